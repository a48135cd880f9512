// ============================================================================
// Sources de taux de change
// ============================================================================
// Une source sait récupérer une table de taux pour une devise de base.
//
// CONCEPTS RUST :
// 1. Traits async via async-trait : permet des `Arc<dyn RateSource>`
// 2. Serde : désérialisation tolérante (champs optionnels, valeurs brutes)
// 3. Conversion d'erreurs reqwest -> FetchError
// ============================================================================

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::SourceConfig;
use crate::models::{normalize_code, normalize_rates, FetchError, RateOrigin, RateTable};

/// Une source de taux interrogeable
///
/// Le timeout n'est pas appliqué par la source elle-même mais par le
/// resolver, qui enveloppe chaque appel dans `tokio::time::timeout`.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Nom lisible de la source
    fn name(&self) -> &str;

    /// Délai maximum accordé à cette source
    fn timeout(&self) -> Duration;

    /// Récupère la table relative à `base` (code en minuscules)
    async fn fetch(&self, base: &str) -> Result<RateTable, FetchError>;
}

// ============================================================================
// Format de réponse
// ============================================================================
// exchangerate.host : { "base": "USD", "date": "...", "rates": { ... } }
// frankfurter.app   : { "amount": 1.0, "base": "USD", "date": "...", "rates": { ... } }
// Certaines variantes renvoient "from" au lieu de "base".
// ============================================================================

#[derive(Debug, Deserialize)]
struct RatesResponse {
    base: Option<String>,
    from: Option<String>,
    #[serde(default)]
    rates: HashMap<String, Value>,
}

/// Parse un corps de réponse JSON en RateTable relative à `requested`
///
/// Si la réponse annonce une autre base, la table est réexprimée dans la
/// base demandée ; si c'est impossible, la donnée est inutilisable.
pub fn parse_rates_body(requested: &str, body: &str) -> Result<RateTable, FetchError> {
    let response: RatesResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let requested = normalize_code(requested);
    let announced = response
        .base
        .or(response.from)
        .map(|b| normalize_code(&b))
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| requested.clone());

    let table = normalize_rates(&announced, response.rates);

    let table = if requested.is_empty() || announced == requested {
        table
    } else {
        debug!(%requested, %announced, "Response base differs, rebasing");
        table
            .rebased(&requested)
            .ok_or(FetchError::UnusableData(0))?
    };

    if !table.is_usable() {
        return Err(FetchError::UnusableData(table.len()));
    }

    Ok(table)
}

// ============================================================================
// Source HTTP
// ============================================================================

/// Source HTTP générique : GET {url}?{base_param}={BASE}
pub struct HttpRateSource {
    config: SourceConfig,
    client: reqwest::Client,
}

impl HttpRateSource {
    /// Crée la source et son client HTTP
    pub fn new(config: SourceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("lazyfx/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self { config, client })
    }

    /// Construit une source par entrée de la config, dans l'ordre
    pub fn from_configs(configs: &[SourceConfig]) -> anyhow::Result<Vec<Self>> {
        configs.iter().cloned().map(Self::new).collect()
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    #[instrument(skip(self), fields(source = %self.config.name))]
    async fn fetch(&self, base: &str) -> Result<RateTable, FetchError> {
        // Les deux APIs acceptent les codes ISO en majuscules
        let code = base.to_uppercase();

        debug!(url = %self.config.url, "Sending HTTP request");
        let response = self
            .client
            .get(&self.config.url)
            .query(&[(self.config.base_param.as_str(), code.as_str())])
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.config.timeout))?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            warn!(status = %status, "Rate source returned error status");
            return Err(FetchError::Http(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, self.config.timeout))?;

        let table = parse_rates_body(base, &body)?;
        debug!(currencies = table.len(), "Parsed rate table");

        Ok(table.with_origin(RateOrigin::Live {
            source: self.config.name.clone(),
            fetched_at: Utc::now(),
        }))
    }
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else if err.is_decode() {
        FetchError::Parse(err.to_string())
    } else {
        FetchError::Network(err.to_string())
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_parse_exchangerate_host_body() {
        let body = r#"{"base":"USD","date":"2024-01-15","rates":{"EUR":0.91,"INR":83.1,"USD":1}}"#;
        let table = parse_rates_body("usd", body).unwrap();

        assert_eq!(table.base(), "usd");
        assert_eq!(table.get("eur"), 0.91);
        assert_eq!(table.get("inr"), 83.1);
        assert_eq!(table.get("usd"), 1.0);
    }

    #[test]
    fn test_parse_frankfurter_body() {
        // Frankfurter n'inclut pas la base dans "rates"
        let body = r#"{"amount":1.0,"base":"EUR","date":"2024-01-15","rates":{"USD":1.09,"GBP":0.86}}"#;
        let table = parse_rates_body("eur", body).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get("eur"), 1.0);
        assert_eq!(table.get("gbp"), 0.86);
    }

    #[test]
    fn test_parse_from_field_and_missing_base() {
        let body = r#"{"from":"gbp","rates":{"usd":1.25}}"#;
        let table = parse_rates_body("gbp", body).unwrap();
        assert_eq!(table.base(), "gbp");

        let body = r#"{"rates":{"usd":1.25}}"#;
        let table = parse_rates_body("gbp", body).unwrap();
        assert_eq!(table.base(), "gbp");
        assert_eq!(table.get("gbp"), 1.0);
    }

    #[test]
    fn test_parse_rebases_mismatched_base() {
        let body = r#"{"base":"EUR","rates":{"USD":2.0,"GBP":1.0}}"#;
        let table = parse_rates_body("usd", body).unwrap();

        assert_eq!(table.base(), "usd");
        assert_eq!(table.get("eur"), 0.5);
        assert_eq!(table.get("gbp"), 0.5);

        let body = r#"{"base":"EUR","rates":{"GBP":1.0}}"#;
        assert_eq!(
            parse_rates_body("usd", body),
            Err(FetchError::UnusableData(0))
        );
    }

    #[test]
    fn test_parse_malformed_body() {
        let err = parse_rates_body("usd", "<html>oops</html>").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn test_parse_unusable_body() {
        let body = r#"{"base":"USD","rates":{"EUR":"n/a","GBP":-3}}"#;
        assert_eq!(
            parse_rates_body("usd", body),
            Err(FetchError::UnusableData(1))
        );

        let body = r#"{"success":false}"#;
        assert_eq!(
            parse_rates_body("usd", body),
            Err(FetchError::UnusableData(1))
        );
    }

    #[test]
    fn test_http_sources_from_config() {
        let config = Config::default();
        let sources = HttpRateSource::from_configs(&config.sources).unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name(), "exchangerate.host");
        assert_eq!(sources[1].timeout(), Duration::from_secs(7));
    }

    // Test avec un vrai appel API : cargo test -- --ignored
    #[tokio::test]
    #[ignore = "appel réseau réel"]
    async fn test_fetch_live_rates() {
        let config = Config::default();
        let source = HttpRateSource::new(config.sources[1].clone()).unwrap();

        let result = tokio::time::timeout(source.timeout(), source.fetch("usd")).await;

        match result {
            Ok(Ok(table)) => {
                assert_eq!(table.base(), "usd");
                assert!(table.is_usable());
                println!("✓ Récupéré {} devises", table.len());
            }
            Ok(Err(e)) => println!("⚠ Test skippé (pas de connexion?) : {}", e),
            Err(_) => println!("⚠ Test skippé (timeout)"),
        }
    }
}
