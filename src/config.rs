// ============================================================================
// Configuration
// ============================================================================
// Valeurs par défaut codées en dur, surchargées par variables d'environnement
//
// Variables reconnues :
// - LAZYFX_PRIMARY_URL / LAZYFX_FALLBACK_URL
// - LAZYFX_PRIMARY_TIMEOUT_MS / LAZYFX_FALLBACK_TIMEOUT_MS
// - LAZYFX_SOURCE / LAZYFX_TARGET / LAZYFX_AMOUNT
// - LAZYFX_LOG_DIR
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::models::normalize_code;

/// Description d'une source HTTP de taux
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    /// Nom lisible (logs, barre de statut)
    pub name: String,

    /// URL de l'endpoint, sans query string
    pub url: String,

    /// Nom du paramètre de query qui porte la devise de base
    pub base_param: String,

    /// Délai maximum pour une tentative
    pub timeout: Duration,
}

/// Configuration complète de l'application
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Sources interrogées dans l'ordre (primaire puis secours)
    pub sources: Vec<SourceConfig>,

    pub default_amount: f64,
    pub default_source: String,
    pub default_target: String,

    /// Répertoire des logs ; None => emplacement par défaut
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: vec![
                SourceConfig {
                    name: "exchangerate.host".to_string(),
                    url: "https://api.exchangerate.host/latest".to_string(),
                    base_param: "base".to_string(),
                    timeout: Duration::from_secs(8),
                },
                SourceConfig {
                    name: "frankfurter.app".to_string(),
                    url: "https://api.frankfurter.app/latest".to_string(),
                    base_param: "from".to_string(),
                    timeout: Duration::from_secs(7),
                },
            ],
            default_amount: 1.0,
            default_source: "usd".to_string(),
            default_target: "inr".to_string(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Construit la config à partir de l'environnement du processus
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construit la config à partir d'une fonction de lookup
    ///
    /// CONCEPT RUST : Injection de dépendance par closure
    /// - Les tests passent une HashMap au lieu de toucher à l'environnement
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("LAZYFX_PRIMARY_URL") {
            config.sources[0].url = url;
        }
        if let Some(url) = lookup("LAZYFX_FALLBACK_URL") {
            config.sources[1].url = url;
        }
        if let Some(timeout) = parse_millis(&lookup, "LAZYFX_PRIMARY_TIMEOUT_MS") {
            config.sources[0].timeout = timeout;
        }
        if let Some(timeout) = parse_millis(&lookup, "LAZYFX_FALLBACK_TIMEOUT_MS") {
            config.sources[1].timeout = timeout;
        }

        if let Some(code) = lookup("LAZYFX_SOURCE").map(|c| normalize_code(&c)) {
            if !code.is_empty() {
                config.default_source = code;
            }
        }
        if let Some(code) = lookup("LAZYFX_TARGET").map(|c| normalize_code(&c)) {
            if !code.is_empty() {
                config.default_target = code;
            }
        }

        if let Some(raw) = lookup("LAZYFX_AMOUNT") {
            match raw.trim().parse::<f64>() {
                Ok(amount) if amount.is_finite() => config.default_amount = amount,
                _ => warn!(value = %raw, "Ignoring invalid LAZYFX_AMOUNT"),
            }
        }

        if let Some(dir) = lookup("LAZYFX_LOG_DIR") {
            config.log_dir = Some(PathBuf::from(dir));
        }

        config
    }

    /// Répertoire de logs effectif
    ///
    /// - Linux : ~/.local/share/lazyfx/logs
    /// - Sinon ./logs si aucun répertoire de données n'est connu
    pub fn resolved_log_dir(&self) -> PathBuf {
        if let Some(dir) = &self.log_dir {
            return dir.clone();
        }
        dirs::data_local_dir()
            .map(|dir| dir.join("lazyfx").join("logs"))
            .unwrap_or_else(|| PathBuf::from("./logs"))
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            warn!(key, value = %raw, "Ignoring invalid timeout");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].timeout, Duration::from_secs(8));
        assert_eq!(config.sources[1].timeout, Duration::from_secs(7));
        assert_eq!(config.default_source, "usd");
        assert_eq!(config.default_target, "inr");
        assert_eq!(config.default_amount, 1.0);
    }

    #[test]
    fn test_env_overrides() {
        let config = config_with(&[
            ("LAZYFX_PRIMARY_URL", "http://localhost:9000/latest"),
            ("LAZYFX_FALLBACK_TIMEOUT_MS", "1500"),
            ("LAZYFX_SOURCE", " EUR "),
            ("LAZYFX_AMOUNT", "42.5"),
            ("LAZYFX_LOG_DIR", "/tmp/lazyfx"),
        ]);

        assert_eq!(config.sources[0].url, "http://localhost:9000/latest");
        assert_eq!(config.sources[1].timeout, Duration::from_millis(1500));
        assert_eq!(config.default_source, "eur");
        assert_eq!(config.default_amount, 42.5);
        assert_eq!(config.resolved_log_dir(), PathBuf::from("/tmp/lazyfx"));
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let config = config_with(&[
            ("LAZYFX_PRIMARY_TIMEOUT_MS", "soon"),
            ("LAZYFX_AMOUNT", "NaN"),
            ("LAZYFX_TARGET", "   "),
        ]);

        assert_eq!(config.sources[0].timeout, Duration::from_secs(8));
        assert_eq!(config.default_amount, 1.0);
        assert_eq!(config.default_target, "inr");
    }
}
