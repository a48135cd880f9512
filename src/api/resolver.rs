// ============================================================================
// Resolver : fallback ordonné entre sources
// ============================================================================
// Essaie chaque source dans l'ordre, chacune bornée par son propre timeout.
// La première table exploitable gagne ; sinon on renvoie la dernière erreur.
// ============================================================================

use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::sources::RateSource;
use crate::models::{FetchError, RateTable};

/// Liste ordonnée de sources partagée entre les tâches du worker
pub type SharedSources = Arc<Vec<Arc<dyn RateSource>>>;

/// Résout la meilleure table live pour `base`
///
/// Ne touche à aucun état : le repli sur une table connue est fait par
/// le `RateProvider` qui reçoit l'erreur.
#[instrument(skip(sources), fields(sources = sources.len()))]
pub async fn resolve_rates(
    sources: &[Arc<dyn RateSource>],
    base: &str,
) -> Result<RateTable, FetchError> {
    let mut last_error = FetchError::NoSources;

    for source in sources {
        let timeout = source.timeout();

        let outcome = match tokio::time::timeout(timeout, source.fetch(base)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        };

        match outcome {
            Ok(table) if table.is_usable() => {
                info!(source = source.name(), currencies = table.len(), "Rates resolved");
                return Ok(table);
            }
            Ok(table) => {
                warn!(source = source.name(), currencies = table.len(), "Source returned unusable rates");
                last_error = FetchError::UnusableData(table.len());
            }
            Err(e) => {
                warn!(source = source.name(), error = %e, "Source failed, trying next");
                last_error = e;
            }
        }
    }

    Err(last_error)
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    /// Source en mémoire : renvoie une réponse fixe, avec un délai optionnel
    struct FakeSource {
        name: &'static str,
        delay: Duration,
        timeout: Duration,
        response: Result<RateTable, FetchError>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn ok(name: &'static str, table: RateTable) -> Self {
            Self {
                name,
                delay: Duration::ZERO,
                timeout: Duration::from_secs(8),
                response: Ok(table),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(name: &'static str, error: FetchError) -> Self {
            Self {
                response: Err(error),
                ..Self::ok(name, RateTable::static_default())
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateSource for FakeSource {
        fn name(&self) -> &str {
            self.name
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }

        async fn fetch(&self, _base: &str) -> Result<RateTable, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.response.clone()
        }
    }

    fn eur_table() -> RateTable {
        RateTable::from_pairs("eur", [("usd", 1.1), ("gbp", 0.86)])
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = Arc::new(FakeSource::ok("primary", eur_table()));
        let fallback = Arc::new(FakeSource::ok("fallback", RateTable::static_default()));
        let sources: Vec<Arc<dyn RateSource>> = vec![primary.clone(), fallback.clone()];

        let table = resolve_rates(&sources, "eur").await.unwrap();

        assert_eq!(table, eur_table());
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_uses_fallback() {
        let primary = Arc::new(FakeSource::failing("primary", FetchError::Http(500)));
        let fallback = Arc::new(FakeSource::ok("fallback", eur_table()));
        let sources: Vec<Arc<dyn RateSource>> = vec![primary.clone(), fallback.clone()];

        let table = resolve_rates(&sources, "eur").await.unwrap();

        assert_eq!(table, eur_table());
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_unusable_primary_uses_fallback() {
        let lonely = RateTable::from_pairs("eur", Vec::<(&str, f64)>::new());
        let primary = Arc::new(FakeSource::ok("primary", lonely));
        let fallback = Arc::new(FakeSource::ok("fallback", eur_table()));
        let sources: Vec<Arc<dyn RateSource>> = vec![primary, fallback];

        let table = resolve_rates(&sources, "eur").await.unwrap();
        assert_eq!(table, eur_table());
    }

    #[tokio::test]
    async fn test_all_sources_fail_returns_last_error() {
        let sources: Vec<Arc<dyn RateSource>> = vec![
            Arc::new(FakeSource::failing("primary", FetchError::Network("dns".into()))),
            Arc::new(FakeSource::failing("fallback", FetchError::Parse("eof".into()))),
        ];

        let err = resolve_rates(&sources, "eur").await.unwrap_err();
        assert_eq!(err, FetchError::Parse("eof".into()));
    }

    #[tokio::test]
    async fn test_no_sources() {
        let err = resolve_rates(&[], "eur").await.unwrap_err();
        assert_eq!(err, FetchError::NoSources);
    }

    // Horloge virtuelle : le sleep de 60s est "instantané"
    #[tokio::test(start_paused = true)]
    async fn test_slow_primary_times_out() {
        let primary = Arc::new(
            FakeSource::ok("primary", RateTable::static_default()).slow(Duration::from_secs(60)),
        );
        let fallback = Arc::new(
            FakeSource::failing("fallback", FetchError::Http(503)).slow(Duration::from_secs(60)),
        );
        let sources: Vec<Arc<dyn RateSource>> = vec![primary.clone(), fallback.clone()];

        let err = resolve_rates(&sources, "usd").await.unwrap_err();

        assert_eq!(err, FetchError::Timeout(Duration::from_secs(8)));
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_is_bounded_by_its_own_timeout() {
        let primary = Arc::new(
            FakeSource::ok("primary", eur_table())
                .slow(Duration::from_secs(9))
                .with_timeout(Duration::from_secs(8)),
        );
        let fallback = Arc::new(
            FakeSource::ok("fallback", eur_table())
                .slow(Duration::from_millis(7500))
                .with_timeout(Duration::from_secs(7)),
        );
        let sources: Vec<Arc<dyn RateSource>> = vec![primary.clone(), fallback.clone()];

        let started = tokio::time::Instant::now();
        let err = resolve_rates(&sources, "eur").await.unwrap_err();

        assert_eq!(err, FetchError::Timeout(Duration::from_secs(7)));
        // 8s pour la source principale + 7s pour le fallback
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16));
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_timeout_then_fallback_succeeds() {
        let primary = Arc::new(
            FakeSource::ok("primary", RateTable::static_default())
                .slow(Duration::from_secs(9))
                .with_timeout(Duration::from_secs(8)),
        );
        let fallback = Arc::new(
            FakeSource::ok("fallback", eur_table()).with_timeout(Duration::from_secs(7)),
        );
        let sources: Vec<Arc<dyn RateSource>> = vec![primary.clone(), fallback.clone()];

        let table = resolve_rates(&sources, "eur").await.unwrap();

        assert_eq!(table, eur_table());
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }
}
