// ============================================================================
// Module : api
// ============================================================================
// Clients des APIs de taux de change (exchangerate.host, frankfurter.app)
// et logique de fallback entre sources
// ============================================================================

pub mod resolver; // Fallback ordonné + timeouts
pub mod sources;  // Trait RateSource et implémentation HTTP

// Re-export des fonctions principales
pub use resolver::{resolve_rates, SharedSources};
pub use sources::{parse_rates_body, HttpRateSource, RateSource};
