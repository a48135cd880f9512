// ============================================================================
// Module : models
// ============================================================================
// Structures de données : tables de taux et état de récupération
// ============================================================================

pub mod fetch_state; // Déclaration du module fetch_state (fichier fetch_state.rs)
pub mod rate_table;  // Déclaration du module rate_table (fichier rate_table.rs)

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use lazyfx::models::rate_table::RateTable;
// On peut faire : use lazyfx::models::RateTable;
pub use fetch_state::{FetchError, FetchState, RATES_UNAVAILABLE};
pub use rate_table::{normalize_code, normalize_rates, round4, RateOrigin, RateTable};
