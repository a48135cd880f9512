// ============================================================================
// Enum : FetchState + FetchError
// ============================================================================
// CONCEPT RUST : Enums pour state machines
// - Un seul état à la fois : impossible d'être "loading" ET "en erreur"
// - Chaque variant porte la table affichable : l'UI n'a jamais de table vide
// ============================================================================

use std::time::Duration;

use thiserror::Error;

use super::rate_table::RateTable;

/// Message affiché quand toutes les sources ont échoué
pub const RATES_UNAVAILABLE: &str = "Live rates unavailable, showing best-known rates";

/// Échecs possibles lors de la récupération d'une table
///
/// Tous sont traités de la même façon par le provider : on passe à la
/// source suivante, puis on se replie sur la meilleure table connue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// La source n'a pas répondu dans le délai imparti
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Échec de connexion / DNS
    #[error("network error: {0}")]
    Network(String),

    /// Statut HTTP hors 2xx
    #[error("HTTP error: status {0}")]
    Http(u16),

    /// Corps de réponse illisible
    #[error("malformed response: {0}")]
    Parse(String),

    /// Moins de 2 devises exploitables après normalisation
    #[error("unusable rate data: {0} currencies after normalization")]
    UnusableData(usize),

    /// Aucune source configurée
    #[error("no rate source configured")]
    NoSources,
}

/// État de la récupération des taux
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    /// Aucune base sélectionnée : table hors-ligne, pas de fetch
    Idle(RateTable),

    /// Fetch en cours ; on garde la table précédente affichée
    Loading(RateTable),

    /// Table live à jour
    Ready(RateTable),

    /// Toutes les sources ont échoué : meilleure table connue + raison
    StaleWithError(RateTable, String),
}

impl FetchState {
    /// Table à afficher, quel que soit l'état
    pub fn table(&self) -> &RateTable {
        match self {
            FetchState::Idle(table)
            | FetchState::Loading(table)
            | FetchState::Ready(table)
            | FetchState::StaleWithError(table, _) => table,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading(_))
    }

    /// Message d'erreur non fatal, s'il y en a un
    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::StaleWithError(_, reason) => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Libellé court pour les logs et la barre de statut
    pub fn label(&self) -> &'static str {
        match self {
            FetchState::Idle(_) => "idle",
            FetchState::Loading(_) => "loading",
            FetchState::Ready(_) => "ready",
            FetchState::StaleWithError(_, _) => "stale",
        }
    }
}

impl Default for FetchState {
    fn default() -> Self {
        FetchState::Idle(RateTable::static_default())
    }
}
