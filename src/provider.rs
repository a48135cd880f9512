// ============================================================================
// Structure : RateProvider
// ============================================================================
// Tient la meilleure table disponible pour la devise de base courante.
//
// Le provider ne fait aucun I/O : il émet des `FetchTicket` que le worker
// exécute, puis reçoit le résultat via `apply()`. Chaque changement de base
// ou refresh incrémente la génération ; un résultat dont le ticket ne
// correspond plus à (base, génération) courants est jeté.
// ============================================================================

use tracing::{debug, info, warn};

use crate::models::{normalize_code, FetchError, FetchState, RateTable, RATES_UNAVAILABLE};

/// Demande de résolution pour une base et une génération données
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub base: String,
    pub generation: u64,
}

/// État des taux pour la base courante
#[derive(Debug, Clone)]
pub struct RateProvider {
    base: String,
    generation: u64,
    state: FetchState,
}

impl RateProvider {
    /// Provider sans base : table hors-ligne, aucun fetch
    pub fn new() -> Self {
        Self {
            base: String::new(),
            generation: 0,
            state: FetchState::default(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Table à afficher (jamais vide)
    pub fn table(&self) -> &RateTable {
        self.state.table()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }

    /// Change la devise de base
    ///
    /// Retourne le ticket à exécuter, ou None si la base n'a pas changé
    /// ou si elle est vide (table hors-ligne, pas de fetch).
    pub fn set_base(&mut self, code: &str) -> Option<FetchTicket> {
        let code = normalize_code(code);
        if code == self.base {
            return None;
        }

        debug!(from = %self.base, to = %code, "Base currency changed");
        self.base = code;
        self.start()
    }

    /// Force une nouvelle résolution de la même base
    pub fn refresh(&mut self) -> Option<FetchTicket> {
        info!(base = %self.base, "Refresh requested");
        self.start()
    }

    /// Nouvelle génération : invalide tout fetch en vol
    fn start(&mut self) -> Option<FetchTicket> {
        self.generation += 1;

        if self.base.is_empty() {
            self.state = FetchState::Idle(RateTable::static_default());
            return None;
        }

        // On garde la table courante pendant le chargement (pas de flicker)
        let held = self.state.table().clone();
        self.state = FetchState::Loading(held);

        Some(FetchTicket {
            base: self.base.clone(),
            generation: self.generation,
        })
    }

    /// Applique le résultat d'un fetch
    ///
    /// Retourne false si le ticket est périmé (résultat ignoré).
    pub fn apply(&mut self, ticket: &FetchTicket, result: Result<RateTable, FetchError>) -> bool {
        if !self.is_current(ticket) {
            debug!(
                ticket_base = %ticket.base,
                ticket_generation = ticket.generation,
                current_base = %self.base,
                current_generation = self.generation,
                "Discarding stale rate result"
            );
            return false;
        }

        self.state = match result {
            Ok(table) => {
                info!(base = %ticket.base, currencies = table.len(), "Live rates applied");
                FetchState::Ready(table)
            }
            Err(e) => {
                // Table précédente (live ou hors-ligne) conservée
                warn!(base = %ticket.base, error = %e, "All rate sources failed");
                let held = self.state.table().clone();
                FetchState::StaleWithError(held, RATES_UNAVAILABLE.to_string())
            }
        };
        true
    }

    /// Le ticket correspond-il encore à la requête courante ?
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation && ticket.base == self.base
    }
}

impl Default for RateProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
