// ============================================================================
// Structure : ConversionController
// ============================================================================
// Maintient deux champs (montant + devise) cohérents avec la table de taux.
//
// Règle de dérivation, selon le dernier côté édité (`active_side`) :
// - Source active : target = round4(source * rate)
// - Target active : source = round4(target / rate), 0 si rate == 0
//
// `rate` est le taux croisé source -> target de la table courante ; 0
// signifie "aucun taux connu".
// ============================================================================

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{normalize_code, round4, RateTable};

/// Côté du convertisseur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Source => "From",
            Side::Target => "To",
        }
    }
}

/// Saisie utilisateur interprétée
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmountInput {
    /// Champ vidé : affiché vide, vaut 0 pour les calculs
    Blank,
    Value(f64),
}

impl AmountInput {
    pub fn value(self) -> f64 {
        match self {
            AmountInput::Blank => 0.0,
            AmountInput::Value(v) => v,
        }
    }
}

/// Interprète le texte saisi ; tout ce qui n'est pas un nombre fini vaut 0
pub fn parse_amount(raw: &str) -> AmountInput {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return AmountInput::Blank;
    }

    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => AmountInput::Value(v),
        _ => AmountInput::Value(0.0),
    }
}

/// Montant converti : round4(amount * rate)
pub fn derive(amount: f64, rate: f64) -> f64 {
    round4(amount * rate)
}

/// Montant source retrouvé : round4(amount / rate), 0 si pas de taux
pub fn derive_inverse(amount: f64, rate: f64) -> f64 {
    if rate > 0.0 {
        round4(amount / rate)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("unknown currency: {0}")]
    UnknownCurrency(String),
}

/// Contrôleur de conversion bidirectionnelle
#[derive(Debug, Clone)]
pub struct ConversionController {
    source_amount: f64,
    target_amount: f64,
    source_currency: String,
    target_currency: String,
    active_side: Side,

    /// Côté dont le champ a été vidé par l'utilisateur (affiché vide)
    blank_side: Option<Side>,

    table: RateTable,

    /// Devises sélectionnables : clés triées de la dernière table non vide
    options: Vec<String>,
}

impl ConversionController {
    /// Crée le contrôleur et dérive immédiatement la cible
    pub fn new(amount: f64, source: &str, target: &str, table: RateTable) -> Self {
        let mut controller = Self {
            source_amount: if amount.is_finite() { amount } else { 0.0 },
            target_amount: 0.0,
            source_currency: normalize_code(source),
            target_currency: normalize_code(target),
            active_side: Side::Source,
            blank_side: None,
            table,
            options: Vec::new(),
        };
        controller.refresh_options();
        controller.repair_selection();
        controller.recompute();
        controller
    }

    // ========================================================================
    // Accesseurs
    // ========================================================================

    pub fn source_amount(&self) -> f64 {
        self.source_amount
    }

    pub fn target_amount(&self) -> f64 {
        self.target_amount
    }

    pub fn amount(&self, side: Side) -> f64 {
        match side {
            Side::Source => self.source_amount,
            Side::Target => self.target_amount,
        }
    }

    pub fn source_currency(&self) -> &str {
        &self.source_currency
    }

    pub fn target_currency(&self) -> &str {
        &self.target_currency
    }

    pub fn currency(&self, side: Side) -> &str {
        match side {
            Side::Source => &self.source_currency,
            Side::Target => &self.target_currency,
        }
    }

    pub fn active_side(&self) -> Side {
        self.active_side
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Taux courant source -> target (0 si inconnu)
    pub fn rate(&self) -> f64 {
        self.table
            .cross_rate(&self.source_currency, &self.target_currency)
    }

    /// Texte à afficher dans le champ d'un côté
    pub fn display_amount(&self, side: Side) -> String {
        if self.blank_side == Some(side) {
            return String::new();
        }
        format_amount(self.amount(side))
    }

    // ========================================================================
    // Opérations
    // ========================================================================

    /// L'utilisateur édite un montant : ce côté devient actif
    pub fn set_amount(&mut self, side: Side, raw: &str) {
        let input = parse_amount(raw);

        self.blank_side = match input {
            AmountInput::Blank => Some(side),
            AmountInput::Value(_) => None,
        };
        self.active_side = side;

        match side {
            Side::Source => self.source_amount = input.value(),
            Side::Target => self.target_amount = input.value(),
        }

        self.recompute();
    }

    /// Sélection d'une devise
    ///
    /// Un code absent des options est refusé et l'état reste inchangé.
    pub fn set_currency(&mut self, side: Side, code: &str) -> Result<(), ConversionError> {
        let code = normalize_code(code);
        if code.is_empty() || !self.options.iter().any(|c| *c == code) {
            warn!(side = side.label(), %code, "Rejected unknown currency");
            return Err(ConversionError::UnknownCurrency(code));
        }

        match side {
            Side::Source => {
                debug!(%code, "Source currency selected");
                self.source_currency = code;
            }
            Side::Target => {
                // La cible est recalculée depuis la source, jamais l'inverse
                debug!(%code, "Target currency selected");
                self.target_currency = code;
                self.active_side = Side::Source;
                if self.blank_side == Some(Side::Target) {
                    self.blank_side = None;
                }
            }
        }

        self.recompute();
        Ok(())
    }

    /// Inverse les devises
    ///
    /// - Source active : montant source conservé, cible recalculée
    /// - Target active : le montant cible devient le montant source, la cible
    ///   repasse à 0 en attendant le prochain recalcul, la source devient active
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.source_currency, &mut self.target_currency);

        match self.active_side {
            Side::Source => self.recompute(),
            Side::Target => {
                self.source_amount = self.target_amount;
                self.target_amount = 0.0;
                self.active_side = Side::Source;
                self.blank_side = None;
            }
        }

        debug!(
            source = %self.source_currency,
            target = %self.target_currency,
            "Currencies swapped"
        );
    }

    /// Conversion explicite (submit) ; idempotente
    pub fn convert(&mut self) {
        self.blank_side = None;
        self.recompute();
    }

    /// Le champ en cours d'édition perd le focus : un champ vide devient 0
    pub fn blur(&mut self) {
        self.blank_side = None;
    }

    /// Nouvelle table de taux
    ///
    /// Met à jour les options, répare la sélection puis recalcule.
    /// Retourne true si la devise source a dû être changée (nouveau fetch).
    pub fn update_rates(&mut self, table: &RateTable) -> bool {
        self.table = table.clone();
        self.refresh_options();
        let source_changed = self.repair_selection();
        self.recompute();
        source_changed
    }

    // ========================================================================
    // Interne
    // ========================================================================

    /// Recalcule le côté inactif depuis le côté actif
    fn recompute(&mut self) {
        let rate = self.rate();
        match self.active_side {
            Side::Source => self.target_amount = derive(self.source_amount, rate),
            Side::Target => self.source_amount = derive_inverse(self.target_amount, rate),
        }
    }

    /// Options = clés triées ; une table vide conserve les options précédentes
    fn refresh_options(&mut self) {
        let codes: Vec<String> = self.table.codes().map(str::to_string).collect();
        if !codes.is_empty() {
            self.options = codes;
        }
    }

    /// Ramène source et cible dans la liste des options
    fn repair_selection(&mut self) -> bool {
        let Some(first) = self.options.first().cloned() else {
            return false;
        };

        let mut source_changed = false;
        if !self.options.contains(&self.source_currency) {
            debug!(from = %self.source_currency, to = %first, "Source currency repaired");
            self.source_currency = first.clone();
            source_changed = true;
        }

        if !self.options.contains(&self.target_currency) {
            let fallback = self
                .options
                .iter()
                .find(|c| **c != self.source_currency)
                .cloned()
                .unwrap_or(first);
            debug!(from = %self.target_currency, to = %fallback, "Target currency repaired");
            self.target_currency = fallback;
        }

        source_changed
    }
}

impl Default for ConversionController {
    fn default() -> Self {
        Self::new(1.0, "usd", "inr", RateTable::static_default())
    }
}

/// Formate un montant sans zéros superflus ("835", "1.2346")
pub fn format_amount(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        "0".to_string()
    } else {
        format!("{}", value)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
