// ============================================================================
// Structure : App
// ============================================================================
// Gère l'état global de l'application TUI
//
// PATTERN : "Application State"
// - Tous les composants de l'UI lisent depuis App
// - Toutes les modifications passent par les méthodes de App
// - Les méthodes qui nécessitent un fetch retournent un `FetchTicket`
//   que la boucle principale envoie au worker
// ============================================================================

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::converter::{ConversionController, ConversionError, Side};
use crate::models::{FetchError, RateOrigin, RateTable};
use crate::provider::{FetchTicket, RateProvider};

// ============================================================================
// Enum : Focus
// ============================================================================
// CONCEPT RUST : Enums pour state machines
// - Un seul champ actif à la fois
// - Tab / Shift-Tab font tourner le focus
// ============================================================================

/// Champ qui reçoit les frappes clavier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    SourceAmount,
    SourceCurrency,
    TargetAmount,
    TargetCurrency,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::SourceAmount => Focus::SourceCurrency,
            Focus::SourceCurrency => Focus::TargetAmount,
            Focus::TargetAmount => Focus::TargetCurrency,
            Focus::TargetCurrency => Focus::SourceAmount,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            Focus::SourceAmount => Focus::TargetCurrency,
            Focus::SourceCurrency => Focus::SourceAmount,
            Focus::TargetAmount => Focus::SourceCurrency,
            Focus::TargetCurrency => Focus::TargetAmount,
        }
    }

    /// Côté du convertisseur concerné par ce champ
    pub fn side(self) -> Side {
        match self {
            Focus::SourceAmount | Focus::SourceCurrency => Side::Source,
            Focus::TargetAmount | Focus::TargetCurrency => Side::Target,
        }
    }

    pub fn is_amount(self) -> bool {
        matches!(self, Focus::SourceAmount | Focus::TargetAmount)
    }
}

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Two-step quit : première pression de 'q' => confirmation demandée
    pub confirm_quit: bool,

    /// Champ actif
    pub focus: Focus,

    /// Texte du champ montant en cours d'édition
    pub input_buffer: String,

    pub controller: ConversionController,
    pub provider: RateProvider,
}

impl App {
    /// Crée l'application à partir de la configuration
    ///
    /// Aucun fetch n'est lancé ici : appeler `start()` ensuite.
    pub fn new(config: &Config) -> Self {
        let controller = ConversionController::new(
            config.default_amount,
            &config.default_source,
            &config.default_target,
            RateTable::static_default(),
        );

        let mut app = Self {
            running: true,
            confirm_quit: false,
            focus: Focus::SourceAmount,
            input_buffer: String::new(),
            controller,
            provider: RateProvider::new(),
        };
        app.sync_buffer();
        app
    }

    /// Premier fetch : base = devise source
    pub fn start(&mut self) -> Option<FetchTicket> {
        let base = self.controller.source_currency().to_string();
        self.provider.set_base(&base)
    }

    // ========================================================================
    // Cycle de vie
    // ========================================================================

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    // ========================================================================
    // Focus et saisie
    // ========================================================================

    pub fn focus_next(&mut self) {
        self.move_focus(self.focus.next());
    }

    pub fn focus_previous(&mut self) {
        self.move_focus(self.focus.previous());
    }

    fn move_focus(&mut self, focus: Focus) {
        // Quitter un champ montant vide le fait repasser à "0"
        if self.focus.is_amount() {
            self.controller.blur();
        }
        self.focus = focus;
        self.sync_buffer();
    }

    /// Ajoute un caractère au montant édité
    pub fn append_char(&mut self, c: char) {
        if !self.focus.is_amount() {
            return;
        }
        self.input_buffer.push(c);
        self.controller.set_amount(self.focus.side(), &self.input_buffer);
    }

    /// Supprime le dernier caractère du montant édité
    pub fn backspace(&mut self) {
        if !self.focus.is_amount() {
            return;
        }
        self.input_buffer.pop();
        self.controller.set_amount(self.focus.side(), &self.input_buffer);
    }

    /// Recopie le montant affiché du champ focus dans le buffer
    fn sync_buffer(&mut self) {
        if self.focus.is_amount() {
            self.input_buffer = self.controller.display_amount(self.focus.side());
        } else {
            self.input_buffer.clear();
        }
    }

    /// Resynchronise le buffer seulement si le champ focus est dérivé
    ///
    /// Le champ en cours de frappe garde son texte brut ("1." reste "1.").
    fn sync_derived_buffer(&mut self) {
        if self.focus.side() != self.controller.active_side() {
            self.sync_buffer();
        }
    }

    // ========================================================================
    // Devises
    // ========================================================================

    /// Passe à la devise suivante/précédente dans la liste d'options
    pub fn cycle_currency(&mut self, forward: bool) -> Option<FetchTicket> {
        if self.focus.is_amount() {
            return None;
        }

        let side = self.focus.side();
        let options = self.controller.options();
        if options.is_empty() {
            return None;
        }

        let current = options
            .iter()
            .position(|c| c == self.controller.currency(side))
            .unwrap_or(0);
        let len = options.len();
        let index = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        let code = options[index].clone();

        self.select_currency(side, &code).unwrap_or_else(|e| {
            warn!(error = %e, "Currency cycling failed");
            None
        })
    }

    /// Sélection directe d'une devise
    ///
    /// Changer la source relance un fetch avec la nouvelle base.
    pub fn select_currency(
        &mut self,
        side: Side,
        code: &str,
    ) -> Result<Option<FetchTicket>, ConversionError> {
        self.controller.set_currency(side, code)?;
        info!(side = side.label(), code = %self.controller.currency(side), "Currency selected");
        self.sync_derived_buffer();

        let ticket = match side {
            Side::Source => self.request_source_rates(),
            Side::Target => None,
        };
        Ok(ticket)
    }

    fn request_source_rates(&mut self) -> Option<FetchTicket> {
        let base = self.controller.source_currency().to_string();
        self.provider.set_base(&base)
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Inverse les devises ; la nouvelle source déclenche un fetch
    pub fn swap(&mut self) -> Option<FetchTicket> {
        self.controller.swap();
        let ticket = self.request_source_rates();

        // Même base (ex: USD -> USD) : pas de fetch, on recalcule tout de suite
        if ticket.is_none() {
            self.controller.convert();
        }
        self.sync_buffer();
        ticket
    }

    /// Conversion explicite (Enter) ; ignorée pendant un fetch
    pub fn convert(&mut self) {
        if self.provider.is_loading() {
            debug!("Convert ignored while rates are loading");
            return;
        }
        self.controller.convert();
        self.sync_buffer();
    }

    /// Relance la résolution de la base courante ; ignorée pendant un fetch
    pub fn refresh(&mut self) -> Option<FetchTicket> {
        if self.provider.is_loading() {
            debug!("Refresh ignored while rates are loading");
            return None;
        }
        self.provider.refresh()
    }

    /// Reçoit le résultat d'un fetch du worker
    ///
    /// Retourne un nouveau ticket si la réparation de la sélection a changé
    /// la devise source.
    pub fn apply_rates(
        &mut self,
        ticket: &FetchTicket,
        result: Result<RateTable, FetchError>,
    ) -> Option<FetchTicket> {
        if !self.provider.apply(ticket, result) {
            return None;
        }

        let source_changed = self.controller.update_rates(self.provider.table());
        self.sync_derived_buffer();

        if source_changed {
            debug!(source = %self.controller.source_currency(), "Source repaired, fetching its rates");
            self.request_source_rates()
        } else {
            None
        }
    }

    // ========================================================================
    // Helpers d'affichage
    // ========================================================================

    /// Texte du champ montant d'un côté (buffer brut si en édition)
    pub fn amount_text(&self, side: Side) -> String {
        if self.focus.is_amount() && self.focus.side() == side {
            self.input_buffer.clone()
        } else {
            self.controller.display_amount(side)
        }
    }

    /// "1 USD = 83.500000 INR", seulement hors chargement et si le taux est connu
    pub fn rate_line(&self) -> Option<String> {
        let rate = self.controller.rate();
        if self.provider.is_loading() || rate <= 0.0 {
            return None;
        }
        Some(format!(
            "1 {} = {:.6} {}",
            self.controller.source_currency().to_uppercase(),
            rate,
            self.controller.target_currency().to_uppercase()
        ))
    }

    /// Provenance de la table affichée
    pub fn origin_line(&self) -> String {
        match self.provider.table().origin() {
            RateOrigin::Builtin => "built-in rates".to_string(),
            RateOrigin::Live { source, fetched_at } => format!(
                "{} @ {}",
                source,
                fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RATES_UNAVAILABLE;

    fn usd_table() -> RateTable {
        RateTable::from_pairs("usd", [("eur", 0.5), ("inr", 80.0)])
    }

    fn eur_table() -> RateTable {
        RateTable::from_pairs("eur", [("usd", 2.0), ("inr", 160.0)])
    }

    #[test]
    fn test_app_creation() {
        let app = App::default();
        assert!(app.is_running());
        assert_eq!(app.focus, Focus::SourceAmount);
        assert_eq!(app.input_buffer, "1");
        assert_eq!(app.amount_text(Side::Target), "83.5");
    }

    #[test]
    fn test_app_quit() {
        let mut app = App::default();
        app.request_quit();
        assert!(app.is_awaiting_quit_confirmation());
        app.cancel_quit();
        assert!(!app.is_awaiting_quit_confirmation());

        app.quit();
        assert!(!app.is_running());
    }

    #[test]
    fn test_start_requests_source_rates() {
        let mut app = App::default();
        let ticket = app.start().unwrap();

        assert_eq!(ticket.base, "usd");
        assert!(app.provider.is_loading());
        assert!(app.rate_line().is_none());
    }

    #[test]
    fn test_typing_updates_target() {
        let mut app = App::default();
        app.backspace();
        assert_eq!(app.amount_text(Side::Source), "");

        app.append_char('1');
        app.append_char('0');
        assert_eq!(app.controller.target_amount(), 835.0);

        // Le point final reste visible pendant la frappe
        app.append_char('.');
        assert_eq!(app.amount_text(Side::Source), "10.");
    }

    #[test]
    fn test_focus_cycle_and_blur() {
        let mut app = App::default();
        app.backspace();
        app.focus_next();
        assert_eq!(app.focus, Focus::SourceCurrency);
        assert_eq!(app.amount_text(Side::Source), "0");

        app.focus_next();
        assert_eq!(app.focus, Focus::TargetAmount);
        assert_eq!(app.input_buffer, "0");

        app.focus_previous();
        app.focus_previous();
        app.focus_previous();
        assert_eq!(app.focus, Focus::TargetCurrency);
    }

    #[test]
    fn test_rates_applied_and_rate_line() {
        let mut app = App::default();
        let ticket = app.start().unwrap();

        assert!(app.apply_rates(&ticket, Ok(usd_table())).is_none());
        assert_eq!(app.controller.target_amount(), 80.0);
        assert_eq!(app.rate_line().unwrap(), "1 USD = 80.000000 INR");
    }

    #[test]
    fn test_failure_shows_error_and_keeps_rates() {
        let mut app = App::default();
        let ticket = app.start().unwrap();

        app.apply_rates(&ticket, Err(FetchError::Http(500)));
        assert_eq!(app.provider.error(), Some(RATES_UNAVAILABLE));
        assert_eq!(app.controller.target_amount(), 83.5);
        assert_eq!(app.origin_line(), "built-in rates");
    }

    #[test]
    fn test_source_change_fetches_and_ignores_stale() {
        let mut app = App::default();
        let usd_ticket = app.start().unwrap();

        app.focus_next();
        let eur_ticket = app.select_currency(Side::Source, "eur").unwrap().unwrap();
        assert_eq!(eur_ticket.base, "eur");

        assert!(app.apply_rates(&eur_ticket, Ok(eur_table())).is_none());
        app.apply_rates(&usd_ticket, Ok(usd_table()));

        assert_eq!(app.provider.table(), &eur_table());
        assert_eq!(app.controller.target_amount(), 160.0);
    }

    #[test]
    fn test_cycle_currency_on_target() {
        let mut app = App::default();
        app.focus = Focus::TargetCurrency;

        assert!(app.cycle_currency(true).is_none());
        assert_eq!(app.controller.target_currency(), "jpy");
        app.cycle_currency(false);
        app.cycle_currency(false);
        assert_eq!(app.controller.target_currency(), "gbp");
    }

    #[test]
    fn test_cycle_currency_ignored_on_amount_field() {
        let mut app = App::default();
        assert!(app.cycle_currency(true).is_none());
        assert_eq!(app.controller.target_currency(), "inr");
    }

    #[test]
    fn test_swap_requests_new_base() {
        let mut app = App::default();
        app.start();

        let ticket = app.swap().unwrap();
        assert_eq!(ticket.base, "inr");
        assert_eq!(app.controller.source_currency(), "inr");
        assert_eq!(app.controller.target_currency(), "usd");
        assert_eq!(app.input_buffer, "1");
    }

    #[test]
    fn test_refresh_and_convert_wait_for_pending_fetch() {
        let mut app = App::default();
        let ticket = app.start().unwrap();
        app.backspace();

        assert!(app.refresh().is_none());
        app.convert();
        assert_eq!(app.amount_text(Side::Source), "");
        assert!(app.provider.is_current(&ticket));

        app.apply_rates(&ticket, Err(FetchError::Http(503)));
        let retry = app.refresh().unwrap();
        assert_eq!(retry.base, "usd");
        assert!(!app.provider.is_current(&ticket));

        app.apply_rates(&retry, Ok(usd_table()));
        app.convert();
        assert_eq!(app.amount_text(Side::Source), "0");
    }

    #[test]
    fn test_unknown_currency_rejected() {
        let mut app = App::default();
        let err = app.select_currency(Side::Target, "xyz").unwrap_err();
        assert_eq!(err, ConversionError::UnknownCurrency("xyz".into()));
        assert_eq!(app.controller.target_currency(), "inr");
    }
}
