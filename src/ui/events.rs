// ============================================================================
// Gestion des événements
// ============================================================================
// Lit les événements clavier (crossterm) et fournit des helpers pour les
// reconnaître dans la boucle principale
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind};

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Terminal redimensionné : forcer un redraw
    Resize,

    /// Tick régulier : permet de traiter les résultats du worker
    Tick,
}

/// Gestionnaire d'événements
pub struct EventHandler {
    poll_timeout: Duration,
}

impl EventHandler {
    /// Poll toutes les 100ms : les résultats réseau s'affichent sans attendre une touche
    pub fn new() -> Self {
        Self {
            poll_timeout: Duration::from_millis(100),
        }
    }

    /// Lit le prochain événement (bloquant au plus `poll_timeout`)
    pub fn next(&self) -> Result<Event> {
        if !event::poll(self.poll_timeout)? {
            return Ok(Event::Tick);
        }

        match event::read()? {
            // Sur certains OS, on reçoit Press ET Release : on ne garde que Press
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Ok(Event::Key(key)),
            CrosstermEvent::Resize(_, _) => Ok(Event::Resize),
            _ => Ok(Event::Tick),
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers : reconnaître les touches
// ============================================================================

fn key_code(event: &Event) -> Option<KeyCode> {
    match event {
        Event::Key(key) => Some(key.code),
        _ => None,
    }
}

/// 'q' : quitter (two-step)
pub fn is_quit_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('q') | KeyCode::Char('Q')))
}

/// Entrée : convertir
pub fn is_enter_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Enter))
}

/// Tab : champ suivant
pub fn is_tab_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Tab))
}

/// Shift-Tab : champ précédent
pub fn is_backtab_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::BackTab))
}

/// Flèche gauche ou flèche haut : devise précédente
pub fn is_previous_option_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Left | KeyCode::Up))
}

/// Flèche droite ou flèche bas : devise suivante
pub fn is_next_option_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Right | KeyCode::Down))
}

/// 's' : inverser les devises
pub fn is_swap_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('s') | KeyCode::Char('S')))
}

/// 'r' : rafraîchir les taux
pub fn is_refresh_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('r') | KeyCode::Char('R')))
}

pub fn is_backspace_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Backspace))
}

/// Caractère valide dans un montant : chiffre, point ou signe moins
pub fn is_amount_char_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char(c)) if c.is_ascii_digit() || c == '.' || c == '-')
}

/// Extrait le caractère d'un événement clavier si c'est un caractère
pub fn get_char_from_event(event: &Event) -> Option<char> {
    match key_code(event) {
        Some(KeyCode::Char(c)) => Some(c),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    #[test]
    fn test_is_quit_event() {
        assert!(is_quit_event(&key(KeyCode::Char('q'))));
        assert!(!is_quit_event(&key(KeyCode::Char('a'))));
        assert!(!is_quit_event(&Event::Tick));
    }

    #[test]
    fn test_amount_chars() {
        assert!(is_amount_char_event(&key(KeyCode::Char('7'))));
        assert!(is_amount_char_event(&key(KeyCode::Char('.'))));
        assert!(!is_amount_char_event(&key(KeyCode::Char('s'))));
        assert_eq!(get_char_from_event(&key(KeyCode::Char('7'))), Some('7'));
        assert_eq!(get_char_from_event(&key(KeyCode::Enter)), None);
    }

    #[test]
    fn test_action_keys() {
        assert!(is_swap_event(&key(KeyCode::Char('s'))));
        assert!(is_refresh_event(&key(KeyCode::Char('R'))));
        assert!(is_tab_event(&key(KeyCode::Tab)));
        assert!(is_backtab_event(&key(KeyCode::BackTab)));
        assert!(is_next_option_event(&key(KeyCode::Right)));
        assert!(is_previous_option_event(&key(KeyCode::Left)));
        assert!(!is_enter_event(&Event::Resize));
    }
}
