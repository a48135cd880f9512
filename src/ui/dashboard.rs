// ============================================================================
// Dashboard - Rendu du convertisseur
// ============================================================================
// Dessine l'interface TUI : header, deux champs (From / To), ligne de taux,
// bandeau d'erreur éventuel et raccourcis clavier
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Layout : découpage de l'espace en zones
// 3. Style : couleurs et attributs de texte
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, Focus};
use crate::converter::Side;

/// Dessine l'interface complète
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = create_layout(frame.size());

    render_header(frame, chunks[0]);
    render_side(frame, app, Side::Source, chunks[1]);
    render_side(frame, app, Side::Target, chunks[2]);
    render_status(frame, app, chunks[3]);
    render_footer(frame, app, chunks[4]);
}

/// Header, From, To, statut, footer
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // From
            Constraint::Length(3), // To
            Constraint::Min(4),    // Taux + erreurs
            Constraint::Length(3), // Footer
        ])
        .split(area)
        .to_vec()
}

fn render_header(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" LazyFX ")
        .title_alignment(Alignment::Center);

    let text = Line::from(Span::styled(
        "💱 Currency Converter",
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    ));

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Champs From / To
// ============================================================================

/// Un côté du convertisseur : montant à gauche, devise à droite
fn render_side(frame: &mut Frame, app: &App, side: Side, area: Rect) {
    let (amount_focus, currency_focus) = match side {
        Side::Source => (Focus::SourceAmount, Focus::SourceCurrency),
        Side::Target => (Focus::TargetAmount, Focus::TargetCurrency),
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(14)])
        .split(area);

    // Montant
    let amount_focused = app.focus == amount_focus;
    let mut spans = vec![Span::styled(
        app.amount_text(side),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )];
    if amount_focused {
        spans.push(Span::styled(
            "█", // Curseur
            Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK),
        ));
    }

    let marker = if app.controller.active_side() == side { " ●" } else { "" };
    let amount_block = field_block(format!(" {}{} ", side.label(), marker), amount_focused);
    frame.render_widget(Paragraph::new(Line::from(spans)).block(amount_block), columns[0]);

    // Devise
    let currency_focused = app.focus == currency_focus;
    let code = app.controller.currency(side).to_uppercase();
    let label = if currency_focused {
        format!("◀ {} ▶", code)
    } else {
        code
    };
    let currency_block = field_block(" Currency ".to_string(), currency_focused);
    let currency = Paragraph::new(Line::from(Span::styled(
        label,
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )))
    .block(currency_block)
    .alignment(Alignment::Center);
    frame.render_widget(currency, columns[1]);
}

fn field_block(title: String, focused: bool) -> Block<'static> {
    let color = if focused { Color::Green } else { Color::Cyan };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title)
}

// ============================================================================
// Statut : taux, chargement, erreur
// ============================================================================

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Rates ");

    let mut lines = Vec::new();

    if app.provider.is_loading() {
        lines.push(Line::from(Span::styled(
            "⏳ Fetching latest rates…",
            Style::default().fg(Color::Yellow),
        )));
    } else if let Some(rate) = app.rate_line() {
        lines.push(Line::from(Span::styled(
            rate,
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )));
    }

    lines.push(Line::from(Span::styled(
        app.origin_line(),
        Style::default().fg(Color::Gray),
    )));

    if let Some(error) = app.provider.error() {
        lines.push(Line::from(Span::styled(
            format!("⚠ {} (press [r] to retry)", error),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Footer : raccourcis
// ============================================================================

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let key_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let shortcuts = if app.is_awaiting_quit_confirmation() {
        Line::from(vec![
            Span::styled(
                "⚠  Appuyez sur ",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "[q]",
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD)
                    .add_modifier(Modifier::SLOW_BLINK),
            ),
            Span::styled(
                " à nouveau pour quitter, ou n'importe quelle autre touche pour annuler ⚠",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ])
    } else {
        let refresh_label = if app.provider.is_loading() {
            " Refreshing…  "
        } else {
            " Refresh  "
        };
        Line::from(vec![
            Span::styled("[q]", key_style),
            Span::raw(" Quit  "),
            Span::styled("[Tab]", key_style),
            Span::raw(" Field  "),
            Span::styled("[←→]", key_style),
            Span::raw(" Currency  "),
            Span::styled("[s]", key_style),
            Span::raw(" Swap  "),
            Span::styled("[r]", key_style),
            Span::raw(refresh_label),
            Span::styled("[Enter]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(" Convert"),
        ])
    };

    let paragraph = Paragraph::new(vec![shortcuts])
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}
