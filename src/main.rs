// ============================================================================
// LazyFX - Convertisseur de devises en terminal
// ============================================================================
// Programme TUI : saisie d'un montant, conversion avec des taux live
// (exchangerate.host, puis frankfurter.app), repli sur une table hors-ligne
//
// ARCHITECTURE :
// 1. Thread UI : possède App, dessine, traite le clavier
// 2. Worker : runtime tokio, exécute les fetchs en tâches indépendantes
// 3. Channels mpsc : commandes vers le worker, résultats vers l'UI
// ============================================================================

use std::io;
use std::sync::{mpsc, Arc};

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, error, info, warn};

use lazyfx::api::{resolve_rates, HttpRateSource, RateSource, SharedSources};
use lazyfx::app::App;
use lazyfx::config::Config;
use lazyfx::models::{FetchError, RateTable};
use lazyfx::provider::FetchTicket;
use lazyfx::ui::{render, EventHandler};

// ============================================================================
// Commandes et résultats du worker
// ============================================================================

/// Commandes envoyées au worker thread
#[derive(Debug, Clone)]
enum AppCommand {
    /// Résoudre la table de taux pour un ticket (base + génération)
    FetchRates(FetchTicket),
}

/// Résultats renvoyés par le worker thread
#[derive(Debug)]
enum AppResult {
    /// Résolution terminée (succès ou échec de toutes les sources)
    RatesResolved {
        ticket: FetchTicket,
        result: Result<RateTable, FetchError>,
    },
}

// ============================================================================
// Initialisation du logging
// ============================================================================
// Les println! ne fonctionnent pas une fois le TUI lancé : on log vers un
// fichier avec rotation quotidienne
// ============================================================================

/// Initialise le système de logging vers fichier
///
/// ```bash
/// tail -f ~/.local/share/lazyfx/logs/lazyfx.log
/// RUST_LOG=lazyfx=trace cargo run
/// ```
fn init_logging(config: &Config) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = config.resolved_log_dir();
    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "lazyfx.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lazyfx=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    let config = Config::from_env();

    init_logging(&config).unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!(?config, "LazyFX starting up");

    let sources: Vec<Arc<dyn RateSource>> = HttpRateSource::from_configs(&config.sources)?
        .into_iter()
        .map(|source| Arc::new(source) as Arc<dyn RateSource>)
        .collect();
    let sources: SharedSources = Arc::new(sources);

    let (command_tx, command_rx) = mpsc::channel::<AppCommand>();
    let (result_tx, result_rx) = mpsc::channel::<AppResult>();

    info!("Spawning background worker thread");
    spawn_background_worker(command_rx, result_tx, sources)?;

    let mut app = App::new(&config);
    if let Some(ticket) = app.start() {
        send_fetch(&command_tx, ticket);
    }

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let events = EventHandler::new();

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &events, &command_tx, &result_rx);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Background Worker Thread
// ============================================================================
// Chaque commande devient une tâche tokio indépendante : une requête lente
// ne retarde jamais une requête plus récente. Les résultats périmés sont
// filtrés côté UI par le RateProvider.
// ============================================================================

fn spawn_background_worker(
    command_rx: mpsc::Receiver<AppCommand>,
    result_tx: mpsc::Sender<AppResult>,
    sources: SharedSources,
) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    std::thread::spawn(move || {
        // recv() bloque ce thread ; les tâches tournent sur les workers du runtime
        while let Ok(command) = command_rx.recv() {
            info!(?command, "Worker received command");

            match command {
                AppCommand::FetchRates(ticket) => {
                    let sources = Arc::clone(&sources);
                    let result_tx = result_tx.clone();

                    runtime.spawn(async move {
                        let result = resolve_rates(&sources, &ticket.base).await;
                        if result_tx
                            .send(AppResult::RatesResolved { ticket, result })
                            .is_err()
                        {
                            debug!("UI gone, dropping rate result");
                        }
                    });
                }
            }
        }

        info!("Worker thread exiting (channel closed)");
    });

    Ok(())
}

fn send_fetch(command_tx: &mpsc::Sender<AppCommand>, ticket: FetchTicket) {
    debug!(base = %ticket.base, generation = ticket.generation, "Requesting rates");
    if command_tx.send(AppCommand::FetchRates(ticket)).is_err() {
        error!("Worker thread disconnected!");
    }
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   0. Résultats du worker
//   1. Render
//   2. Input
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
    command_tx: &mpsc::Sender<AppCommand>,
    result_rx: &mpsc::Receiver<AppResult>,
) -> Result<()> {
    while app.is_running() {
        // 0. RÉSULTATS : draine tout ce qui est arrivé, sans bloquer
        loop {
            match result_rx.try_recv() {
                Ok(AppResult::RatesResolved { ticket, result }) => {
                    if let Err(e) = &result {
                        warn!(base = %ticket.base, error = %e, "Rate resolution failed");
                    }
                    if let Some(next) = app.apply_rates(&ticket, result) {
                        send_fetch(command_tx, next);
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    error!("Worker thread disconnected!");
                    break;
                }
            }
        }

        // 1. RENDER
        terminal.draw(|frame| render(frame, app))?;

        // 2. INPUT
        match events.next() {
            Ok(event) => {
                if let Some(ticket) = handle_event(app, event) {
                    send_fetch(command_tx, ticket);
                }
            }
            Err(e) => warn!(error = ?e, "Failed to read terminal event"),
        }
    }

    Ok(())
}

// ============================================================================
// Gestion des événements
// ============================================================================

/// Traite un événement ; retourne un ticket si un fetch doit être lancé
fn handle_event(app: &mut App, event: lazyfx::ui::Event) -> Option<FetchTicket> {
    use lazyfx::ui::events::{
        get_char_from_event, is_amount_char_event, is_backspace_event, is_backtab_event,
        is_enter_event, is_next_option_event, is_previous_option_event,
        is_quit_event, is_refresh_event, is_swap_event, is_tab_event, Event,
    };

    match event {
        Event::Key(_) if is_quit_event(&event) => {
            if app.is_awaiting_quit_confirmation() {
                info!("User confirmed quit");
                app.quit();
            } else {
                info!("User requested quit (awaiting confirmation)");
                app.request_quit();
            }
            None
        }

        Event::Key(_) => {
            // Toute autre touche annule la demande de quit
            app.cancel_quit();

            if is_tab_event(&event) {
                app.focus_next();
                None
            } else if is_backtab_event(&event) {
                app.focus_previous();
                None
            } else if is_amount_char_event(&event) && app.focus.is_amount() {
                if let Some(c) = get_char_from_event(&event) {
                    app.append_char(c);
                }
                None
            } else if is_backspace_event(&event) {
                app.backspace();
                None
            } else if is_next_option_event(&event) {
                app.cycle_currency(true)
            } else if is_previous_option_event(&event) {
                app.cycle_currency(false)
            } else if is_swap_event(&event) {
                info!("User swapped currencies");
                app.swap()
            } else if is_refresh_event(&event) {
                app.refresh()
            } else if is_enter_event(&event) {
                debug!("User submitted conversion");
                app.convert();
                None
            } else {
                None
            }
        }

        Event::Resize | Event::Tick => None,
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

/// Restaure le terminal à son état normal
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
