mod api;
mod app;
mod config;
mod export;
mod logging;
mod markdown;
mod metrics;
mod query;
mod session;
mod ui;

use crate::api::ApiClient;
use crate::app::action::Action;
use crate::app::event::AppEvent;
use crate::app::handler;
use crate::app::state::*;
use crate::query::PollSchedule;
use crate::session::{FileStorage, MemoryStorage, SessionStorage, SessionStore};
use anyhow::Result;
use crossterm::{
    event::EventStream,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::prelude::*;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    // Install panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        original_hook(info);
    }));

    let cfg = config::load_config()?;
    let log_file = logging::init(&cfg.logging);
    info!(version = env!("CARGO_PKG_VERSION"), log = ?log_file, "peerfeed starting");
    match config::write_default_if_missing() {
        Ok(true) => info!("wrote default config"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "could not write default config"),
    }

    let api = ApiClient::new(&cfg.api)?;
    info!(base_url = api.base_url(), "using feedback API");

    let mut session = SessionStore::new(open_storage(&cfg));
    session.restore();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, cfg, api, session).await;

    restore_terminal()?;

    if let Err(e) = result {
        error!(error = %e, "exiting with error");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    info!("peerfeed stopped");
    Ok(())
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// The configured session file, or memory when its directory is unusable.
fn open_storage(cfg: &config::AppConfig) -> Box<dyn SessionStorage + Send> {
    let path = &cfg.storage.session_file;
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(path = %path.display(), error = %e, "session file unusable, session will not persist");
            return Box::new(MemoryStorage::new());
        }
    }
    let storage = FileStorage::new(path.clone());
    info!(path = %storage.path().display(), "session storage");
    Box::new(storage)
}

async fn run_app(
    terminal: &mut Tui,
    cfg: config::AppConfig,
    api: ApiClient,
    session: SessionStore,
) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let tick_ms = cfg.ui.tick_ms.max(16);
    let mut state = AppState::new(cfg, session);
    let mut schedule = PollSchedule::new();

    // Spawn terminal input task
    let term_tx = event_tx.clone();
    tokio::spawn(async move {
        let mut reader = EventStream::new();
        while let Some(Ok(event)) = reader.next().await {
            if term_tx.send(AppEvent::Terminal(event)).is_err() {
                break;
            }
        }
    });

    // Spawn tick task
    let tick_tx = event_tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
        loop {
            interval.tick().await;
            if tick_tx.send(AppEvent::Tick).is_err() {
                break;
            }
        }
    });

    // Backend health, shown in the status bar
    let health_api = api.clone();
    let health_tx = event_tx.clone();
    tokio::spawn(async move {
        let result = health_api.health().await.map_err(|e| {
            warn!(error = %e, "health check failed");
            e.user_message()
        });
        let _ = health_tx.send(AppEvent::HealthChecked(result));
    });

    let mut pending: VecDeque<Action> = VecDeque::new();
    if state.session.is_authenticated() {
        pending.extend(handler::navigate(&mut state, Screen::Dashboard));
    }

    terminal.draw(|f| ui::render(f, &state))?;

    loop {
        while let Some(action) = pending.pop_front() {
            match action {
                Action::Login { username, password } => {
                    redraw(terminal, &mut state)?;
                    match state.session.login(&api, &username, &password).await {
                        Ok(()) => pending.extend(handler::signed_in(&mut state)),
                        Err(e) => {
                            warn!(error = %e, "login failed");
                            handler::sign_in_failed(&mut state, e.user_message());
                        }
                    }
                }
                Action::Register(data) => {
                    redraw(terminal, &mut state)?;
                    match state.session.register(&api, &data).await {
                        Ok(()) => pending.extend(handler::signed_in(&mut state)),
                        Err(e) => {
                            warn!(error = %e, "registration failed");
                            handler::sign_in_failed(&mut state, e.user_message());
                        }
                    }
                }
                Action::Poll(bindings) => {
                    schedule.replace(&bindings, &event_tx, AppEvent::PollDue);
                    debug!(keys = ?schedule.keys(), "poll schedule replaced");
                }
                Action::Fetch(key) => {
                    let Some(ticket) = state.queries.begin_fetch(&key) else {
                        continue;
                    };
                    let client = api.with_token(state.session.token());
                    let tx = event_tx.clone();
                    tokio::spawn(async move {
                        let result = query::fetch(&client, &key).await.map_err(|e| {
                            warn!(%key, status = ?e.status(), error = %e, "fetch failed");
                            e.user_message()
                        });
                        let _ = tx.send(AppEvent::QueryLoaded {
                            key,
                            ticket,
                            result,
                        });
                    });
                }
                Action::Mutate(request) => {
                    let client = api.with_token(state.session.token());
                    let session = state.session_epoch;
                    let tx = event_tx.clone();
                    tokio::spawn(async move {
                        let mutation = request.kind();
                        let result = request.execute(&client).await.map_err(|e| {
                            warn!(%mutation, status = ?e.status(), error = %e, "mutation failed");
                            e.user_message()
                        });
                        let _ = tx.send(AppEvent::MutationFinished {
                            mutation,
                            session,
                            result,
                        });
                    });
                }
                Action::Export { feedback_id } => {
                    let client = api.with_token(state.session.token());
                    let dir = state.config.export.download_dir.clone();
                    let session = state.session_epoch;
                    let tx = event_tx.clone();
                    tokio::spawn(async move {
                        let result = match client.export_feedback(feedback_id).await {
                            Ok(report) => export::save_report(&dir, feedback_id, &report).await,
                            Err(e) => Err(e),
                        };
                        let result = result.map_err(|e| {
                            warn!(feedback_id, error = %e, "export failed");
                            e.user_message()
                        });
                        let _ = tx.send(AppEvent::ExportFinished {
                            feedback_id,
                            session,
                            result,
                        });
                    });
                }
                Action::Quit => state.should_quit = true,
            }
        }

        if state.should_quit {
            schedule.clear();
            break;
        }

        // Conditional render (only if dirty)
        redraw(terminal, &mut state)?;

        let Some(event) = event_rx.recv().await else {
            break;
        };
        pending.extend(handler::handle_event(&mut state, event));
    }

    Ok(())
}

fn redraw(terminal: &mut Tui, state: &mut AppState) -> Result<()> {
    if state.dirty {
        terminal.draw(|f| ui::render(f, state))?;
        state.dirty = false;
    }
    Ok(())
}
