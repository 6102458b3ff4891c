mod app;
mod backend;
mod config;
mod handler;
mod language;
mod tui;
mod ui;

use std::fs::File;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use crate::app::App;
use crate::config::Config;
use crate::tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = Config::load().unwrap_or_else(|_| Config::new());
    let mut app = App::new(&config);

    info!(backend = app.backend.base_url(), "starting guffspace");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, events: &mut EventHandler, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }

        drain_finished_requests(app).await;
    }

    Ok(())
}

/// Fold finished request tasks back into the store, in completion order.
/// Unfinished tasks keep running untouched; joining an already-finished
/// task is the only await here, so the event loop never stalls on the
/// network.
async fn drain_finished_requests(app: &mut App) {
    let mut i = 0;
    while i < app.chat_tasks.len() {
        if app.chat_tasks[i].is_finished() {
            let task = app.chat_tasks.remove(i);
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(err) => Err(anyhow!("chat task failed: {err}")),
            };
            app.finish_chat(outcome);
        } else {
            i += 1;
        }
    }

    let mut i = 0;
    while i < app.upload_tasks.len() {
        if app.upload_tasks[i].is_finished() {
            let task = app.upload_tasks.remove(i);
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(err) => Err(anyhow!("upload task failed: {err}")),
            };
            app.finish_upload(outcome);
        } else {
            i += 1;
        }
    }
}

fn init_logging() -> Result<()> {
    let log_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("guffspace");
    std::fs::create_dir_all(&log_dir)?;
    let log_file = File::create(log_dir.join("guffspace.log"))?;

    let log_level = if std::env::var("GUFFSPACE_DEBUG").is_ok() {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // The terminal owns stderr, so diagnostics go to a file
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("failed to set tracing subscriber: {e}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::AppEvent;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn offline_app() -> App {
        // Nothing listens on the discard port, so requests fail fast
        let config = Config {
            backend_url: Some("http://127.0.0.1:9".to_string()),
            response_language: None,
        };
        App::new(&config)
    }

    #[tokio::test]
    async fn enter_dispatches_one_request_per_trigger() {
        let mut app = offline_app();
        for c in "hello".chars() {
            app.composer_insert(c);
        }

        handler::handle_event(&mut app, key(KeyCode::Enter));

        assert_eq!(app.chat_tasks.len(), 1);
        assert_eq!(app.messages.len(), 1);
        assert!(app.awaiting_response);

        // The composer is empty again, so a second Enter sends nothing
        handler::handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.chat_tasks.len(), 1);
        assert_eq!(app.messages.len(), 1);
    }

    #[tokio::test]
    async fn unreachable_backend_clears_the_flag_and_appends_nothing() {
        let mut app = offline_app();
        app.set_pending_input("hi");
        handler::handle_event(&mut app, key(KeyCode::Enter));

        let task = app.chat_tasks.remove(0);
        let outcome = task.await.expect("chat task must not panic");
        assert!(outcome.is_err());
        app.finish_chat(outcome);

        assert!(!app.awaiting_response);
        assert_eq!(app.messages.len(), 1); // just the optimistic user message
        assert!(app.alert.is_none());
    }

    #[tokio::test]
    async fn unreadable_upload_path_surfaces_the_alert() {
        let mut app = offline_app();
        app.open_upload_prompt();
        for c in "/definitely/not/a/real/file.pdf".chars() {
            app.upload_insert(c);
        }
        handler::handle_event(&mut app, key(KeyCode::Enter));

        let task = app.upload_tasks.remove(0);
        let outcome = task.await.expect("upload task must not panic");
        app.finish_upload(outcome);

        assert!(app.messages.is_empty());
        assert!(app.alert.is_some());

        // Any key dismisses the alert without leaking into the composer
        handler::handle_event(&mut app, key(KeyCode::Char('x')));
        assert!(app.alert.is_none());
        assert!(app.input.is_empty());
    }
}
