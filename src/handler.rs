use std::path::PathBuf;

use anyhow::Context;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode};
use crate::backend::ChatRequest;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Popup precedence: alert, then upload prompt, then language picker
    if app.alert.is_some() {
        // Blocking alert: any key dismisses it
        app.alert = None;
        return;
    }
    if app.show_upload_prompt {
        handle_upload_prompt_key(app, key);
        return;
    }
    if app.show_language_picker {
        handle_language_picker_key(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Transcript scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),

        // Language picker
        KeyCode::Char('l') => app.open_language_picker(),

        // File upload
        KeyCode::Char('u') => app.open_upload_prompt(),

        // Back to the composer
        KeyCode::Char('i') | KeyCode::Char('/') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            // Explicit send trigger; blank input stays a no-op inside
            if let Some(request) = app.submit_chat() {
                spawn_chat(app, request);
            }
        }
        KeyCode::Backspace => app.composer_backspace(),
        KeyCode::Left => app.composer_left(),
        KeyCode::Right => app.composer_right(),
        KeyCode::Home => app.composer_home(),
        KeyCode::End => app.composer_end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.composer_insert(c);
        }
        _ => {}
    }
}

fn handle_upload_prompt_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_upload_prompt(),
        KeyCode::Enter => {
            if let Some(path) = app.submit_upload() {
                spawn_upload(app, path);
            }
        }
        KeyCode::Backspace => app.upload_backspace(),
        KeyCode::Left => app.upload_left(),
        KeyCode::Right => app.upload_right(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.upload_insert(c);
        }
        _ => {}
    }
}

fn handle_language_picker_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_language_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.language_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.language_nav_up(),
        KeyCode::Enter => app.select_language(),
        _ => {}
    }
}

/// One outbound chat call per send trigger. The user message is already in
/// the store when this spawns.
fn spawn_chat(app: &mut App, request: ChatRequest) {
    let client = app.backend.clone();
    app.chat_tasks.push(tokio::spawn(async move {
        Ok(client.chat(&request).await?)
    }));
}

/// One outbound upload per confirmed prompt. The file is read off the event
/// loop; an unreadable path surfaces through the same alert as a failed post.
fn spawn_upload(app: &mut App, path: PathBuf) {
    let client = app.backend.clone();
    app.upload_tasks.push(tokio::spawn(async move {
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf")
            .to_string();
        Ok(client.upload_document(&file_name, bytes).await?)
    }));
}
