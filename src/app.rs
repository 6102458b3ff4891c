use ratatui::widgets::ListState;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::error;

use crate::backend::{BackendClient, ChatRequest};
use crate::config::Config;
use crate::language::Language;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

/// One transcript entry, immutable once appended.
///
/// Invariant: at least one of `text` or `file` is non-empty. The
/// constructors below are the only way the rest of the app builds one.
#[derive(Debug, Clone)]
pub struct Message {
    pub sender: Sender,
    pub text: Option<String>,
    pub file: Option<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: Some(text.into()),
            file: None,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: Some(text.into()),
            file: None,
        }
    }

    /// File artifact: carries the stored name plus a readable confirmation.
    pub fn uploaded_file(name: &str) -> Self {
        Self {
            sender: Sender::User,
            text: Some(format!("{} uploaded successfully.", name)),
            file: Some(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation store: append-only transcript plus derived UI flags
    pub messages: Vec<Message>,
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars
    pub awaiting_response: bool,
    pub language: Language,

    // In-flight requests. No lock prevents overlap; each explicit trigger
    // starts exactly one task and the event loop drains them as they finish.
    pub chat_tasks: Vec<JoinHandle<anyhow::Result<String>>>,
    pub upload_tasks: Vec<JoinHandle<anyhow::Result<String>>>,

    // Transcript viewport
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Language picker state
    pub show_language_picker: bool,
    pub language_state: ListState,

    // Upload prompt state
    pub show_upload_prompt: bool,
    pub upload_input: String,
    pub upload_cursor: usize,

    // Blocking alert (upload failures only)
    pub alert: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub backend: BackendClient,
}

impl App {
    pub fn new(config: &Config) -> Self {
        // Backend location: env var first, then config, then the default
        let base_url = std::env::var("GUFFSPACE_BACKEND_URL")
            .ok()
            .or_else(|| config.backend_url.clone())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let language = config
            .response_language
            .as_deref()
            .and_then(Language::from_code)
            .unwrap_or(Language::En);

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            messages: Vec::new(),
            input: String::new(),
            input_cursor: 0,
            awaiting_response: false,
            language,

            chat_tasks: Vec::new(),
            upload_tasks: Vec::new(),

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            show_language_picker: false,
            language_state: ListState::default(),

            show_upload_prompt: false,
            upload_input: String::new(),
            upload_cursor: 0,

            alert: None,

            animation_frame: 0,

            backend: BackendClient::new(&base_url),
        }
    }

    // Conversation store operations
    // Strictly additive: there is no removal, edit, or reordering operation.

    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the composer text verbatim, empty string included.
    pub fn set_pending_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.input_cursor = self.input.chars().count();
    }

    pub fn set_awaiting_response(&mut self, flag: bool) {
        self.awaiting_response = flag;
    }

    /// Takes effect on the next chat request only; past captures keep the
    /// language they were sent with.
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    // Send flow

    /// Explicit send trigger. Whitespace-only input is a no-op. Otherwise the
    /// user message lands in the transcript, the composer empties, the loading
    /// flag raises, and the request captured at send time is handed back for
    /// the caller to dispatch, so the message is visible before the call leaves.
    pub fn submit_chat(&mut self) -> Option<ChatRequest> {
        if self.input.trim().is_empty() {
            return None;
        }

        let query = std::mem::take(&mut self.input);
        self.input_cursor = 0;
        self.append_message(Message::user(query.clone()));
        self.set_awaiting_response(true);
        self.scroll_to_bottom();

        Some(ChatRequest {
            query,
            response_language: self.language,
        })
    }

    /// Terminal branch of the send flow. The loading flag drops on every
    /// branch; a failure leaves the transcript untouched and is only logged.
    pub fn finish_chat(&mut self, outcome: anyhow::Result<String>) {
        self.set_awaiting_response(false);
        match outcome {
            Ok(reply) => {
                self.append_message(Message::bot(reply));
                self.scroll_to_bottom();
            }
            Err(err) => error!("chat request failed: {err:#}"),
        }
    }

    // Upload flow

    pub fn open_upload_prompt(&mut self) {
        self.show_upload_prompt = true;
        self.upload_input.clear();
        self.upload_cursor = 0;
    }

    pub fn close_upload_prompt(&mut self) {
        self.show_upload_prompt = false;
        self.upload_input.clear();
        self.upload_cursor = 0;
    }

    /// Confirm the upload prompt. An empty path means nothing was selected,
    /// which is a no-op. Returns the path for the caller to read and post.
    pub fn submit_upload(&mut self) -> Option<PathBuf> {
        let path = self.upload_input.trim().to_string();
        self.close_upload_prompt();
        if path.is_empty() {
            return None;
        }
        Some(PathBuf::from(path))
    }

    /// Terminal branch of the upload flow. Success appends the file message;
    /// failure raises the alert and appends nothing. The chat loading flag is
    /// never involved.
    pub fn finish_upload(&mut self, outcome: anyhow::Result<String>) {
        match outcome {
            Ok(file_name) => {
                self.append_message(Message::uploaded_file(&file_name));
                self.scroll_to_bottom();
            }
            Err(err) => {
                error!("file upload failed: {err:#}");
                self.alert = Some(format!("Error uploading file: {err}"));
            }
        }
    }

    // Language picker

    pub fn open_language_picker(&mut self) {
        self.show_language_picker = true;
        let current = Language::all()
            .iter()
            .position(|l| *l == self.language)
            .unwrap_or(0);
        self.language_state.select(Some(current));
    }

    pub fn language_nav_down(&mut self) {
        let len = Language::all().len();
        if len > 0 {
            let i = self.language_state.selected().unwrap_or(0);
            self.language_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn language_nav_up(&mut self) {
        let i = self.language_state.selected().unwrap_or(0);
        self.language_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_language(&mut self) {
        if let Some(i) = self.language_state.selected() {
            if let Some(language) = Language::all().get(i).copied() {
                self.set_language(language);
                self.show_language_picker = false;
                // Save as default for next launch
                let _ = Config::save_response_language(language.code());
            }
        }
    }

    // Composer editing

    pub fn composer_insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn composer_backspace(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn composer_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn composer_right(&mut self) {
        let len = self.input.chars().count();
        self.input_cursor = (self.input_cursor + 1).min(len);
    }

    pub fn composer_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn composer_end(&mut self) {
        self.input_cursor = self.input.chars().count();
    }

    // Upload prompt editing

    pub fn upload_insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.upload_input, self.upload_cursor);
        self.upload_input.insert(byte_pos, c);
        self.upload_cursor += 1;
    }

    pub fn upload_backspace(&mut self) {
        if self.upload_cursor > 0 {
            self.upload_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.upload_input, self.upload_cursor);
            self.upload_input.remove(byte_pos);
        }
    }

    pub fn upload_left(&mut self) {
        self.upload_cursor = self.upload_cursor.saturating_sub(1);
    }

    pub fn upload_right(&mut self) {
        let len = self.upload_input.chars().count();
        self.upload_cursor = (self.upload_cursor + 1).min(len);
    }

    // Transcript viewport

    pub fn scroll_down(&mut self) {
        let max_scroll = self
            .transcript_lines()
            .saturating_sub(self.visible_height());
        if self.chat_scroll < max_scroll {
            self.chat_scroll = self.chat_scroll.saturating_add(1);
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = self.visible_height() / 2;
        let max_scroll = self
            .transcript_lines()
            .saturating_sub(self.visible_height());
        self.chat_scroll = (self.chat_scroll + half_page).min(max_scroll);
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = self.visible_height() / 2;
        self.chat_scroll = self.chat_scroll.saturating_sub(half_page);
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
    }

    /// Follow the tail so the newest message (or the thinking indicator)
    /// stays visible.
    pub fn scroll_to_bottom(&mut self) {
        let total_lines = self.transcript_lines();
        let visible_height = self.visible_height();

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }

    /// Line count of the rendered transcript at the current chat width,
    /// wrapped lines included. Mirrors how the transcript is drawn.
    fn transcript_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.messages {
            total_lines += 1; // Sender label line
            if msg.file.is_some() {
                total_lines += 1; // File name line
            }
            if let Some(text) = &msg.text {
                for line in text.lines() {
                    // Character count, not byte length, for UTF-8 content
                    let char_count = line.chars().count();
                    if char_count == 0 {
                        total_lines += 1;
                    } else {
                        total_lines += ((char_count / wrap_width) + 1) as u16;
                    }
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.awaiting_response {
            total_lines += 2; // "Bot:" + "Thinking..."
        }

        total_lines
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    // Misc

    pub fn uploads_in_flight(&self) -> usize {
        self.upload_tasks.len()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.awaiting_response {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

/// Convert a character index to a byte index for UTF-8 safe string edits
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn test_app() -> App {
        App::new(&Config::new())
    }

    #[test]
    fn blank_input_send_is_a_noop() {
        let mut app = test_app();
        app.set_pending_input("   \t ");

        assert!(app.submit_chat().is_none());
        assert!(app.messages.is_empty());
        assert!(!app.awaiting_response);
        assert_eq!(app.input, "   \t ");
    }

    #[test]
    fn send_appends_optimistically_and_captures_the_request() {
        let mut app = test_app();
        app.set_pending_input("what is in the report? ");

        let request = app.submit_chat().expect("non-blank input must send");

        // The untrimmed text is what lands in the store and on the wire
        assert_eq!(request.query, "what is in the report? ");
        assert_eq!(request.response_language, Language::En);
        assert_eq!(app.messages.len(), 1);
        assert_eq!(app.messages[0].sender, Sender::User);
        assert_eq!(app.messages[0].text.as_deref(), Some("what is in the report? "));
        assert!(app.input.is_empty());
        assert_eq!(app.input_cursor, 0);
        assert!(app.awaiting_response);
    }

    #[test]
    fn language_switch_affects_only_later_captures() {
        let mut app = test_app();

        app.set_pending_input("first");
        let first = app.submit_chat().unwrap();

        app.set_language(Language::Ne);
        app.set_pending_input("second");
        let second = app.submit_chat().unwrap();

        assert_eq!(first.response_language, Language::En);
        assert_eq!(second.response_language, Language::Ne);
    }

    #[test]
    fn resolved_chat_appends_bot_reply_after_user_message() {
        let mut app = test_app();
        app.set_pending_input("hi");
        app.submit_chat().unwrap();

        app.finish_chat(Ok("Hello".to_string()));

        assert!(!app.awaiting_response);
        assert_eq!(app.messages.len(), 2);
        assert_eq!(app.messages[0].sender, Sender::User);
        assert_eq!(app.messages[1].sender, Sender::Bot);
        assert_eq!(app.messages[1].text.as_deref(), Some("Hello"));
    }

    #[test]
    fn failed_chat_appends_nothing_but_clears_the_flag() {
        let mut app = test_app();
        app.set_pending_input("hi");
        app.submit_chat().unwrap();

        app.finish_chat(Err(anyhow!("connection refused")));

        assert!(!app.awaiting_response);
        assert_eq!(app.messages.len(), 1);
        assert!(app.alert.is_none()); // send failures stay silent
    }

    #[test]
    fn overlapping_sends_are_not_locked_out() {
        let mut app = test_app();

        app.set_pending_input("first");
        assert!(app.submit_chat().is_some());
        app.set_pending_input("second");
        assert!(app.submit_chat().is_some());

        assert_eq!(app.messages.len(), 2);
        assert!(app.awaiting_response);

        // First resolution drops the shared flag; the store only ever appends
        app.finish_chat(Ok("reply to one of them".to_string()));
        assert!(!app.awaiting_response);
        assert_eq!(app.messages.len(), 3);
    }

    #[test]
    fn successful_upload_appends_a_file_message() {
        let mut app = test_app();

        app.finish_upload(Ok("report.pdf".to_string()));

        assert_eq!(app.messages.len(), 1);
        let msg = &app.messages[0];
        assert_eq!(msg.sender, Sender::User);
        assert_eq!(msg.file.as_deref(), Some("report.pdf"));
        let text = msg.text.as_deref().unwrap();
        assert!(!text.is_empty());
        assert!(text.contains("report.pdf"));
        assert!(app.alert.is_none());
    }

    #[test]
    fn failed_upload_raises_the_alert_and_appends_nothing() {
        let mut app = test_app();

        app.finish_upload(Err(anyhow!("could not read /tmp/missing.pdf")));

        assert!(app.messages.is_empty());
        assert!(app.alert.is_some());
        assert!(!app.awaiting_response);
    }

    #[test]
    fn empty_upload_prompt_is_a_noop() {
        let mut app = test_app();
        app.open_upload_prompt();
        app.upload_insert(' ');

        assert!(app.submit_upload().is_none());
        assert!(!app.show_upload_prompt);
        assert!(app.messages.is_empty());
    }

    #[test]
    fn confirmed_upload_prompt_yields_the_path() {
        let mut app = test_app();
        app.open_upload_prompt();
        for c in "/tmp/report.pdf".chars() {
            app.upload_insert(c);
        }

        let path = app.submit_upload().expect("path was typed");
        assert_eq!(path, PathBuf::from("/tmp/report.pdf"));
        assert!(!app.show_upload_prompt);
        assert!(app.upload_input.is_empty());
    }

    #[test]
    fn composer_editing_is_utf8_safe() {
        let mut app = test_app();
        for c in "नमस्ते".chars() {
            app.composer_insert(c);
        }
        assert_eq!(app.input, "नमस्ते");

        app.composer_backspace();
        app.composer_backspace();
        assert_eq!(app.input, "नमस्");

        app.composer_home();
        app.composer_insert('>');
        assert_eq!(app.input, ">नमस्");

        app.composer_end();
        app.composer_left();
        app.composer_insert('x');
        assert_eq!(app.input, ">नमसx्");
    }

    #[test]
    fn set_pending_input_replaces_verbatim() {
        let mut app = test_app();
        app.set_pending_input("draft");
        assert_eq!(app.input_cursor, 5);

        app.set_pending_input("");
        assert_eq!(app.input, "");
        assert_eq!(app.input_cursor, 0);
    }

    #[test]
    fn picker_selection_updates_the_language() {
        let mut app = test_app();
        app.open_language_picker();
        assert_eq!(app.language_state.selected(), Some(0));

        app.language_nav_down();
        app.language_nav_down(); // clamps at the last entry
        assert_eq!(app.language_state.selected(), Some(1));

        // Apply directly; select_language also persists to the config file
        let picked = Language::all()[app.language_state.selected().unwrap()];
        app.set_language(picked);
        assert_eq!(app.language, Language::Ne);
    }

    #[test]
    fn tail_follow_accounts_for_wrapped_lines() {
        let mut app = test_app();
        app.chat_width = 10;
        app.chat_height = 4;

        // Label + 3 wrapped lines + trailing blank = 5 lines at width 10
        app.append_message(Message::bot("a".repeat(25)));
        app.scroll_to_bottom();
        assert_eq!(app.chat_scroll, 1);

        // Short transcript never scrolls
        let mut short = test_app();
        short.chat_width = 80;
        short.chat_height = 20;
        short.append_message(Message::user("hi"));
        short.scroll_to_bottom();
        assert_eq!(short.chat_scroll, 0);
    }

    #[test]
    fn thinking_indicator_counts_toward_the_tail() {
        let mut app = test_app();
        app.chat_width = 10;
        app.chat_height = 4;

        app.set_pending_input("aaaaaaaaaaaaaaaaaaaaaaaaa");
        app.submit_chat().unwrap();

        // 5 transcript lines + 2 indicator lines, height 4 => scroll 3
        assert_eq!(app.chat_scroll, 3);
    }
}
