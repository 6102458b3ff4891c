use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, InputMode, Sender};
use crate::language::Language;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);

    // Body: sidebar on the left, chat on the right
    let [sidebar_area, chat_area] = Layout::horizontal([
        Constraint::Length(26),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_sidebar(app, frame, sidebar_area);

    let [transcript_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(chat_area);

    render_transcript(app, frame, transcript_area);
    render_composer(app, frame, input_area);

    render_footer(app, frame, footer_area);

    // Render popups (in order of priority)
    if app.alert.is_some() {
        render_alert(app, frame, area);
    } else if app.show_upload_prompt {
        render_upload_prompt(app, frame, area);
    } else if app.show_language_picker {
        render_language_picker(app, frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" GuffSpace ", Style::default().fg(Color::Green).bold()),
        Span::styled("How can I help you today?", Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            "GuffSpace",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Your AI-powered chat assistant",
            Style::default().fg(Color::DarkGray),
        )),
        Line::default(),
        Line::from(Span::styled("Backend", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(
            app.backend.base_url().to_string(),
            Style::default().fg(Color::DarkGray),
        )),
        Line::default(),
        Line::from(Span::styled("Language", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(format!(
            "{} ({})",
            app.language.display_name(),
            app.language.code()
        )),
        Line::default(),
    ];

    if app.awaiting_response {
        lines.push(Line::from(Span::styled(
            "Awaiting reply...",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        )));
    }
    if app.uploads_in_flight() > 0 {
        lines.push(Line::from(Span::styled(
            format!("{} upload(s) in flight", app.uploads_in_flight()),
            Style::default().fg(Color::Magenta),
        )));
    }

    let sidebar = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(sidebar, area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let focused = app.input_mode == InputMode::Normal;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Conversation ({}) ", app.messages.len()));

    let transcript = if app.messages.is_empty() && !app.awaiting_response {
        Text::from(Span::styled(
            "Start a conversation...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.messages {
            match msg.sender {
                Sender::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                }
                Sender::Bot => {
                    lines.push(Line::from(Span::styled(
                        "Bot:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                }
            }

            if let Some(file) = &msg.file {
                lines.push(Line::from(Span::styled(
                    format!("[file] {}", file),
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::UNDERLINED),
                )));
            }
            if let Some(text) = &msg.text {
                for line in text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            lines.push(Line::default());
        }

        if app.awaiting_response {
            lines.push(Line::from(Span::styled(
                "Bot:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let transcript = Paragraph::new(transcript)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(transcript, area);
}

fn render_composer(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message (Enter to send) ");

    // Horizontal scroll keeps the cursor visible in a single-line composer
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let composer = if app.input.is_empty() && !editing {
        Paragraph::new("Ask anything...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block)
    } else {
        Paragraph::new(visible_text)
            .style(Style::default().fg(Color::Cyan))
            .block(block)
    };

    frame.render_widget(composer, area);

    // Show cursor when editing
    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = if app.input_mode == InputMode::Editing {
        (" COMPOSE ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" VIEW ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let hints = if app.alert.is_some() {
        vec![
            Span::styled(" any key ", key_style),
            Span::styled(" dismiss ", label_style),
        ]
    } else if app.show_upload_prompt {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" upload ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ]
    } else if app.show_language_picker {
        vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" nav ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ]
    } else if app.input_mode == InputMode::Editing {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" view ", label_style),
        ]
    } else {
        vec![
            Span::styled(" i ", key_style),
            Span::styled(" compose ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" u ", key_style),
            Span::styled(" upload ", label_style),
            Span::styled(" l ", key_style),
            Span::styled(" language ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ]
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_language_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let languages = Language::all();

    // Calculate popup size and position (centered)
    let popup_width = 34.min(area.width.saturating_sub(4));
    let popup_height = (languages.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Response Language ");

    let items: Vec<ListItem> = languages
        .iter()
        .map(|language| {
            let is_current = *language == app.language;
            let prefix = if is_current { "* " } else { "  " };
            let style = if is_current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(
                "{}{} ({})",
                prefix,
                language.display_name(),
                language.code()
            ))
            .style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.language_state);
}

fn render_upload_prompt(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 7;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Upload File ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions =
        Paragraph::new("Type the path of the document. Enter to upload, Esc to cancel.")
            .style(Style::default().fg(Color::DarkGray));

    let instructions_area = Rect::new(inner.x, inner.y, inner.width, 1);
    frame.render_widget(instructions, instructions_area);

    // Input field with horizontal scroll for long paths
    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let inner_width = inner.width as usize;
    let scroll_offset = if inner_width == 0 {
        0
    } else if app.upload_cursor >= inner_width {
        app.upload_cursor - inner_width + 1
    } else {
        0
    };
    let visible_text: String = app
        .upload_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan));
    frame.render_widget(input, input_area);

    // Show cursor
    let cursor_x = (app.upload_cursor - scroll_offset).min(inner_width) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    // Status line: the file name the backend will see
    let status_text = std::path::Path::new(app.upload_input.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| format!("File: {}", n))
        .unwrap_or_else(|| "No file selected.".to_string());
    let status = Paragraph::new(status_text).style(Style::default().fg(Color::DarkGray));

    let status_area = Rect::new(inner.x, inner.y + 4, inner.width, 1);
    frame.render_widget(status, status_area);
}

fn render_alert(app: &App, frame: &mut Frame, area: Rect) {
    let message = app.alert.as_deref().unwrap_or_default();

    // Calculate popup size and position (centered)
    let popup_width = 56.min(area.width.saturating_sub(4));
    let popup_height = 7;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Upload Error ");

    let body = Text::from(vec![
        Line::from(message.to_string()),
        Line::default(),
        Line::from(Span::styled(
            "Press any key to continue",
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    let alert = Paragraph::new(body)
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(alert, popup_area);
}
