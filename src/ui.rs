use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::chat::{ChatMessage, PendingMessage};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let playing_indicator = match &app.now_playing {
        Some(uri) => format!(" [playing {uri}]"),
        None => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(" trackchat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("session {}", app.session()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(playing_indicator, Style::default().fg(Color::Green)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(title), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let empty = app.messages().is_empty() && app.pending_echoes.is_empty() && !app.is_thinking();
    let chat_text = if empty {
        Text::from(vec![
            Line::default(),
            Line::from(Span::styled(
                "No messages yet",
                Style::default().fg(Color::DarkGray).bold(),
            ))
            .alignment(Alignment::Center),
            Line::from(Span::styled(
                "Start a conversation!",
                Style::default().fg(Color::DarkGray),
            ))
            .alignment(Alignment::Center),
        ])
    } else {
        let selected_uri = app.selected_track_uri();
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.messages() {
            lines.extend(message_lines(
                msg,
                app.now_playing.as_deref(),
                selected_uri.as_deref(),
            ));
        }

        for echo in &app.pending_echoes {
            lines.extend(echo_lines(echo));
        }

        if app.is_thinking() {
            lines.push(
                Line::from(Span::styled(
                    "DJ",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Right),
            );
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(
                Line::from(Span::styled(
                    format!("Thinking{dots}"),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                ))
                .alignment(Alignment::Right),
            );
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// Lines for one stored message: a left-aligned bubble for the user half, a
/// right-aligned bubble plus track rows for the assistant half. A message
/// with neither text field contributes nothing.
fn message_lines(
    msg: &ChatMessage,
    now_playing: Option<&str>,
    selected_uri: Option<&str>,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let timestamp = msg
        .created_at
        .with_timezone(&Local)
        .format("%H:%M")
        .to_string();

    if let Some(text) = &msg.user_message {
        lines.push(Line::from(vec![
            Span::styled(
                "You",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {timestamp}"), Style::default().fg(Color::DarkGray)),
        ]));
        for line in text.lines() {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::default());
    }

    if let Some(text) = &msg.assistant_message {
        lines.push(
            Line::from(vec![
                Span::styled(format!("{timestamp}  "), Style::default().fg(Color::DarkGray)),
                Span::styled(
                    "DJ",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
            ])
            .alignment(Alignment::Right),
        );
        for line in text.lines() {
            lines.push(Line::from(line.to_string()).alignment(Alignment::Right));
        }
        for track in &msg.tracks {
            lines.push(track_line(
                track,
                now_playing == Some(track.uri.as_str()),
                selected_uri == Some(track.uri.as_str()),
            ));
        }
        lines.push(Line::default());
    }

    lines
}

fn track_line(track: &crate::chat::Track, playing: bool, selected: bool) -> Line<'static> {
    let marker = if playing { "⏸" } else { "▶" };
    let marker_style = if playing {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Blue)
    };
    let detail_style = if selected {
        Style::default().fg(Color::White).bg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Gray)
    };

    Line::from(vec![
        Span::styled(format!("{marker} "), marker_style),
        Span::styled(track.name.clone(), detail_style.add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("  {} • {}", track.artist, track.album),
            detail_style,
        ),
    ])
    .alignment(Alignment::Right)
}

/// An optimistic echo renders as a dimmed user bubble until the refetch
/// replaces it with the server's copy.
fn echo_lines(echo: &PendingMessage) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let timestamp = echo
        .sent_at
        .with_timezone(&Local)
        .format("%H:%M")
        .to_string();

    lines.push(Line::from(vec![
        Span::styled(
            "You",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::DIM),
        ),
        Span::styled(format!("  {timestamp}"), Style::default().fg(Color::DarkGray)),
    ]));
    for line in echo.text.lines() {
        lines.push(Line::from(Span::styled(
            line.to_string(),
            Style::default().add_modifier(Modifier::DIM),
        )));
    }
    lines.push(Line::default());

    lines
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Message (Enter to send) ");

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    // Get the visible slice of the input
    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    frame.set_cursor_position((
        area.x + 1 + (cursor_pos - scroll_offset) as u16,
        area.y + 1,
    ));
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let footer = match &app.status {
        Some(status) => Line::from(Span::styled(
            format!(" {status}"),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(Span::styled(
            " Enter: send | Tab: select track | Enter on track: play/pause | Up/Down: scroll | Ctrl-C: quit",
            Style::default().fg(Color::DarkGray),
        )),
    };

    frame.render_widget(Paragraph::new(footer), area);
}
