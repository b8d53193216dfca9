use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};
use ratatui::Frame;

use crate::domain::{Role, ERROR_PREFIX};

use super::App;

const SPINNER_FRAMES: [&str; 3] = ["·", "··", "···"];

pub(super) fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .split(frame.area());

    render_conversation(frame, app, chunks[0]);
    render_status(frame, app, chunks[1]);
    render_input(frame, app, chunks[2]);
}

fn render_conversation(frame: &mut Frame, app: &mut App, area: Rect) {
    let inner_width = area.width.saturating_sub(2).max(1);
    let inner_height = area.height.saturating_sub(2);

    let lines = conversation_lines(app);
    let total_height: u16 = lines
        .iter()
        .map(|line| wrapped_height(line.width() as u16, inner_width))
        .sum();
    let max_scroll = total_height.saturating_sub(inner_height);

    if app.stick_to_bottom {
        app.scroll = max_scroll;
        app.stick_to_bottom = false;
    }
    if app.scroll > max_scroll {
        app.scroll = max_scroll;
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::bordered().title(" docchat "))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    frame.render_widget(paragraph, area);
}

fn conversation_lines(app: &App) -> Vec<Line<'static>> {
    let turns = app.session.conversation().turns();
    if turns.is_empty() {
        return vec![
            Line::raw(String::new()),
            Line::styled(
                "  Type a message and press Enter. Attach one PDF with /attach <path>.",
                Style::default().fg(Color::DarkGray),
            ),
        ];
    }

    let mut lines = Vec::with_capacity(turns.len() * 3);
    let streaming = app.session.is_awaiting();

    for (index, turn) in turns.iter().enumerate() {
        let text = turn.display_text();
        let is_error = turn.role() == Role::Assistant && text.starts_with(ERROR_PREFIX);

        let (label, label_style) = match turn.role() {
            Role::User => (
                "You",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Role::Assistant if is_error => (
                "Assistant",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Role::Assistant => (
                "Assistant",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
        };
        lines.push(Line::styled(label.to_string(), label_style));

        if text.is_empty() && streaming && index == turns.len() - 1 {
            let spinner = SPINNER_FRAMES[app.spinner_frame as usize % SPINNER_FRAMES.len()];
            lines.push(Line::styled(
                spinner.to_string(),
                Style::default().fg(Color::DarkGray),
            ));
        } else {
            let body_style = if is_error {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            for body_line in text.lines() {
                lines.push(Line::styled(body_line.to_string(), body_style));
            }
        }
        lines.push(Line::raw(String::new()));
    }

    lines
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();

    if app.session.is_awaiting() {
        let spinner = SPINNER_FRAMES[app.spinner_frame as usize % SPINNER_FRAMES.len()];
        spans.push(Span::styled(
            format!(" awaiting response {spinner}"),
            Style::default().fg(Color::Yellow),
        ));
    } else {
        spans.push(Span::styled(" idle", Style::default().fg(Color::DarkGray)));
    }

    if let Some(pending) = app.session.pending_attachment() {
        spans.push(Span::raw("  •  "));
        spans.push(Span::styled(
            format!("attachment: {}", pending.summary()),
            Style::default().fg(Color::Magenta),
        ));
    }

    if let Some(notice) = &app.notice {
        spans.push(Span::raw("  •  "));
        spans.push(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let awaiting = app.session.is_awaiting();
    let (title, style) = if awaiting {
        (
            " waiting for the response… ",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (
            " message — Enter to send · /attach <path> · Esc to quit ",
            Style::default(),
        )
    };

    let paragraph = Paragraph::new(app.input.as_str())
        .style(style)
        .block(Block::bordered().title(title));
    frame.render_widget(paragraph, area);

    if !awaiting {
        let max_x = area.x + area.width.saturating_sub(2);
        let x = area.x + 1 + app.input.chars().count() as u16;
        frame.set_cursor_position((x.min(max_x), area.y + 1));
    }
}

/// Rows one logical line occupies once wrapped to `width` columns.
fn wrapped_height(line_width: u16, width: u16) -> u16 {
    if line_width == 0 {
        return 1;
    }
    line_width.div_ceil(width)
}
