use companion_core::{Message, Role};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, InputMode};

/// Label shown above the model's turns.
const COMPANION_LABEL: &str = "DevOps AI Companion";

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        if end == 0 {
            // "****" is not bold text
            spans.push(Span::raw(rest[..start + 4].to_string()));
            rest = &after[2..];
            continue;
        }

        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(
            after[..end].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after[end + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

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

    if app.show_template_picker {
        render_template_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let settings = &app.conversation().settings;

    let title = Line::from(vec![
        Span::styled(format!(" {} ", COMPANION_LABEL), Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!(" {} via {} ", settings.model, app.provider.display_name()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Lines for one chat bubble: sender, body, action hints.
fn message_lines(app: &App, index: usize, msg: &Message) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let (sender, color) = match msg.role {
        Role::User => (app.username.clone(), Color::Cyan),
        Role::System => (COMPANION_LABEL.to_string(), Color::Yellow),
    };
    lines.push(Line::from(Span::styled(
        format!("{}:", sender),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )));

    match msg.role {
        Role::User => {
            for line in msg.content.lines() {
                lines.push(Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Cyan))));
            }
        }
        Role::System => {
            for line in msg.content.lines() {
                lines.push(parse_markdown_line(line));
            }
        }
    }

    let hint_style = Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC);
    let mut hints = Vec::new();
    if app.conversation().shows_copy(index) {
        hints.push(Span::styled("[y] copy", hint_style));
    }
    if app.conversation().shows_continue(index) {
        hints.push(Span::raw("  "));
        hints.push(Span::styled(
            "[c] continue",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ));
    }
    lines.push(Line::from(hints));
    lines.push(Line::default());

    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Inner size minus borders, for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let conversation = app.conversation();
    let text = if conversation.messages().is_empty() && !conversation.is_busy() {
        Text::from(Span::styled(
            "Ask a question about user stories, promotions or deployments... (t for templates)",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for (index, msg) in conversation.messages().iter().enumerate() {
            lines.extend(message_lines(app, index, msg));
        }

        if conversation.is_busy() {
            lines.push(Line::from(Span::styled(
                format!("{}:", COMPANION_LABEL),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let title = if app.conversation().messages().is_empty() {
        " review/edit the information to be sent... "
    } else {
        " ask follow-up questions or additional instructions... "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor visible
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
        .draft()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    if let Some(toast) = &app.toast {
        let style = if toast.is_error {
            Style::default().bg(Color::Red).fg(Color::White)
        } else {
            Style::default().bg(Color::Green).fg(Color::Black)
        };
        frame.render_widget(Paragraph::new(format!(" {} ", toast.text)).style(style), area);
        return;
    }

    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" EDIT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Dark background with bright text reads on both light and dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: &[(&str, &str)] = match app.input_mode {
        InputMode::Editing => &[(" Enter ", " send "), (" Esc ", " normal ")],
        InputMode::Normal => &[
            (" i ", " edit "),
            (" c ", " continue "),
            (" y ", " copy "),
            (" t ", " templates "),
            (" x ", " clear "),
            (" j/k ", " scroll "),
            (" q ", " quit "),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in pairs {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_template_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let templates = &app.orchestrator.state().templates;

    // Centered popup
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = (templates.len() as u16 + 2).min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let selected = app.conversation().selected_template.as_deref();
    let items: Vec<ListItem> = templates
        .iter()
        .map(|label| {
            let style = if Some(label.as_str()) == selected {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", label)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Question Templates (Enter to use, Esc to cancel) "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.template_picker_state);
}
