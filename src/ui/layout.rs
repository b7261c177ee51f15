//! Frame composition.
//!
//! ```text
//! +----------+----------------------------------+
//! | channels | banner (only when set)           |
//! |          | messages                         |
//! |          | typing indicator                 |
//! |          | input                            |
//! +----------+----------------------------------+
//! | mode | workspace | user | status            |
//! +---------------------------------------------+
//! ```

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::core::context::AppContext;
use crate::core::message::ChatMessage;
use crate::core::view::Mode;

const SIDEBAR_WIDTH: u16 = 24;

pub fn draw(frame: &mut Frame, ctx: &AppContext) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(rows[0]);

    draw_sidebar(frame, ctx, columns[0]);
    draw_main(frame, ctx, columns[1]);
    draw_status(frame, ctx, rows[1]);
}

fn draw_sidebar(frame: &mut Frame, ctx: &AppContext, area: Rect) {
    let current = ctx.current_channel();
    let channels = if ctx.view.mode == Mode::Search {
        ctx.filter_channels(&ctx.view.search)
    } else {
        ctx.channels().iter().collect()
    };

    let items: Vec<ListItem> = channels
        .into_iter()
        .map(|channel| {
            let mut style = Style::default();
            if Some(&channel.id) == current {
                style = style.add_modifier(Modifier::REVERSED);
            } else if channel.unread > 0 {
                style = style.add_modifier(Modifier::BOLD);
            }
            ListItem::new(Line::from(Span::styled(channel.label(), style)))
        })
        .collect();

    let title = format!(" {} ", ctx.workspace());
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);
}

fn draw_main(frame: &mut Frame, ctx: &AppContext, area: Rect) {
    let banner_height = u16::from(ctx.view.banner.is_some());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(banner_height),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(area);

    if let Some(banner) = &ctx.view.banner {
        let style = Style::default().fg(Color::White).bg(Color::Red);
        frame.render_widget(Paragraph::new(banner.as_str()).style(style), chunks[0]);
    }

    draw_messages(frame, ctx, chunks[1]);

    let typing = ctx
        .current_channel()
        .map(|id| ctx.view.typing_users(id))
        .unwrap_or_default();
    if !typing.is_empty() {
        let text = format!("{} typing…", typing.join(", "));
        let style = Style::default().fg(Color::DarkGray);
        frame.render_widget(Paragraph::new(text).style(style), chunks[2]);
    }

    draw_input(frame, ctx, chunks[3]);
}

fn message_line(message: &ChatMessage) -> Line<'_> {
    Line::from(vec![
        Span::styled(
            message.timestamp.format("%H:%M ").to_string(),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("{}: ", message.user),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(message.text.as_str()),
    ])
}

/// Rows a message occupies once wrapped to `width` columns.
fn wrapped_rows(message: &ChatMessage, width: u16) -> u16 {
    let width = usize::from(width.max(1));
    // "HH:MM " plus "user: " plus the text.
    let columns = 6 + message.user.width() + 2 + message.text.width();
    u16::try_from(columns.div_ceil(width).max(1)).unwrap_or(u16::MAX)
}

fn draw_messages(frame: &mut Frame, ctx: &AppContext, area: Rect) {
    let title = match ctx.current_summary() {
        Some(channel) => format!(" {} ", channel.label()),
        None => " no channel ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);

    let Some(channel) = ctx.current_channel() else {
        frame.render_widget(block, area);
        return;
    };

    let messages: Vec<&ChatMessage> = ctx.view.messages(channel).collect();
    let total: u16 = messages
        .iter()
        .map(|message| wrapped_rows(message, inner.width))
        .fold(0, u16::saturating_add);
    let bottom = total.saturating_sub(inner.height);
    let offset = bottom.saturating_sub(ctx.view.scroll);

    let lines: Vec<Line> = messages.into_iter().map(message_line).collect();
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    frame.render_widget(paragraph, area);
}

fn draw_input(frame: &mut Frame, ctx: &AppContext, area: Rect) {
    let (title, text) = match ctx.view.mode {
        Mode::Search => (" search ", ctx.view.search.as_str()),
        _ => (" message ", ctx.view.input.as_str()),
    };
    let style = if ctx.view.mode == Mode::Command {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };

    let paragraph = Paragraph::new(format!("> {text}"))
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(paragraph, area);

    if ctx.view.mode != Mode::Command {
        let max_x = area.right().saturating_sub(2);
        let offset = u16::try_from(text.width() + 2).unwrap_or(u16::MAX);
        let x = area.x.saturating_add(1).saturating_add(offset).min(max_x);
        frame.set_cursor_position((x, area.y + 1));
    }
}

fn draw_status(frame: &mut Frame, ctx: &AppContext, area: Rect) {
    let connection = if ctx.is_connected() { "online" } else { "offline" };
    let mut spans = vec![
        Span::styled(
            format!(" {} ", ctx.view.mode.label()),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::raw(format!(
            " {} | {} | {} ",
            ctx.workspace(),
            ctx.user().unwrap_or("-"),
            connection
        )),
    ];
    if let Some(status) = &ctx.view.status {
        spans.push(Span::styled(
            format!("| {status}"),
            Style::default().fg(Color::Yellow),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::message::ChannelId;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::sync::Arc;

    fn screen(ctx: &AppContext) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).expect("terminal");
        terminal.draw(|frame| draw(frame, ctx)).expect("draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn draws_channels_messages_and_status() {
        let mut ctx = AppContext::new(Arc::new(Config::default()), "acme");
        ctx.set_user("me");
        ctx.upsert_channel(ChannelId::new("C1"), "general".into());
        ctx.upsert_channel(ChannelId::new("C2"), "random".into());
        ctx.record_message(ChatMessage::new("C1", "ada", "hello there"));
        ctx.view.banner = Some("Disconnected: gone".into());

        let text = screen(&ctx);
        assert!(text.contains("#general"));
        assert!(text.contains("#random"));
        assert!(text.contains("ada: hello there"));
        assert!(text.contains("Disconnected: gone"));
        assert!(text.contains("COMMAND"));
        assert!(text.contains("offline"));
    }

    #[test]
    fn search_mode_filters_sidebar() {
        let mut ctx = AppContext::new(Arc::new(Config::default()), "acme");
        ctx.upsert_channel(ChannelId::new("C1"), "general".into());
        ctx.upsert_channel(ChannelId::new("C2"), "random".into());
        ctx.select_channel(&ChannelId::new("C2")).expect("select");
        ctx.view.mode = Mode::Search;
        ctx.view.search = "ran".into();

        let text = screen(&ctx);
        assert!(text.contains("#random"));
        assert!(!text.contains("#general"));
    }

    #[test]
    fn wrapped_rows_accounts_for_wide_text() {
        let message = ChatMessage::new("C1", "ada", "x".repeat(40));
        // 6 + 3 + 2 + 40 = 51 columns.
        assert_eq!(wrapped_rows(&message, 50), 2);
        assert_eq!(wrapped_rows(&message, 60), 1);
    }
}
