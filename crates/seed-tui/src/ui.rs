use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Bar, BarChart, BarGroup, Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap,
    },
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use seed_core::{render::Alignment as UnitAlign, RenderedUnit, Role, UnitKind};

use crate::app::{App, InputMode, Theme};

/// Accent colour for a mood label.
pub fn mood_color(mood: &str) -> Color {
    match mood {
        "joy" => Color::Green,
        "sadness" => Color::Blue,
        "anger" => Color::Red,
        "fear" => Color::Cyan,
        "disgust" => Color::LightGreen,
        "surprise" => Color::Magenta,
        _ => Color::Gray,
    }
}

struct Palette {
    base: Style,
    user: Color,
    assistant: Color,
    dim: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                base: Style::default().fg(Color::White).bg(Color::Reset),
                user: Color::Cyan,
                assistant: Color::White,
                dim: Color::DarkGray,
            },
            Theme::Light => Self {
                base: Style::default().fg(Color::Black).bg(Color::White),
                user: Color::Blue,
                assistant: Color::Black,
                dim: Color::Gray,
            },
        }
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let palette = Palette::for_theme(app.theme);
    f.render_widget(Block::default().style(palette.base), f.size());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(6),    // Transcript
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(f.size());

    draw_header(f, app, &palette, chunks[0]);
    draw_transcript(f, app, &palette, chunks[1]);
    draw_input(f, app, &palette, chunks[2]);
    draw_status_bar(f, app, chunks[3]);

    match app.input_mode() {
        InputMode::Normal => {}
        InputMode::ConfirmNewChat => draw_confirm(f, &palette),
        InputMode::History => draw_history(f, app, &palette),
        InputMode::Stats => draw_stats(f, app, &palette),
    }
}

fn border(app: &App) -> Style {
    Style::default().fg(mood_color(app.conversation.mood()))
}

fn draw_header(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let mood = app.conversation.mood();
    let mut spans = vec![
        Span::raw(" 🌱 "),
        Span::styled("SEED", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled("  |  ", Style::default().fg(palette.dim)),
        Span::styled(
            format!("mood: {}", mood),
            Style::default()
                .fg(mood_color(mood))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("  |  ", Style::default().fg(palette.dim)),
        Span::styled(
            format!("session {}", app.conversation.sid()),
            Style::default().fg(palette.dim),
        ),
    ];
    if app.conversation.is_awaiting_reply() {
        spans.push(Span::styled(
            "  ◐ thinking...",
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(border(app)))
        .style(palette.base)
        .alignment(Alignment::Left);
    f.render_widget(header, area);
}

fn draw_transcript(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let transcript = app.conversation.transcript();
    let inner_width = area.width.saturating_sub(2) as usize;
    let height = area.height.saturating_sub(2) as usize;

    let visible_units = transcript.len().saturating_sub(transcript.scroll_back());
    let lines: Vec<Line> = transcript.units()[..visible_units]
        .iter()
        .flat_map(|unit| unit_lines(unit, inner_width, palette))
        .collect();
    let start = lines.len().saturating_sub(height);

    let title = if transcript.is_following_tail() {
        " Chat ".to_string()
    } else {
        format!(" Chat (scrolled back {}) ", transcript.scroll_back())
    };
    let widget = Paragraph::new(lines[start..].to_vec())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(border(app)),
        )
        .style(palette.base);
    f.render_widget(widget, area);
}

fn unit_lines(unit: &RenderedUnit, width: usize, palette: &Palette) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match unit.kind {
        UnitKind::Typing => {
            lines.push(Line::from(vec![
                Span::raw(format!("{} ", unit.avatar.unwrap_or(""))),
                Span::styled(
                    "typing...",
                    Style::default()
                        .fg(palette.dim)
                        .add_modifier(Modifier::ITALIC),
                ),
            ]));
        }
        UnitKind::Message(Role::User) => {
            let style = Style::default().fg(palette.user);
            for row in wrap(&unit.body, (width * 3 / 4).max(8)) {
                lines.push(Line::styled(row, style).alignment(Alignment::Right));
            }
        }
        UnitKind::Message(Role::Assistant) => {
            let style = Style::default().fg(palette.assistant);
            let prefix = unit.avatar.map(|a| format!("{} ", a)).unwrap_or_default();
            let indent = " ".repeat(prefix.width());
            let rows = wrap(&unit.body, width.saturating_sub(indent.len()).max(8));
            for (i, row) in rows.into_iter().enumerate() {
                let lead = if i == 0 { prefix.clone() } else { indent.clone() };
                lines.push(Line::from(vec![Span::raw(lead), Span::styled(row, style)]));
            }
            if let (false, Some(emotion)) = (unit.revealing, unit.emotion.as_deref()) {
                lines.push(Line::from(Span::styled(
                    format!("{}└─ {}", indent, emotion),
                    Style::default()
                        .fg(mood_color(emotion))
                        .add_modifier(Modifier::ITALIC),
                )));
            }
        }
    }
    if unit.align == UnitAlign::Right {
        lines = lines
            .into_iter()
            .map(|l| l.alignment(Alignment::Right))
            .collect();
    }
    lines.push(Line::from(""));
    lines
}

/// Hard-wrap to display width, keeping explicit newlines.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for source in text.split('\n') {
        let mut row = String::new();
        let mut used = 0;
        for c in source.chars() {
            let w = c.width().unwrap_or(0);
            if used + w > width && !row.is_empty() {
                rows.push(std::mem::take(&mut row));
                used = 0;
            }
            row.push(c);
            used += w;
        }
        rows.push(row);
    }
    rows
}

fn draw_input(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let busy = app.conversation.is_busy();
    let prompt_color = if busy { Color::Yellow } else { Color::Green };
    let input_text = if app.input.is_empty() {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(prompt_color)),
            Span::styled(
                "Share what's on your mind and press Enter...",
                Style::default()
                    .fg(palette.dim)
                    .add_modifier(Modifier::ITALIC),
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(prompt_color)),
            Span::raw(app.input.clone()),
            Span::styled("▌", Style::default().fg(prompt_color)),
        ])
    };

    let input = Paragraph::new(input_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Message ")
                .border_style(border(app)),
        )
        .style(palette.base)
        .wrap(Wrap { trim: true });
    f.render_widget(input, area);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = match app.input_mode() {
        InputMode::Normal => {
            "[Enter] Send  [^N] New  [^H/F2] History  [^E] Stats  [^T] Theme  [^L] Logout  [^C] Quit"
        }
        InputMode::ConfirmNewChat => "[y] Start new chat  [n/Esc] Cancel",
        InputMode::History => "Type to filter  [↑/↓] Select  [Enter] Open  [Esc] Close",
        InputMode::Stats => "[Esc/^E] Close",
    };
    let status = match &app.notice {
        Some(notice) => format!(" {} | {}", notice, help_text),
        None => format!(" Messages: {} | {}", app.conversation.log().len(), help_text),
    };

    let status_bar = Paragraph::new(status)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::REVERSED));
    f.render_widget(status_bar, area);
}

fn draw_confirm(f: &mut Frame, palette: &Palette) {
    let area = centered_rect(50, 5, f.size());
    let text = Paragraph::new(vec![
        Line::from("Start a new chat?"),
        Line::from(Span::styled(
            "The current chat stays in your history.  [y/n]",
            Style::default().fg(palette.dim),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" New chat ")
            .border_style(Style::default().fg(Color::Yellow)),
    )
    .style(palette.base);
    f.render_widget(Clear, area);
    f.render_widget(text, area);
}

fn draw_history(f: &mut Frame, app: &App, palette: &Palette) {
    let area = centered_rect(70, 20, f.size());
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" History ")
        .border_style(border(app))
        .style(palette.base);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let query = Line::from(vec![
        Span::styled("Search: ", Style::default().fg(palette.dim)),
        Span::raw(app.history.query().to_string()),
        Span::styled("▌", Style::default().fg(Color::Green)),
    ]);
    f.render_widget(Paragraph::new(query), chunks[0]);

    let entries = app.history.filtered();
    if app.history_loading || entries.is_empty() {
        let text = if app.history_loading {
            "Loading..."
        } else {
            "No saved chats"
        };
        f.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(palette.dim))),
            chunks[1],
        );
        return;
    }

    let items: Vec<ListItem> = entries
        .iter()
        .map(|s| {
            let title = if s.title.trim().is_empty() {
                "(untitled)".to_string()
            } else {
                s.title.clone()
            };
            let mut spans = vec![
                Span::raw(title),
                Span::styled(
                    format!("  {}", s.updated_local()),
                    Style::default().fg(palette.dim),
                ),
            ];
            if let Some(count) = s.count {
                spans.push(Span::styled(
                    format!("  ({} messages)", count),
                    Style::default().fg(palette.dim),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol(">> ");
    let mut state = ListState::default();
    state.select(Some(app.history.selected_index()));
    f.render_stateful_widget(list, chunks[1], &mut state);
}

fn draw_stats(f: &mut Frame, app: &App, palette: &Palette) {
    let area = centered_rect(70, 16, f.size());
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Emotions in this chat ")
        .border_style(border(app))
        .style(palette.base);

    let histogram = app.conversation.histogram();
    if histogram.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No emotions yet. Say hello!",
            Style::default().fg(palette.dim),
        ))
        .alignment(Alignment::Center)
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let bars: Vec<Bar> = histogram
        .iter()
        .map(|(label, count)| {
            Bar::default()
                .value(count as u64)
                .label(Line::from(label.to_string()))
                .style(Style::default().fg(mood_color(label)))
        })
        .collect();
    let chart = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .bar_width(8)
        .bar_gap(2);
    f.render_widget(chart, area);
}

/// Rect of `percent_x` of the width and `height` rows, centered in `r`.
fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let height = height.min(r.height);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((r.height - height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use seed_core::EMOTIONS;

    #[test]
    fn test_every_mood_has_a_distinct_color() {
        let colors: Vec<Color> = EMOTIONS.iter().map(|m| mood_color(m)).collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(mood_color("unknown"), mood_color("neutral"));
    }

    #[test]
    fn test_wrap_respects_width_and_newlines() {
        assert_eq!(wrap("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap("a\nb", 10), vec!["a", "b"]);
        assert_eq!(wrap("", 10), vec![""]);
        // wide glyphs count double
        assert_eq!(wrap("你好世界", 4), vec!["你好", "世界"]);
    }

    #[test]
    fn test_centered_rect_fits_small_terminals() {
        let r = centered_rect(70, 20, Rect::new(0, 0, 40, 10));
        assert!(r.height <= 10);
        assert!(r.width <= 40);
    }
}
