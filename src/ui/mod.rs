use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::state::{CategoryTab, ViewState};
use crate::model::Bookmark;

/// What one frame needs besides the derived view.
pub struct Screen<'a> {
    pub view: &'a ViewState,
    pub selected: Option<usize>,
    pub status: Option<&'a str>,
    pub confirm_delete: Option<&'a Bookmark>,
}

impl Screen<'_> {
    fn selected_bookmark(&self) -> Option<&Bookmark> {
        self.selected.and_then(|index| self.view.items.get(index))
    }
}

pub fn draw_app(frame: &mut Frame, screen: &Screen<'_>, list_state: &mut ListState) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(frame.size());

    let tabs_width = vertical[0].width.saturating_sub(2) as usize;
    let tabs = Paragraph::new(build_tab_line(&screen.view.tabs, tabs_width)).block(
        Block::default()
            .title("Categories")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(tabs, vertical[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(vertical[1]);

    let title_width = columns[0].width.saturating_sub(4) as usize;
    let mut items: Vec<ListItem> = screen
        .view
        .items
        .iter()
        .map(|bookmark| {
            ListItem::new(vec![
                Line::from(Span::styled(
                    truncate_to_width(&bookmark.title, title_width),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    truncate_to_width(&bookmark.url, title_width),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No bookmarks here yet."));
    }
    let list = List::new(items)
        .block(
            Block::default()
                .title(format!(
                    "{} ({}/{})",
                    screen.view.active_category,
                    screen.view.items.len(),
                    screen.view.total
                ))
                .borders(Borders::ALL),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, columns[0], list_state);

    let detail = Paragraph::new(detail_text(screen.selected_bookmark()))
        .block(Block::default().title("Details").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, columns[1]);

    let status = Paragraph::new(build_status_line(screen))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, vertical[2]);

    if let Some(bookmark) = screen.confirm_delete {
        render_delete_prompt(frame, bookmark);
    }
}

fn build_tab_line(tabs: &[CategoryTab], max_width: usize) -> Line<'static> {
    let mut spans = Vec::with_capacity(tabs.len() * 2);
    let mut used = 0;
    for (index, tab) in tabs.iter().enumerate() {
        let label = format!(" {} {} ", tab.name, tab.count);
        let separator = if index == 0 { 0 } else { 1 };
        if used + separator + label.width() > max_width {
            spans.push(Span::styled("…", Style::default().fg(Color::Gray)));
            break;
        }
        if separator == 1 {
            spans.push(Span::raw("│"));
        }
        used += separator + label.width();
        let style = if tab.active {
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        } else if tab.protected {
            Style::default().add_modifier(Modifier::ITALIC)
        } else {
            Style::default()
        };
        spans.push(Span::styled(label, style));
    }
    Line::from(spans)
}

fn detail_text(bookmark: Option<&Bookmark>) -> Text<'static> {
    let Some(bookmark) = bookmark else {
        return Text::from("Select a bookmark to see its details.");
    };
    let label = Style::default().fg(Color::Gray);
    let mut lines = vec![
        Line::from(Span::styled(
            bookmark.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("URL       ", label),
            Span::raw(bookmark.url.clone()),
        ]),
        Line::from(vec![
            Span::styled("Category  ", label),
            Span::raw(bookmark.category.clone()),
        ]),
        Line::from(vec![
            Span::styled("Added     ", label),
            Span::raw(bookmark.date.clone()),
        ]),
    ];
    if !bookmark.memo.trim().is_empty() {
        lines.push(Line::from(""));
        lines.extend(bookmark.memo.lines().map(|line| Line::from(line.to_string())));
    }
    Text::from(lines)
}

fn build_status_line(screen: &Screen<'_>) -> Text<'static> {
    let position = match screen.selected {
        Some(index) if !screen.view.items.is_empty() => {
            format!("{}/{}", index + 1, screen.view.items.len())
        }
        _ => "0/0".to_string(),
    };
    let mut spans = vec![
        Span::raw(format!("Total: {} ", screen.view.total)),
        Span::raw(" | Selected: "),
        Span::styled(position, Style::default().add_modifier(Modifier::BOLD)),
    ];
    match screen.status {
        Some(message) => {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(
                message.to_string(),
                Style::default().fg(Color::Yellow),
            ));
        }
        None => spans.push(Span::styled(
            " | h/l category  j/k select  d delete  </> move  b backup  B restore  q quit",
            Style::default().fg(Color::Gray),
        )),
    }
    Text::from(Line::from(spans))
}

fn render_delete_prompt(frame: &mut Frame, bookmark: &Bookmark) {
    let area = centered_rect(50, 20, frame.size());
    frame.render_widget(Clear, area);
    let prompt = Paragraph::new(Text::from(vec![
        Line::from(format!("Delete \"{}\"?", bookmark.title)),
        Line::from(Span::styled(
            "y to confirm, any other key to cancel",
            Style::default().fg(Color::Gray),
        )),
    ]))
    .block(
        Block::default()
            .title("Confirm")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    )
    .wrap(Wrap { trim: true });
    frame.render_widget(prompt, area);
}

/// Cuts `text` to at most `max_width` terminal columns, ending in `…` when
/// anything was dropped.
fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let width = ch.width().unwrap_or(0);
        if used + width + 1 > max_width {
            break;
        }
        used += width;
        out.push(ch);
    }
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

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

    fn span_texts(line: &Line<'static>) -> Vec<String> {
        line.spans
            .iter()
            .map(|span| span.content.clone().into_owned())
            .collect()
    }

    fn tab(name: &str, count: usize, active: bool) -> CategoryTab {
        CategoryTab {
            name: name.into(),
            active,
            count,
            protected: name == "All",
        }
    }

    #[test]
    fn truncation_respects_wide_characters() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("bookmarks", 5), "book…");
        assert_eq!(truncate_to_width("学習メモ", 5), "学習…");
        assert_eq!(truncate_to_width("anything", 0), "");
    }

    #[test]
    fn tab_line_marks_overflow() {
        let tabs = vec![tab("All", 3, true), tab("Tools", 2, false), tab("Blog", 1, false)];
        let full = build_tab_line(&tabs, 80);
        assert_eq!(
            span_texts(&full),
            vec![" All 3 ", "│", " Tools 2 ", "│", " Blog 1 "]
        );

        let narrow = build_tab_line(&tabs, 12);
        assert_eq!(span_texts(&narrow), vec![" All 3 ", "…"]);
    }
}
