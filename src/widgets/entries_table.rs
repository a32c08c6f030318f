use journalscope::journal::{LogEntry, Priority};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Paragraph, Row, Table, Widget},
};

const TIME_WIDTH: u16 = 15;
const PROCESS_WIDTH: u16 = 20;

/// The visible window of the filtered entries.
pub struct EntriesTable<'a> {
    /// Rows starting at `offset` of the filtered view.
    pub rows: Vec<&'a LogEntry>,
    pub offset: usize,
    pub selected: usize,
    pub title: String,
    pub empty_text: &'a str,
}

impl Widget for EntriesTable<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().title(self.title).borders(Borders::ALL);

        if self.rows.is_empty() {
            Paragraph::new(self.empty_text).block(block).render(area, buf);
            return;
        }

        let header = Row::new(vec!["Time", "Process", "Message"])
            .style(Style::default().add_modifier(Modifier::BOLD));

        let rows: Vec<Row> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let style = if self.offset + i == self.selected {
                    Style::default()
                        .bg(crate::palette::dark_gray())
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };

                Row::new(vec![
                    Span::styled(
                        entry.display_time(),
                        Style::default().fg(crate::palette::gray()),
                    ),
                    Span::styled(
                        entry.process_name.clone(),
                        Style::default().fg(crate::palette::cyan()),
                    ),
                    Span::styled(
                        entry.message.clone(),
                        Style::default().fg(priority_color(entry.priority)),
                    ),
                ])
                .style(style)
            })
            .collect();

        let table = Table::new(
            rows,
            vec![
                Constraint::Length(TIME_WIDTH),
                Constraint::Length(PROCESS_WIDTH),
                Constraint::Min(20),
            ],
        )
        .header(header)
        .block(block);

        Widget::render(table, area, buf);
    }
}

pub fn priority_color(priority: Option<Priority>) -> Color {
    match priority.map(Priority::level) {
        Some(0..=2) => crate::palette::red(),
        Some(3) => crate::palette::light_red(),
        Some(4) => crate::palette::yellow(),
        Some(5) => crate::palette::green(),
        Some(6) => crate::palette::white(),
        Some(_) => crate::palette::blue(),
        None => crate::palette::white(),
    }
}

/// First row to draw. Keeps `offset` unless `selected` has left the window.
pub fn scroll_offset(offset: usize, total: usize, selected: usize, visible_lines: usize) -> usize {
    if visible_lines == 0 || total <= visible_lines {
        return 0;
    }
    let last_page = total - visible_lines;
    let offset = offset.min(last_page);
    if selected < offset {
        selected
    } else if selected >= offset + visible_lines {
        (selected + 1 - visible_lines).min(last_page)
    } else {
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_keeps_selection_visible() {
        assert_eq!(scroll_offset(0, 5, 4, 10), 0);
        assert_eq!(scroll_offset(0, 100, 99, 10), 90);
        assert_eq!(scroll_offset(0, 100, 20, 0), 0);
        // Jumping to the top or past the bottom edge
        assert_eq!(scroll_offset(90, 100, 0, 10), 0);
        assert_eq!(scroll_offset(0, 100, 10, 10), 1);
    }

    #[test]
    fn scroll_stays_put_while_selection_is_on_screen() {
        // k from the bottom page
        assert_eq!(scroll_offset(90, 100, 98, 10), 90);
        // j from the first row
        assert_eq!(scroll_offset(0, 100, 1, 10), 0);
        assert_eq!(scroll_offset(40, 100, 45, 10), 40);
    }

    #[test]
    fn scroll_clamps_when_entries_shrink() {
        assert_eq!(scroll_offset(90, 20, 19, 10), 10);
        assert_eq!(scroll_offset(90, 20, 0, 10), 0);
    }

    #[test]
    fn severe_priorities_are_red() {
        assert_eq!(priority_color(Some(Priority::Crit)), Color::Red);
        assert_eq!(priority_color(Some(Priority::Warning)), Color::Yellow);
        assert_eq!(priority_color(None), Color::White);
    }
}
