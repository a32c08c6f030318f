use ratatui::{
    style::Style,
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

pub const HELP_TEXT: &str = r#"journalscope - systemd journal browser

Entries:
    j, ↓          Down        k, ↑          Up
    g             Top         G             Bottom (follow)
    Space, PgDn   Page down   b, PgUp       Page up

Search (case-insensitive regex over time, process and message):
    /             Edit search text, matches update as you type
    Enter         Keep search   Esc         Restore previous search
    Esc           Clear search (outside the search line)

Query:
    f             Change filter (interval, boot, unit, identifier, priority)
    r             Refresh, re-run the current query
    Esc           Cancel a running query

Global:
    q, Q          Quit
    ?             Toggle this help

Press any key to close this help"#;

pub struct Help;

impl Widget for Help {
    fn render(self, area: ratatui::layout::Rect, buf: &mut ratatui::buffer::Buffer) {
        let block = Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(crate::palette::yellow()))
            .style(Style::default().bg(crate::palette::black()));

        let paragraph = Paragraph::new(HELP_TEXT)
            .block(block)
            .wrap(Wrap { trim: false });
        Clear.render(area, buf);
        paragraph.render(area, buf);
    }
}
