use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

#[derive(Debug, Clone, Copy)]
pub enum Status<'a> {
    Idle,
    Busy,
    Error(&'a str),
    Info(&'a str),
}

/// Bottom line: key hints plus the current status.
pub struct StatusBar<'a> {
    pub status: Status<'a>,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: ratatui::layout::Rect, buf: &mut ratatui::buffer::Buffer) {
        let mut spans = match self.status {
            Status::Busy => vec![Span::styled(
                "Querying journal... (Esc to cancel) ",
                Style::default()
                    .fg(crate::palette::yellow())
                    .add_modifier(Modifier::BOLD),
            )],
            _ => vec![Span::raw("/:search f:filter r:refresh j/k:move ?:help ")],
        };

        spans.push(Span::styled(
            "q:quit ",
            Style::default()
                .fg(crate::palette::red())
                .add_modifier(Modifier::BOLD),
        ));

        match self.status {
            Status::Error(msg) => spans.push(Span::styled(
                format!("| {msg}"),
                Style::default().fg(crate::palette::red()),
            )),
            Status::Info(msg) => spans.push(Span::styled(
                format!("| {msg}"),
                Style::default().fg(crate::palette::gray()),
            )),
            Status::Idle | Status::Busy => {}
        }

        Paragraph::new(Line::from(spans)).render(area, buf);
    }
}
