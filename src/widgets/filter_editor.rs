use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use journalscope::journal::{FilterKind, QueryError, QuerySpecification, TimeBound};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Since,
    Until,
    Filter(FilterKind),
}

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::Since => "Since",
            Field::Until => "Until",
            Field::Filter(FilterKind::Boot) => "Boot",
            Field::Filter(FilterKind::Unit) => "Unit",
            Field::Filter(FilterKind::Identifier) => "Identifier",
            Field::Filter(FilterKind::Priority) => "Priority",
        }
    }

    fn hint(self) -> &'static str {
        match self {
            Field::Since | Field::Until => "YYYY-MM-DD [HH:MM[:SS]], today, yesterday, -2h",
            Field::Filter(FilterKind::Boot) => "0 = current, -1 = previous, or a boot id",
            Field::Filter(FilterKind::Unit) => "Tab completes loaded unit names",
            Field::Filter(FilterKind::Identifier) => "syslog identifier, e.g. sudo",
            Field::Filter(FilterKind::Priority) => "emerg..debug, 0-7 or a range like err..warning",
        }
    }
}

const FIELDS: [Field; 6] = [
    Field::Since,
    Field::Until,
    Field::Filter(FilterKind::Boot),
    Field::Filter(FilterKind::Unit),
    Field::Filter(FilterKind::Identifier),
    Field::Filter(FilterKind::Priority),
];

/// What the editor wants after a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum EditorOutcome {
    Pending,
    Submit(QuerySpecification),
    /// Closed without changes.
    Cancel,
}

struct Completion {
    prefix: String,
    next: usize,
}

/// Popup form for the query filters.
pub struct FilterEditor {
    values: [String; 6],
    focused: usize,
    error: Option<String>,
    completion: Option<Completion>,
}

impl FilterEditor {
    pub fn from_spec(spec: &QuerySpecification) -> Self {
        let values = FIELDS.map(|field| match field {
            Field::Since => spec.interval().since.as_ref().map(TimeBound::to_string).unwrap_or_default(),
            Field::Until => spec.interval().until.as_ref().map(TimeBound::to_string).unwrap_or_default(),
            Field::Filter(kind) => spec.filter(kind).unwrap_or_default().to_string(),
        });
        Self {
            values,
            focused: 0,
            error: None,
            completion: None,
        }
    }

    /// The query described by the current field contents.
    pub fn build(&self) -> Result<QuerySpecification, QueryError> {
        let mut spec = QuerySpecification::new();
        for (field, value) in FIELDS.iter().zip(&self.values) {
            let value = value.trim();
            spec = match field {
                Field::Since => spec.with_since(parse_bound(value)?),
                Field::Until => spec.with_until(parse_bound(value)?),
                Field::Filter(kind) => spec.with_filter(*kind, value)?,
            };
        }
        Ok(spec)
    }

    pub fn handle_key(&mut self, key: KeyEvent, unit_names: &[String]) -> EditorOutcome {
        match key.code {
            KeyCode::Esc => return EditorOutcome::Cancel,
            KeyCode::Enter => match self.build() {
                Ok(spec) => return EditorOutcome::Submit(spec),
                Err(e) => self.error = Some(e.to_string()),
            },
            KeyCode::Tab if FIELDS[self.focused] == Field::Filter(FilterKind::Unit) => {
                self.complete_unit(unit_names);
                return EditorOutcome::Pending;
            }
            KeyCode::Tab | KeyCode::Down => self.focused = (self.focused + 1) % FIELDS.len(),
            KeyCode::BackTab | KeyCode::Up => {
                self.focused = (self.focused + FIELDS.len() - 1) % FIELDS.len()
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.values[self.focused].clear();
            }
            KeyCode::Char(c) => self.values[self.focused].push(c),
            KeyCode::Backspace => {
                self.values[self.focused].pop();
            }
            _ => return EditorOutcome::Pending,
        }
        self.completion = None;
        EditorOutcome::Pending
    }

    fn complete_unit(&mut self, unit_names: &[String]) {
        let completion = self.completion.get_or_insert_with(|| Completion {
            prefix: self.values[self.focused].clone(),
            next: 0,
        });
        if let Some(name) = complete(&completion.prefix, unit_names, completion.next) {
            self.values[self.focused] = name.to_string();
            completion.next += 1;
        }
    }
}

fn parse_bound(value: &str) -> Result<Option<TimeBound>, QueryError> {
    if value.is_empty() {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

/// The `nth` unit name starting with `prefix`, cycling through the matches.
pub fn complete<'a>(prefix: &str, names: &'a [String], nth: usize) -> Option<&'a str> {
    let matches: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| name.starts_with(prefix))
        .collect();
    if matches.is_empty() {
        None
    } else {
        Some(matches[nth % matches.len()])
    }
}

impl Widget for &FilterEditor {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Change filter ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(crate::palette::yellow()))
            .style(Style::default().bg(crate::palette::black()));
        let inner = block.inner(area);
        Clear.render(area, buf);
        block.render(area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(FIELDS.len() as u16),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        let lines: Vec<Line> = FIELDS
            .iter()
            .zip(&self.values)
            .enumerate()
            .map(|(i, (field, value))| {
                let focused = i == self.focused;
                let label_style = if focused {
                    Style::default()
                        .fg(crate::palette::green())
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(crate::palette::white())
                };
                let cursor = if focused { "_" } else { "" };
                Line::from(vec![
                    Span::styled(format!("{:>11}: ", field.label()), label_style),
                    Span::raw(format!("{value}{cursor}")),
                ])
            })
            .collect();
        Paragraph::new(lines).render(chunks[0], buf);

        Paragraph::new(FIELDS[self.focused].hint())
            .style(Style::default().fg(crate::palette::gray()))
            .render(chunks[1], buf);

        if let Some(error) = &self.error {
            Paragraph::new(error.as_str())
                .style(Style::default().fg(crate::palette::red()))
                .render(chunks[2], buf);
        }

        Paragraph::new("Enter: apply   Esc: cancel   Tab/↑/↓: move   Ctrl-U: clear field")
            .style(Style::default().fg(crate::palette::gray()))
            .render(chunks[3], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(editor: &mut FilterEditor, text: &str) {
        for c in text.chars() {
            editor.handle_key(key(KeyCode::Char(c)), &[]);
        }
    }

    #[test]
    fn prefills_from_spec_and_round_trips() {
        let spec = QuerySpecification::current_boot()
            .with_filter(FilterKind::Unit, "sshd.service")
            .unwrap();
        let editor = FilterEditor::from_spec(&spec);
        assert_eq!(editor.build().unwrap(), spec);
    }

    #[test]
    fn submit_builds_new_spec() {
        let mut editor = FilterEditor::from_spec(&QuerySpecification::new());
        type_text(&mut editor, "yesterday");
        for _ in 0..5 {
            editor.handle_key(key(KeyCode::Down), &[]);
        }
        type_text(&mut editor, "err");

        let EditorOutcome::Submit(spec) = editor.handle_key(key(KeyCode::Enter), &[]) else {
            panic!("expected submit");
        };
        assert_eq!(spec.to_arguments(), vec!["--since=yesterday", "--priority=err"]);
    }

    #[test]
    fn invalid_input_keeps_editor_open() {
        let mut editor = FilterEditor::from_spec(&QuerySpecification::new());
        type_text(&mut editor, "whenever");
        assert_eq!(editor.handle_key(key(KeyCode::Enter), &[]), EditorOutcome::Pending);
        assert!(editor.error.is_some());
    }

    #[test]
    fn escape_cancels() {
        let mut editor = FilterEditor::from_spec(&QuerySpecification::new());
        assert_eq!(editor.handle_key(key(KeyCode::Esc), &[]), EditorOutcome::Cancel);
    }

    #[test]
    fn tab_cycles_unit_completions() {
        let units: Vec<String> = ["cron.service", "sshd.service", "sshd.socket"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut editor = FilterEditor::from_spec(&QuerySpecification::new());
        editor.focused = 3;
        type_text(&mut editor, "ss");

        editor.handle_key(key(KeyCode::Tab), &units);
        assert_eq!(editor.values[3], "sshd.service");
        editor.handle_key(key(KeyCode::Tab), &units);
        assert_eq!(editor.values[3], "sshd.socket");
        editor.handle_key(key(KeyCode::Tab), &units);
        assert_eq!(editor.values[3], "sshd.service");
    }

    #[test]
    fn complete_without_matches() {
        assert_eq!(complete("zz", &["a".to_string()], 0), None);
    }
}
