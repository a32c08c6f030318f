use crate::config::Config;
use crate::systemd::client::SystemdClient;
use crate::widgets::entries_table::scroll_offset;
use crate::widgets::filter_editor::{EditorOutcome, FilterEditor};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use journalscope::journal::{
    Event, FilterController, Journalctl, LogProvider, Observer, QueryError,
};

const PAGE_SIZE: usize = 10;

/// What the event loop should do after a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
    Dispatch(Event),
}

/// Collects controller notifications for the next redraw.
#[derive(Debug, Default)]
pub struct StatusObserver {
    error: Option<String>,
    entries_changed: bool,
}

impl StatusObserver {
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn take_entries_changed(&mut self) -> bool {
        std::mem::take(&mut self.entries_changed)
    }
}

impl Observer for StatusObserver {
    fn on_entries_updated(&mut self) {
        self.entries_changed = true;
    }

    fn on_query_description_changed(&mut self) {
        self.entries_changed = true;
    }

    fn on_error(&mut self, error: &QueryError) {
        self.error = Some(error.to_string());
    }
}

pub struct App<P = Journalctl> {
    controller: FilterController<P, StatusObserver>,
    systemd: Option<SystemdClient>,
    unit_names: Vec<String>,
    selected: usize,
    /// First entry row on screen.
    offset: usize,
    follow: bool,
    search_input: Option<SearchInput>,
    editor: Option<FilterEditor>,
    show_help: bool,
    busy: bool,
    user_mode: bool,
}

/// The search line while it is being edited.
struct SearchInput {
    text: String,
    backup: String,
}

impl App<Journalctl> {
    pub async fn new(config: &Config) -> Self {
        let systemd = match SystemdClient::new(config.user).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("D-Bus unavailable, unit completion disabled: {}", e);
                None
            }
        };
        let unit_names = match &systemd {
            Some(client) => client.unit_names().await.unwrap_or_else(|e| {
                tracing::warn!("Failed to list units: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        let controller = FilterController::new(
            config.provider(),
            StatusObserver::default(),
            config.spec.clone(),
        )
        .await;

        let mut app = Self::with_controller(controller, config.user);
        app.systemd = systemd;
        app.unit_names = unit_names;
        if !config.search.is_empty() {
            app.controller.on_search_change(config.search.clone());
        }
        app.after_dispatch();
        app
    }
}

impl<P: LogProvider> App<P> {
    pub fn with_controller(controller: FilterController<P, StatusObserver>, user_mode: bool) -> Self {
        let mut app = Self {
            controller,
            systemd: None,
            unit_names: Vec::new(),
            selected: 0,
            offset: 0,
            follow: true,
            search_input: None,
            editor: None,
            show_help: false,
            busy: false,
            user_mode,
        };
        app.after_dispatch();
        app
    }

    pub fn controller(&self) -> &FilterController<P, StatusObserver> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut FilterController<P, StatusObserver> {
        &mut self.controller
    }

    pub fn is_user_mode(&self) -> bool {
        self.systemd
            .as_ref()
            .map(SystemdClient::is_user_mode)
            .unwrap_or(self.user_mode)
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Scroll position for a window of `visible_lines` rows, moved only when
    /// the selection would leave it.
    pub fn scroll(&mut self, visible_lines: usize) -> usize {
        self.offset = scroll_offset(
            self.offset,
            self.controller.visible_len(),
            self.selected,
            visible_lines,
        );
        self.offset
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    /// Search text as typed, including while the search line is being edited.
    pub fn search_text(&self) -> &str {
        match &self.search_input {
            Some(input) => &input.text,
            None => self.controller.search(),
        }
    }

    pub fn is_editing_search(&self) -> bool {
        self.search_input.is_some()
    }

    pub fn editor(&self) -> Option<&FilterEditor> {
        self.editor.as_ref()
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub fn error_message(&self) -> Option<&str> {
        self.controller.observer().error()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if self.show_help {
            // Any key closes help
            self.show_help = false;
            return Action::Continue;
        }

        if let Some(editor) = &mut self.editor {
            return match editor.handle_key(key, &self.unit_names) {
                EditorOutcome::Pending => Action::Continue,
                EditorOutcome::Submit(spec) => {
                    self.editor = None;
                    self.begin_action();
                    Action::Dispatch(Event::FilterChanged(Some(spec)))
                }
                EditorOutcome::Cancel => {
                    self.editor = None;
                    Action::Dispatch(Event::FilterChanged(None))
                }
            };
        }

        if let Some(input) = &mut self.search_input {
            return match key.code {
                KeyCode::Esc => {
                    let backup = std::mem::take(&mut input.backup);
                    self.search_input = None;
                    self.begin_action();
                    Action::Dispatch(Event::SearchChanged(backup))
                }
                KeyCode::Enter => {
                    self.search_input = None;
                    Action::Continue
                }
                KeyCode::Char(c) => {
                    input.text.push(c);
                    let text = input.text.clone();
                    self.begin_action();
                    Action::Dispatch(Event::SearchChanged(text))
                }
                KeyCode::Backspace => {
                    input.text.pop();
                    let text = input.text.clone();
                    self.begin_action();
                    Action::Dispatch(Event::SearchChanged(text))
                }
                _ => Action::Continue,
            };
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => return Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Action::Quit;
            }
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('/') => {
                let current = self.controller.search().to_string();
                self.search_input = Some(SearchInput {
                    text: current.clone(),
                    backup: current,
                });
            }
            KeyCode::Char('f') => self.editor = Some(FilterEditor::from_spec(self.controller.spec())),
            KeyCode::Char('r') => {
                self.begin_action();
                return Action::Dispatch(Event::Refresh);
            }
            KeyCode::Esc => {
                if !self.controller.search().is_empty() {
                    self.begin_action();
                    return Action::Dispatch(Event::SearchChanged(String::new()));
                }
                self.controller.observer_mut().clear_error();
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_down(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(1),
            KeyCode::Char(' ') | KeyCode::PageDown => self.move_down(PAGE_SIZE),
            KeyCode::Char('b') | KeyCode::PageUp => self.move_up(PAGE_SIZE),
            KeyCode::Char('g') | KeyCode::Home => {
                self.selected = 0;
                self.follow = false;
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.follow = true;
                self.scroll_to_bottom();
            }
            _ => {}
        }
        Action::Continue
    }

    /// Run one event through the controller.
    pub async fn dispatch(&mut self, event: Event) {
        self.controller.handle(event).await;
        self.after_dispatch();
    }

    /// Pick up controller notifications: keep the selection on screen.
    pub fn after_dispatch(&mut self) {
        if self.controller.observer_mut().take_entries_changed() {
            if self.follow {
                self.scroll_to_bottom();
            } else {
                let last = self.controller.visible_len().saturating_sub(1);
                self.selected = self.selected.min(last);
            }
        }
    }

    fn begin_action(&mut self) {
        self.controller.observer_mut().clear_error();
    }

    fn move_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
        self.follow = false;
    }

    fn move_down(&mut self, n: usize) {
        let last = self.controller.visible_len().saturating_sub(1);
        self.selected = (self.selected + n).min(last);
        self.follow = self.selected == last;
    }

    fn scroll_to_bottom(&mut self) {
        self.selected = self.controller.visible_len().saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journalscope::journal::{ExecutionError, QuerySpecification};
    use tokio_util::sync::CancellationToken;

    struct Fixed(Vec<String>);

    impl LogProvider for Fixed {
        async fn fetch(
            &self,
            _args: &[String],
            _cancel: &CancellationToken,
        ) -> Result<Vec<String>, ExecutionError> {
            Ok(self.0.clone())
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn app() -> App<Fixed> {
        let lines = (0..30)
            .map(|i| {
                let ident = if i % 10 == 0 { "CROND" } else { "sshd" };
                format!(
                    r#"{{"__REALTIME_TIMESTAMP":"{}","SYSLOG_IDENTIFIER":"{ident}","MESSAGE":"line {i}"}}"#,
                    1_700_000_000_000_000u64 + i * 1_000_000
                )
            })
            .collect();
        let controller = FilterController::new(
            Fixed(lines),
            StatusObserver::default(),
            QuerySpecification::new(),
        )
        .await;
        App::with_controller(controller, false)
    }

    #[tokio::test]
    async fn starts_following_newest_entry() {
        let app = app().await;
        assert_eq!(app.selected(), 29);
        assert!(app.is_following());
    }

    #[tokio::test]
    async fn typing_in_search_line_dispatches_live_filter() {
        let mut app = app().await;
        assert_eq!(app.handle_key(key(KeyCode::Char('/'))), Action::Continue);
        for c in "crond".chars() {
            let Action::Dispatch(event) = app.handle_key(key(KeyCode::Char(c))) else {
                panic!("expected dispatch");
            };
            app.dispatch(event).await;
        }
        assert_eq!(app.controller().visible_len(), 3);
        assert_eq!(app.selected(), 2);

        // Esc restores the search text from before editing
        let Action::Dispatch(event) = app.handle_key(key(KeyCode::Esc)) else {
            panic!("expected dispatch");
        };
        app.dispatch(event).await;
        assert!(!app.is_editing_search());
        assert_eq!(app.controller().visible_len(), 30);
    }

    #[tokio::test]
    async fn cancelled_filter_editor_dispatches_unchanged() {
        let mut app = app().await;
        app.handle_key(key(KeyCode::Char('f')));
        assert!(app.editor().is_some());
        assert_eq!(
            app.handle_key(key(KeyCode::Esc)),
            Action::Dispatch(Event::FilterChanged(None))
        );
        assert!(app.editor().is_none());
    }

    #[tokio::test]
    async fn navigation_stops_following() {
        let mut app = app().await;
        app.handle_key(key(KeyCode::Char('k')));
        assert_eq!(app.selected(), 28);
        assert!(!app.is_following());
        app.handle_key(key(KeyCode::Char('G')));
        assert_eq!(app.selected(), 29);
        assert!(app.is_following());
    }

    #[tokio::test]
    async fn scrolling_up_from_bottom_keeps_the_page() {
        let mut app = app().await;
        assert_eq!(app.scroll(10), 20);
        app.handle_key(key(KeyCode::Char('k')));
        app.handle_key(key(KeyCode::Char('k')));
        assert_eq!(app.scroll(10), 20);

        app.handle_key(key(KeyCode::Char('g')));
        assert_eq!(app.scroll(10), 0);
        app.handle_key(key(KeyCode::Char('j')));
        assert_eq!(app.scroll(10), 0);
    }

    #[tokio::test]
    async fn invalid_search_shows_error() {
        let mut app = app().await;
        app.handle_key(key(KeyCode::Char('/')));
        let Action::Dispatch(event) = app.handle_key(key(KeyCode::Char('('))) else {
            panic!("expected dispatch");
        };
        app.dispatch(event).await;
        assert_eq!(app.controller().visible_len(), 0);
        assert!(app.error_message().unwrap().contains("invalid search pattern"));
    }
}
