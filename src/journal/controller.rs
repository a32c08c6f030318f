use crate::journal::entry::{LogEntry, parse_batch};
use crate::journal::error::{ExecutionError, FilterError, QueryError};
use crate::journal::executor::LogProvider;
use crate::journal::query::QuerySpecification;
use crate::journal::store::EntryStore;
use tokio_util::sync::CancellationToken;

/// Inputs the controller reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Answer of the filter editor; `None` means the user cancelled it.
    FilterChanged(Option<QuerySpecification>),
    SearchChanged(String),
    Refresh,
}

/// Receives notifications from a [`FilterController`].
///
/// The controller never draws anything; whoever presents the entries decides
/// when to redraw.
pub trait Observer {
    fn on_entries_updated(&mut self) {}
    fn on_query_description_changed(&mut self) {}
    fn on_error(&mut self, _error: &QueryError) {}
}

impl Observer for () {}

/// Owns the current query, the live search text and the fetched entries.
///
/// Events are processed one at a time to completion. Entries are only
/// touched after the provider returns, so dropping a `handle` future
/// mid-query keeps the previous entries.
pub struct FilterController<P, O> {
    provider: P,
    observer: O,
    spec: QuerySpecification,
    search: String,
    store: EntryStore,
    view: Vec<usize>,
    filter_error: Option<FilterError>,
    cancel: CancellationToken,
}

impl<P: LogProvider, O: Observer> FilterController<P, O> {
    /// Create the controller and run the initial query.
    pub async fn new(provider: P, observer: O, spec: QuerySpecification) -> Self {
        let mut controller = Self {
            provider,
            observer,
            spec,
            search: String::new(),
            store: EntryStore::new(),
            view: Vec::new(),
            filter_error: None,
            cancel: CancellationToken::new(),
        };
        controller.observer.on_query_description_changed();
        controller.reload().await;
        controller
    }

    pub async fn handle(&mut self, event: Event) {
        match event {
            Event::FilterChanged(Some(spec)) => self.on_filter_change(spec).await,
            Event::FilterChanged(None) => {
                tracing::info!("Filter editor cancelled, query is still {}", self.spec);
            }
            Event::SearchChanged(text) => self.on_search_change(text),
            Event::Refresh => self.on_refresh().await,
        }
    }

    /// Adopt a new query and fetch its entries.
    ///
    /// If the fetch fails the previous entries stay visible; a later
    /// refresh retries the new query.
    pub async fn on_filter_change(&mut self, spec: QuerySpecification) {
        tracing::info!("New query is {}", spec);
        self.spec = spec;
        self.observer.on_query_description_changed();
        self.reload().await;
    }

    /// Re-run the current query to pick up entries written since the last one.
    pub async fn on_refresh(&mut self) {
        self.reload().await;
    }

    /// Re-filter the current entries without querying the provider.
    pub fn on_search_change(&mut self, text: String) {
        tracing::debug!("Search string set to '{}'", text);
        self.search = text;
        self.refilter();
        self.observer.on_entries_updated();
    }

    /// Token that cancels the query currently being run by `handle`.
    ///
    /// Take it before dispatching an event. A token that was cancelled
    /// earlier is replaced with a fresh one.
    pub fn cancellation(&mut self) -> CancellationToken {
        self.renew_cancellation();
        self.cancel.clone()
    }

    fn renew_cancellation(&mut self) {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
    }

    async fn reload(&mut self) {
        match self.execute().await {
            Ok(entries) => {
                self.store.replace(entries);
                self.refilter();
                self.observer.on_entries_updated();
            }
            Err(e) => {
                tracing::warn!("Keeping {} previous entries: {}", self.store.len(), e);
                self.report(QueryError::Execution(e));
            }
        }
    }

    async fn execute(&mut self) -> Result<Vec<LogEntry>, ExecutionError> {
        // A cancel that arrived after the previous query finished is stale
        self.renew_cancellation();
        let args = self.spec.to_arguments();
        let result = self.provider.fetch(&args, &self.cancel).await;
        self.renew_cancellation();
        let raw = result?;
        let entries = parse_batch(&raw);
        tracing::info!(
            "Query '{}' returned {} entries ({} records)",
            args.join(" "),
            entries.len(),
            raw.len()
        );
        Ok(entries)
    }

    fn refilter(&mut self) {
        match self.store.matching_indices(&self.search) {
            Ok(view) => {
                self.view = view;
                self.filter_error = None;
            }
            Err(e) => {
                self.view.clear();
                self.report(QueryError::Filter(e.clone()));
                self.filter_error = Some(e);
            }
        }
    }

    fn report(&mut self, error: QueryError) {
        self.observer.on_error(&error);
    }
}

impl<P, O> FilterController<P, O> {
    pub fn spec(&self) -> &QuerySpecification {
        &self.spec
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    /// Entries passing the live search, in store order.
    pub fn visible(&self) -> impl Iterator<Item = &LogEntry> {
        self.view.iter().filter_map(|&idx| self.store.get(idx))
    }

    pub fn visible_len(&self) -> usize {
        self.view.len()
    }

    pub fn visible_entry(&self, row: usize) -> Option<&LogEntry> {
        self.view.get(row).and_then(|&idx| self.store.get(idx))
    }

    /// Set while the search text does not compile; the view is empty then.
    pub fn filter_error(&self) -> Option<&FilterError> {
        self.filter_error.as_ref()
    }

    pub fn interval_description(&self) -> String {
        self.spec.interval_description()
    }

    pub fn filters_description(&self) -> String {
        self.spec.filters_description()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::query::FilterKind;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned responses and records the arguments it was given.
    #[derive(Default)]
    struct Scripted {
        responses: RefCell<VecDeque<Result<Vec<String>, String>>>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl Scripted {
        fn push_ok(self, lines: &[String]) -> Self {
            self.responses.borrow_mut().push_back(Ok(lines.to_vec()));
            self
        }

        fn push_err(self, msg: &str) -> Self {
            self.responses.borrow_mut().push_back(Err(msg.to_string()));
            self
        }
    }

    impl LogProvider for Scripted {
        async fn fetch(
            &self,
            args: &[String],
            cancel: &CancellationToken,
        ) -> Result<Vec<String>, ExecutionError> {
            if cancel.is_cancelled() {
                return Err(ExecutionError::Cancelled { args: args.to_vec() });
            }
            self.calls.borrow_mut().push(args.to_vec());
            let response = self.responses.borrow_mut().pop_front();
            match response {
                Some(Ok(lines)) => Ok(lines),
                other => Err(ExecutionError::Launch {
                    program: "scripted".to_string(),
                    args: args.to_vec(),
                    source: std::io::Error::other(match other {
                        Some(Err(msg)) => msg,
                        _ => "no response scripted".to_string(),
                    }),
                }),
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        updates: usize,
        descriptions: usize,
        errors: Vec<String>,
    }

    impl Observer for Recorder {
        fn on_entries_updated(&mut self) {
            self.updates += 1;
        }
        fn on_query_description_changed(&mut self) {
            self.descriptions += 1;
        }
        fn on_error(&mut self, error: &QueryError) {
            self.errors.push(error.to_string());
        }
    }

    fn rec(micros: &str, ident: &str, message: &str) -> String {
        format!(
            r#"{{"__REALTIME_TIMESTAMP":"{micros}","SYSLOG_IDENTIFIER":"{ident}","MESSAGE":"{message}"}}"#
        )
    }

    fn batch() -> Vec<String> {
        vec![
            rec("1700000000000000", "CROND", "hourly run"),
            rec("1700000001000000", "sshd", "session opened"),
        ]
    }

    #[tokio::test]
    async fn construction_runs_initial_query() {
        let provider = Scripted::default().push_ok(&batch());
        let c = FilterController::new(provider, Recorder::default(), QuerySpecification::current_boot()).await;
        assert_eq!(c.store().len(), 2);
        assert_eq!(c.visible_len(), 2);
        assert_eq!(c.provider().calls.borrow()[0], vec!["--boot=0"]);
        assert_eq!(c.observer().updates, 1);
        assert_eq!(c.observer().descriptions, 1);
    }

    #[tokio::test]
    async fn priority_query_drops_unparsable_record() {
        let mut lines = batch();
        lines.insert(1, rec("not-a-time", "x", "broken"));
        let provider = Scripted::default().push_ok(&[]).push_ok(&lines);
        let mut c = FilterController::new(provider, Recorder::default(), QuerySpecification::new()).await;

        let spec = QuerySpecification::new()
            .with_filter(FilterKind::Priority, "error")
            .unwrap();
        c.handle(Event::FilterChanged(Some(spec))).await;

        let calls = c.provider().calls.borrow().clone();
        let args = calls.last().unwrap();
        assert!(args.contains(&"--priority=err".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--unit")));
        assert_eq!(c.store().len(), 2);
        assert!(c.observer().errors.is_empty());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_entries() {
        let provider = Scripted::default().push_ok(&batch()).push_ok(&batch()).push_err("journal gone");
        let mut c = FilterController::new(provider, Recorder::default(), QuerySpecification::new()).await;
        c.handle(Event::Refresh).await;
        c.handle(Event::Refresh).await;

        assert_eq!(c.store().len(), 2);
        assert_eq!(c.visible_len(), 2);
        assert_eq!(c.observer().errors.len(), 1);
        assert_eq!(c.provider().calls.borrow().len(), 3);
    }

    #[tokio::test]
    async fn search_refilters_without_querying() {
        let provider = Scripted::default().push_ok(&batch());
        let mut c = FilterController::new(provider, Recorder::default(), QuerySpecification::new()).await;
        c.handle(Event::SearchChanged("crond".to_string())).await;

        let names: Vec<_> = c.visible().map(|e| e.process_name.as_str()).collect();
        assert_eq!(names, vec!["CROND"]);
        assert_eq!(c.provider().calls.borrow().len(), 1);
    }

    #[tokio::test]
    async fn invalid_search_empties_view_and_reports() {
        let provider = Scripted::default().push_ok(&batch());
        let mut c = FilterController::new(provider, Recorder::default(), QuerySpecification::new()).await;
        c.handle(Event::SearchChanged("(".to_string())).await;

        assert_eq!(c.visible_len(), 0);
        assert_eq!(c.store().len(), 2);
        assert!(c.filter_error().is_some());
        assert_eq!(c.observer().errors.len(), 1);

        c.handle(Event::SearchChanged(String::new())).await;
        assert_eq!(c.visible_len(), 2);
        assert!(c.filter_error().is_none());
    }

    #[tokio::test]
    async fn unchanged_filter_is_a_no_op() {
        let provider = Scripted::default().push_ok(&batch());
        let mut c = FilterController::new(provider, Recorder::default(), QuerySpecification::new()).await;
        c.handle(Event::FilterChanged(None)).await;

        assert_eq!(c.provider().calls.borrow().len(), 1);
        assert_eq!(c.observer().descriptions, 1);
    }

    #[tokio::test]
    async fn failed_initial_query_starts_empty() {
        let provider = Scripted::default().push_err("no journalctl");
        let c = FilterController::new(provider, Recorder::default(), QuerySpecification::new()).await;
        assert!(c.store().is_empty());
        assert_eq!(c.observer().errors.len(), 1);
    }

    #[tokio::test]
    async fn stale_cancel_does_not_fail_next_refresh() {
        let provider = Scripted::default().push_ok(&batch()).push_ok(&batch()[..1]);
        let mut c = FilterController::new(provider, Recorder::default(), QuerySpecification::new()).await;

        c.cancellation().cancel();
        c.handle(Event::SearchChanged("sshd".to_string())).await;
        c.handle(Event::Refresh).await;

        assert!(c.observer().errors.is_empty(), "{:?}", c.observer().errors);
        assert_eq!(c.store().len(), 1);
        assert_eq!(c.provider().calls.borrow().len(), 2);
    }

    #[tokio::test]
    async fn cancellation_hands_out_a_live_token() {
        let provider = Scripted::default().push_ok(&batch());
        let mut c = FilterController::new(provider, Recorder::default(), QuerySpecification::new()).await;
        let first = c.cancellation();
        first.cancel();
        assert!(!c.cancellation().is_cancelled());
    }
}
