use crate::journal::entry::LogEntry;
use crate::journal::error::FilterError;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;

/// Result of the most recent successful query, in provider order.
///
/// The backing sequence is an immutable snapshot; `replace` swaps it as a
/// whole, so holders of a [`snapshot`](EntryStore::snapshot) always see a
/// complete result. Filtering rescans every entry on each call, which is
/// fine for the size of one query window but has no index to fall back on.
#[derive(Debug, Clone, Default)]
pub struct EntryStore {
    entries: Arc<Vec<LogEntry>>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, entries: Vec<LogEntry>) {
        self.entries = Arc::new(entries);
    }

    pub fn snapshot(&self) -> Arc<Vec<LogEntry>> {
        Arc::clone(&self.entries)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn get(&self, idx: usize) -> Option<&LogEntry> {
        self.entries.get(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indices of entries matching `search`, in store order.
    pub fn matching_indices(&self, search: &str) -> Result<Vec<usize>, FilterError> {
        let Some(pattern) = compile_search(search)? else {
            return Ok((0..self.entries.len()).collect());
        };

        Ok(self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| matches_entry(&pattern, entry))
            .map(|(idx, _)| idx)
            .collect())
    }

    /// Entries whose time, process or message matches `search`
    /// (case-insensitive regular expression). Empty search matches all.
    pub fn filtered(&self, search: &str) -> Result<Vec<&LogEntry>, FilterError> {
        Ok(self
            .matching_indices(search)?
            .into_iter()
            .map(|idx| &self.entries[idx])
            .collect())
    }
}

/// Compile the live search text. `None` means "match everything".
pub fn compile_search(search: &str) -> Result<Option<Regex>, FilterError> {
    if search.is_empty() {
        return Ok(None);
    }
    RegexBuilder::new(search)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|source| FilterError {
            pattern: search.to_string(),
            source,
        })
}

fn matches_entry(pattern: &Regex, entry: &LogEntry) -> bool {
    pattern.is_match(&entry.process_name)
        || pattern.is_match(&entry.message)
        || pattern.is_match(&entry.display_time())
}
