use crate::journal::error::QueryError;
use crate::journal::priority::normalize_priority_filter;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const BOUND_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Keywords journalctl accepts for `--since`/`--until`.
const RELATIVE_KEYWORDS: [&str; 4] = ["now", "today", "yesterday", "tomorrow"];

/// One end of the query interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeBound {
    /// Wall-clock time, interpreted by the provider in the local zone.
    Absolute(NaiveDateTime),
    /// Passed to the provider verbatim (`yesterday`, `-1h`, `2 hours ago`).
    Relative(String),
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBound::Absolute(dt) => write!(f, "{}", dt.format(BOUND_FORMAT)),
            TimeBound::Relative(text) => f.write_str(text),
        }
    }
}

impl FromStr for TimeBound {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        for format in [BOUND_FORMAT, "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                return Ok(TimeBound::Absolute(dt));
            }
        }
        if let Some(midnight) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(TimeBound::Absolute(midnight));
        }
        if is_relative(text) {
            return Ok(TimeBound::Relative(text.to_string()));
        }
        Err(QueryError::InvalidTimeBound(s.to_string()))
    }
}

fn is_relative(text: &str) -> bool {
    if RELATIVE_KEYWORDS.contains(&text) {
        return true;
    }
    let offset = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .or_else(|| text.strip_prefix('@'));
    if let Some(rest) = offset {
        return rest.starts_with(|c: char| c.is_ascii_digit());
    }
    text.ends_with(" ago") && text.starts_with(|c: char| c.is_ascii_digit())
}

/// Optional start and end of the queried time window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interval {
    pub since: Option<TimeBound>,
    pub until: Option<TimeBound>,
}

/// Categorical journal filters. Declaration order is argument order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKind {
    Boot,
    Unit,
    Identifier,
    Priority,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [
        FilterKind::Boot,
        FilterKind::Unit,
        FilterKind::Identifier,
        FilterKind::Priority,
    ];

    pub fn flag(self) -> &'static str {
        match self {
            FilterKind::Boot => "--boot",
            FilterKind::Unit => "--unit",
            FilterKind::Identifier => "--identifier",
            FilterKind::Priority => "--priority",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterKind::Boot => "boot",
            FilterKind::Unit => "unit",
            FilterKind::Identifier => "identifier",
            FilterKind::Priority => "priority",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boot" | "b" => Ok(FilterKind::Boot),
            "unit" | "u" => Ok(FilterKind::Unit),
            "identifier" | "syslog-identifier" | "t" => Ok(FilterKind::Identifier),
            "priority" | "p" => Ok(FilterKind::Priority),
            other => Err(format!(
                "unknown filter '{other}' (expected one of: boot, unit, identifier, priority)"
            )),
        }
    }
}

/// What to ask the journal for.
///
/// Treated as a value: a changed query is a new `QuerySpecification`, built
/// with the `with_*` methods, never edited in place by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpecification {
    interval: Interval,
    filters: BTreeMap<FilterKind, String>,
}

impl QuerySpecification {
    /// No interval, no filters: the whole journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries of the running boot only. This is the initial query.
    pub fn current_boot() -> Self {
        let mut spec = Self::default();
        spec.filters.insert(FilterKind::Boot, "0".to_string());
        spec
    }

    pub fn with_since(mut self, bound: Option<TimeBound>) -> Self {
        self.interval.since = bound;
        self
    }

    pub fn with_until(mut self, bound: Option<TimeBound>) -> Self {
        self.interval.until = bound;
        self
    }

    /// Set or clear a filter. Blank values clear it; priorities are validated.
    pub fn with_filter(mut self, kind: FilterKind, value: &str) -> Result<Self, QueryError> {
        let value = value.trim();
        if value.is_empty() {
            self.filters.remove(&kind);
            return Ok(self);
        }
        let value = match kind {
            FilterKind::Priority => normalize_priority_filter(value)?,
            _ => value.to_string(),
        };
        self.filters.insert(kind, value);
        Ok(self)
    }

    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn filter(&self, kind: FilterKind) -> Option<&str> {
        self.filters.get(&kind).map(String::as_str)
    }

    pub fn filters(&self) -> impl Iterator<Item = (FilterKind, &str)> {
        self.filters.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Provider arguments for this query. Unset criteria contribute nothing.
    pub fn to_arguments(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(since) = &self.interval.since {
            args.push(format!("--since={since}"));
        }
        if let Some(until) = &self.interval.until {
            args.push(format!("--until={until}"));
        }
        for (kind, value) in &self.filters {
            args.push(format!("{}={}", kind.flag(), value));
        }
        args
    }

    /// Human readable interval, for display only.
    pub fn interval_description(&self) -> String {
        match (&self.interval.since, &self.interval.until) {
            (None, None) => "No time restriction".to_string(),
            (Some(since), None) => format!("Since {since}"),
            (None, Some(until)) => format!("Until {until}"),
            (Some(since), Some(until)) => format!("Between {since} and {until}"),
        }
    }

    /// Human readable filter list, for display only.
    pub fn filters_description(&self) -> String {
        if self.filters.is_empty() {
            return "No additional filters".to_string();
        }
        let parts: Vec<String> = self
            .filters
            .iter()
            .map(|(kind, value)| match (kind, value.as_str()) {
                (FilterKind::Boot, "0") => "boot (current)".to_string(),
                (FilterKind::Boot, "-1") => "boot (previous)".to_string(),
                _ => format!("{kind} ({value})"),
            })
            .collect();
        format!("Filtering by {}", parts.join(", "))
    }
}

impl fmt::Display for QuerySpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self.to_arguments();
        if args.is_empty() {
            f.write_str("<all entries>")
        } else {
            f.write_str(&args.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> TimeBound {
        s.parse().unwrap()
    }

    #[test]
    fn empty_spec_has_no_arguments() {
        let spec = QuerySpecification::new();
        assert!(spec.to_arguments().is_empty());
        assert_eq!(spec.interval_description(), "No time restriction");
        assert_eq!(spec.filters_description(), "No additional filters");
    }

    #[test]
    fn arguments_are_deterministic_and_ordered() {
        let build = || {
            QuerySpecification::new()
                .with_filter(FilterKind::Priority, "err")
                .unwrap()
                .with_filter(FilterKind::Unit, "sshd.service")
                .unwrap()
                .with_until(Some(dt("2026-10-18 12:00")))
                .with_since(Some(dt("yesterday")))
        };
        let args = build().to_arguments();
        assert_eq!(
            args,
            vec![
                "--since=yesterday",
                "--until=2026-10-18 12:00:00",
                "--unit=sshd.service",
                "--priority=err",
            ]
        );
        assert_eq!(args, build().to_arguments());
    }

    #[test]
    fn unset_and_blank_filters_are_omitted() {
        let spec = QuerySpecification::new()
            .with_filter(FilterKind::Priority, "error")
            .unwrap()
            .with_filter(FilterKind::Unit, "   ")
            .unwrap();
        let args = spec.to_arguments();
        assert_eq!(args, vec!["--priority=err"]);
        assert!(!args.iter().any(|a| a.starts_with("--unit")));
        assert!(!args.iter().any(|a| a.contains('*')));
    }

    #[test]
    fn blank_value_clears_existing_filter() {
        let spec = QuerySpecification::current_boot()
            .with_filter(FilterKind::Boot, "")
            .unwrap();
        assert_eq!(spec, QuerySpecification::new());
    }

    #[test]
    fn invalid_priority_is_rejected() {
        let err = QuerySpecification::new()
            .with_filter(FilterKind::Priority, "loud")
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidPriority(_)));
    }

    #[test]
    fn parses_time_bounds() {
        assert_eq!(dt("2026-10-18").to_string(), "2026-10-18 00:00:00");
        assert_eq!(dt("-1h"), TimeBound::Relative("-1h".to_string()));
        assert_eq!(dt("2 hours ago"), TimeBound::Relative("2 hours ago".to_string()));
        assert!("--unit=foo".parse::<TimeBound>().is_err());
        assert!("whenever".parse::<TimeBound>().is_err());
    }

    #[test]
    fn describes_interval_and_filters() {
        let spec = QuerySpecification::current_boot()
            .with_since(Some(dt("-2h")))
            .with_until(Some(dt("-1h")))
            .with_filter(FilterKind::Unit, "sshd.service")
            .unwrap();
        assert_eq!(spec.interval_description(), "Between -2h and -1h");
        assert_eq!(
            spec.filters_description(),
            "Filtering by boot (current), unit (sshd.service)"
        );
    }

    #[test]
    fn filter_kind_names() {
        assert_eq!("Unit".parse::<FilterKind>().unwrap(), FilterKind::Unit);
        assert!("hostname".parse::<FilterKind>().is_err());
    }
}
