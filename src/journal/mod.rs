//! Journal query-and-filter engine.
//!
//! - [`query`] builds journalctl arguments from a [`QuerySpecification`]
//! - [`executor`] runs the provider with a deadline
//! - [`entry`] turns `--output=json` lines into [`LogEntry`] values
//! - [`store`] holds the last result and applies the live search
//! - [`controller`] ties them together and notifies an [`Observer`]

pub mod controller;
pub mod entry;
pub mod error;
pub mod executor;
pub mod priority;
pub mod query;
pub mod store;

pub use controller::{Event, FilterController, Observer};
pub use entry::{LogEntry, TIME_FORMAT, parse_batch};
pub use error::{ExecutionError, FilterError, ParseError, QueryError};
pub use executor::{DEFAULT_TIMEOUT, Journalctl, LogProvider};
pub use priority::Priority;
pub use query::{FilterKind, Interval, QuerySpecification, TimeBound};
pub use store::EntryStore;
