//! sorta - keep a drop folder tidy
//!
//! Entries dropped into a sorta drop folder are moved out by name: a rule for
//! the part before the delimiter (`reports--q1.pdf` with a `reports` prefix
//! rule) wins, otherwise a rule for the extension (`pdf`) decides. Rules live
//! in the drop folder's `.sortaconfig`; sweeps can run once or as a polling
//! daemon, and the last sweep can be undone.

pub mod cli;
pub mod config;
pub mod history;
pub mod ini;
pub mod logging;
pub mod output;
pub mod resolver;
pub mod rule_store;
pub mod sorter;
pub mod undo;
pub mod watcher;

pub use config::{FilterError, SweepFilters, SweepSettings};
pub use logging::{SortEvents, TracingEvents};
pub use resolver::{DestinationNotFound, resolve, resolve_destination};
pub use rule_store::{RuleKind, RuleNotFound, RuleStore, StoreError};
pub use sorter::{SortError, Sorter, SweepReport};
pub use undo::{UndoManager, UndoReport};

pub use cli::{SortaCommand, run_cli};
