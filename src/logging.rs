//! Logging setup and the event sink used by sweeps.
//!
//! The subscriber is installed on first call to [`init`] and never again, so
//! every entry point may call it. Sweeps don't log directly: they report to a
//! [`SortEvents`] handed to the [`Sorter`](crate::sorter::Sorter), and
//! [`TracingEvents`] is the sink that turns those reports into log lines.

use crate::resolver::{DestinationNotFound, MatchedRule};
use crate::sorter::SortError;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

static SUBSCRIBER: OnceLock<()> = OnceLock::new();

/// Installs the global `tracing` subscriber once.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (e.g. `"info"`) is
/// used.
pub fn init(default_level: &str) {
    SUBSCRIBER.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    });
}

/// Receives the outcome of every entry a sweep looks at.
pub trait SortEvents {
    /// The entry was moved.
    fn moved(&self, name: &str, destination: &Path, rule: &MatchedRule);

    /// Dry run: the entry would have been moved.
    fn planned(&self, name: &str, destination: &Path, rule: &MatchedRule);

    /// No rule applies to the entry.
    fn unmatched(&self, error: &DestinationNotFound);

    /// Sweep filters excluded the entry.
    fn filtered(&self, name: &str);

    /// A rule applied but the entry could not be moved.
    fn failed(&self, name: &str, error: &SortError);
}

/// Reports sweep events as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

impl SortEvents for TracingEvents {
    fn moved(&self, name: &str, destination: &Path, rule: &MatchedRule) {
        info!(
            "{} moved to {} ({} rule '{}')",
            name,
            destination.display(),
            rule.kind,
            rule.key
        );
    }

    fn planned(&self, name: &str, destination: &Path, rule: &MatchedRule) {
        info!(
            "[dry run] {} would move to {} ({} rule '{}')",
            name,
            destination.display(),
            rule.kind,
            rule.key
        );
    }

    fn unmatched(&self, error: &DestinationNotFound) {
        warn!("{}", error);
    }

    fn filtered(&self, name: &str) {
        debug!("{} excluded by sweep filters", name);
    }

    fn failed(&self, name: &str, error: &SortError) {
        warn!("error while moving the element {}: {}", name, error);
    }
}
