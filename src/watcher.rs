//! Daemon mode: keep sweeping a drop folder as things land in it.
//!
//! The watcher sweeps once right away, then checks the drop folder's
//! modification time every `core.polling` seconds and sweeps again only when
//! it has moved past the time of the previous sweep. It stops when the
//! shutdown flag is raised, typically from a Ctrl+C handler.

use crate::sorter::{SortError, SortResult, Sorter};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// Longest single sleep between two shutdown checks.
const SHUTDOWN_CHECK: Duration = Duration::from_millis(200);

/// Runs sweeps until `shutdown` becomes true. Returns the number of sweeps.
///
/// # Errors
///
/// Fails if the drop folder can no longer be read, either while sweeping or
/// while reading its modification time.
pub fn watch(sorter: &Sorter<'_>, shutdown: &AtomicBool) -> SortResult<usize> {
    let drop_folder = sorter.store().drop_folder();
    let interval = sorter.store().polling_interval();
    info!(
        "starting sorta daemon on {} (polling every {:?})",
        drop_folder.display(),
        interval
    );

    let mut last_sweep = SystemTime::now();
    sorter.sweep()?;
    let mut sweeps = 1;

    while !shutdown.load(Ordering::SeqCst) {
        let mtime = modified(drop_folder)?;
        if mtime > last_sweep {
            debug!("drop folder changed, sweeping");
            sorter.sweep()?;
            sweeps += 1;
            last_sweep = mtime;
        }

        sleep_unless_shutdown(interval, shutdown);
    }

    info!("stopping sorta daemon...");
    Ok(sweeps)
}

fn modified(drop_folder: &Path) -> SortResult<SystemTime> {
    fs::metadata(drop_folder)
        .and_then(|meta| meta.modified())
        .map_err(|e| SortError::ReadDropFolder {
            path: drop_folder.to_path_buf(),
            source: e,
        })
}

/// Sleeps for `total`, waking up regularly to honour a shutdown request.
fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) {
    let mut remaining = total;
    while !remaining.is_zero() && !shutdown.load(Ordering::SeqCst) {
        let step = remaining.min(SHUTDOWN_CHECK);
        thread::sleep(step);
        remaining -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::TracingEvents;
    use crate::rule_store::{CONFIG_FILE_NAME, RuleStore};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fast_polling_store(root: &Path) -> RuleStore {
        let drop = root.join("drop");
        let pdfs = root.join("pdfs");
        fs::create_dir(&drop).unwrap();
        fs::create_dir(&pdfs).unwrap();
        fs::write(
            drop.join(CONFIG_FILE_NAME),
            format!(
                "[core]\ndelimiter = --\npolling = 0.05\n\n[prefix]\n\n[extension]\npdf = {}\n",
                pdfs.display()
            ),
        )
        .unwrap();
        RuleStore::load(&drop).unwrap()
    }

    #[test]
    fn test_watch_stops_immediately_when_already_shut_down() {
        let temp_dir = TempDir::new().unwrap();
        let store = fast_polling_store(temp_dir.path());
        let events = TracingEvents;
        let sorter = Sorter::new(&store, &events);

        let shutdown = AtomicBool::new(true);
        assert_eq!(watch(&sorter, &shutdown).unwrap(), 1);
    }

    #[test]
    fn test_watch_sweeps_new_arrivals() {
        let temp_dir = TempDir::new().unwrap();
        let store = fast_polling_store(temp_dir.path());
        let events = TracingEvents;
        let sorter = Sorter::new(&store, &events);

        let shutdown = Arc::new(AtomicBool::new(false));
        let drop = store.drop_folder().to_path_buf();
        let flag = Arc::clone(&shutdown);
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            fs::write(drop.join("late.pdf"), "").unwrap();
            thread::sleep(Duration::from_millis(600));
            flag.store(true, Ordering::SeqCst);
        });

        let sweeps = watch(&sorter, &shutdown).unwrap();
        producer.join().unwrap();

        assert!(sweeps >= 2);
        assert!(temp_dir.path().join("pdfs").join("late.pdf").is_file());
        assert!(!store.drop_folder().join("late.pdf").exists());
    }

    #[test]
    fn test_sleep_returns_early_on_shutdown() {
        let shutdown = AtomicBool::new(true);
        let started = std::time::Instant::now();
        sleep_unless_shutdown(Duration::from_secs(60), &shutdown);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
