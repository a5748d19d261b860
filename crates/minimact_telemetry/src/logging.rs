//! Captured logs
//!
//! Every crate in the workspace logs through the `log` facade. Installing
//! [`CaptureLogger`] keeps the most recent records in a bounded ring
//! buffer so an external inspector (CLI, DevTools panel) can pull them
//! across the boundary. Capture is off until [`enable`] is called.

use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// Entries kept before the oldest is dropped
pub const LOG_CAPACITY: usize = 10_000;

static LOGGER: OnceLock<CaptureLogger> = OnceLock::new();
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// One captured record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Severity
    #[serde(serialize_with = "serialize_level")]
    pub level: Level,
    /// Formatted message
    pub message: String,
    /// Source tag (the emitting module path)
    pub target: String,
    /// Milliseconds since the logger was created
    pub elapsed_ms: u64,
}

fn serialize_level<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(level.as_str())
}

/// A `log::Log` implementation writing into a ring buffer
pub struct CaptureLogger {
    enabled: AtomicBool,
    filter: AtomicUsize,
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    started: Instant,
}

fn filter_from_usize(value: usize) -> LevelFilter {
    match value {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

impl CaptureLogger {
    /// Create a disabled logger holding at most `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            filter: AtomicUsize::new(LevelFilter::Info as usize),
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            started: Instant::now(),
        }
    }

    /// Start capturing
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Stop capturing; held entries are kept
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    /// Whether capture is on
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Capture records at `filter` severity or above
    pub fn set_filter(&self, filter: LevelFilter) {
        self.filter.store(filter as usize, Ordering::SeqCst);
    }

    /// Current minimum captured severity
    pub fn filter(&self) -> LevelFilter {
        filter_from_usize(self.filter.load(Ordering::SeqCst))
    }

    /// Copy of the held entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Held entries as a JSON array
    pub fn entries_json(&self) -> String {
        let entries = self.entries.lock();
        serde_json::to_string(&*entries).unwrap_or_else(|_| "[]".to_string())
    }

    /// Number of held entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no entries are held
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every held entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Log for CaptureLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.is_enabled() && metadata.level() <= self.filter()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let entry = LogEntry {
            level: record.level(),
            message: record.args().to_string(),
            target: record.target().to_string(),
            elapsed_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    fn flush(&self) {}
}

/// The process-wide capture logger
pub fn logger() -> &'static CaptureLogger {
    LOGGER.get_or_init(|| CaptureLogger::with_capacity(LOG_CAPACITY))
}

/// Install the capture logger as the `log` backend
///
/// Returns `false` when some other logger already owns the facade; capture
/// controls still work but will see no records in that case.
pub fn init() -> bool {
    if INSTALLED.load(Ordering::SeqCst) {
        return true;
    }
    match log::set_logger(logger()) {
        Ok(()) => {
            INSTALLED.store(true, Ordering::SeqCst);
            sync_max_level();
            true
        }
        Err(_) => false,
    }
}

fn sync_max_level() {
    if !INSTALLED.load(Ordering::SeqCst) {
        return;
    }
    let logger = logger();
    if logger.is_enabled() {
        log::set_max_level(logger.filter());
    } else {
        log::set_max_level(LevelFilter::Off);
    }
}

/// Install (if needed) and start capturing
pub fn enable() {
    init();
    logger().enable();
    sync_max_level();
}

/// Stop capturing
pub fn disable() {
    logger().disable();
    sync_max_level();
}

/// Set the minimum captured severity
pub fn set_level(filter: LevelFilter) {
    logger().set_filter(filter);
    sync_max_level();
}

/// Map a boundary level code to a filter
///
/// Codes follow increasing severity: 0 trace, 1 debug, 2 info, 3 warn,
/// 4 error. Anything else is rejected.
pub fn level_from_code(code: i32) -> Option<LevelFilter> {
    match code {
        0 => Some(LevelFilter::Trace),
        1 => Some(LevelFilter::Debug),
        2 => Some(LevelFilter::Info),
        3 => Some(LevelFilter::Warn),
        4 => Some(LevelFilter::Error),
        _ => None,
    }
}

/// Copy of the captured entries
pub fn entries() -> Vec<LogEntry> {
    logger().entries()
}

/// Captured entries as JSON
pub fn entries_json() -> String {
    logger().entries_json()
}

/// Drop every captured entry
pub fn clear() {
    logger().clear();
}
