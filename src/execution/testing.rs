//! Log capture for tests.
//!
//! Installs a process-wide logger once and keeps records per thread, so
//! tests running in parallel only see their own records.

use std::cell::RefCell;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new());
}

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let message = record.args().to_string();
        CAPTURED.with(|captured| captured.borrow_mut().push((record.level(), message)));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Runs `f` and returns its result with the warnings it logged.
pub fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });

    CAPTURED.with(|captured| captured.borrow_mut().clear());
    let output = f();
    let warnings = CAPTURED.with(|captured| {
        captured
            .borrow_mut()
            .drain(..)
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, message)| message)
            .collect()
    });

    (output, warnings)
}
