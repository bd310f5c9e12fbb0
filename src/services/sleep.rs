//! Blocking Delay

use std::thread;
use std::time::Duration;

use log::debug;

use super::Sleeper;

/// [`Sleeper`] that suspends the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        debug!("Sleeping for {:.1?}", duration);
        thread::sleep(duration);
    }
}
