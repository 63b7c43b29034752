//! Small utilities exposed to app code.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{Instant, sleep, sleep_until};
use uuid::Uuid;

/// A fresh hyphenated v4 UUID string.
#[must_use]
pub fn unique_id() -> String {
    Uuid::new_v4().to_string()
}

/// Sleep for `duration`.
pub async fn delay(duration: Duration) {
    sleep(duration).await;
}

/// Create a [`Debouncer`] with the given quiet period.
#[must_use]
pub fn debounce(quiet: Duration) -> Debouncer {
    Debouncer::new(quiet)
}

/// Coalesces bursts of triggers into one settling point.
///
/// Each [`trigger`](Debouncer::trigger) pushes the settling deadline out to
/// `now + quiet`; [`settled`](Debouncer::settled) completes once the quiet
/// period passes with no further trigger. Never triggered means already
/// settled.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Mutex<Option<Instant>>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet period.
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: Mutex::new(None),
        }
    }

    /// Record a trigger, pushing the settling deadline out.
    pub fn trigger(&self) {
        if let Ok(mut deadline) = self.deadline.lock() {
            *deadline = Some(Instant::now() + self.quiet);
        }
    }

    /// Wait until the quiet period elapses with no further trigger.
    pub async fn settled(&self) {
        loop {
            let deadline = self.deadline.lock().ok().and_then(|d| *d);
            match deadline {
                None => return,
                Some(at) if Instant::now() >= at => return,
                Some(at) => sleep_until(at).await,
            }
        }
    }
}
