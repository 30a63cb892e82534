use std::fmt::Display;
use std::thread;
use std::time::Duration;
use log::{debug, warn};

/// Bounded patience: how many times to try, how long each try may wait,
/// and how long to rest between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub timeout: Duration,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, timeout: Duration, delay: Duration) -> Self {
        RetryPolicy { attempts, timeout, delay }
    }

    /// Same attempt count, no waiting at all.
    pub fn instant(attempts: u32) -> Self {
        RetryPolicy::new(attempts, Duration::ZERO, Duration::ZERO)
    }
}

pub fn pause(label: &str, duration: Duration) {
    if duration.is_zero() {
        return;
    }
    debug!("Waiting {:.1}s ({})...", duration.as_secs_f32(), label);
    thread::sleep(duration);
}

/// Runs `op` until it succeeds or `policy.attempts` is used up.
///
/// `op` receives the per-attempt timeout. Failures are logged and never
/// propagated: exhaustion yields `None`, which callers treat as a normal
/// terminal signal.
pub fn with_retries<T, E, F>(label: &str, policy: &RetryPolicy, mut op: F) -> Option<T>
where
    E: Display,
    F: FnMut(Duration) -> Result<T, E>,
{
    for attempt in 1..=policy.attempts {
        match op(policy.timeout) {
            Ok(value) => return Some(value),
            Err(e) => {
                warn!("{} failed (attempt {}/{}): {}", label, attempt, policy.attempts, e);
                if attempt < policy.attempts {
                    pause(label, policy.delay);
                }
            }
        }
    }
    None
}
