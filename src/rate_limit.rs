use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::clock::{Clock, duration_ms};
use crate::models::FeatureType;
use crate::store::KeyValueStore;

/// Minimum spacing between submissions of the same feature: 5 minutes.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

pub fn rate_limit_key(feature: FeatureType) -> String {
    format!("rateLimit_{}", feature)
}

// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Throttled { remaining_secs: u64 },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }

    pub fn remaining_secs(&self) -> Option<u64> {
        match self {
            Admission::Allowed => None,
            Admission::Throttled { remaining_secs } => Some(*remaining_secs),
        }
    }
}

/// One submission per feature per cooldown window, tracked by the last
/// admitted timestamp in the shared store.
///
/// `check` never writes. Concurrent callers should go through `try_admit`,
/// which checks and records under one lock so two submissions racing for the
/// same window cannot both get in.
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    cooldown_ms: i64,
    admission: Mutex<()>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            cooldown_ms: duration_ms(DEFAULT_COOLDOWN),
            admission: Mutex::new(()),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown_ms = duration_ms(cooldown);
        self
    }

    fn last_request_at(&self, feature: FeatureType) -> Option<i64> {
        let key = rate_limit_key(feature);
        match self.store.get(&key) {
            Ok(Some(raw)) => match raw.trim().parse::<i64>() {
                Ok(at) => Some(at),
                Err(_) => {
                    warn!(%key, value = %raw, "ignoring unreadable rate limit record");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(%key, error = %e, "rate limit read failed");
                None
            }
        }
    }

    pub fn check(&self, feature: FeatureType) -> Admission {
        let Some(last) = self.last_request_at(feature) else {
            return Admission::Allowed;
        };

        let elapsed = self.clock.now_ms().saturating_sub(last);
        if elapsed < 0 {
            warn!(%feature, last, "ignoring rate limit record dated in the future");
            return Admission::Allowed;
        }
        if elapsed >= self.cooldown_ms {
            return Admission::Allowed;
        }

        let remaining_ms = self.cooldown_ms.saturating_sub(elapsed).unsigned_abs();
        let remaining_secs = remaining_ms.div_ceil(1000);
        debug!(%feature, remaining_secs, "submission throttled");
        Admission::Throttled { remaining_secs }
    }

    pub fn record(&self, feature: FeatureType) {
        let key = rate_limit_key(feature);
        let now = self.clock.now_ms();
        if let Err(e) = self.store.set(&key, &now.to_string()) {
            warn!(%key, error = %e, "failed to record rate limit timestamp");
        }
    }

    /// `check`, then `record` if allowed, as one step.
    pub fn try_admit(&self, feature: FeatureType) -> Admission {
        let _guard = self.admission.lock();
        let admission = self.check(feature);
        if admission.is_allowed() {
            self.record(feature);
        }
        admission
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// "1 minute 5 seconds", "2 minutes 0 seconds", or just "5 seconds" under a minute.
pub fn format_remaining(seconds: u64) -> String {
    let minutes = seconds / 60;
    let secs = seconds % 60;
    if minutes > 0 {
        format!("{} {}", plural(minutes, "minute"), plural(secs, "second"))
    } else {
        plural(secs, "second")
    }
}
