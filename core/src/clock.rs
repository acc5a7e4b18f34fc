//! Cooperative interval timers: the accrual and autosave cadences.
//!
//! Timers never block or spawn anything. The owner polls them with the
//! current wall time and they report whether (and for how long) they fired.

use crate::{config::AccrualMode, types::Millis};
use serde::{Deserialize, Serialize};

/// One poll's worth of firing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerFire {
    /// Number of intervals that came due since the last fire.
    pub count:      u32,
    /// Milliseconds to credit for this fire.
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntervalTimer {
    pub interval_ms: Millis,
    pub mode:        AccrualMode,
    last_fire_ms:    Millis,
    next_due_ms:     Millis,
    cancelled:       bool,
}

impl IntervalTimer {
    /// Arm a timer that first fires one interval after `now_ms`.
    pub fn start(interval_ms: Millis, mode: AccrualMode, now_ms: Millis) -> Self {
        let interval_ms = interval_ms.max(1);
        Self {
            interval_ms,
            mode,
            last_fire_ms: now_ms,
            next_due_ms: now_ms.saturating_add(interval_ms),
            cancelled: false,
        }
    }

    /// Fire if due. Nominal timers catch up by whole intervals;
    /// measured timers fire once and credit the real gap.
    pub fn poll(&mut self, now_ms: Millis) -> Option<TimerFire> {
        if self.cancelled || now_ms < self.next_due_ms {
            return None;
        }

        match self.mode {
            AccrualMode::Nominal => {
                let overdue = now_ms - self.next_due_ms;
                let count = 1 + overdue / self.interval_ms;
                let advanced = count * self.interval_ms;
                self.last_fire_ms = self.last_fire_ms.saturating_add(advanced);
                self.next_due_ms = self.next_due_ms.saturating_add(advanced);
                Some(TimerFire {
                    count:      u32::try_from(count).unwrap_or(u32::MAX),
                    elapsed_ms: advanced as f64,
                })
            }
            AccrualMode::Measured => {
                let elapsed = now_ms - self.last_fire_ms;
                self.last_fire_ms = now_ms;
                self.next_due_ms = now_ms.saturating_add(self.interval_ms);
                Some(TimerFire {
                    count:      1,
                    elapsed_ms: elapsed as f64,
                })
            }
        }
    }

    pub fn cancel(&mut self) { self.cancelled = true; }
    pub fn is_cancelled(&self) -> bool { self.cancelled }
    pub fn next_due_ms(&self) -> Millis { self.next_due_ms }
}
