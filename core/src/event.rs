//! Everything that happens during a session, in the order it happened.
//!
//! The session returns these to the presentation layer so it can render
//! feedback without re-deriving engine internals.

use crate::{
    persistence::RestoreReport,
    types::{Amount, Millis, UpgradeId},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    // ── Lifecycle ──────────────────────────────────
    SessionStarted {
        at_ms:  Millis,
        report: RestoreReport,
    },
    SessionEnded {
        at_ms: Millis,
    },

    // ── Player actions ─────────────────────────────
    ActionApplied {
        credited:  Amount,
        marker_id: Uuid,
    },
    UpgradePurchased {
        id:          UpgradeId,
        price:       Amount,
        owned_count: u32,
        next_cost:   Amount,
    },
    PurchaseRejected {
        id:     UpgradeId,
        reason: String,
    },

    // ── Timers ─────────────────────────────────────
    AccrualApplied {
        elapsed_ms: f64,
        credited:   Amount,
    },
    StateSaved {
        at: DateTime<Utc>,
    },
    SaveFailed {
        reason: String,
    },
    MarkersExpired {
        count: usize,
    },
}
