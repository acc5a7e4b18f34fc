//! Shared primitive types used across the entire game.

/// Stable catalog key for an upgrade, e.g. `"cursor"`.
pub type UpgradeId = String;

/// Wall-clock milliseconds as seen by the session driver.
/// Only differences between two values are meaningful.
pub type Millis = u64;

/// An amount of currency. Fractional values come from continuous accrual.
pub type Amount = f64;
