use crate::{
    error::{ClickerError, ClickerResult},
    types::{Amount, Millis},
};
use serde::{Deserialize, Serialize};

pub const COST_INCREASE_FACTOR: f64 = 1.15;
pub const CLICK_REWARD: Amount = 1.0;
pub const GAME_TICK_INTERVAL_MS: Millis = 1000;
pub const SAVE_INTERVAL_MS: Millis = 5000;
/// Ceiling on units of one upgrade. At 1.15 growth the price overflows
/// to infinity near 5,100 units, so no played game gets here.
pub const MAX_OWNED_COUNT: u32 = 10_000;
/// 50 ms before the float-up starts, then a 1 s fade.
pub const FEEDBACK_LIFETIME_MS: Millis = 1050;

pub const BALANCE_KEY: &str = "cookieClicker_cookies";
pub const UPGRADES_KEY: &str = "cookieClicker_upgrades";

/// How the accrual timer converts a fire into elapsed milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccrualMode {
    /// Every fire credits exactly one nominal interval.
    #[default]
    Nominal,
    /// Every fire credits the wall time since the previous fire.
    Measured,
}

/// Tunable game constants. Every field falls back to its default
/// when absent from a config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub growth_factor:        f64,
    pub base_action_reward:   Amount,
    pub accrual_interval_ms:  Millis,
    pub save_interval_ms:     Millis,
    pub feedback_lifetime_ms: Millis,
    pub accrual_mode:         AccrualMode,
    pub balance_key:          String,
    pub upgrades_key:         String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            growth_factor:        COST_INCREASE_FACTOR,
            base_action_reward:   CLICK_REWARD,
            accrual_interval_ms:  GAME_TICK_INTERVAL_MS,
            save_interval_ms:     SAVE_INTERVAL_MS,
            feedback_lifetime_ms: FEEDBACK_LIFETIME_MS,
            accrual_mode:         AccrualMode::Nominal,
            balance_key:          BALANCE_KEY.to_string(),
            upgrades_key:         UPGRADES_KEY.to_string(),
        }
    }
}

impl GameConfig {
    /// Load from a JSON file and validate.
    /// Without a file, use GameConfig::default().
    pub fn load(path: &str) -> ClickerResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: GameConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ClickerResult<()> {
        let reason = if !(self.growth_factor.is_finite() && self.growth_factor > 1.0) {
            Some(format!("growth_factor must be > 1, got {}", self.growth_factor))
        } else if !(self.base_action_reward.is_finite() && self.base_action_reward > 0.0) {
            Some(format!(
                "base_action_reward must be > 0, got {}",
                self.base_action_reward
            ))
        } else if self.accrual_interval_ms == 0 {
            Some("accrual_interval_ms must be > 0".to_string())
        } else if self.save_interval_ms == 0 {
            Some("save_interval_ms must be > 0".to_string())
        } else if self.balance_key.is_empty() || self.upgrades_key.is_empty() {
            Some("store keys must not be empty".to_string())
        } else if self.balance_key == self.upgrades_key {
            Some(format!("store keys must differ, both are '{}'", self.balance_key))
        } else {
            None
        };

        match reason {
            Some(reason) => {
                log::warn!("rejected config: {reason}");
                Err(ClickerError::InvalidConfig { reason })
            }
            None => Ok(()),
        }
    }
}
