//! Upgrade catalog: immutable reference data.
//!
//! The catalog is the single list of everything a player can buy.
//! Order matters: it is the display order and the order of the
//! reconciled upgrade state after a load.

use crate::{
    error::{ClickerError, ClickerResult},
    types::{Amount, UpgradeId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What owning one unit of an upgrade contributes to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EffectClass {
    /// Adds to currency gained per second.
    #[serde(rename = "cps")]
    RateBoost,
    /// Adds to currency gained per manual action.
    #[serde(rename = "click")]
    ActionBoost,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeDefinition {
    pub id:                UpgradeId,
    pub name:              String,
    pub icon:              String,
    pub base_cost:         Amount,
    #[serde(rename = "effectType")]
    pub effect_class:      EffectClass,
    pub base_effect_value: Amount,
    pub description:       String,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    upgrades: Vec<UpgradeDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeCatalog {
    definitions: Vec<UpgradeDefinition>,
}

impl UpgradeCatalog {
    /// Build a catalog, rejecting duplicate ids, base costs below 1
    /// and non-positive effects.
    pub fn new(definitions: Vec<UpgradeDefinition>) -> ClickerResult<Self> {
        let mut seen = HashSet::new();
        for def in &definitions {
            if def.id.is_empty() {
                return Err(invalid("upgrade id must not be empty".to_string()));
            }
            if !seen.insert(def.id.as_str()) {
                return Err(invalid(format!("duplicate upgrade id '{}'", def.id)));
            }
            // Floored costs must never reach zero.
            if !(def.base_cost.is_finite() && def.base_cost >= 1.0) {
                return Err(invalid(format!(
                    "upgrade '{}' has base cost below 1: {}",
                    def.id, def.base_cost
                )));
            }
            if !(def.base_effect_value.is_finite() && def.base_effect_value > 0.0) {
                return Err(invalid(format!(
                    "upgrade '{}' has non-positive effect {}",
                    def.id, def.base_effect_value
                )));
            }
        }
        Ok(Self { definitions })
    }

    /// Parse a `{ "upgrades": [...] }` document.
    pub fn from_json(json: &str) -> ClickerResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.upgrades)
    }

    pub fn load(path: &str) -> ClickerResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Self::from_json(&content)
    }

    pub fn definitions(&self) -> &[UpgradeDefinition] {
        &self.definitions
    }

    pub fn get(&self, id: &str) -> Option<&UpgradeDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.definitions.iter().position(|d| d.id == id)
    }

    pub fn by_class(&self, class: EffectClass) -> impl Iterator<Item = &UpgradeDefinition> {
        self.definitions.iter().filter(move |d| d.effect_class == class)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The standard fourteen upgrades: seven generators, seven click boosters.
    pub fn builtin() -> Self {
        use EffectClass::{ActionBoost, RateBoost};

        let table: [(&str, &str, &str, Amount, EffectClass, Amount, &str); 14] = [
            ("cursor", "Auto-Clicker", "🖱️", 15.0, RateBoost, 1.0,
                "Clicks the cookie for you."),
            ("grandma", "Grandma", "👵", 100.0, RateBoost, 5.0,
                "Bakes cookies with love."),
            ("farm", "Cookie Farm", "🌾", 1_100.0, RateBoost, 40.0,
                "Grows cookie plants."),
            ("mine", "Cookie Mine", "⛏️", 12_000.0, RateBoost, 250.0,
                "Extracts raw cookie dough."),
            ("factory", "Cookie Factory", "🏭", 130_000.0, RateBoost, 1_500.0,
                "Mass produces cookies."),
            ("bank", "Cookie Bank", "🏦", 1_400_000.0, RateBoost, 10_000.0,
                "Generates interest in cookies."),
            ("temple", "Cookie Temple", "🏯", 20_000_000.0, RateBoost, 75_000.0,
                "Pray for more cookies."),
            ("reinforcedFinger", "Reinforced Finger", "💪", 50.0, ActionBoost, 1.0,
                "Your clicks are stronger."),
            ("steelMouse", "Steel-Tipped Mouse", "🖱️✨", 500.0, ActionBoost, 5.0,
                "State-of-the-art clicking tech."),
            ("multiplierWand", "Cookie Multiplier Wand", "✨🪄", 10_000.0, ActionBoost, 50.0,
                "Magically multiplies cookies on click."),
            ("goldenKnuckles", "Golden Knuckles", "✊🌟", 150_000.0, ActionBoost, 250.0,
                "Feel the Midas touch in every click."),
            ("gemEncrustedClicker", "Gem-Encrusted Clicker", "💎🖱️", 2_000_000.0, ActionBoost, 1_200.0,
                "Clicks with the brilliance of a thousand gems."),
            ("cosmicClickRay", "Cosmic Click Ray", "🌌🔫", 30_000_000.0, ActionBoost, 8_000.0,
                "Harness cosmic energy for unimaginable clicks."),
            ("realityBendingClick", "Reality Bending Click", "🌀👆", 500_000_000.0, ActionBoost, 50_000.0,
                "Clicks so powerful, they warp reality (and bake cookies)."),
        ];

        let definitions = table
            .into_iter()
            .map(|(id, name, icon, base_cost, effect_class, base_effect_value, description)| {
                UpgradeDefinition {
                    id: id.to_string(),
                    name: name.to_string(),
                    icon: icon.to_string(),
                    base_cost,
                    effect_class,
                    base_effect_value,
                    description: description.to_string(),
                }
            })
            .collect();

        Self { definitions }
    }
}

impl Default for UpgradeCatalog {
    fn default() -> Self { Self::builtin() }
}

fn invalid(reason: String) -> ClickerError {
    ClickerError::InvalidCatalog { reason }
}
