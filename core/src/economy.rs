//! The economy engine: balance, owned upgrades, and the rules that move them.
//!
//! RULES:
//!   - State is mutated only by apply_action, apply_accrual, purchase and restore.
//!   - Derived values (rate, action value) are recomputed on demand, never cached.
//!   - Upgrade state is kept in catalog order, one entry per definition.
//!   - A purchase charges the price in effect BEFORE the purchase, then
//!     recomputes the price from the incremented owned count.

use crate::{
    catalog::{EffectClass, UpgradeCatalog, UpgradeDefinition},
    config::{GameConfig, MAX_OWNED_COUNT},
    persistence::RestoredState,
    types::{Amount, UpgradeId},
};
use serde::{Deserialize, Serialize};

/// Price of the next unit when `owned` units are already held.
pub fn cost_at(base_cost: Amount, growth_factor: f64, owned: u32) -> Amount {
    (base_cost * growth_factor.powf(f64::from(owned))).floor()
}

/// Sum of every price paid to go from zero to `owned` units.
pub fn spent_on(base_cost: Amount, growth_factor: f64, owned: u32) -> Amount {
    (0..owned).map(|i| cost_at(base_cost, growth_factor, i)).sum()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeState {
    pub id:           UpgradeId,
    pub owned_count:  u32,
    pub current_cost: Amount,
}

impl UpgradeState {
    pub fn fresh(def: &UpgradeDefinition) -> Self {
        Self {
            id:           def.id.clone(),
            owned_count:  0,
            current_cost: def.base_cost,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EconomyState {
    pub balance:  Amount,
    pub upgrades: Vec<UpgradeState>,
}

impl EconomyState {
    pub fn fresh(catalog: &UpgradeCatalog) -> Self {
        Self {
            balance:  0.0,
            upgrades: catalog.definitions().iter().map(UpgradeState::fresh).collect(),
        }
    }
}

/// Result of a purchase attempt. Rejections leave state untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PurchaseOutcome {
    Purchased {
        id:          UpgradeId,
        price:       Amount,
        owned_count: u32,
        next_cost:   Amount,
    },
    InsufficientFunds {
        id:      UpgradeId,
        price:   Amount,
        balance: Amount,
    },
    UnknownUpgrade {
        id: UpgradeId,
    },
    LimitReached {
        id:          UpgradeId,
        owned_count: u32,
    },
}

impl PurchaseOutcome {
    pub fn is_purchased(&self) -> bool {
        matches!(self, PurchaseOutcome::Purchased { .. })
    }
}

/// Read-only projection of one upgrade for display.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeView {
    pub id:                UpgradeId,
    pub name:              String,
    pub icon:              String,
    pub description:       String,
    pub effect_class:      EffectClass,
    pub base_effect_value: Amount,
    pub owned_count:       u32,
    pub current_cost:      Amount,
    pub affordable:        bool,
}

pub struct EconomyEngine {
    catalog:            UpgradeCatalog,
    growth_factor:      f64,
    base_action_reward: Amount,
    state:              EconomyState,
}

impl EconomyEngine {
    /// Fresh engine: zero balance, nothing owned.
    pub fn new(catalog: UpgradeCatalog, config: &GameConfig) -> Self {
        let state = EconomyState::fresh(&catalog);
        Self {
            catalog,
            growth_factor: config.growth_factor,
            base_action_reward: config.base_action_reward,
            state,
        }
    }

    pub fn catalog(&self) -> &UpgradeCatalog { &self.catalog }
    pub fn state(&self) -> &EconomyState { &self.state }
    pub fn balance(&self) -> Amount { self.state.balance }
    pub fn growth_factor(&self) -> f64 { self.growth_factor }

    pub fn upgrade(&self, id: &str) -> Option<&UpgradeState> {
        self.state.upgrades.iter().find(|u| u.id == id)
    }

    /// Catalog definitions paired with their live state.
    fn owned(&self) -> impl Iterator<Item = (&UpgradeDefinition, &UpgradeState)> {
        self.catalog.definitions().iter().zip(self.state.upgrades.iter())
    }

    fn boost_sum(&self, class: EffectClass) -> Amount {
        self.owned()
            .filter(|(def, _)| def.effect_class == class)
            .map(|(def, st)| f64::from(st.owned_count) * def.base_effect_value)
            .sum()
    }

    /// Currency gained per second.
    pub fn derived_rate(&self) -> Amount {
        self.boost_sum(EffectClass::RateBoost)
    }

    /// Currency gained per manual action.
    pub fn derived_action_value(&self) -> Amount {
        self.base_action_reward + self.boost_sum(EffectClass::ActionBoost)
    }

    /// Credit one manual action. Returns the amount credited.
    pub fn apply_action(&mut self) -> Amount {
        let credited = self.derived_action_value();
        self.state.balance += credited;
        credited
    }

    /// Credit `elapsed_ms` of production at the current rate. Not floored.
    /// Negative or non-finite elapsed time credits nothing.
    pub fn apply_accrual(&mut self, elapsed_ms: f64) -> Amount {
        if !(elapsed_ms.is_finite() && elapsed_ms > 0.0) {
            return 0.0;
        }
        let credited = self.derived_rate() * elapsed_ms / 1000.0;
        self.state.balance += credited;
        credited
    }

    pub fn can_afford(&self, id: &str) -> bool {
        self.upgrade(id)
            .is_some_and(|u| self.state.balance >= u.current_cost)
    }

    pub fn purchase(&mut self, id: &str) -> PurchaseOutcome {
        let Some(index) = self.catalog.position(id) else {
            log::debug!("purchase rejected: unknown upgrade '{id}'");
            return PurchaseOutcome::UnknownUpgrade { id: id.to_string() };
        };
        let base_cost = self.catalog.definitions()[index].base_cost;
        let balance = self.state.balance;
        let upgrade = &mut self.state.upgrades[index];

        let Some(next_owned) = upgrade
            .owned_count
            .checked_add(1)
            .filter(|n| *n <= MAX_OWNED_COUNT)
        else {
            log::debug!("purchase rejected: '{id}' already at {} owned", upgrade.owned_count);
            return PurchaseOutcome::LimitReached {
                id:          id.to_string(),
                owned_count: upgrade.owned_count,
            };
        };

        let price = upgrade.current_cost;
        if balance < price {
            log::debug!("purchase rejected: '{id}' costs {price}, balance {balance:.2}");
            return PurchaseOutcome::InsufficientFunds {
                id: id.to_string(),
                price,
                balance,
            };
        }

        // Charge the old price first, then grow the price from the new count.
        self.state.balance = balance - price;
        upgrade.owned_count = next_owned;
        upgrade.current_cost = cost_at(base_cost, self.growth_factor, upgrade.owned_count);

        log::debug!(
            "purchased '{id}' for {price}: owned={} next_cost={}",
            upgrade.owned_count,
            upgrade.current_cost
        );

        PurchaseOutcome::Purchased {
            id: id.to_string(),
            price,
            owned_count: upgrade.owned_count,
            next_cost: upgrade.current_cost,
        }
    }

    /// Current balance plus every historical purchase price, recomputed
    /// from owned counts.
    pub fn total_ever_earned(&self) -> Amount {
        let spent: Amount = self
            .owned()
            .map(|(def, st)| spent_on(def.base_cost, self.growth_factor, st.owned_count))
            .sum();
        self.state.balance + spent
    }

    pub fn upgrade_views(&self) -> Vec<UpgradeView> {
        self.owned()
            .map(|(def, st)| UpgradeView {
                id:                def.id.clone(),
                name:              def.name.clone(),
                icon:              def.icon.clone(),
                description:       def.description.clone(),
                effect_class:      def.effect_class,
                base_effect_value: def.base_effect_value,
                owned_count:       st.owned_count,
                current_cost:      st.current_cost,
                affordable:        self.state.balance >= st.current_cost,
            })
            .collect()
    }

    /// Replace state with a reconciled restore. Upgrades are replaced
    /// only when they line up with this engine's catalog; balance only
    /// when one was recovered.
    pub fn restore(&mut self, restored: RestoredState) {
        let (balance, upgrades) = restored.into_parts();
        if let Some(balance) = balance {
            self.state.balance = balance;
        }

        let aligned = upgrades.len() == self.catalog.len()
            && self.catalog.definitions().iter().zip(&upgrades).all(|(d, u)| d.id == u.id);
        if aligned {
            self.state.upgrades = upgrades;
        } else {
            log::warn!("restore skipped: upgrades were reconciled against a different catalog");
        }
    }
}
