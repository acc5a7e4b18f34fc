//! Save/load of economy state through a key-value store.
//!
//! Layout (two keys, no version field):
//!   balance key  → decimal string of the balance
//!   upgrades key → JSON array of `{ ...catalog definition, owned, currentCost }`
//!
//! Schema evolution relies entirely on reconciliation against the current
//! catalog: stale ids are dropped, missing ids are synthesized fresh, and
//! saved `owned`/`currentCost` take precedence over catalog defaults.
//!
//! RULE: load never fails. Malformed data is logged and replaced by the
//! fresh baseline, for the upgrades mapping only, independently of balance.

use crate::{
    catalog::{UpgradeCatalog, UpgradeDefinition},
    config::{GameConfig, MAX_OWNED_COUNT},
    economy::{cost_at, EconomyEngine, UpgradeState},
    error::ClickerResult,
    store::KvStore,
    types::{Amount, UpgradeId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedUpgradeOut<'a> {
    #[serde(flatten)]
    definition:   &'a UpgradeDefinition,
    owned:        u32,
    current_cost: Amount,
}

/// What we need back from a saved entry. Display fields are ignored;
/// they come from the current catalog.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedUpgradeRecord {
    id:           UpgradeId,
    #[serde(default, alias = "ownedCount")]
    owned:        Option<u32>,
    #[serde(default)]
    current_cost: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BalanceRestore {
    Absent,
    Restored { balance: Amount },
    Invalid { raw: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpgradesRestore {
    Absent,
    Restored {
        dropped:     Vec<UpgradeId>,
        synthesized: Vec<UpgradeId>,
    },
    Malformed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreReport {
    pub balance:  BalanceRestore,
    pub upgrades: UpgradesRestore,
}

/// Reconciled state ready for `EconomyEngine::restore`.
/// Upgrades are always complete and in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredState {
    balance:  Option<Amount>,
    upgrades: Vec<UpgradeState>,
    report:   RestoreReport,
}

impl RestoredState {
    pub fn balance(&self) -> Option<Amount> { self.balance }
    pub fn upgrades(&self) -> &[UpgradeState] { &self.upgrades }
    pub fn report(&self) -> &RestoreReport { &self.report }

    pub(crate) fn into_parts(self) -> (Option<Amount>, Vec<UpgradeState>) {
        (self.balance, self.upgrades)
    }
}

pub struct PersistenceAdapter {
    balance_key:   String,
    upgrades_key:  String,
    growth_factor: f64,
}

impl PersistenceAdapter {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            balance_key:   config.balance_key.clone(),
            upgrades_key:  config.upgrades_key.clone(),
            growth_factor: config.growth_factor,
        }
    }

    /// Write balance and upgrades under the two fixed keys.
    pub fn save<S: KvStore + ?Sized>(&self, store: &S, engine: &EconomyEngine) -> ClickerResult<()> {
        let entries: Vec<SavedUpgradeOut<'_>> = engine
            .catalog()
            .definitions()
            .iter()
            .zip(&engine.state().upgrades)
            .map(|(definition, st)| SavedUpgradeOut {
                definition,
                owned:        st.owned_count,
                current_cost: st.current_cost,
            })
            .collect();

        store.set(&self.balance_key, &engine.balance().to_string())?;
        store.set(&self.upgrades_key, &serde_json::to_string(&entries)?)?;
        log::debug!("saved balance={} upgrades={}", engine.balance(), entries.len());
        Ok(())
    }

    /// Read both keys and reconcile against `catalog`. Never fails.
    pub fn load<S: KvStore + ?Sized>(&self, store: &S, catalog: &UpgradeCatalog) -> RestoredState {
        let (balance, balance_report) = match read_key(store, &self.balance_key) {
            None => (None, BalanceRestore::Absent),
            Some(raw) => match parse_balance(&raw) {
                Some(balance) => (Some(balance), BalanceRestore::Restored { balance }),
                None => {
                    log::warn!("ignoring invalid saved balance {raw:?}");
                    (None, BalanceRestore::Invalid { raw })
                }
            },
        };

        let (upgrades, upgrades_report) = match read_key(store, &self.upgrades_key) {
            None => (fresh_upgrades(catalog), UpgradesRestore::Absent),
            Some(raw) => match self.reconcile(&raw, catalog) {
                Ok((upgrades, dropped, synthesized)) => {
                    if !dropped.is_empty() {
                        log::info!("dropped stale saved upgrades: {dropped:?}");
                    }
                    (upgrades, UpgradesRestore::Restored { dropped, synthesized })
                }
                Err(reason) => {
                    log::warn!("failed to parse saved upgrades, starting fresh: {reason}");
                    (fresh_upgrades(catalog), UpgradesRestore::Malformed { reason })
                }
            },
        };

        RestoredState {
            balance,
            upgrades,
            report: RestoreReport {
                balance:  balance_report,
                upgrades: upgrades_report,
            },
        }
    }

    /// Merge saved entries with the catalog.
    /// Returns (upgrades in catalog order, dropped ids, synthesized ids).
    fn reconcile(
        &self,
        raw: &str,
        catalog: &UpgradeCatalog,
    ) -> Result<(Vec<UpgradeState>, Vec<UpgradeId>, Vec<UpgradeId>), String> {
        let records: Vec<SavedUpgradeRecord> =
            serde_json::from_str(raw).map_err(|e| e.to_string())?;

        let mut saved: HashMap<UpgradeId, (u32, Option<Amount>)> = HashMap::new();
        let mut dropped = Vec::new();

        for record in records {
            // Stale and duplicate entries are dropped whatever they hold.
            if catalog.get(&record.id).is_none() || saved.contains_key(&record.id) {
                dropped.push(record.id);
                continue;
            }
            if let Some(cost) = record.current_cost {
                if !(cost.is_finite() && cost > 0.0) {
                    return Err(format!("upgrade '{}' has invalid cost {cost}", record.id));
                }
            }
            let owned = record.owned.unwrap_or(0);
            if owned > MAX_OWNED_COUNT {
                return Err(format!("upgrade '{}' has unreachable owned count {owned}", record.id));
            }
            saved.insert(record.id, (owned, record.current_cost));
        }

        let mut synthesized = Vec::new();
        let upgrades = catalog
            .definitions()
            .iter()
            .map(|def| match saved.remove(&def.id) {
                Some((owned_count, cost)) => UpgradeState {
                    id: def.id.clone(),
                    owned_count,
                    current_cost: cost
                        .unwrap_or_else(|| cost_at(def.base_cost, self.growth_factor, owned_count)),
                },
                None => {
                    synthesized.push(def.id.clone());
                    UpgradeState::fresh(def)
                }
            })
            .collect();

        Ok((upgrades, dropped, synthesized))
    }
}

fn read_key<S: KvStore + ?Sized>(store: &S, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("failed to read '{key}' from store: {e}");
            None
        }
    }
}

fn parse_balance(raw: &str) -> Option<Amount> {
    raw.trim()
        .parse::<Amount>()
        .ok()
        .filter(|b| b.is_finite() && *b >= 0.0)
}

fn fresh_upgrades(catalog: &UpgradeCatalog) -> Vec<UpgradeState> {
    catalog.definitions().iter().map(UpgradeState::fresh).collect()
}
