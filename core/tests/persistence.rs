//! Persistence tests: save layout, round-trip, and reconciliation on load.

use clicker_core::{
    catalog::UpgradeCatalog,
    config::{GameConfig, BALANCE_KEY, MAX_OWNED_COUNT, UPGRADES_KEY},
    economy::EconomyEngine,
    error::{ClickerError, ClickerResult},
    persistence::{BalanceRestore, PersistenceAdapter, UpgradesRestore},
    store::{KvStore, SqliteStore},
};

fn store() -> SqliteStore {
    let store = SqliteStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn adapter() -> PersistenceAdapter {
    PersistenceAdapter::new(&GameConfig::default())
}

fn engine() -> EconomyEngine {
    EconomyEngine::new(UpgradeCatalog::builtin(), &GameConfig::default())
}

/// Earn with clicks, then buy a mix of upgrades and accrue a fractional amount.
fn played_engine() -> EconomyEngine {
    let mut engine = engine();
    for _ in 0..700 {
        engine.apply_action();
    }
    for id in ["cursor", "cursor", "grandma", "reinforcedFinger", "cursor", "grandma"] {
        assert!(engine.purchase(id).is_purchased());
    }
    engine.apply_accrual(1234.5);
    engine
}

#[test]
fn save_writes_the_two_keys() {
    let store = store();
    let engine = played_engine();

    adapter().save(&store, &engine).unwrap();

    assert_eq!(store.keys().unwrap(), vec![BALANCE_KEY.to_string(), UPGRADES_KEY.to_string()]);
    assert_eq!(store.get(BALANCE_KEY).unwrap().unwrap(), engine.balance().to_string());

    let upgrades: serde_json::Value =
        serde_json::from_str(&store.get(UPGRADES_KEY).unwrap().unwrap()).unwrap();
    let entries = upgrades.as_array().unwrap();
    assert_eq!(entries.len(), 14);

    let cursor = &entries[0];
    assert_eq!(cursor["id"], "cursor");
    assert_eq!(cursor["owned"], 3);
    assert_eq!(cursor["currentCost"], 22.0);
    assert_eq!(cursor["baseCost"], 15.0);
    assert_eq!(cursor["effectType"], "cps");
    assert_eq!(cursor["name"], "Auto-Clicker");
}

/// load(save(state)) reproduces balance and every (owned, cost) exactly.
#[test]
fn round_trip_is_exact() {
    let store = store();
    let original = played_engine();
    adapter().save(&store, &original).unwrap();

    let restored = adapter().load(&store, &UpgradeCatalog::builtin());
    let mut reloaded = engine();
    reloaded.restore(restored);

    assert_eq!(reloaded.balance(), original.balance());
    assert_eq!(reloaded.state(), original.state());
    assert_eq!(reloaded.derived_rate(), original.derived_rate());
}

#[test]
fn round_trip_through_a_file_database() {
    let path = std::env::temp_dir().join(format!("clicker-roundtrip-{}.db", std::process::id()));
    let path_str = path.to_str().unwrap().to_string();
    let _ = std::fs::remove_file(&path);

    let original = played_engine();
    {
        let store = SqliteStore::open(&path_str).unwrap();
        store.migrate().unwrap();
        adapter().save(&store, &original).unwrap();

        let reopened = store.reopen().unwrap();
        let restored = adapter().load(&reopened, &UpgradeCatalog::builtin());
        let mut reloaded = engine();
        reloaded.restore(restored);
        assert_eq!(reloaded.state(), original.state());
    }

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(path.with_extension("db-wal"));
    let _ = std::fs::remove_file(path.with_extension("db-shm"));
}

#[test]
fn empty_store_loads_fresh_baseline() {
    let store = store();
    let catalog = UpgradeCatalog::builtin();

    let restored = adapter().load(&store, &catalog);

    assert_eq!(restored.balance(), None);
    assert_eq!(restored.report().balance, BalanceRestore::Absent);
    assert_eq!(restored.report().upgrades, UpgradesRestore::Absent);
    assert_eq!(restored.upgrades().len(), catalog.len());
    assert!(restored.upgrades().iter().all(|u| u.owned_count == 0));
}

/// A saved id missing from the catalog is dropped; count equals the catalog's.
#[test]
fn stale_ids_are_dropped() {
    let store = store();
    store.set(
        UPGRADES_KEY,
        r#"[
            {"id":"cursor","owned":2,"currentCost":19},
            {"id":"wizardTower","owned":7,"currentCost":900000},
            {"id":"grandma","owned":1,"currentCost":115}
        ]"#,
    ).unwrap();
    let catalog = UpgradeCatalog::builtin();

    let restored = adapter().load(&store, &catalog);

    assert_eq!(restored.upgrades().len(), catalog.len());
    assert!(restored.upgrades().iter().all(|u| u.id != "wizardTower"));
    match &restored.report().upgrades {
        UpgradesRestore::Restored { dropped, synthesized } => {
            assert_eq!(dropped, &vec!["wizardTower".to_string()]);
            assert_eq!(synthesized.len(), catalog.len() - 2);
        }
        other => panic!("expected Restored, got {other:?}"),
    }

    let cursor = &restored.upgrades()[0];
    assert_eq!((cursor.owned_count, cursor.current_cost), (2, 19.0));
}

/// Catalog entries absent from the save are synthesized fresh, in catalog order.
#[test]
fn missing_ids_are_synthesized_in_catalog_order() {
    let store = store();
    store.set(UPGRADES_KEY, r#"[{"id":"temple","owned":1,"currentCost":23000000}]"#).unwrap();
    let catalog = UpgradeCatalog::builtin();

    let restored = adapter().load(&store, &catalog);

    let ids: Vec<&str> = restored.upgrades().iter().map(|u| u.id.as_str()).collect();
    let catalog_ids: Vec<&str> = catalog.definitions().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, catalog_ids);

    for (def, st) in catalog.definitions().iter().zip(restored.upgrades()) {
        if def.id == "temple" {
            assert_eq!((st.owned_count, st.current_cost), (1, 23_000_000.0));
        } else {
            assert_eq!((st.owned_count, st.current_cost), (0, def.base_cost));
        }
    }
}

/// Saved owned/currentCost win over catalog defaults, even if they disagree
/// with the growth curve.
#[test]
fn saved_values_take_precedence() {
    let store = store();
    store.set(UPGRADES_KEY, r#"[{"id":"grandma","owned":4,"currentCost":999,"baseCost":1}]"#).unwrap();
    let catalog = UpgradeCatalog::builtin();

    let restored = adapter().load(&store, &catalog);
    let grandma = restored.upgrades().iter().find(|u| u.id == "grandma").unwrap();

    assert_eq!(grandma.owned_count, 4);
    assert_eq!(grandma.current_cost, 999.0);
}

#[test]
fn older_field_names_and_missing_cost_are_accepted() {
    let store = store();
    store.set(UPGRADES_KEY, r#"[{"id":"cursor","ownedCount":3}]"#).unwrap();

    let restored = adapter().load(&store, &UpgradeCatalog::builtin());
    let cursor = &restored.upgrades()[0];

    assert_eq!(cursor.owned_count, 3);
    assert_eq!(cursor.current_cost, 22.0, "cost recomputed from owned count");
}

/// A stale entry is dropped before its contents are checked, so junk in a
/// removed upgrade never costs the player the upgrades that still exist.
#[test]
fn stale_entry_with_bad_cost_is_dropped_not_malformed() {
    let store = store();
    store.set(
        UPGRADES_KEY,
        r#"[
            {"id":"cursor","owned":3,"currentCost":22},
            {"id":"removedThing","owned":1,"currentCost":0},
            {"id":"retiredOven","owned":1,"currentCost":-1}
        ]"#,
    ).unwrap();

    let restored = adapter().load(&store, &UpgradeCatalog::builtin());

    match &restored.report().upgrades {
        UpgradesRestore::Restored { dropped, .. } => {
            assert_eq!(dropped, &vec!["removedThing".to_string(), "retiredOven".to_string()]);
        }
        other => panic!("expected Restored, got {other:?}"),
    }
    let cursor = &restored.upgrades()[0];
    assert_eq!((cursor.owned_count, cursor.current_cost), (3, 22.0));
}

#[test]
fn unreachable_owned_count_is_malformed() {
    let store = store();
    store.set(BALANCE_KEY, "100").unwrap();
    store.set(UPGRADES_KEY, r#"[{"id":"cursor","owned":4294967295,"currentCost":15}]"#).unwrap();

    let mut engine = engine();
    engine.restore(adapter().load(&store, &UpgradeCatalog::builtin()));

    assert_eq!(engine.upgrade("cursor").unwrap().owned_count, 0);
    assert_eq!(engine.balance(), 100.0);
    assert!(engine.purchase("cursor").is_purchased());
}

#[test]
fn owned_count_at_the_ceiling_is_accepted() {
    let store = store();
    let raw = format!(r#"[{{"id":"grandma","owned":{MAX_OWNED_COUNT},"currentCost":100}}]"#);
    store.set(UPGRADES_KEY, &raw).unwrap();

    let restored = adapter().load(&store, &UpgradeCatalog::builtin());

    assert!(matches!(restored.report().upgrades, UpgradesRestore::Restored { .. }));
    let grandma = restored.upgrades().iter().find(|u| u.id == "grandma").unwrap();
    assert_eq!(grandma.owned_count, MAX_OWNED_COUNT);
}

#[test]
fn duplicate_saved_ids_keep_the_first() {
    let store = store();
    store.set(
        UPGRADES_KEY,
        r#"[{"id":"cursor","owned":1,"currentCost":17},{"id":"cursor","owned":9,"currentCost":52}]"#,
    ).unwrap();

    let restored = adapter().load(&store, &UpgradeCatalog::builtin());

    assert_eq!(restored.upgrades()[0].owned_count, 1);
    match &restored.report().upgrades {
        UpgradesRestore::Restored { dropped, .. } => assert_eq!(dropped, &vec!["cursor".to_string()]),
        other => panic!("expected Restored, got {other:?}"),
    }
}

/// Malformed upgrades fall back to fresh; a good balance still restores.
#[test]
fn malformed_upgrades_fail_closed_independently_of_balance() {
    let bad_payloads = [
        "not json at all",
        r#"{"id":"cursor"}"#,
        r#"[{"id":"cursor","owned":-1}]"#,
        r#"[{"id":"cursor","owned":1,"currentCost":0}]"#,
        r#"[{"id":"cursor","owned":1,"currentCost":-17}]"#,
        r#"[{"owned":1}]"#,
    ];
    let catalog = UpgradeCatalog::builtin();

    for payload in bad_payloads {
        let store = store();
        store.set(BALANCE_KEY, "4321.5").unwrap();
        store.set(UPGRADES_KEY, payload).unwrap();

        let restored = adapter().load(&store, &catalog);

        assert!(
            matches!(restored.report().upgrades, UpgradesRestore::Malformed { .. }),
            "payload {payload:?} gave {:?}",
            restored.report().upgrades
        );
        assert_eq!(restored.balance(), Some(4321.5));
        assert_eq!(restored.upgrades().len(), catalog.len());
        assert!(restored.upgrades().iter().all(|u| u.owned_count == 0));
    }
}

#[test]
fn invalid_balance_keeps_current_value() {
    for raw in ["", "lots", "-5", "NaN", "inf"] {
        let store = store();
        store.set(BALANCE_KEY, raw).unwrap();

        let mut engine = engine();
        engine.apply_action();
        engine.restore(adapter().load(&store, &UpgradeCatalog::builtin()));

        assert_eq!(engine.balance(), 1.0, "raw balance {raw:?}");
    }
}

#[test]
fn restored_engine_never_holds_invalid_state() {
    let store = store();
    store.set(BALANCE_KEY, "-100").unwrap();
    store.set(UPGRADES_KEY, r#"[{"id":"farm","owned":2,"currentCost":1e400}]"#).unwrap();

    let mut engine = engine();
    engine.restore(adapter().load(&store, &UpgradeCatalog::builtin()));

    assert!(engine.balance() >= 0.0);
    for st in &engine.state().upgrades {
        assert!(st.current_cost > 0.0 && st.current_cost.is_finite());
    }
}

/// A catalog that changed between save and load only keeps what still exists.
#[test]
fn load_against_a_smaller_catalog() {
    let store = store();
    adapter().save(&store, &played_engine()).unwrap();

    let small = UpgradeCatalog::new(
        UpgradeCatalog::builtin()
            .definitions()
            .iter()
            .filter(|d| d.id == "grandma" || d.id == "mine")
            .cloned()
            .collect(),
    )
    .unwrap();

    let restored = adapter().load(&store, &small);
    let mut engine = EconomyEngine::new(small, &GameConfig::default());
    engine.restore(restored);

    assert_eq!(engine.state().upgrades.len(), 2);
    assert_eq!(engine.upgrade("grandma").unwrap().owned_count, 2);
    assert_eq!(engine.upgrade("mine").unwrap().owned_count, 0);
    assert_eq!(engine.derived_rate(), 10.0);
}

struct BrokenStore;

impl KvStore for BrokenStore {
    fn get(&self, _key: &str) -> ClickerResult<Option<String>> {
        Err(ClickerError::Other(anyhow::anyhow!("disk on fire")))
    }
    fn set(&self, _key: &str, _value: &str) -> ClickerResult<()> {
        Err(ClickerError::Other(anyhow::anyhow!("disk on fire")))
    }
    fn remove(&self, _key: &str) -> ClickerResult<()> {
        Ok(())
    }
}

#[test]
fn unreadable_store_loads_fresh_and_save_reports_error() {
    let restored = adapter().load(&BrokenStore, &UpgradeCatalog::builtin());
    assert_eq!(restored.report().balance, BalanceRestore::Absent);
    assert_eq!(restored.report().upgrades, UpgradesRestore::Absent);

    assert!(adapter().save(&BrokenStore, &engine()).is_err());
}

#[test]
fn remove_clears_a_key() {
    let store = store();
    store.set(BALANCE_KEY, "10").unwrap();
    store.set(BALANCE_KEY, "20").unwrap();
    assert_eq!(store.get(BALANCE_KEY).unwrap().as_deref(), Some("20"));

    store.remove(BALANCE_KEY).unwrap();
    assert_eq!(store.get(BALANCE_KEY).unwrap(), None);
}
