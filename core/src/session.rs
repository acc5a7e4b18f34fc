//! The game session: the one object the presentation layer talks to.
//!
//! EXECUTION ORDER inside advance() (fixed):
//!   1. Accrual timer  (credits production)
//!   2. Autosave timer (snapshots the result)
//!   3. Feedback expiry
//!
//! RULES:
//!   - Everything runs on the caller's thread; no two mutations overlap.
//!   - Both timers are cancelled together by end(). After that nothing
//!     mutates the economy again.

use crate::{
    catalog::UpgradeCatalog,
    clock::IntervalTimer,
    config::{AccrualMode, GameConfig},
    economy::{EconomyEngine, PurchaseOutcome, UpgradeView},
    error::{ClickerError, ClickerResult},
    event::SessionEvent,
    feedback::{FeedbackMarker, FeedbackQueue},
    format::{format_exact, format_number},
    persistence::{PersistenceAdapter, RestoreReport},
    store::KvStore,
    types::{Amount, Millis},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// What a manual action produced, for the "+N" marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionFeedback {
    pub credited:  Amount,
    pub marker_id: Uuid,
}

/// Everything a renderer needs, in one serialisable value.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub balance:           Amount,
    pub balance_display:   String,
    pub balance_exact:     String,
    pub rate:              Amount,
    pub action_value:      Amount,
    pub upgrades:          Vec<UpgradeView>,
    pub total_ever_earned: Amount,
    pub markers:           Vec<FeedbackMarker>,
    pub last_saved_at:     Option<DateTime<Utc>>,
    pub active:            bool,
}

pub struct GameSession<S: KvStore> {
    engine:         EconomyEngine,
    store:          S,
    persistence:    PersistenceAdapter,
    accrual:        IntervalTimer,
    autosave:       IntervalTimer,
    feedback:       FeedbackQueue,
    restore_report: RestoreReport,
    last_saved_at:  Option<DateTime<Utc>>,
    pending:        Vec<SessionEvent>,
    ended:          bool,
}

impl<S: KvStore> GameSession<S> {
    /// Build a fresh engine, restore it from `store`, arm both timers.
    pub fn start(
        config: &GameConfig,
        catalog: UpgradeCatalog,
        store: S,
        now_ms: Millis,
    ) -> ClickerResult<Self> {
        config.validate()?;

        let persistence = PersistenceAdapter::new(config);
        let restored = persistence.load(&store, &catalog);
        let restore_report = restored.report().clone();

        let mut engine = EconomyEngine::new(catalog, config);
        engine.restore(restored);

        log::info!(
            "session started: balance={} rate={}/s report={:?}",
            format_number(engine.balance()),
            format_number(engine.derived_rate()),
            restore_report
        );

        Ok(Self {
            engine,
            store,
            persistence,
            accrual: IntervalTimer::start(config.accrual_interval_ms, config.accrual_mode, now_ms),
            autosave: IntervalTimer::start(config.save_interval_ms, AccrualMode::Nominal, now_ms),
            feedback: FeedbackQueue::new(config.feedback_lifetime_ms),
            pending: vec![SessionEvent::SessionStarted {
                at_ms:  now_ms,
                report: restore_report.clone(),
            }],
            restore_report,
            last_saved_at: None,
            ended: false,
        })
    }

    pub fn engine(&self) -> &EconomyEngine { &self.engine }
    pub fn store(&self) -> &S { &self.store }
    pub fn restore_report(&self) -> &RestoreReport { &self.restore_report }
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> { self.last_saved_at }
    pub fn markers(&self) -> &[FeedbackMarker] { self.feedback.markers() }
    pub fn is_active(&self) -> bool { !self.ended }

    /// Manual action at screen position (x, y).
    pub fn click(&mut self, x: f64, y: f64, now_ms: Millis) -> ClickerResult<ActionFeedback> {
        self.ensure_active()?;
        let credited = self.engine.apply_action();
        let marker_id = self.feedback.push(credited, x, y, now_ms);
        self.pending.push(SessionEvent::ActionApplied { credited, marker_id });
        Ok(ActionFeedback { credited, marker_id })
    }

    pub fn buy(&mut self, id: &str) -> ClickerResult<PurchaseOutcome> {
        self.ensure_active()?;
        let outcome = self.engine.purchase(id);
        self.pending.push(match &outcome {
            PurchaseOutcome::Purchased { id, price, owned_count, next_cost } => {
                SessionEvent::UpgradePurchased {
                    id:          id.clone(),
                    price:       *price,
                    owned_count: *owned_count,
                    next_cost:   *next_cost,
                }
            }
            PurchaseOutcome::InsufficientFunds { id, .. } => SessionEvent::PurchaseRejected {
                id:     id.clone(),
                reason: "insufficient_funds".to_string(),
            },
            PurchaseOutcome::UnknownUpgrade { id } => SessionEvent::PurchaseRejected {
                id:     id.clone(),
                reason: "unknown_upgrade".to_string(),
            },
            PurchaseOutcome::LimitReached { id, .. } => SessionEvent::PurchaseRejected {
                id:     id.clone(),
                reason: "limit_reached".to_string(),
            },
        });
        Ok(outcome)
    }

    /// Fire whatever timers are due at `now_ms`. Returns every event since
    /// the previous call, player actions included, in the order they happened.
    pub fn advance(&mut self, now_ms: Millis) -> Vec<SessionEvent> {
        let mut events = std::mem::take(&mut self.pending);
        if self.ended {
            return events;
        }

        if let Some(fire) = self.accrual.poll(now_ms) {
            let credited = self.engine.apply_accrual(fire.elapsed_ms);
            log::debug!(
                "accrual: {} interval(s), {}ms, +{credited:.3} balance={:.3}",
                fire.count,
                fire.elapsed_ms,
                self.engine.balance()
            );
            events.push(SessionEvent::AccrualApplied {
                elapsed_ms: fire.elapsed_ms,
                credited,
            });
        }

        if self.autosave.poll(now_ms).is_some() {
            events.push(match self.save_now() {
                Ok(at) => SessionEvent::StateSaved { at },
                Err(e) => {
                    log::warn!("autosave failed: {e}");
                    SessionEvent::SaveFailed { reason: e.to_string() }
                }
            });
        }

        let expired = self.feedback.expire(now_ms);
        if expired > 0 {
            events.push(SessionEvent::MarkersExpired { count: expired });
        }

        events
    }

    /// Snapshot to the store now, outside the autosave cadence.
    pub fn save_now(&mut self) -> ClickerResult<DateTime<Utc>> {
        self.persistence.save(&self.store, &self.engine)?;
        let at = Utc::now();
        self.last_saved_at = Some(at);
        log::debug!("saved at {}", at.format("%H:%M:%S"));
        Ok(at)
    }

    /// Tear the session down: cancel both timers together, drop markers.
    pub fn end(&mut self, now_ms: Millis) -> SessionEvent {
        self.accrual.cancel();
        self.autosave.cancel();
        self.feedback.clear();
        self.ended = true;
        log::info!("session ended at {now_ms}ms");
        SessionEvent::SessionEnded { at_ms: now_ms }
    }

    /// Give the store back, e.g. to start a new session on it.
    pub fn into_store(self) -> S {
        self.store
    }

    pub fn view(&self) -> SessionView {
        let balance = self.engine.balance();
        SessionView {
            balance,
            balance_display: format_number(balance),
            balance_exact: format_exact(balance),
            rate: self.engine.derived_rate(),
            action_value: self.engine.derived_action_value(),
            upgrades: self.engine.upgrade_views(),
            total_ever_earned: self.engine.total_ever_earned(),
            markers: self.feedback.markers().to_vec(),
            last_saved_at: self.last_saved_at,
            active: !self.ended,
        }
    }

    fn ensure_active(&self) -> ClickerResult<()> {
        if self.ended {
            return Err(ClickerError::SessionEnded);
        }
        Ok(())
    }
}
