//! Transient "+N" markers shown where the player clicked.
//!
//! Purely cosmetic: markers are never persisted and never feed back into
//! the economy. They live in one owned queue and expire on the same
//! cooperative clock as everything else.

use crate::types::{Amount, Millis};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackMarker {
    pub id:            Uuid,
    pub value:         Amount,
    pub x:             f64,
    pub y:             f64,
    pub created_at_ms: Millis,
}

#[derive(Debug, Clone)]
pub struct FeedbackQueue {
    lifetime_ms: Millis,
    markers:     Vec<FeedbackMarker>,
}

impl FeedbackQueue {
    pub fn new(lifetime_ms: Millis) -> Self {
        Self { lifetime_ms, markers: Vec::new() }
    }

    pub fn push(&mut self, value: Amount, x: f64, y: f64, now_ms: Millis) -> Uuid {
        let id = Uuid::new_v4();
        self.markers.push(FeedbackMarker { id, value, x, y, created_at_ms: now_ms });
        id
    }

    /// Drop every marker whose lifetime has run out. Returns how many.
    pub fn expire(&mut self, now_ms: Millis) -> usize {
        let before = self.markers.len();
        let lifetime = self.lifetime_ms;
        self.markers
            .retain(|m| now_ms < m.created_at_ms.saturating_add(lifetime));
        before - self.markers.len()
    }

    pub fn clear(&mut self) { self.markers.clear(); }
    pub fn markers(&self) -> &[FeedbackMarker] { &self.markers }
    pub fn len(&self) -> usize { self.markers.len() }
    pub fn is_empty(&self) -> bool { self.markers.is_empty() }
}
