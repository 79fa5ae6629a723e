//! Slot state store: in-memory cache of per-prospect sequences.
//!
//! A cache, not a system of record: sequences are created lazily
//! (all-`pending`) the first time a prospect is touched and evicted when
//! the prospect leaves view. The server remains authoritative; all writes
//! funnel through [`SlotStore::reconcile`] so the coordinator's optimistic
//! path and the scheduler's drift path accept new truth identically.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::SequenceError;

use super::gate;
use super::state::{self, EmailSlot, ProspectSequence, SlotKey, SlotState, SEQUENCE_LENGTH};

/// A state change accepted by the store, suitable for event publication.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotChange {
    pub key: SlotKey,
    pub old_state: SlotState,
    pub new_state: SlotState,
    pub tracking_id: Option<String>,
}

/// In-memory map of prospect sequences.
pub struct SlotStore {
    sequences: RwLock<HashMap<String, ProspectSequence>>,
}

impl SlotStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sequences: RwLock::new(HashMap::new()),
        })
    }

    /// Snapshot a prospect's full sequence, creating it lazily.
    pub async fn sequence_snapshot(&self, prospect_id: &str) -> ProspectSequence {
        let mut map = self.sequences.write().await;
        map.entry(prospect_id.to_string())
            .or_insert_with(ProspectSequence::new)
            .clone()
    }

    /// Snapshot one slot.
    pub async fn slot_snapshot(&self, key: &SlotKey) -> Result<EmailSlot, SequenceError> {
        if !key.in_range() {
            return Err(SequenceError::SlotOutOfRange(key.slot_number));
        }
        let seq = self.sequence_snapshot(&key.prospect_id).await;
        Ok(seq.slot(key.slot_number).clone())
    }

    /// Accept a new truth for a slot, from either the coordinator's own
    /// result or an authoritative remote read. Returns the change when
    /// something actually moved, `None` for an idempotent overwrite.
    pub async fn reconcile(
        &self,
        key: &SlotKey,
        new_state: SlotState,
        tracking_id: Option<&str>,
    ) -> Result<Option<SlotChange>, SequenceError> {
        if !key.in_range() {
            return Err(SequenceError::SlotOutOfRange(key.slot_number));
        }

        let mut map = self.sequences.write().await;
        let seq = map
            .entry(key.prospect_id.clone())
            .or_insert_with(ProspectSequence::new);
        let local = seq.slot(key.slot_number);

        match state::reconcile(local, new_state, tracking_id) {
            Some(updated) => {
                let change = SlotChange {
                    key: key.clone(),
                    old_state: local.state,
                    new_state: updated.state,
                    tracking_id: updated.tracking_id.clone(),
                };
                debug!(
                    key = %key,
                    from = %change.old_state,
                    to = %change.new_state,
                    "Slot state accepted"
                );
                *seq.slot_mut(key.slot_number) = updated;
                Ok(Some(change))
            }
            None => Ok(None),
        }
    }

    /// Is the slot enabled by sequence order?
    pub async fn is_enabled(&self, key: &SlotKey) -> bool {
        if !key.in_range() {
            return false;
        }
        let seq = self.sequence_snapshot(&key.prospect_id).await;
        gate::is_enabled(&seq, key.slot_number)
    }

    /// The lowest slot that is enabled and pending/ready, if any.
    pub async fn next_actionable(&self, prospect_id: &str) -> Option<u8> {
        let seq = self.sequence_snapshot(prospect_id).await;
        (1..=SEQUENCE_LENGTH).find(|&n| gate::is_next_actionable(&seq, n))
    }

    /// Drop a prospect's cached sequence (prospect left view).
    pub async fn evict(&self, prospect_id: &str) -> bool {
        self.sequences.write().await.remove(prospect_id).is_some()
    }

    /// Number of prospects currently cached.
    pub async fn len(&self) -> usize {
        self.sequences.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sequences.read().await.is_empty()
    }
}
