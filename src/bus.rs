//! Event bus: typed broadcast of sequence lifecycle events.
//!
//! The coordinator, recorder, and scheduler are the only producers; UI
//! components subscribe and react (re-render a button, show a toast).
//! Publishing with no subscribers is fine and silently dropped.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::CoordinatorConfig;
use crate::sequence::{SlotChange, SlotState};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Lifecycle events published by the coordinator triad.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SequenceEvent {
    /// A generation request was dispatched for a slot.
    GenerationStarted { prospect_id: String, slot: u8 },
    /// A slot's cached state changed (locally or via drift detection).
    SlotStateChanged {
        prospect_id: String,
        slot: u8,
        old_state: SlotState,
        new_state: SlotState,
        tracking_id: Option<String>,
    },
    /// Generation resolved successfully; the email is ready to copy.
    GenerationCompleted {
        prospect_id: String,
        slot: u8,
        tracking_id: String,
    },
    /// Generation failed; the slot is retry-eligible.
    GenerationFailed {
        prospect_id: String,
        slot: u8,
        error: String,
    },
    /// Confirming the copy/sent record failed; the slot stays ready.
    TrackingFailed {
        prospect_id: String,
        slot: u8,
        error: String,
    },
    /// The poll session gave up before all slots resolved; a manual
    /// refresh is needed.
    PollingTimeout,
}

/// Broadcast bus for [`SequenceEvent`]s.
pub struct EventBus {
    tx: broadcast::Sender<SequenceEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Arc::new(Self { tx })
    }

    pub fn with_default_capacity() -> Arc<Self> {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }

    /// Build a bus sized by the coordinator configuration.
    pub fn from_config(config: &CoordinatorConfig) -> Arc<Self> {
        Self::new(config.broadcast_capacity)
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SequenceEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. No receivers listening yet is fine.
    pub fn publish(&self, event: SequenceEvent) {
        debug!(event = ?event, "Publishing sequence event");
        let _ = self.tx.send(event);
    }

    /// Publish a store-accepted change as a `SlotStateChanged` event.
    pub fn publish_change(&self, change: SlotChange) {
        self.publish(SequenceEvent::SlotStateChanged {
            prospect_id: change.key.prospect_id,
            slot: change.key.slot_number,
            old_state: change.old_state,
            new_state: change.new_state,
            tracking_id: change.tracking_id,
        });
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
