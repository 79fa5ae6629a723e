//! Debounced action dispatcher: absorbs UI clicks and routes by state.
//!
//! A click inside the debounce window for the same slot is a no-op; this
//! absorbs duplicate events from rapid or double activation, not
//! serialization of legitimate distinct actions. Accepted clicks route
//! per the slot's current state: pending/failed trigger generation,
//! ready opens a preview, sent/opened open history, generating is
//! disabled until it resolves.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::coordinator::{GeneratedEmail, GenerationCoordinator};
use crate::error::{Error, Result, SequenceError};
use crate::poll::PollScheduler;
use crate::sequence::{gate, SlotKey, SlotState, SlotStore};

/// What a click resolved to. The host UI reacts (open a modal, nothing).
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Generation ran and produced an email.
    Generated(GeneratedEmail),
    /// Generation ran and failed; the failure event was published and
    /// the slot is retry-eligible.
    GenerationFailed,
    /// The slot is ready; show the compose/preview modal.
    OpenPreview,
    /// The slot is sent or opened; show its history.
    OpenHistory,
    /// The click was absorbed.
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Repeat click inside the debounce window.
    Debounced,
    /// Sequence order has not unlocked this slot.
    Disabled,
    /// A generation is already in flight for this slot.
    InFlight,
}

/// Debounced click router over the coordinator triad.
pub struct Dispatcher {
    config: CoordinatorConfig,
    store: Arc<SlotStore>,
    coordinator: Arc<GenerationCoordinator>,
    scheduler: Arc<PollScheduler>,
    /// Last accepted click per slot; overwritten, never pruned (bounded
    /// by distinct slots clicked in a session).
    ledger: Mutex<HashMap<SlotKey, Instant>>,
}

impl Dispatcher {
    pub fn new(
        config: CoordinatorConfig,
        store: Arc<SlotStore>,
        coordinator: Arc<GenerationCoordinator>,
        scheduler: Arc<PollScheduler>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            coordinator,
            scheduler,
            ledger: Mutex::new(HashMap::new()),
        })
    }

    /// Handle a click on a slot. `room_type` rides along for the
    /// generation path and is ignored by the others.
    pub async fn click(&self, key: &SlotKey, room_type: &str) -> Result<DispatchOutcome> {
        if !key.in_range() {
            return Err(SequenceError::SlotOutOfRange(key.slot_number).into());
        }

        // Debounce check-and-record must be atomic per key.
        {
            let mut ledger = self.ledger.lock().await;
            let now = Instant::now();
            if let Some(last) = ledger.get(key) {
                if now.duration_since(*last) < self.config.debounce_window {
                    debug!(key = %key, "Click debounced");
                    return Ok(DispatchOutcome::Ignored(IgnoreReason::Debounced));
                }
            }
            ledger.insert(key.clone(), now);
        }

        let sequence = self.store.sequence_snapshot(&key.prospect_id).await;
        if !gate::is_enabled(&sequence, key.slot_number) {
            debug!(key = %key, "Click on gated slot ignored");
            return Ok(DispatchOutcome::Ignored(IgnoreReason::Disabled));
        }

        match sequence.slot(key.slot_number).state {
            SlotState::Pending | SlotState::Failed => {
                match self.coordinator.generate(key, room_type).await {
                    Ok(email) => Ok(DispatchOutcome::Generated(email)),
                    Err(Error::Remote(_)) => Ok(DispatchOutcome::GenerationFailed),
                    // Lost a race with another click on the same slot.
                    Err(Error::Sequence(SequenceError::AlreadyGenerating { .. })) => {
                        Ok(DispatchOutcome::Ignored(IgnoreReason::InFlight))
                    }
                    Err(e) => {
                        warn!(key = %key, error = %e, "Generation dispatch rejected");
                        Err(e)
                    }
                }
            }
            SlotState::Generating => Ok(DispatchOutcome::Ignored(IgnoreReason::InFlight)),
            SlotState::Ready => Ok(DispatchOutcome::OpenPreview),
            SlotState::Sent | SlotState::Opened => Ok(DispatchOutcome::OpenHistory),
        }
    }

    /// Operator explicitly asked for a fresh read.
    pub async fn refresh(&self) {
        info!("Operator requested refresh");
        self.scheduler.force_check().await;
    }
}
