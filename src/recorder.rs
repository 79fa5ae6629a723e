//! Tracking recorder: pessimistic copy/sent confirmation.
//!
//! The inverse asymmetry of generation: a failed tracking record must
//! not silently mark an email as sent, so the remote call happens first
//! and the slot only advances to `sent` on success. On failure the slot
//! stays `ready`; the operator already has the content on their
//! clipboard, so nothing is rolled back.

use std::sync::Arc;

use tracing::{info, warn};

use crate::bus::{EventBus, SequenceEvent};
use crate::error::{Result, SequenceError};
use crate::remote::{ConfirmCopyRequest, RemoteApi};
use crate::sequence::{SlotKey, SlotState, SlotStore};

/// Records copied/sent transitions against the remote tracking service.
pub struct TrackingRecorder {
    store: Arc<SlotStore>,
    bus: Arc<EventBus>,
    remote: Arc<dyn RemoteApi>,
}

impl TrackingRecorder {
    pub fn new(store: Arc<SlotStore>, bus: Arc<EventBus>, remote: Arc<dyn RemoteApi>) -> Arc<Self> {
        Arc::new(Self { store, bus, remote })
    }

    /// Confirm the operator copied the generated email (with its
    /// embedded open-tracking reference) to their clipboard.
    pub async fn confirm_copy(
        &self,
        key: &SlotKey,
        tracking_id: &str,
        included_url: Option<&str>,
    ) -> Result<()> {
        let slot = self.store.slot_snapshot(key).await?;
        if slot.state != SlotState::Ready {
            return Err(SequenceError::InvalidTransition {
                key: key.clone(),
                from: slot.state,
                to: SlotState::Sent,
            }
            .into());
        }
        if tracking_id.is_empty() {
            return Err(SequenceError::MissingTrackingId { key: key.clone() }.into());
        }

        let request = ConfirmCopyRequest {
            tracking_id: tracking_id.to_string(),
            prospect_id: key.prospect_id.clone(),
            included_url: included_url.map(str::to_owned),
        };

        match self.remote.confirm_copy(&request).await {
            Ok(()) => {
                if let Some(change) = self
                    .store
                    .reconcile(key, SlotState::Sent, Some(tracking_id))
                    .await?
                {
                    self.bus.publish_change(change);
                }
                info!(key = %key, tracking = tracking_id, "Slot marked as sent");
                Ok(())
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Confirm-copy failed; slot stays ready");
                self.bus.publish(SequenceEvent::TrackingFailed {
                    prospect_id: key.prospect_id.clone(),
                    slot: key.slot_number,
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }
}
