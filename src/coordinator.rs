//! Generation coordinator: owns the generate request/response cycle.
//!
//! Optimistic on generation: the slot flips to `generating` before the
//! remote call so the UI shows a busy affordance immediately, and a
//! failure simply lands the slot back in a retry-eligible `failed`.
//! The poll scheduler, not the coordinator, retires the key from the
//! active set once authoritative state is observed as non-transient;
//! that tolerates the optimistic result and the server's batch state
//! briefly disagreeing.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::bus::{EventBus, SequenceEvent};
use crate::error::{RemoteError, Result, SequenceError};
use crate::poll::PollScheduler;
use crate::remote::{GenerateRequest, GenerateResponse, RemoteApi, TokenUsage};
use crate::sequence::{gate, SlotKey, SlotState, SlotStore};

/// Remembered per-slot context so `regenerate` can re-roll.
#[derive(Debug, Clone)]
struct GenerationContext {
    room_type: String,
}

/// A validated, successfully generated email.
#[derive(Debug, Clone)]
pub struct GeneratedEmail {
    pub subject: String,
    pub body_html: String,
    pub tracking_id: String,
    pub template_info: Option<serde_json::Value>,
    pub selected_link: Option<String>,
    pub token_usage: Option<TokenUsage>,
}

/// Coordinates email generation for sequence slots.
pub struct GenerationCoordinator {
    store: Arc<SlotStore>,
    bus: Arc<EventBus>,
    remote: Arc<dyn RemoteApi>,
    scheduler: Arc<PollScheduler>,
    contexts: Mutex<HashMap<SlotKey, GenerationContext>>,
}

impl GenerationCoordinator {
    pub fn new(
        store: Arc<SlotStore>,
        bus: Arc<EventBus>,
        remote: Arc<dyn RemoteApi>,
        scheduler: Arc<PollScheduler>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            bus,
            remote,
            scheduler,
            contexts: Mutex::new(HashMap::new()),
        })
    }

    /// Generate the email for one slot.
    ///
    /// Preconditions: the slot is enabled by sequence order and no
    /// generation is already in flight for it (single-flight). The call
    /// is issued once and never retried automatically.
    pub async fn generate(&self, key: &SlotKey, room_type: &str) -> Result<GeneratedEmail> {
        if !key.in_range() {
            return Err(SequenceError::SlotOutOfRange(key.slot_number).into());
        }

        let sequence = self.store.sequence_snapshot(&key.prospect_id).await;
        if !gate::is_enabled(&sequence, key.slot_number) {
            return Err(SequenceError::NotEnabled { key: key.clone() }.into());
        }

        let current = sequence.slot(key.slot_number).state;
        if current == SlotState::Generating {
            return Err(SequenceError::AlreadyGenerating { key: key.clone() }.into());
        }
        if !current.can_transition_to(SlotState::Generating) {
            return Err(SequenceError::InvalidTransition {
                key: key.clone(),
                from: current,
                to: SlotState::Generating,
            }
            .into());
        }

        self.contexts.lock().await.insert(
            key.clone(),
            GenerationContext {
                room_type: room_type.to_string(),
            },
        );

        // Optimistic transition; the UI disables the slot right away.
        // The store write is the atomic claim: no change reported means
        // another task already moved this slot to `generating`, so this
        // call lost the race and must not issue a second remote request.
        let Some(change) = self
            .store
            .reconcile(key, SlotState::Generating, None)
            .await?
        else {
            return Err(SequenceError::AlreadyGenerating { key: key.clone() }.into());
        };
        self.bus.publish_change(change);
        self.bus.publish(SequenceEvent::GenerationStarted {
            prospect_id: key.prospect_id.clone(),
            slot: key.slot_number,
        });
        self.scheduler.register(key.clone()).await;

        let request_id = Uuid::new_v4();
        info!(
            request = %request_id,
            key = %key,
            room = room_type,
            "Requesting email generation"
        );

        let request = GenerateRequest {
            prospect_id: key.prospect_id.clone(),
            room_type: room_type.to_string(),
            slot_number: key.slot_number,
        };

        let outcome = match self.remote.generate(&request).await {
            Ok(response) => validate_response(response),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(email) => {
                if let Some(change) = self
                    .store
                    .reconcile(key, SlotState::Ready, Some(&email.tracking_id))
                    .await?
                {
                    self.bus.publish_change(change);
                }
                self.bus.publish(SequenceEvent::GenerationCompleted {
                    prospect_id: key.prospect_id.clone(),
                    slot: key.slot_number,
                    tracking_id: email.tracking_id.clone(),
                });
                info!(
                    request = %request_id,
                    key = %key,
                    tracking = %email.tracking_id,
                    "Email generated"
                );
                Ok(email)
            }
            Err(e) => {
                error!(request = %request_id, key = %key, error = %e, "Email generation failed");
                if let Some(change) = self.store.reconcile(key, SlotState::Failed, None).await? {
                    self.bus.publish_change(change);
                }
                self.bus.publish(SequenceEvent::GenerationFailed {
                    prospect_id: key.prospect_id.clone(),
                    slot: key.slot_number,
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Re-invoke `generate` for a slot using its remembered context.
    /// Used after a failure or for a deliberate re-roll.
    pub async fn regenerate(&self, key: &SlotKey) -> Result<GeneratedEmail> {
        let context = self
            .contexts
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| SequenceError::MissingGenerationContext { key: key.clone() })?;
        self.generate(key, &context.room_type).await
    }
}

/// Map a raw generate response into a validated email or a remote error.
fn validate_response(response: GenerateResponse) -> std::result::Result<GeneratedEmail, RemoteError> {
    const ENDPOINT: &str = "/emails/generate";

    if !response.success {
        return Err(RemoteError::Rejected {
            endpoint: ENDPOINT.to_string(),
            reason: response
                .error
                .unwrap_or_else(|| "generation was not successful".to_string()),
        });
    }

    let missing = |field: &str| RemoteError::MalformedPayload {
        endpoint: ENDPOINT.to_string(),
        reason: format!("successful response is missing {field}"),
    };

    Ok(GeneratedEmail {
        tracking_id: response.tracking_id.ok_or_else(|| missing("trackingId"))?,
        subject: response.subject.ok_or_else(|| missing("subject"))?,
        body_html: response.body_html.ok_or_else(|| missing("bodyHtml"))?,
        template_info: response.template_info,
        selected_link: response.selected_link,
        token_usage: response.token_usage,
    })
}
