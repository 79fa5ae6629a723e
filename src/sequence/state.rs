//! Slot state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of slots in a prospect's outreach sequence.
pub const SEQUENCE_LENGTH: u8 = 5;

/// State of one email slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// Nothing generated yet.
    Pending,
    /// A generation request is in flight.
    Generating,
    /// Generated and awaiting the operator's copy action.
    Ready,
    /// Operator copied the email and the tracking record was confirmed.
    Sent,
    /// The recipient opened the email (detected externally).
    Opened,
    /// Generation failed; retry-eligible, gate-equivalent to `Pending`.
    Failed,
}

impl SlotState {
    /// Check whether a local action may move this state to `target`.
    ///
    /// The reconcile path does not consult this; remote truth is
    /// authoritative and overwrites unconditionally.
    pub fn can_transition_to(&self, target: SlotState) -> bool {
        use SlotState::*;

        matches!(
            (self, target),
            (Pending, Generating) | (Failed, Generating) |
            // Deliberate re-roll of an already-generated email
            (Ready, Generating) |
            (Generating, Ready) | (Generating, Failed) |
            (Ready, Sent) | (Sent, Opened)
        )
    }

    /// States expected to resolve without user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Pending | Self::Generating)
    }

    /// States that count as completed for sequence-order gating.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Sent | Self::Opened)
    }

    /// States a click may re-trigger generation from.
    pub fn is_retriggerable(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Ready => "ready",
            Self::Sent => "sent",
            Self::Opened => "opened",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Identifies one email slot of one prospect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub prospect_id: String,
    /// 1-based position in the sequence (1..=5).
    pub slot_number: u8,
}

impl SlotKey {
    pub fn new(prospect_id: impl Into<String>, slot_number: u8) -> Self {
        Self {
            prospect_id: prospect_id.into(),
            slot_number,
        }
    }

    /// Validate the slot number range.
    pub fn in_range(&self) -> bool {
        (1..=SEQUENCE_LENGTH).contains(&self.slot_number)
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.prospect_id, self.slot_number)
    }
}

/// One email slot: state, last change time, and tracking id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailSlot {
    pub state: SlotState,
    /// When the slot last changed state. `None` until the first change.
    pub updated_at: Option<DateTime<Utc>>,
    /// Opaque server-issued tracking id, present once generated.
    pub tracking_id: Option<String>,
}

impl Default for EmailSlot {
    fn default() -> Self {
        Self {
            state: SlotState::Pending,
            updated_at: None,
            tracking_id: None,
        }
    }
}

/// A prospect's five slots, indexed 1-based through [`ProspectSequence::slot`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProspectSequence {
    slots: [EmailSlot; SEQUENCE_LENGTH as usize],
}

impl ProspectSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a slot by its 1-based number. Panics if out of range; callers
    /// validate through [`SlotKey::in_range`] first.
    pub fn slot(&self, slot_number: u8) -> &EmailSlot {
        assert!(
            (1..=SEQUENCE_LENGTH).contains(&slot_number),
            "slot number {slot_number} out of range"
        );
        &self.slots[(slot_number - 1) as usize]
    }

    pub(crate) fn slot_mut(&mut self, slot_number: u8) -> &mut EmailSlot {
        assert!(
            (1..=SEQUENCE_LENGTH).contains(&slot_number),
            "slot number {slot_number} out of range"
        );
        &mut self.slots[(slot_number - 1) as usize]
    }

    pub fn slots(&self) -> &[EmailSlot] {
        &self.slots
    }
}

/// Accept a new truth for a slot.
///
/// The single acceptance path shared by the coordinator's success path
/// and the scheduler's drift diff: returns the updated slot when the
/// incoming state or tracking id actually changes something, `None` when
/// the overwrite would be a no-op (the two paths racing is expected).
/// A `None` incoming tracking id never clears a locally known one.
pub fn reconcile(
    local: &EmailSlot,
    new_state: SlotState,
    tracking_id: Option<&str>,
) -> Option<EmailSlot> {
    let tracking_id = tracking_id
        .map(str::to_owned)
        .or_else(|| local.tracking_id.clone());

    if local.state == new_state && local.tracking_id == tracking_id {
        return None;
    }

    Some(EmailSlot {
        state: new_state,
        updated_at: Some(Utc::now()),
        tracking_id,
    })
}
