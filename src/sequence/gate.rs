//! Sequence gate: pure predicates over a prospect's slot map.

use super::state::{ProspectSequence, SlotState, SEQUENCE_LENGTH};

/// Is slot `slot_number` clickable?
///
/// Slot 1 has no predecessor and is always eligible; a later slot is
/// enabled only once every earlier slot is `sent` or `opened`.
pub fn is_enabled(sequence: &ProspectSequence, slot_number: u8) -> bool {
    if slot_number == 0 || slot_number > SEQUENCE_LENGTH {
        return false;
    }
    if slot_number == 1 {
        return true;
    }
    (1..slot_number).all(|n| sequence.slot(n).state.is_complete())
}

/// Is slot `slot_number` the one to pulse-highlight next?
///
/// A visual affordance hint only, never an access-control gate;
/// disabled slots ignore clicks regardless of this.
pub fn is_next_actionable(sequence: &ProspectSequence, slot_number: u8) -> bool {
    is_enabled(sequence, slot_number)
        && matches!(
            sequence.slot(slot_number).state,
            SlotState::Pending | SlotState::Ready
        )
}
