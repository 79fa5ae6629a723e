//! Slot sequence model: state machine, store, and ordering gate.

pub mod gate;
pub mod state;
pub mod store;

pub use state::{EmailSlot, ProspectSequence, SlotKey, SlotState, SEQUENCE_LENGTH};
pub use store::{SlotChange, SlotStore};
