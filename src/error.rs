//! Error types for Outreach Core.

use crate::sequence::state::{SlotKey, SlotState};

/// Top-level error type for the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the remote email service.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedPayload { endpoint: String, reason: String },

    #[error("{endpoint} rejected the request: {reason}")]
    Rejected { endpoint: String, reason: String },
}

/// Sequence/state-machine errors.
#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("Slot number {0} out of range (1..=5)")]
    SlotOutOfRange(u8),

    #[error("Slot {key} is not enabled; earlier slots are incomplete")]
    NotEnabled { key: SlotKey },

    #[error("Slot {key} already has a generation in flight")]
    AlreadyGenerating { key: SlotKey },

    #[error("Slot {key} cannot transition from {from} to {to}")]
    InvalidTransition {
        key: SlotKey,
        from: SlotState,
        to: SlotState,
    },

    #[error("No remembered generation context for slot {key}")]
    MissingGenerationContext { key: SlotKey },

    #[error("Slot {key} has no tracking id")]
    MissingTrackingId { key: SlotKey },
}

/// Result type alias for the coordinator.
pub type Result<T> = std::result::Result<T, Error>;
