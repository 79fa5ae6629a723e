//! Remote email service boundary.
//!
//! Three operations: generate an email for a slot, confirm the
//! copied/sent tracking record, and fetch authoritative per-prospect
//! slot states. Wire types are camelCase to match the service's JSON.

pub mod http;

pub use http::HttpRemote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::sequence::SlotState;

/// Request body for the generate operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prospect_id: String,
    pub room_type: String,
    pub slot_number: u8,
}

/// Token accounting reported by the generation backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// Raw generate response. `success: false` or missing fields are mapped
/// to errors by the coordinator's validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub template_info: Option<serde_json::Value>,
    #[serde(default)]
    pub selected_link: Option<String>,
    #[serde(default)]
    pub token_usage: Option<TokenUsage>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Request body for the confirm-copy operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmCopyRequest {
    pub tracking_id: String,
    pub prospect_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub included_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmCopyResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// One row of the fetch-states response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStatusRow {
    pub slot_number: u8,
    pub status: SlotState,
    #[serde(default)]
    pub tracking_id: Option<String>,
}

/// The remote email service.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Generate the email for one slot. Called exactly once per attempt;
    /// never retried automatically.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, RemoteError>;

    /// Record that the operator copied the email (mark as sent).
    async fn confirm_copy(&self, request: &ConfirmCopyRequest) -> Result<(), RemoteError>;

    /// Fetch authoritative states for all five slots of a prospect.
    async fn fetch_states(&self, prospect_id: &str) -> Result<Vec<SlotStatusRow>, RemoteError>;
}
