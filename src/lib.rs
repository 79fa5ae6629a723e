//! Outreach Core: email sequence lifecycle coordinator.
//!
//! Coordinates the five-slot outbound email sequence for each prospect:
//! generation, copy/sent confirmation, and adaptive polling that
//! reconciles externally-observed state (opens, another operator acting
//! on the same record) back into the local cache. The crate's only
//! boundaries are the [`remote::RemoteApi`] operations and the
//! [`bus::EventBus`].

pub mod bus;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod poll;
pub mod recorder;
pub mod remote;
pub mod sequence;

pub use error::{Error, Result};
