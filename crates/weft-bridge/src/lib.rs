//! Weft Bridge - window message bridge
//!
//! Answers `fillInput`, `trackInput` and `waitFor` messages posted to a
//! page's window: descriptors are re-resolved with `weft-locate`, then the
//! requested fill strategy, tracker or wait runs against the page and a reply
//! is posted back.

mod bridge;
mod config;
mod describe;
mod fill;
mod message;
mod page;
mod revive;
mod track;
mod wait;

pub use bridge::Bridge;
pub use config::{BridgeConfig, ConfigError};
pub use describe::describe;
pub use fill::{fill, js_string, truthy, FillContext, FillError, FillMethod, FillOutcome};
pub use message::{
    Envelope, FillReply, FillRequest, FillStatus, FoundInput, FoundTrackedInput, InputLocation,
    Outbound, Reply, RequestKind, SelectorText, TrackReply, TrackRequest, TrackStatus,
    TrackUpdate, TrackedInput, TrackedInputSelector, WaitReply, WaitRequest, WaitStatus, WindowId,
};
pub use page::Page;
pub use revive::revive;
pub use track::{track, TrackMethod, TrackedKind, Tracker};
pub use wait::{wait_for_react, WaitMethod, WaitOutcome};

/// Errors decoding an inbound request
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Malformed request: {0}")]
    Decode(#[from] serde_json::Error),
}
