//! Host-side sink for finalized results.

pub mod context;

pub use context::{HostContext, HostStats, MinigameRecord, CREDITS_PER_WIN};
