//! Outcome computation and distribution.
//!
//! - `OutcomeRecord`: id-keyed terminal result sent in `finish`
//! - `Finalizer`: one-shot guard plus banner countdown
//! - `MatchResult`: hand-off delivered to the host

pub mod record;
pub mod finalizer;

pub use record::{FinishReason, Outcome, OutcomeRecord};
pub use finalizer::{Finalizer, MatchResult};
