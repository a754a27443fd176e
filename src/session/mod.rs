//! Session and authority resolution.
//!
//! Participant 0 of the roster is the authority. The decision is made once
//! at launch from the match context and never renegotiated.

#[allow(clippy::module_inception)]
pub mod session;

pub use session::{DuelSession, MatchContext, Resolution};
