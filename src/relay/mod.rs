//! Input relay between the non-authority's local input and the authority's
//! simulation.

pub mod input;

pub use input::InputRelay;
