//! Presentation-side smoothing of continuous values.

pub mod smoothing;

pub use smoothing::{blend_factor, Channel, Interpolator, Vec2};
