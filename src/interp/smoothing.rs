//! Exponential smoothing toward snapshot targets.
//!
//! Each frame: `value += (target - value) * min(1, dt * K)`. With dead
//! reckoning on, the target itself advances by its last known velocity
//! between snapshots. Presentation only; never feeds back into the
//! simulation.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Blend factor for one frame.
#[inline]
#[must_use]
pub fn blend_factor(dt: f32, gain: f32) -> f32 {
    (dt * gain).clamp(0.0, 1.0)
}

/// Planar value (paddle, ball, cursor).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal.
    pub x: f32,
    /// Vertical.
    pub y: f32,
}

impl Vec2 {
    /// Build from components.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn lerp_toward(self, target: Vec2, t: f32) -> Vec2 {
        Vec2::new(self.x + (target.x - self.x) * t, self.y + (target.y - self.y) * t)
    }

    fn advanced(self, velocity: Vec2, dt: f32) -> Vec2 {
        Vec2::new(self.x + velocity.x * dt, self.y + velocity.y * dt)
    }
}

/// One smoothed value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Channel {
    /// Displayed value.
    pub value: Vec2,
    /// Latest authoritative value.
    pub target: Vec2,
    /// Velocity reported with the target.
    pub velocity: Vec2,
}

impl Channel {
    /// Channel resting at `value`.
    #[must_use]
    pub fn at(value: Vec2) -> Self {
        Self {
            value,
            target: value,
            velocity: Vec2::default(),
        }
    }

    /// One frame toward the target.
    pub fn step(&mut self, dt: f32, gain: f32, dead_reckoning: bool) {
        if dead_reckoning {
            self.target = self.target.advanced(self.velocity, dt);
        }
        self.value = self.value.lerp_toward(self.target, blend_factor(dt, gain));
    }
}

/// Named smoothed channels.
#[derive(Clone, Debug)]
pub struct Interpolator {
    gain: f32,
    dead_reckoning: bool,
    channels: FxHashMap<String, Channel>,
}

impl Interpolator {
    /// Interpolator with smoothing gain `K`.
    #[must_use]
    pub fn new(gain: f32, dead_reckoning: bool) -> Self {
        Self {
            gain,
            dead_reckoning,
            channels: FxHashMap::default(),
        }
    }

    /// New target from a snapshot. Unknown channels start at the target.
    pub fn set_target(&mut self, name: &str, target: Vec2, velocity: Vec2) {
        let channel = self
            .channels
            .entry(name.to_string())
            .or_insert_with(|| Channel::at(target));
        channel.target = target;
        channel.velocity = velocity;
    }

    /// Jump straight to `value` (discrete replacement, or the owner's own object).
    pub fn snap(&mut self, name: &str, value: Vec2) {
        self.channels.insert(name.to_string(), Channel::at(value));
    }

    /// Advance every channel by one frame.
    pub fn step(&mut self, dt: f32) {
        for channel in self.channels.values_mut() {
            channel.step(dt, self.gain, self.dead_reckoning);
        }
    }

    /// Displayed value of a channel.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Vec2> {
        self.channels.get(name).map(|c| c.value)
    }

    /// Full channel state.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Forget a channel.
    pub fn remove(&mut self, name: &str) -> Option<Channel> {
        self.channels.remove(name)
    }

    /// Smoothing gain.
    #[must_use]
    pub fn gain(&self) -> f32 {
        self.gain
    }
}
