//! Debris Configuration
//!
//! Single source of truth for the constants that shape every explosion:
//! gravity, fade timing, shape sampling budget and the fork threshold of the
//! scheduler. Loadable from JSON so designers can tweak the feel without
//! touching code; any field left out of the file keeps its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DebrisError;

/// Tuning shared by every explosion system and the scheduler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebrisConfig {
    // Physics
    /// Downward acceleration in blocks/s² before any factor is applied
    pub gravity_constant: f32,
    /// Level-wide gravity multiplier (the game's "global gravity factor")
    pub gravity_factor: f32,
    /// Multiplier applied to incandescence once per simulated tick
    pub incandescence_decay: f32,
    /// Fragment speed is clamped to this many blocks/s
    pub max_fragment_speed: f32,

    // Lifetime
    /// Age in seconds at which a system starts fading out
    pub fade_start_secs: f32,
    /// Age in seconds after which a system is dead
    pub lifetime_secs: f32,

    // Decomposition
    /// Largest fragment count a single system may be built with
    pub max_fragment_count: usize,
    /// Resampling budget for the roughly-cubic extent constraint
    pub max_shape_attempts: u32,
    /// Spawn delay span (seconds) from top to bottom of a crumbling face
    pub crumble_delay_span: f32,
    /// Extra random spawn delay (seconds) added to each crumble fragment
    pub crumble_delay_jitter: f32,

    // Energy propagation
    /// Falloff at or below which an impulse is ignored
    pub energy_cutoff: f32,

    // Scheduling
    /// Live system count at which the update is split across the worker
    pub fork_threshold: usize,
}

impl Default for DebrisConfig {
    fn default() -> Self {
        Self {
            gravity_constant: 0.4725,
            gravity_factor: 1.0,
            incandescence_decay: 0.95,
            max_fragment_speed: 20.0,

            fade_start_secs: 4.0,
            lifetime_secs: 6.0,

            max_fragment_count: 256,
            max_shape_attempts: 32,
            crumble_delay_span: 0.5,
            crumble_delay_jitter: 0.05,

            energy_cutoff: 0.1,

            fork_threshold: 2,
        }
    }
}

impl DebrisConfig {
    /// Parse a config from a JSON document. Missing fields use defaults.
    pub fn from_json_str(json: &str) -> Result<Self, DebrisError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config from a JSON file on disk.
    pub fn load(path: &Path) -> Result<Self, DebrisError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON (used to dump the defaults for editing).
    pub fn to_json_pretty(&self) -> Result<String, DebrisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Effective downward acceleration for a system with the given modifier.
    #[inline]
    pub fn gravity(&self, modifier: f32) -> f32 {
        self.gravity_constant * self.gravity_factor * modifier
    }

    /// Length of the fade-out window in seconds.
    #[inline]
    pub fn fade_duration(&self) -> f32 {
        (self.lifetime_secs - self.fade_start_secs).max(f32::EPSILON)
    }
}
