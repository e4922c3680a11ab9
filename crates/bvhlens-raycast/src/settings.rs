//! Cast parameters.

use serde::{Deserialize, Serialize};

use crate::error::{RaycastError, Result};

/// Largest batch a single cast may request.
pub const MAX_RAY_COUNT: usize = 500;

/// Longest ray a cast may request.
pub const MAX_LENGTH: f64 = 100.0;

/// Ray batch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CastSettings {
    /// Rays per batch.
    pub ray_count: usize,
    /// Length of every ray.
    pub length: f64,
    /// Seed of the sampling stream.
    pub seed: u32,
}

impl Default for CastSettings {
    fn default() -> Self {
        Self {
            ray_count: 10,
            length: MAX_LENGTH,
            seed: 0,
        }
    }
}

impl CastSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.ray_count > MAX_RAY_COUNT {
            return Err(RaycastError::InvalidSettings(format!(
                "ray_count must be at most {MAX_RAY_COUNT}, got {}",
                self.ray_count
            )));
        }
        if !(self.length > 0.0 && self.length <= MAX_LENGTH) {
            return Err(RaycastError::InvalidSettings(format!(
                "length must be in (0, {MAX_LENGTH}], got {}",
                self.length
            )));
        }
        Ok(())
    }
}
