//! Simulation configuration and the physics uniform

use crate::error::{Result, SimulationError};
use bytemuck::{Pod, Zeroable};
use particle_physics::{capacity, BLOCK_SIZE, DT, GRAVITY, GRID_SIDE, POINT_SIZE};

/// Tunables for one simulation context. Fixed for the lifetime of the buffers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Side length of the square state grid
    pub grid_side: u32,
    /// Particles written per injection
    pub block_size: u32,
    pub dt: f32,
    pub gravity: f32,
    /// Point size in device-independent pixels
    pub point_size: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid_side: GRID_SIDE,
            block_size: BLOCK_SIZE,
            dt: DT,
            gravity: GRAVITY,
            point_size: POINT_SIZE,
        }
    }
}

impl SimulationConfig {
    /// Same defaults on a smaller grid
    pub fn with_grid_side(grid_side: u32) -> Self {
        Self {
            grid_side,
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> u64 {
        capacity(self.grid_side)
    }

    /// Bytes in one state buffer (4 floats per texel)
    pub fn state_buffer_size(&self) -> u64 {
        self.capacity() * std::mem::size_of::<particle_physics::ParticleState>() as u64
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(SimulationError::InvalidConfig(msg)) };

        if self.grid_side == 0 || self.block_size == 0 {
            return invalid(format!(
                "grid_side ({}) and block_size ({}) must be non-zero",
                self.grid_side, self.block_size
            ));
        }
        if self.block_size > self.grid_side || self.grid_side % self.block_size != 0 {
            return invalid(format!(
                "block_size ({}) must divide grid_side ({})",
                self.block_size, self.grid_side
            ));
        }
        if self.capacity() > u32::MAX as u64 {
            return invalid(format!("grid_side {} is too large", self.grid_side));
        }
        if !self.dt.is_finite() || !self.gravity.is_finite() {
            return invalid("dt and gravity must be finite".to_string());
        }
        if self.point_size.is_nan() || self.point_size <= 0.0 {
            return invalid(format!("point_size must be positive, got {}", self.point_size));
        }
        Ok(())
    }

    pub fn params(&self) -> SimParams {
        SimParams {
            dt: self.dt,
            gravity: self.gravity,
            grid_side: self.grid_side,
            _padding: 0,
        }
    }
}

/// Physics uniform (matches `SimParams` in physics.wgsl)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SimParams {
    pub dt: f32,
    pub gravity: f32,
    pub grid_side: u32,
    pub _padding: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capacity(), 262_144);
        assert_eq!(config.state_buffer_size(), 262_144 * 16);
    }

    #[test]
    fn test_block_must_divide_row() {
        let config = SimulationConfig {
            block_size: 48,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));

        assert!(SimulationConfig::with_grid_side(32).validate().is_err());
        assert!(SimulationConfig::with_grid_side(64).validate().is_ok());
    }

    #[test]
    fn test_params_mirror_config() {
        let params = SimulationConfig::default().params();
        assert_eq!(params.dt, 0.1);
        assert_eq!(params.gravity, -0.5);
        assert_eq!(params.grid_side, 512);
        assert_eq!(std::mem::size_of::<SimParams>(), 16);
    }
}
