//! Simulation constants
//!
//! Defaults for the particle grid, the injection block and the integrator.
//! Everything here can be overridden at runtime through
//! `particle_simulation::SimulationConfig`.

/// Side length of the square state grid. Total particle capacity is `GRID_SIDE²`.
pub const GRID_SIDE: u32 = 512;

/// Number of particles written per injection event
pub const BLOCK_SIZE: u32 = 64;

/// Integration timestep per tick
pub const DT: f32 = 0.1;

/// Vertical acceleration (NDC units per tick²)
pub const GRAVITY: f32 = -0.5;

/// Rendered point size in device-independent pixels
pub const POINT_SIZE: f32 = 16.0;

/// Injected positions are clamped to `[-NDC_LIMIT, NDC_LIMIT]`
pub const NDC_LIMIT: f32 = 0.999;

/// Horizontal spread of injected velocities
pub const SPREAD_X: f32 = 0.25;

/// Particle capacity of a grid with the given side
pub const fn capacity(grid_side: u32) -> u64 {
    grid_side as u64 * grid_side as u64
}
