//! # Particle Physics
//!
//! Plain data and pure per-particle kernels for the particle fountain:
//! state layout, grid addressing, the integrator, render indexing and
//! pointer injection math.

pub mod constants;
pub mod injection;
pub mod kernels;
pub mod particle;

pub use constants::*;
pub use injection::*;
pub use kernels::*;
pub use particle::*;
