//! # Particle Simulation
//!
//! Ping-pong particle state, the per-tick physics step, pointer injection and
//! the frame scheduler that ties them together. Ships a wgpu compute backend
//! and a CPU backend behind the same [`ParticleBackend`] interface.

pub mod backend;
pub mod cpu;
pub mod error;
pub mod params;
pub mod scheduler;
pub mod simulation;
pub mod state;

pub use backend::*;
pub use cpu::*;
pub use error::*;
pub use params::*;
pub use scheduler::*;
pub use simulation::*;
pub use state::*;
