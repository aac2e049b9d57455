//! # Particle Renderer
//!
//! Draws the live prefix of the particle grid as screen-aligned points.

pub mod renderer;
pub mod uniforms;

pub use renderer::*;
pub use uniforms::*;
