//! Simulation errors
//!
//! Every variant is fatal: the state buffers depend on each previous tick, so
//! a failed tick leaves nothing worth recovering.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("no compatible GPU adapter: {0}")]
    AdapterUnavailable(#[from] wgpu::RequestAdapterError),

    #[error("device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("device limit too small for float state buffers: {limit} is {actual}, need {required}")]
    InsufficientLimits {
        limit: &'static str,
        actual: u64,
        required: u64,
    },

    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error("device rejected {operation}: {message}")]
    Device {
        operation: &'static str,
        message: String,
    },

    #[error("state readback failed: {0}")]
    Readback(String),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
