//! Ping-pong state buffers on the GPU

use crate::backend::{BufferSlot, SlotPair};
use crate::params::SimulationConfig;
use wgpu::util::DeviceExt;

/// Two identically sized storage buffers of `vec4<f32>` texels.
///
/// Both are zero-filled from host memory at creation rather than relying on
/// the backend clearing new allocations. They are never resized.
pub struct StateBufferPair {
    buffers: [wgpu::Buffer; 2],
    size: u64,
}

impl StateBufferPair {
    pub fn new(device: &wgpu::Device, config: &SimulationConfig) -> Self {
        let size = config.state_buffer_size();
        let zeros = vec![0u8; size as usize];

        let create = |label: &str| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: &zeros,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            })
        };

        let buffers = [create("State Buffer A"), create("State Buffer B")];
        log::info!("State buffers created ({} bytes each)", size);

        Self { buffers, size }
    }

    pub fn buffer(&self, slot: BufferSlot) -> &wgpu::Buffer {
        &self.buffers[slot.index()]
    }

    /// `(read, write)` buffers for one tick
    pub fn swap(&self, slots: SlotPair) -> (&wgpu::Buffer, &wgpu::Buffer) {
        (self.buffer(slots.read), self.buffer(slots.write))
    }

    /// Size of one buffer in bytes
    pub fn size(&self) -> u64 {
        self.size
    }
}
