//! wgpu backend: compute simulation plus the point renderer

use particle_physics::{DrawRange, InjectionBlock, TexelAddress};
use particle_renderer::ParticleRenderer;
use particle_simulation::{BufferSlot, GpuSimulation, ParticleBackend, Result, SlotPair};

pub struct GpuBackend {
    simulation: GpuSimulation,
    renderer: ParticleRenderer,
    pixel_ratio: f32,
}

impl GpuBackend {
    pub fn new(simulation: GpuSimulation, renderer: ParticleRenderer, pixel_ratio: f32) -> Self {
        Self {
            simulation,
            renderer,
            pixel_ratio,
        }
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.pixel_ratio = pixel_ratio;
    }

    pub fn resize(&mut self, device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) {
        self.renderer.resize(device, config);
    }
}

impl ParticleBackend for GpuBackend {
    type Target = wgpu::TextureView;

    fn grid_side(&self) -> u32 {
        self.simulation.config().grid_side
    }

    fn write_block(
        &mut self,
        slot: BufferSlot,
        start: TexelAddress,
        block: &InjectionBlock,
    ) -> Result<()> {
        let simulation = &self.simulation;
        simulation.guarded("block write", || simulation.write_block(slot, start, block))
    }

    fn step(&mut self, slots: SlotPair) -> Result<()> {
        let simulation = &self.simulation;
        simulation.guarded("physics step", || simulation.step(slots))
    }

    fn render(
        &mut self,
        target: &wgpu::TextureView,
        slot: BufferSlot,
        range: DrawRange,
    ) -> Result<()> {
        let simulation = &self.simulation;
        simulation.guarded("particle render", || {
            self.renderer.render(
                simulation.device(),
                simulation.queue(),
                target,
                simulation.state_buffer(slot),
                range,
                self.pixel_ratio,
            )
        })
    }
}
