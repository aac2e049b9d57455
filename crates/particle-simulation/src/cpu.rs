//! CPU backend
//!
//! Runs the reference kernels with a data-parallel iterator. Used for tests,
//! benchmarks and hosts without a usable GPU.

use crate::backend::{BufferSlot, ParticleBackend, SlotPair};
use crate::error::{Result, SimulationError};
use crate::params::SimulationConfig;
use glam::Vec2;
use particle_physics::{
    block_segments, build_index_list, index_texel, physics_kernel, render_kernel, DrawRange,
    InjectionBlock, ParticleState, RenderedPoint, TexelAddress,
};
use rayon::prelude::*;

/// Last frame produced by [`CpuBackend::render`]
#[derive(Clone, Debug, Default)]
pub struct FrameCapture {
    /// Slot the frame sampled positions from
    pub source: Option<BufferSlot>,
    pub range: Option<DrawRange>,
    /// Drawn points in submission order
    pub points: Vec<RenderedPoint>,
}

pub struct CpuBackend {
    config: SimulationConfig,
    buffers: [Vec<ParticleState>; 2],
    index_list: Vec<[f32; 2]>,
    frame: FrameCapture,
}

impl CpuBackend {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let texels = config.capacity() as usize;

        log::info!(
            "Allocating CPU state buffers: 2 x {}x{} texels",
            config.grid_side,
            config.grid_side
        );

        Ok(Self {
            config,
            buffers: [
                vec![ParticleState::ZERO; texels],
                vec![ParticleState::ZERO; texels],
            ],
            index_list: build_index_list(config.grid_side),
            frame: FrameCapture::default(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self, slot: BufferSlot) -> &[ParticleState] {
        &self.buffers[slot.index()]
    }

    pub fn texel(&self, slot: BufferSlot, address: TexelAddress) -> ParticleState {
        self.buffers[slot.index()][address.linear(self.config.grid_side)]
    }

    /// Overwrite one texel directly (seeding test scenarios)
    pub fn set_texel(&mut self, slot: BufferSlot, address: TexelAddress, state: ParticleState) {
        let side = self.config.grid_side;
        self.buffers[slot.index()][address.linear(side)] = state;
    }

    pub fn last_frame(&self) -> &FrameCapture {
        &self.frame
    }
}

impl ParticleBackend for CpuBackend {
    type Target = ();

    fn grid_side(&self) -> u32 {
        self.config.grid_side
    }

    fn write_block(
        &mut self,
        slot: BufferSlot,
        start: TexelAddress,
        block: &InjectionBlock,
    ) -> Result<()> {
        let side = self.config.grid_side;
        if start.column >= side || start.row >= side {
            return Err(SimulationError::Device {
                operation: "block write",
                message: format!("address {start:?} outside {side}x{side} grid"),
            });
        }

        let buffer = &mut self.buffers[slot.index()];
        let states = block.states();
        for segment in block_segments(start, states.len() as u32, side) {
            let dst = segment.start.linear(side);
            let src = segment.source_offset as usize;
            let len = segment.len as usize;
            buffer[dst..dst + len].copy_from_slice(&states[src..src + len]);
        }
        Ok(())
    }

    fn step(&mut self, slots: SlotPair) -> Result<()> {
        let (first, second) = self.buffers.split_at_mut(1);
        let (read, write) = match slots.read {
            BufferSlot::A => (&first[0], &mut second[0]),
            BufferSlot::B => (&second[0], &mut first[0]),
        };

        let dt = self.config.dt;
        let gravity = self.config.gravity;
        write
            .par_iter_mut()
            .zip(read.par_iter())
            .for_each(|(next, prev)| *next = physics_kernel(*prev, dt, gravity));
        Ok(())
    }

    fn render(&mut self, _target: &(), slot: BufferSlot, range: DrawRange) -> Result<()> {
        let side = self.config.grid_side;
        let state = &self.buffers[slot.index()];
        let list = &self.index_list[range.offset as usize..range.end() as usize];

        // Clear, then draw
        self.frame.points.clear();
        self.frame.points.extend(list.iter().map(|&index| {
            let index = Vec2::from_array(index);
            let texel = index_texel(index, side);
            render_kernel(index, state[texel.linear(side)])
        }));
        self.frame.source = Some(slot);
        self.frame.range = Some(range);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> CpuBackend {
        CpuBackend::new(SimulationConfig::with_grid_side(64)).unwrap()
    }

    #[test]
    fn test_buffers_start_zeroed() {
        let cpu = backend();
        assert!(cpu.state(BufferSlot::A).iter().all(|s| *s == ParticleState::ZERO));
        assert!(cpu.state(BufferSlot::B).iter().all(|s| *s == ParticleState::ZERO));
        assert_eq!(cpu.state(BufferSlot::A).len(), 64 * 64);
    }

    #[test]
    fn test_step_reads_one_slot_writes_other() {
        let mut cpu = backend();
        let seeded = ParticleState::new(Vec2::new(0.0, 0.5), Vec2::new(0.1, 0.0));
        cpu.set_texel(BufferSlot::B, TexelAddress::new(3, 2), seeded);

        cpu.step(SlotPair::for_tick(1)).unwrap();

        let expected = physics_kernel(seeded, 0.1, -0.5);
        assert_eq!(cpu.texel(BufferSlot::A, TexelAddress::new(3, 2)), expected);
        // Source is untouched
        assert_eq!(cpu.texel(BufferSlot::B, TexelAddress::new(3, 2)), seeded);
    }

    #[test]
    fn test_write_block_wraps_within_row() {
        let mut cpu = backend();
        let block = InjectionBlock::generate(&mut rand::rng(), Vec2::new(0.1, 0.2), 8);

        cpu.write_block(BufferSlot::A, TexelAddress::new(60, 5), &block)
            .unwrap();

        for (k, state) in block.states().iter().enumerate() {
            let column = (60 + k as u32) % 64;
            assert_eq!(cpu.texel(BufferSlot::A, TexelAddress::new(column, 5)), *state);
        }
        // Next row is untouched
        assert_eq!(cpu.texel(BufferSlot::A, TexelAddress::new(0, 6)), ParticleState::ZERO);
    }

    #[test]
    fn test_render_samples_requested_slot() {
        let mut cpu = backend();
        let marker = ParticleState::new(Vec2::new(0.25, -0.25), Vec2::ZERO);
        cpu.set_texel(BufferSlot::B, TexelAddress::new(0, 0), marker);

        cpu.render(&(), BufferSlot::B, DrawRange::for_active(1, 64))
            .unwrap();

        let frame = cpu.last_frame();
        assert_eq!(frame.source, Some(BufferSlot::B));
        assert_eq!(frame.points.len(), 1);
        assert_eq!(frame.points[0].screen_position, Vec2::new(0.25, -0.25));
        assert_eq!(frame.points[0].color.z, 1.0);
    }
}
