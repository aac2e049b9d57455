//! Execution backends and ping-pong slot bookkeeping

use crate::error::Result;
use particle_physics::{DrawRange, InjectionBlock, TexelAddress};

/// One of the two state buffers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferSlot {
    A = 0,
    B = 1,
}

impl BufferSlot {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Read/write roles of the state buffers for one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotPair {
    pub read: BufferSlot,
    pub write: BufferSlot,
}

impl SlotPair {
    /// `read = buffers[tick mod 2]`, `write = buffers[(tick + 1) mod 2]`
    pub fn for_tick(tick: u64) -> Self {
        let read = if tick % 2 == 0 {
            BufferSlot::A
        } else {
            BufferSlot::B
        };
        Self {
            read,
            write: read.other(),
        }
    }
}

/// Execute-over-grid interface shared by the GPU and CPU pipelines.
///
/// The scheduler drives a backend once per tick in a fixed order:
/// `write_block` (only when injecting), `step`, then `render`.
pub trait ParticleBackend {
    /// Whatever `render` draws into (a surface view, or nothing for the CPU)
    type Target: ?Sized;

    /// Grid side the backend's buffers were allocated with
    fn grid_side(&self) -> u32;

    /// Write `block` into `slot`, starting at `start` and wrapping within the row
    fn write_block(
        &mut self,
        slot: BufferSlot,
        start: TexelAddress,
        block: &InjectionBlock,
    ) -> Result<()>;

    /// Run the physics kernel over every texel of `slots.read` into `slots.write`
    fn step(&mut self, slots: SlotPair) -> Result<()>;

    /// Clear the target to opaque black and draw `range` sampling `slot`
    fn render(&mut self, target: &Self::Target, slot: BufferSlot, range: DrawRange) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_alternate_by_parity() {
        let even = SlotPair::for_tick(0);
        let odd = SlotPair::for_tick(1);
        assert_eq!(even.read, BufferSlot::A);
        assert_eq!(even.write, BufferSlot::B);
        assert_eq!(odd.read, BufferSlot::B);
        assert_eq!(odd.write, BufferSlot::A);
        assert_eq!(SlotPair::for_tick(u64::MAX - 1), even);
    }

    #[test]
    fn test_roles_never_coincide() {
        for tick in 0..8 {
            let slots = SlotPair::for_tick(tick);
            assert_ne!(slots.read, slots.write);
            assert_eq!(SlotPair::for_tick(tick + 1).read, slots.write);
        }
    }
}
