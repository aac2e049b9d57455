//! Particle state and grid addressing

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// One texel of a state buffer: packed position and velocity.
///
/// Layout matches `vec4<f32>` in WGSL (`xy` = position, `zw` = velocity).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleState {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
}

impl ParticleState {
    pub const ZERO: Self = Self {
        position: [0.0; 2],
        velocity: [0.0; 2],
    };

    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self {
            position: position.to_array(),
            velocity: velocity.to_array(),
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::from_array(self.position)
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::from_array(self.velocity)
    }
}

/// Column/row coordinate of a texel in an N×N state grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TexelAddress {
    pub column: u32,
    pub row: u32,
}

impl TexelAddress {
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Texel holding the particle with linear id `id`: `(id mod N, id div N)`.
    pub fn from_id(id: u32, grid_side: u32) -> Self {
        Self {
            column: id % grid_side,
            row: id / grid_side,
        }
    }

    /// Row-major linear index into a buffer of side `grid_side`
    pub fn linear(&self, grid_side: u32) -> usize {
        self.row as usize * grid_side as usize + self.column as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_layout_is_vec4() {
        assert_eq!(std::mem::size_of::<ParticleState>(), 16);
        let state = ParticleState::new(Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0));
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&state));
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_texel_from_id() {
        assert_eq!(TexelAddress::from_id(0, 512), TexelAddress::new(0, 0));
        assert_eq!(TexelAddress::from_id(513, 512), TexelAddress::new(1, 1));
        assert_eq!(TexelAddress::from_id(513, 512).linear(512), 513);
    }
}
