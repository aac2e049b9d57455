//! Per-particle kernels
//!
//! NOTE: The GPU path runs the WGSL versions of these in
//! `particle-simulation/src/shaders/physics.wgsl` and
//! `particle-renderer/src/shaders/particle.wgsl`. The functions here are the
//! reference used by the CPU backend and by tests, and must stay in lockstep
//! with the shaders.

use crate::constants::capacity;
use crate::particle::{ParticleState, TexelAddress};
use glam::{Vec2, Vec4};

/// Advance one particle by one tick.
///
/// Half-step, reflect any axis that left `[-1, 1]`, second half-step with the
/// (possibly reflected) velocity, then apply gravity to the vertical velocity.
pub fn physics_kernel(state: ParticleState, dt: f32, gravity: f32) -> ParticleState {
    let mut position = state.position();
    let mut velocity = state.velocity();

    position += 0.5 * velocity * dt;
    if position.x < -1.0 || position.x > 1.0 {
        velocity.x *= -1.0;
    }
    if position.y < -1.0 || position.y > 1.0 {
        velocity.y *= -1.0;
    }
    position += 0.5 * velocity * dt;

    velocity.y += gravity * dt;

    ParticleState::new(position, velocity)
}

/// Normalized texel coordinate `(x / N, y / N)` for particle `id`
pub fn particle_index(id: u32, grid_side: u32) -> Vec2 {
    let texel = TexelAddress::from_id(id, grid_side);
    let side = grid_side as f32;
    Vec2::new(texel.column as f32 / side, texel.row as f32 / side)
}

/// Inverse of [`particle_index`]: which texel a normalized index samples.
pub fn index_texel(index: Vec2, grid_side: u32) -> TexelAddress {
    let side = grid_side as f32;
    let clamp = |v: f32| ((v * side).round() as u32).min(grid_side - 1);
    TexelAddress::new(clamp(index.x), clamp(index.y))
}

/// Full per-vertex index list in draw order.
///
/// Built in id order and then reversed, so the list ends with id 0. Drawing a
/// suffix of this list (see [`DrawRange`]) therefore always draws the lowest ids.
pub fn build_index_list(grid_side: u32) -> Vec<[f32; 2]> {
    let total = capacity(grid_side) as u32;
    let mut list: Vec<[f32; 2]> = (0..total)
        .map(|id| particle_index(id, grid_side).to_array())
        .collect();
    list.reverse();
    list
}

/// Slice of the reversed index list submitted for one frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawRange {
    pub offset: u32,
    pub count: u32,
}

impl DrawRange {
    /// Range covering `min(active_count, N²)` particles at the tail of the list
    pub fn for_active(active_count: u64, grid_side: u32) -> Self {
        let total = capacity(grid_side);
        let count = active_count.min(total);
        Self {
            offset: (total - count) as u32,
            count: count as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn end(&self) -> u32 {
        self.offset + self.count
    }

    /// Particle id behind list position `slot` of the reversed list
    pub fn id_at(slot: u32, grid_side: u32) -> u32 {
        capacity(grid_side) as u32 - 1 - slot
    }
}

/// One drawn point: where it lands on screen and its diagnostic color
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderedPoint {
    pub screen_position: Vec2,
    pub color: Vec4,
}

/// Vertex + fragment stage for a single point.
///
/// Color is a gradient over the normalized index: `(x, y, 1 - max(x, y), 1)`.
pub fn render_kernel(index: Vec2, state: ParticleState) -> RenderedPoint {
    RenderedPoint {
        screen_position: state.position(),
        color: Vec4::new(index.x, index.y, 1.0 - index.x.max(index.y), 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DT, GRAVITY};

    #[test]
    fn test_rest_is_stable_without_gravity() {
        let state = ParticleState::new(Vec2::new(0.3, -0.7), Vec2::ZERO);
        let next = physics_kernel(state, DT, 0.0);
        assert_eq!(next, state);
    }

    #[test]
    fn test_zero_state_only_gains_gravity() {
        let next = physics_kernel(ParticleState::ZERO, DT, GRAVITY);
        assert_eq!(next.position, [0.0, 0.0]);
        assert_eq!(next.velocity, [0.0, GRAVITY * DT]);
    }

    #[test]
    fn test_reflection_flips_once() {
        let state = ParticleState::new(Vec2::new(0.98, 0.0), Vec2::new(1.0, 0.0));
        let next = physics_kernel(state, DT, 0.0);

        assert_eq!(next.velocity[0], -1.0);
        assert!(next.position[0] >= -1.05 && next.position[0] <= 1.05);
        // Out by 0.05 on the first half-step, back by 0.05 on the second
        assert!((next.position[0] - 0.98).abs() < 1e-6);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        // Landing exactly on the wall is still inside
        let state = ParticleState::new(Vec2::new(0.5, 0.0), Vec2::new(10.0, 0.0));
        let next = physics_kernel(state, DT, 0.0);
        assert_eq!(next.velocity[0], 10.0);
        assert_eq!(next.position[0], 1.5);
    }

    #[test]
    fn test_reflection_on_floor() {
        let state = ParticleState::new(Vec2::new(0.0, -0.99), Vec2::new(0.0, -1.0));
        let next = physics_kernel(state, DT, GRAVITY);
        assert_eq!(next.velocity[1], 1.0 + GRAVITY * DT);
        assert!(next.position[1] >= -1.05);
    }

    #[test]
    fn test_index_list_is_reversed() {
        let list = build_index_list(4);
        assert_eq!(list.len(), 16);
        assert_eq!(list[15], [0.0, 0.0]);
        assert_eq!(list[14], [0.25, 0.0]);
        assert_eq!(list[0], [0.75, 0.75]);
    }

    #[test]
    fn test_draw_range_draws_lowest_ids() {
        let side = 8;
        let list = build_index_list(side);
        let range = DrawRange::for_active(5, side);
        assert_eq!(range, DrawRange { offset: 59, count: 5 });

        let mut ids: Vec<u32> = (range.offset..range.end())
            .map(|slot| {
                let texel = index_texel(Vec2::from_array(list[slot as usize]), side);
                texel.linear(side) as u32
            })
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);

        for slot in range.offset..range.end() {
            let texel = index_texel(Vec2::from_array(list[slot as usize]), side);
            assert_eq!(texel.linear(side) as u32, DrawRange::id_at(slot, side));
        }
    }

    #[test]
    fn test_draw_range_clamps_to_capacity() {
        let full = DrawRange::for_active(262_144, 512);
        assert_eq!(full, DrawRange { offset: 0, count: 262_144 });

        let over = DrawRange::for_active(262_144 + 64, 512);
        assert_eq!(over, full);

        assert!(DrawRange::for_active(0, 512).is_empty());
    }

    #[test]
    fn test_render_kernel_color_gradient() {
        let point = render_kernel(
            Vec2::new(0.25, 0.5),
            ParticleState::new(Vec2::new(-0.5, 0.5), Vec2::ZERO),
        );
        assert_eq!(point.screen_position, Vec2::new(-0.5, 0.5));
        assert_eq!(point.color, Vec4::new(0.25, 0.5, 0.5, 1.0));
    }
}
