//! Pointer-driven particle injection
//!
//! Converts a pointer sample into a block of fresh particle states and works
//! out where in the state grid that block lands.

use crate::constants::{capacity, NDC_LIMIT, SPREAD_X};
use crate::particle::{ParticleState, TexelAddress};
use glam::Vec2;
use rand::Rng;

/// Map a device-pixel coordinate to normalized device coordinates.
///
/// `2 * ratio * coord / size - 1`, clamped to `[-0.999, 0.999]` so that
/// injected particles never start exactly on a wall.
pub fn to_ndc(coord: f32, size: f32, pixel_ratio: f32) -> f32 {
    (2.0 * pixel_ratio * coord / size - 1.0).clamp(-NDC_LIMIT, NDC_LIMIT)
}

/// Pointer position in NDC. Device Y grows downward, NDC Y grows upward.
pub fn pointer_ndc(x: f32, y: f32, width: f32, height: f32, pixel_ratio: f32) -> Vec2 {
    Vec2::new(
        to_ndc(x, width, pixel_ratio),
        -to_ndc(y, height, pixel_ratio),
    )
}

/// A batch of particle states sharing one spawn position
#[derive(Clone, Debug, PartialEq)]
pub struct InjectionBlock {
    states: Vec<ParticleState>,
}

impl InjectionBlock {
    /// Fill `len` entries at `position`, each with velocity
    /// `(0.25 * (r0 - 0.5), r1)` for independent uniform `r0, r1 ∈ [0, 1)`.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, position: Vec2, len: u32) -> Self {
        let states = (0..len)
            .map(|_| {
                let vx = SPREAD_X * (rng.random::<f32>() - 0.5);
                let vy = rng.random::<f32>();
                ParticleState::new(position, Vec2::new(vx, vy))
            })
            .collect();
        Self { states }
    }

    pub fn states(&self) -> &[ParticleState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Count of particles ever injected. Never decreases and is never clamped;
/// consumers clamp to the grid capacity themselves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RingCursor {
    active: u64,
}

impl RingCursor {
    pub const fn new() -> Self {
        Self { active: 0 }
    }

    /// Cursor that has already seen `active` particles
    pub const fn starting_at(active: u64) -> Self {
        Self { active }
    }

    pub fn active_count(&self) -> u64 {
        self.active
    }

    /// Write address of the next block.
    ///
    /// Column and row wrap independently: `column = count mod N`,
    /// `row = (count div N) mod N`.
    pub fn address(&self, grid_side: u32) -> TexelAddress {
        let side = grid_side as u64;
        TexelAddress::new(
            (self.active % side) as u32,
            ((self.active / side) % side) as u32,
        )
    }

    pub fn advance(&mut self, block_size: u32) {
        self.active = self.active.saturating_add(block_size as u64);
    }

    /// Value shown by the counter display: `min(count, N²)`
    pub fn displayed(&self, grid_side: u32) -> u64 {
        self.active.min(capacity(grid_side))
    }
}

/// Contiguous run of block entries inside one grid row
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSegment {
    /// First texel written by this run
    pub start: TexelAddress,
    /// Index of the first block entry in this run
    pub source_offset: u32,
    pub len: u32,
}

/// Split a block of `len` entries written at `start` into per-row runs.
///
/// Entries advance by column and wrap back to column 0 of the *same* row when
/// they pass the row end. A block wider than the grid wraps more than once and
/// later entries overwrite earlier ones, exactly as a wrapped texel write would.
pub fn block_segments(start: TexelAddress, len: u32, grid_side: u32) -> Vec<BlockSegment> {
    let mut segments = Vec::new();
    let mut column = start.column;
    let mut written = 0;

    while written < len {
        let run = (grid_side - column).min(len - written);
        segments.push(BlockSegment {
            start: TexelAddress::new(column, start.row),
            source_offset: written,
            len: run,
        });
        written += run;
        column = 0;
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_ndc_clamps_edges() {
        assert_eq!(to_ndc(0.0, 800.0, 1.0), -0.999);
        assert_eq!(to_ndc(800.0, 800.0, 1.0), 0.999);
        assert_eq!(to_ndc(-50.0, 800.0, 1.0), -0.999);
    }

    #[test]
    fn test_ndc_center() {
        assert!(to_ndc(400.0, 800.0, 1.0).abs() < 1e-6);
        // Logical pixel on a 2x display: drawing buffer is twice as large
        assert!(to_ndc(400.0, 1600.0, 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_pointer_ndc_flips_y() {
        let ndc = pointer_ndc(600.0, 150.0, 800.0, 600.0, 1.0);
        assert!((ndc.x - 0.5).abs() < 1e-6);
        assert!((ndc.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_block_velocities_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let block = InjectionBlock::generate(&mut rng, Vec2::new(0.5, 0.5), 64);
        assert_eq!(block.len(), 64);

        for state in block.states() {
            assert_eq!(state.position, [0.5, 0.5]);
            assert!(state.velocity[0] >= -0.125 && state.velocity[0] <= 0.125);
            assert!(state.velocity[1] >= 0.0 && state.velocity[1] < 1.0);
        }

        // Velocities are independent per entry
        let first = block.states()[0].velocity;
        assert!(block.states().iter().any(|s| s.velocity != first));
    }

    #[test]
    fn test_cursor_address_wraps_row_and_column() {
        let side = 512;
        assert_eq!(RingCursor::new().address(side), TexelAddress::new(0, 0));
        assert_eq!(RingCursor::starting_at(576).address(side), TexelAddress::new(64, 1));

        // Past capacity the row wraps back to 0
        let wrapped = RingCursor::starting_at(262_144 + 64);
        assert_eq!(wrapped.address(side), TexelAddress::new(64, 0));
    }

    #[test]
    fn test_cursor_is_monotonic_and_display_clamps() {
        let mut cursor = RingCursor::starting_at(262_144 - 64);
        cursor.advance(64);
        assert_eq!(cursor.displayed(512), 262_144);
        cursor.advance(64);
        assert_eq!(cursor.active_count(), 262_208);
        assert_eq!(cursor.displayed(512), 262_144);
    }

    #[test]
    fn test_aligned_block_is_one_segment() {
        let segments = block_segments(TexelAddress::new(64, 3), 64, 512);
        assert_eq!(
            segments,
            vec![BlockSegment {
                start: TexelAddress::new(64, 3),
                source_offset: 0,
                len: 64,
            }]
        );
    }

    #[test]
    fn test_overrunning_block_wraps_within_row() {
        let segments = block_segments(TexelAddress::new(500, 7), 64, 512);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, TexelAddress::new(500, 7));
        assert_eq!(segments[0].len, 12);
        assert_eq!(segments[1].start, TexelAddress::new(0, 7));
        assert_eq!(segments[1].source_offset, 12);
        assert_eq!(segments[1].len, 52);
    }
}
