//! Per-frame render uniform

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// Render uniform for GPU (matches `RenderUniform` in particle.wgsl)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct RenderUniform {
    /// Drawing-buffer size in physical pixels
    pub viewport: [f32; 2],
    /// Point edge length in physical pixels
    pub point_size: f32,
    pub grid_side: u32,
}

impl RenderUniform {
    /// `point_size` is in device-independent pixels and is scaled by `pixel_ratio`.
    pub fn new(width: u32, height: u32, pixel_ratio: f32, point_size: f32, grid_side: u32) -> Self {
        Self {
            viewport: [width.max(1) as f32, height.max(1) as f32],
            point_size: point_size * pixel_ratio,
            grid_side,
        }
    }

    /// Half extent of one point in NDC
    pub fn point_half_extent(&self) -> Vec2 {
        Vec2::splat(self.point_size) / Vec2::from_array(self.viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_extent_scales_with_ratio() {
        let uniform = RenderUniform::new(800, 400, 2.0, 16.0, 512);
        assert_eq!(uniform.point_size, 32.0);
        // 32 px wide on an 800 px buffer spans 0.08 NDC, half of that either side
        assert_eq!(uniform.point_half_extent(), Vec2::new(0.04, 0.08));
    }

    #[test]
    fn test_uniform_is_16_bytes() {
        assert_eq!(std::mem::size_of::<RenderUniform>(), 16);
    }
}
