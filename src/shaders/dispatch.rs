// SPDX-License-Identifier: GPL-3.0-only

//! Parallel dispatch planning
//!
//! Maps an image of arbitrary (possibly odd) dimensions onto a grid of
//! fixed-size work-groups. The 4:2:2 encode direction assigns one horizontal
//! pixel pair per work item, so its logical width is `ceil(width/2)`; the
//! decode directions assign one pixel per item. Over-provisioned items at
//! the grid edge bounds-check inside the kernel and write nothing.

use crate::constants::WORKGROUP_SIZE;
use crate::shaders::gpu_processor::compute_dispatch_size;

/// Work-group counts for one compute dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGrid {
    pub groups_x: u32,
    pub groups_y: u32,
}

impl DispatchGrid {
    /// Grid for kernels that handle one pixel pair per work item
    /// (4:2:2 encode)
    pub fn for_pixel_pairs(width: u32, height: u32) -> Self {
        Self {
            groups_x: compute_dispatch_size(width.div_ceil(2), WORKGROUP_SIZE),
            groups_y: compute_dispatch_size(height, WORKGROUP_SIZE),
        }
    }

    /// Grid for kernels that handle one pixel per work item
    /// (planar decode, packed decode)
    pub fn for_pixels(width: u32, height: u32) -> Self {
        Self {
            groups_x: compute_dispatch_size(width, WORKGROUP_SIZE),
            groups_y: compute_dispatch_size(height, WORKGROUP_SIZE),
        }
    }

    /// Work items provisioned along each axis
    pub fn provisioned(&self) -> (u32, u32) {
        (
            self.groups_x * WORKGROUP_SIZE,
            self.groups_y * WORKGROUP_SIZE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_grid_covers_logical_width() {
        for (w, h) in [(1, 1), (2, 2), (31, 9), (32, 16), (33, 17), (1920, 1080)] {
            let grid = DispatchGrid::for_pixel_pairs(w, h);
            let (px, py) = grid.provisioned();
            assert!(px >= w.div_ceil(2), "{}x{} under-provisioned in x", w, h);
            assert!(py >= h, "{}x{} under-provisioned in y", w, h);
            // No whole workgroup is wasted
            assert!(px - w.div_ceil(2) < WORKGROUP_SIZE);
            assert!(py - h < WORKGROUP_SIZE);
        }
    }

    #[test]
    fn test_pair_grid_matches_direct_formula() {
        // ceil(ceil(w/2) / 16) is the same count as ceil(w / 32)
        for w in [1, 2, 15, 16, 31, 32, 33, 63, 64, 641, 1919, 1920, 3841] {
            let grid = DispatchGrid::for_pixel_pairs(w, 1);
            assert_eq!(grid.groups_x, w.div_ceil(2 * WORKGROUP_SIZE));
        }
    }

    #[test]
    fn test_pixel_grid() {
        let grid = DispatchGrid::for_pixels(1920, 1080);
        assert_eq!(grid.groups_x, 120);
        assert_eq!(grid.groups_y, 68);
        let grid = DispatchGrid::for_pixels(17, 17);
        assert_eq!((grid.groups_x, grid.groups_y), (2, 2));
    }
}
