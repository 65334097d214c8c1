// SPDX-License-Identifier: GPL-3.0-only

//! Pixel formats, conversion geometry and the CPU reference codecs
//!
//! The byte layouts here are consumed by external tooling and must match the
//! GPU kernels exactly; any drift in offsets or element counts is a
//! correctness bug, not a style choice.

pub mod nv12;
pub mod yuy2;

use serde::{Deserialize, Serialize};

use crate::errors::{ConvertError, ConvertResult};

/// Packed 32-bit source pixel formats accepted by the engine
///
/// The gamma-tagged variants are converted as if they were their linear
/// counterpart; no gamma decode is performed. This is a stated limitation of
/// the engine, not a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// B,G,R,A byte order
    Bgra8,
    /// R,G,B,A byte order
    Rgba8,
    /// B,G,R,A byte order, gamma-tagged surface
    Bgra8Srgb,
    /// R,G,B,A byte order, gamma-tagged surface
    Rgba8Srgb,
}

impl PixelFormat {
    /// Bytes per packed pixel, all variants
    pub const BYTES_PER_PIXEL: u32 = 4;

    /// Offsets of the R, G, B channels inside one packed pixel
    ///
    /// Every source order is normalized to canonical R,G,B through these
    /// offsets before the color transform runs.
    pub fn rgb_offsets(&self) -> (usize, usize, usize) {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Bgra8Srgb => (2, 1, 0),
            PixelFormat::Rgba8 | PixelFormat::Rgba8Srgb => (0, 1, 2),
        }
    }

    /// Channel-order code passed to the compute kernels (0 = BGRA, 1 = RGBA)
    pub fn kernel_order(&self) -> u32 {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Bgra8Srgb => 0,
            PixelFormat::Rgba8 | PixelFormat::Rgba8Srgb => 1,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::Bgra8 => write!(f, "BGRA8"),
            PixelFormat::Rgba8 => write!(f, "RGBA8"),
            PixelFormat::Bgra8Srgb => write!(f, "BGRA8 (sRGB)"),
            PixelFormat::Rgba8Srgb => write!(f, "RGBA8 (sRGB)"),
        }
    }
}

/// Geometry of one conversion call
///
/// Strides are in bytes and must cover at least the minimal row; for packed
/// sources only `y_stride` is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionParams {
    pub width: u32,
    pub height: u32,
    /// Packed row bytes, or luma-plane row bytes for planar input
    pub y_stride: u32,
    /// Chroma-plane row bytes for planar input
    pub uv_stride: u32,
}

impl ConversionParams {
    /// Tightly packed 32-bit color geometry
    pub fn packed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            y_stride: width * PixelFormat::BYTES_PER_PIXEL,
            uv_stride: 0,
        }
    }

    /// Packed geometry with an explicit row stride
    pub fn packed_with_stride(width: u32, height: u32, stride: u32) -> Self {
        Self {
            width,
            height,
            y_stride: stride,
            uv_stride: 0,
        }
    }

    /// Tightly packed planar 4:2:0 geometry
    pub fn planar(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            y_stride: width,
            uv_stride: width,
        }
    }

    /// Check packed-source geometry
    pub fn validate_packed(&self) -> ConvertResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConvertError::RejectedInput(format!(
                "invalid dimensions {}x{}",
                self.width, self.height
            )));
        }
        if self.y_stride < self.width * PixelFormat::BYTES_PER_PIXEL {
            return Err(ConvertError::RejectedInput(format!(
                "row stride {} below minimum {} for width {}",
                self.y_stride,
                self.width * PixelFormat::BYTES_PER_PIXEL,
                self.width
            )));
        }
        Ok(())
    }

    /// Check planar 4:2:0 geometry
    ///
    /// Odd dimensions are rejected: the layout defines no partial chroma
    /// block, and inventing one would read past a plane boundary.
    pub fn validate_planar(&self) -> ConvertResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConvertError::RejectedInput(format!(
                "invalid dimensions {}x{}",
                self.width, self.height
            )));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(ConvertError::RejectedInput(format!(
                "planar 4:2:0 requires even dimensions, got {}x{}",
                self.width, self.height
            )));
        }
        if self.y_stride < self.width {
            return Err(ConvertError::RejectedInput(format!(
                "luma stride {} below width {}",
                self.y_stride, self.width
            )));
        }
        if self.uv_stride < self.width {
            return Err(ConvertError::RejectedInput(format!(
                "chroma stride {} below width {}",
                self.uv_stride, self.width
            )));
        }
        Ok(())
    }

    /// Bytes required by a packed source with this geometry
    ///
    /// Only the last row may be tight when the stride exceeds the row width.
    pub fn packed_required_bytes(&self) -> usize {
        let row = (self.width * PixelFormat::BYTES_PER_PIXEL) as usize;
        self.y_stride as usize * (self.height as usize - 1) + row
    }

    /// Exact byte count of a planar 4:2:0 source with this geometry
    pub fn planar_total_bytes(&self) -> usize {
        self.y_stride as usize * self.height as usize
            + self.uv_stride as usize * (self.height as usize / 2)
    }
}
