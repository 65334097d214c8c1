// SPDX-License-Identifier: GPL-3.0-only

//! Planar 4:2:0 (NV12) codec, CPU reference path
//!
//! A W*H luma plane followed by a row-major chroma plane of interleaved
//! [U,V] pairs, one pair per 2x2 luma block. Odd dimensions are rejected:
//! the layout defines no partial chroma block, and inventing one would read
//! past a plane boundary.

use crate::color::{ColorMatrix, quantize_chroma, quantize_luma};
use crate::errors::{ConvertError, ConvertResult};
use crate::formats::{ConversionParams, PixelFormat};

/// Total buffer size for even W, H: `W * H * 3 / 2` bytes
#[inline]
pub fn required_size(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3 / 2
}

/// Decode NV12 to RGBA8 (alpha = 255)
///
/// Luma is read at `y * y_stride + x`; chroma is shared across each 2x2
/// block, U then V interleaved at the block offset.
pub fn decode_to_rgba(
    src: &[u8],
    params: &ConversionParams,
    matrix: &ColorMatrix,
) -> ConvertResult<Vec<u8>> {
    params.validate_planar()?;
    let total = params.planar_total_bytes();
    if src.len() != total {
        return Err(ConvertError::RejectedInput(format!(
            "planar source is {} bytes, {}x{} geometry needs exactly {}",
            src.len(),
            params.width,
            params.height,
            total
        )));
    }

    let width = params.width as usize;
    let height = params.height as usize;
    let y_stride = params.y_stride as usize;
    let uv_stride = params.uv_stride as usize;
    let y_plane_size = y_stride * height;

    let mut out = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        let y_row = y * y_stride;
        let uv_row = y_plane_size + (y / 2) * uv_stride;
        for x in 0..width {
            let luma = src[y_row + x];
            let uv_base = uv_row + (x & !1);
            let (r, g, b) = matrix.studio_to_rgb(luma, src[uv_base], src[uv_base + 1]);
            out.push((r * 255.0).round() as u8);
            out.push((g * 255.0).round() as u8);
            out.push((b * 255.0).round() as u8);
            out.push(255);
        }
    }
    Ok(out)
}

/// Encode packed 32-bit color into NV12
///
/// Luma is computed per pixel; each 2x2 block's chroma values are averaged
/// before rounding (2:1 decimation in both axes).
pub fn encode_from_packed(
    src: &[u8],
    format: PixelFormat,
    params: &ConversionParams,
    matrix: &ColorMatrix,
) -> ConvertResult<Vec<u8>> {
    if params.width % 2 != 0 || params.height % 2 != 0 {
        return Err(ConvertError::RejectedInput(format!(
            "planar 4:2:0 requires even dimensions, got {}x{}",
            params.width, params.height
        )));
    }
    params.validate_packed()?;
    let required = params.packed_required_bytes();
    if src.len() < required {
        return Err(ConvertError::RejectedInput(format!(
            "packed source is {} bytes, geometry needs {}",
            src.len(),
            required
        )));
    }

    let width = params.width as usize;
    let height = params.height as usize;
    let stride = params.y_stride as usize;
    let (ro, go, bo) = format.rgb_offsets();

    let rgb_at = |x: usize, y: usize| -> (f32, f32, f32) {
        let p = &src[y * stride + x * 4..y * stride + x * 4 + 4];
        (
            p[ro] as f32 / 255.0,
            p[go] as f32 / 255.0,
            p[bo] as f32 / 255.0,
        )
    };

    let mut out = vec![0u8; required_size(params.width, params.height)];
    let (luma_plane, chroma_plane) = out.split_at_mut(width * height);
    for by in (0..height).step_by(2) {
        for bx in (0..width).step_by(2) {
            let mut u_sum = 0.0f32;
            let mut v_sum = 0.0f32;
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (r, g, b) = rgb_at(bx + dx, by + dy);
                let (y, u, v) = matrix.rgb_to_ycbcr(r, g, b);
                luma_plane[(by + dy) * width + bx + dx] = quantize_luma(y);
                u_sum += u;
                v_sum += v;
            }
            let uv_base = (by / 2) * width + bx;
            chroma_plane[uv_base] = quantize_chroma(u_sum * 0.25);
            chroma_plane[uv_base + 1] = quantize_chroma(v_sum * 0.25);
        }
    }
    Ok(out)
}

/// Gradient test frame: luma sweeps left to right, U top to bottom, V left
/// to right
pub fn test_pattern(width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let mut data = vec![0u8; required_size(width, height)];
    let (luma_plane, chroma_plane) = data.split_at_mut(w * h);

    for y in 0..h {
        for x in 0..w {
            luma_plane[y * w + x] = (16 + x * 219 / w) as u8;
        }
    }
    for y in 0..h / 2 {
        for x in 0..w / 2 {
            let base = y * w + x * 2;
            chroma_plane[base] = (16 + y * 224 / (h / 2)) as u8;
            chroma_plane[base + 1] = (16 + x * 224 / (w / 2)) as u8;
        }
    }
    data
}
