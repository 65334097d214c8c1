// SPDX-License-Identifier: GPL-3.0-only

//! Packed 4:2:2 (YUY2) codec, CPU reference path
//!
//! One 4-byte macropixel encodes two horizontally adjacent pixels as
//! [Y0, U, Y1, V]; the chroma pair is shared by both pixels. An odd-width
//! row pairs its trailing pixel with a duplicate of itself, never with a
//! pixel wrapped from the next row.

use crate::color::{ColorMatrix, quantize_chroma, quantize_luma};
use crate::errors::{ConvertError, ConvertResult};
use crate::formats::{ConversionParams, PixelFormat};

/// Macropixels per row: `ceil(width / 2)`
#[inline]
pub fn macropixels_per_row(width: u32) -> u32 {
    width.div_ceil(2)
}

/// Encoded buffer size: `ceil(W/2) * H * 4` bytes
#[inline]
pub fn encoded_size(width: u32, height: u32) -> usize {
    macropixels_per_row(width) as usize * height as usize * 4
}

/// Encode packed 32-bit color into YUY2
///
/// Luma is computed independently per pixel; the pair's chroma values are
/// averaged before rounding (2:1 horizontal decimation).
pub fn encode_from_packed(
    src: &[u8],
    format: PixelFormat,
    params: &ConversionParams,
    matrix: &ColorMatrix,
) -> ConvertResult<Vec<u8>> {
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
    let stride = params.y_stride as usize;
    let (ro, go, bo) = format.rgb_offsets();
    let pairs = macropixels_per_row(params.width) as usize;

    let mut out = Vec::with_capacity(encoded_size(params.width, params.height));
    for row in 0..params.height as usize {
        let row_bytes = &src[row * stride..];
        for pair in 0..pairs {
            let x0 = pair * 2;
            let x1 = (x0 + 1).min(width - 1);
            let p0 = &row_bytes[x0 * 4..x0 * 4 + 4];
            let p1 = &row_bytes[x1 * 4..x1 * 4 + 4];

            let (y0, u0, v0) = matrix.rgb_to_ycbcr(
                p0[ro] as f32 / 255.0,
                p0[go] as f32 / 255.0,
                p0[bo] as f32 / 255.0,
            );
            let (y1, u1, v1) = matrix.rgb_to_ycbcr(
                p1[ro] as f32 / 255.0,
                p1[go] as f32 / 255.0,
                p1[bo] as f32 / 255.0,
            );

            out.push(quantize_luma(y0));
            out.push(quantize_chroma((u0 + u1) * 0.5));
            out.push(quantize_luma(y1));
            out.push(quantize_chroma((v0 + v1) * 0.5));
        }
    }
    Ok(out)
}

/// Decode YUY2 back to RGBA8 (alpha = 255)
///
/// Each pixel reads luma from its own slot and chroma from the macropixel
/// that covers it.
pub fn decode_to_rgba(
    src: &[u8],
    width: u32,
    height: u32,
    matrix: &ColorMatrix,
) -> ConvertResult<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(ConvertError::RejectedInput(format!(
            "invalid dimensions {}x{}",
            width, height
        )));
    }
    let needed = encoded_size(width, height);
    if src.len() < needed {
        return Err(ConvertError::RejectedInput(format!(
            "YUY2 source is {} bytes, {}x{} needs {}",
            src.len(),
            width,
            height,
            needed
        )));
    }

    let pairs = macropixels_per_row(width) as usize;
    let mut out = Vec::with_capacity(width as usize * height as usize * 4);
    for row in 0..height as usize {
        let row_base = row * pairs * 4;
        for x in 0..width as usize {
            let mp = row_base + (x / 2) * 4;
            let y = if x % 2 == 0 { src[mp] } else { src[mp + 2] };
            let (r, g, b) = matrix.studio_to_rgb(y, src[mp + 1], src[mp + 3]);
            out.push((r * 255.0).round() as u8);
            out.push((g * 255.0).round() as u8);
            out.push((b * 255.0).round() as u8);
            out.push(255);
        }
    }
    Ok(out)
}
