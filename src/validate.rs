// SPDX-License-Identifier: GPL-3.0-only

//! Statistical validation of converted output
//!
//! Runs off the hot path (every N converted frames) to catch systemic
//! corruption - a stuck shader, a mis-bound buffer, a channel-order swap -
//! without paying readback cost on every frame. The checks are statistical
//! over the full buffer rather than a fixed byte prefix.

use crate::constants::{
    CHROMA_MAX, CHROMA_MIN, LUMA_MAX, LUMA_MIN, VALIDATION_MAX_OUT_OF_RANGE,
};
use crate::formats::yuy2;

/// Aggregate statistics over one YUY2 buffer
#[derive(Debug, Clone)]
pub struct Yuy2Stats {
    /// Fraction of luma bytes inside [16, 235]
    pub luma_in_range: f64,
    /// Fraction of chroma bytes inside [16, 240]
    pub chroma_in_range: f64,
    /// Mean luma over the whole buffer
    pub mean_luma: f64,
}

/// Full-sample statistics over a YUY2 buffer
pub fn analyze_yuy2(data: &[u8]) -> Yuy2Stats {
    let mut luma_ok = 0u64;
    let mut chroma_ok = 0u64;
    let mut luma_sum = 0u64;
    let mut luma_count = 0u64;
    let mut chroma_count = 0u64;

    for mp in data.chunks_exact(4) {
        for y in [mp[0], mp[2]] {
            luma_count += 1;
            luma_sum += y as u64;
            if (LUMA_MIN..=LUMA_MAX).contains(&y) {
                luma_ok += 1;
            }
        }
        for c in [mp[1], mp[3]] {
            chroma_count += 1;
            if (CHROMA_MIN..=CHROMA_MAX).contains(&c) {
                chroma_ok += 1;
            }
        }
    }

    Yuy2Stats {
        luma_in_range: luma_ok as f64 / luma_count.max(1) as f64,
        chroma_in_range: chroma_ok as f64 / chroma_count.max(1) as f64,
        mean_luma: luma_sum as f64 / luma_count.max(1) as f64,
    }
}

/// Check one YUY2 buffer against the studio-range invariants
///
/// Fails when the buffer size does not match the geometry or when more than
/// 10% of either component falls outside its studio range.
pub fn check_yuy2(data: &[u8], width: u32, height: u32) -> Result<Yuy2Stats, String> {
    let expected = yuy2::encoded_size(width, height);
    if data.len() != expected {
        return Err(format!(
            "YUY2 size mismatch: expected {} bytes for {}x{}, got {}",
            expected,
            width,
            height,
            data.len()
        ));
    }

    let stats = analyze_yuy2(data);
    if 1.0 - stats.luma_in_range > VALIDATION_MAX_OUT_OF_RANGE {
        return Err(format!(
            "{:.1}% of luma bytes outside [{}, {}]",
            (1.0 - stats.luma_in_range) * 100.0,
            LUMA_MIN,
            LUMA_MAX
        ));
    }
    if 1.0 - stats.chroma_in_range > VALIDATION_MAX_OUT_OF_RANGE {
        return Err(format!(
            "{:.1}% of chroma bytes outside [{}, {}]",
            (1.0 - stats.chroma_in_range) * 100.0,
            CHROMA_MIN,
            CHROMA_MAX
        ));
    }
    Ok(stats)
}

/// Spot-check decoded RGBA output on a sampled grid
///
/// Every sampled pixel must be fully opaque; a transparent pixel means the
/// kernel never wrote that position.
pub fn check_rgba_alpha(data: &[u8], width: u32, height: u32) -> Result<(), String> {
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(format!(
            "RGBA size mismatch: expected {} bytes for {}x{}, got {}",
            expected,
            width,
            height,
            data.len()
        ));
    }

    let step_x = (width / 4).max(1) as usize;
    let step_y = (height / 4).max(1) as usize;
    for y in (0..height as usize).step_by(step_y) {
        for x in (0..width as usize).step_by(step_x) {
            let alpha = data[(y * width as usize + x) * 4 + 3];
            if alpha != 255 {
                return Err(format!("alpha {} at ({}, {})", alpha, x, y));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorMatrix;
    use crate::formats::{ConversionParams, PixelFormat};

    #[test]
    fn test_encoded_output_passes() {
        let matrix = ColorMatrix::bt601();
        let src: Vec<u8> = (0..64u32 * 16)
            .flat_map(|i| [(i % 256) as u8, ((i * 3) % 256) as u8, 40, 255])
            .collect();
        let params = ConversionParams::packed(64, 16);
        let yuy2 =
            yuy2::encode_from_packed(&src, PixelFormat::Bgra8, &params, &matrix).unwrap();

        let stats = check_yuy2(&yuy2, 64, 16).expect("valid output must pass");
        assert_eq!(stats.luma_in_range, 1.0);
        assert_eq!(stats.chroma_in_range, 1.0);
    }

    #[test]
    fn test_flat_zero_buffer_fails() {
        // A buffer the kernel never wrote is all zeros, far below the
        // studio floor
        let data = vec![0u8; yuy2::encoded_size(8, 8)];
        assert!(check_yuy2(&data, 8, 8).is_err());
    }

    #[test]
    fn test_size_mismatch_fails() {
        let data = vec![128u8; 64];
        assert!(check_yuy2(&data, 100, 100).is_err());
    }

    #[test]
    fn test_tolerates_sparse_outliers() {
        // A handful of out-of-range bytes stays under the 10% threshold
        let mut data = vec![128u8; yuy2::encoded_size(32, 32)];
        for byte in data.iter_mut().take(8) {
            *byte = 0;
        }
        assert!(check_yuy2(&data, 32, 32).is_ok());
    }

    #[test]
    fn test_rgba_alpha_check() {
        let mut rgba = vec![255u8; 8 * 8 * 4];
        assert!(check_rgba_alpha(&rgba, 8, 8).is_ok());
        // Knock out a sampled pixel's alpha
        rgba[3] = 0;
        assert!(check_rgba_alpha(&rgba, 8, 8).is_err());
    }
}
