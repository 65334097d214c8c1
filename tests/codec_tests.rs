// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the CPU codecs: range, size, round-trip and
//! channel-order properties

use capture_convert::color::ColorMatrix;
use capture_convert::formats::{ConversionParams, PixelFormat, nv12, yuy2};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Smooth two-axis gradient in RGBA order: red sweeps x, green sweeps y,
/// blue constant
fn smooth_gradient(width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let mut data = vec![0u8; w * h * 4];
    for y in 0..h {
        for x in 0..w {
            let px = (y * w + x) * 4;
            data[px] = (x * 255 / (w - 1).max(1)) as u8;
            data[px + 1] = (y * 255 / (h - 1).max(1)) as u8;
            data[px + 2] = 128;
            data[px + 3] = 255;
        }
    }
    data
}

fn channel_errors(a: &[u8], b: &[u8]) -> (u8, f64) {
    let mut max = 0u8;
    let mut sum = 0u64;
    let mut count = 0u64;
    for (pa, pb) in a.chunks_exact(4).zip(b.chunks_exact(4)) {
        for c in 0..3 {
            let diff = pa[c].abs_diff(pb[c]);
            max = max.max(diff);
            sum += diff as u64;
            count += 1;
        }
    }
    (max, sum as f64 / count as f64)
}

#[test]
fn yuy2_range_invariant_on_random_input() {
    let matrix = ColorMatrix::bt601();
    let mut rng = StdRng::seed_from_u64(0x1c010);
    let (w, h) = (63u32, 17u32);
    let src: Vec<u8> = (0..w * h * 4).map(|_| rng.random()).collect();
    let params = ConversionParams::packed(w, h);
    let out = yuy2::encode_from_packed(&src, PixelFormat::Bgra8, &params, &matrix).unwrap();

    assert_eq!(out.len(), yuy2::encoded_size(w, h));
    for mp in out.chunks_exact(4) {
        assert!((16..=235).contains(&mp[0]), "Y0 {} out of range", mp[0]);
        assert!((16..=235).contains(&mp[2]), "Y1 {} out of range", mp[2]);
        assert!((16..=240).contains(&mp[1]), "U {} out of range", mp[1]);
        assert!((16..=240).contains(&mp[3]), "V {} out of range", mp[3]);
    }
}

#[test]
fn yuy2_size_invariant() {
    for (w, h) in [(1u32, 1u32), (2, 1), (3, 5), (640, 480), (1919, 1081)] {
        assert_eq!(
            yuy2::encoded_size(w, h),
            (w as usize).div_ceil(2) * h as usize * 4
        );
    }
    assert_eq!(nv12::required_size(1920, 1080), 1920 * 1080 * 3 / 2);
}

#[test]
fn yuy2_round_trip_on_smooth_gradient() {
    let matrix = ColorMatrix::bt601();
    let (w, h) = (256u32, 64u32);
    let src = smooth_gradient(w, h);
    let params = ConversionParams::packed(w, h);

    let encoded = yuy2::encode_from_packed(&src, PixelFormat::Rgba8, &params, &matrix).unwrap();
    let decoded = yuy2::decode_to_rgba(&encoded, w, h, &matrix).unwrap();

    let (max, mean) = channel_errors(&src, &decoded);
    assert!(max <= 3, "max channel error {} too large", max);
    assert!(mean <= 1.5, "mean channel error {:.2} too large", mean);
}

#[test]
fn nv12_round_trip_on_smooth_gradient() {
    let matrix = ColorMatrix::bt601();
    let (w, h) = (256u32, 64u32);
    let src = smooth_gradient(w, h);
    let params = ConversionParams::packed(w, h);

    let encoded = nv12::encode_from_packed(&src, PixelFormat::Rgba8, &params, &matrix).unwrap();
    assert_eq!(encoded.len(), nv12::required_size(w, h));

    let planar = ConversionParams::planar(w, h);
    let decoded = nv12::decode_to_rgba(&encoded, &planar, &matrix).unwrap();

    let (max, mean) = channel_errors(&src, &decoded);
    assert!(max <= 4, "max channel error {} too large", max);
    assert!(mean <= 1.5, "mean channel error {:.2} too large", mean);
}

#[test]
fn one_pixel_wide_image_duplicates_luma() {
    let matrix = ColorMatrix::bt601();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..16 {
        let px: [u8; 4] = [rng.random(), rng.random(), rng.random(), 255];
        let params = ConversionParams::packed(1, 1);
        let out = yuy2::encode_from_packed(&px, PixelFormat::Bgra8, &params, &matrix).unwrap();

        assert_eq!(out.len(), 4);
        assert_eq!(out[0], out[2], "odd-width luma slots must match");
        // Chroma is the single pixel's own, unaveraged
        let (_, u, v) = matrix.rgb_to_studio(
            px[2] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[0] as f32 / 255.0,
        );
        assert_eq!(out[1], u);
        assert_eq!(out[3], v);
    }
}

#[test]
fn mid_gray_encodes_uniformly() {
    let matrix = ColorMatrix::bt601();
    for (w, h) in [(2u32, 2u32), (17, 9), (640, 480)] {
        let src = vec![128u8; (w * h * 4) as usize];
        let params = ConversionParams::packed(w, h);
        let out = yuy2::encode_from_packed(&src, PixelFormat::Bgra8, &params, &matrix).unwrap();
        for mp in out.chunks_exact(4) {
            assert_eq!(mp, &[126, 128, 126, 128], "{}x{} macropixel drifted", w, h);
        }
    }
}

#[test]
fn solid_red_survives_round_trip() {
    let matrix = ColorMatrix::bt601();
    let (w, h) = (16u32, 8u32);
    let params = ConversionParams::packed(w, h);

    // Same image through both source orders; a channel swap would turn
    // red into cyan-ish output and fail loudly
    for (format, px) in [
        (PixelFormat::Bgra8, [0u8, 0, 255, 255]),
        (PixelFormat::Rgba8, [255u8, 0, 0, 255]),
    ] {
        let src = px.repeat((w * h) as usize);
        let encoded = yuy2::encode_from_packed(&src, format, &params, &matrix).unwrap();
        let decoded = yuy2::decode_to_rgba(&encoded, w, h, &matrix).unwrap();
        for out in decoded.chunks_exact(4) {
            assert!(out[0] >= 250, "red channel collapsed: {:?}", out);
            assert!(out[1] <= 6, "green leaked in: {:?}", out);
            assert!(out[2] <= 6, "blue leaked in: {:?}", out);
        }
    }
}

#[test]
fn srgb_variants_convert_as_linear() {
    let matrix = ColorMatrix::bt601();
    let params = ConversionParams::packed(4, 2);
    let src = [10u8, 200, 60, 255].repeat(8);
    let plain = yuy2::encode_from_packed(&src, PixelFormat::Bgra8, &params, &matrix).unwrap();
    let tagged = yuy2::encode_from_packed(&src, PixelFormat::Bgra8Srgb, &params, &matrix).unwrap();
    assert_eq!(plain, tagged);
}

#[test]
fn nv12_gradient_pattern_decodes() {
    let matrix = ColorMatrix::bt601();
    let (w, h) = (64u32, 32u32);
    let data = nv12::test_pattern(w, h);
    let params = ConversionParams::planar(w, h);
    let rgba = nv12::decode_to_rgba(&data, &params, &matrix).unwrap();

    assert_eq!(rgba.len(), (w * h * 4) as usize);
    // Luma sweeps left to right, so the right edge is brighter than the left
    let left = &rgba[0..3];
    let right = &rgba[((w - 1) * 4) as usize..((w - 1) * 4 + 3) as usize];
    let left_sum: u32 = left.iter().map(|&b| b as u32).sum();
    let right_sum: u32 = right.iter().map(|&b| b as u32).sum();
    assert!(right_sum > left_sum);
}
