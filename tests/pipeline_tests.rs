// SPDX-License-Identifier: GPL-3.0-only

//! GPU pipeline integration tests
//!
//! These require a GPU adapter and skip themselves when none exists, the
//! same way CI machines without Vulkan skip device creation.

use capture_convert::color::ColorMatrix;
use capture_convert::formats::{ConversionParams, PixelFormat, nv12, yuy2};
use capture_convert::shaders::{Nv12DecodeProcessor, Yuy2EncodeProcessor};

fn gradient_bgra(width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let mut data = vec![0u8; w * h * 4];
    for y in 0..h {
        for x in 0..w {
            let px = (y * w + x) * 4;
            data[px] = (x * 255 / (w - 1).max(1)) as u8;
            data[px + 1] = (y * 255 / (h - 1).max(1)) as u8;
            data[px + 2] = 96;
            data[px + 3] = 255;
        }
    }
    data
}

fn max_byte_diff(a: &[u8], b: &[u8]) -> u8 {
    a.iter().zip(b.iter()).map(|(x, y)| x.abs_diff(*y)).max().unwrap_or(0)
}

#[tokio::test]
async fn gpu_yuy2_encode_matches_cpu_reference() {
    let mut processor = match Yuy2EncodeProcessor::new().await {
        Ok(p) => p,
        Err(e) => {
            println!("Skipping test (no GPU): {}", e);
            return;
        }
    };

    // Odd width exercises the trailing-pixel duplication on the GPU
    let (w, h) = (33u32, 18u32);
    let src = gradient_bgra(w, h);
    let params = ConversionParams::packed(w, h);

    let result = processor
        .convert(&src, PixelFormat::Bgra8, &params, true)
        .await
        .expect("GPU conversion failed");
    let gpu_out = result.yuy2.expect("no readback data");

    let cpu_out =
        yuy2::encode_from_packed(&src, PixelFormat::Bgra8, &params, &ColorMatrix::bt601()).unwrap();

    assert_eq!(gpu_out.len(), cpu_out.len());
    let diff = max_byte_diff(&gpu_out, &cpu_out);
    assert!(diff <= 2, "GPU and CPU encoders disagree by {} levels", diff);
}

#[tokio::test]
async fn gpu_encode_rejects_short_input_before_dispatch() {
    let mut processor = match Yuy2EncodeProcessor::new().await {
        Ok(p) => p,
        Err(e) => {
            println!("Skipping test (no GPU): {}", e);
            return;
        }
    };

    let params = ConversionParams::packed(64, 64);
    let err = processor
        .convert(&[0u8; 16], PixelFormat::Bgra8, &params, true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        capture_convert::ConvertError::RejectedInput(_)
    ));
}

#[tokio::test]
async fn gpu_nv12_decode_matches_cpu_reference() {
    let mut processor = match Nv12DecodeProcessor::new().await {
        Ok(p) => p,
        Err(e) => {
            println!("Skipping test (no GPU): {}", e);
            return;
        }
    };

    let (w, h) = (64u32, 32u32);
    let data = nv12::test_pattern(w, h);
    let params = ConversionParams::planar(w, h);

    let result = processor
        .convert(&data, &params, true)
        .await
        .expect("GPU conversion failed");
    let gpu_out = result.rgba.expect("no readback data");

    let cpu_out = nv12::decode_to_rgba(&data, &params, &ColorMatrix::bt601()).unwrap();

    assert_eq!(gpu_out.len(), cpu_out.len());
    let diff = max_byte_diff(&gpu_out, &cpu_out);
    assert!(diff <= 3, "GPU and CPU decoders disagree by {} levels", diff);
}

#[tokio::test]
async fn gpu_nv12_decode_rejects_odd_dimensions() {
    let mut processor = match Nv12DecodeProcessor::new().await {
        Ok(p) => p,
        Err(e) => {
            println!("Skipping test (no GPU): {}", e);
            return;
        }
    };

    let params = ConversionParams::planar(33, 32);
    let err = processor.convert(&[0u8; 16], &params, true).await.unwrap_err();
    assert!(matches!(
        err,
        capture_convert::ConvertError::RejectedInput(_)
    ));
}
