// SPDX-License-Identifier: GPL-3.0-only

//! Compute-shader conversion pipelines
//!
//! The WGSL kernels embedded here are the single source of truth for the
//! GPU side of each conversion; the CPU codecs in [`crate::formats`] mirror
//! their arithmetic and serve as the reference in tests.

pub mod dispatch;
mod gpu_processor;
pub mod nv12_decode;
pub mod yuy2_encode;

pub use dispatch::DispatchGrid;
pub use gpu_processor::{CachedDimensions, compute_dispatch_size, read_buffer_async};
pub use nv12_decode::{Nv12DecodeProcessor, decode_nv12_frame, get_nv12_decoder};
pub use yuy2_encode::{Yuy2EncodeProcessor, encode_frame, get_yuy2_encoder};
