// SPDX-License-Identifier: GPL-3.0-only

//! Pixel-format conversion engine for live capture
//!
//! Converts between packed 32-bit color (BGRA/RGBA), the packed 4:2:2
//! macropixel format (YUY2) and the planar 4:2:0 format (NV12). The
//! conversions run as wgpu compute shaders with a CPU reference path used
//! for validation and as an automatic fallback when no GPU is available.
//!
//! # Architecture
//!
//! - [`color`]: RGB to luma/chroma transform with studio-range remapping
//! - [`formats`]: byte layouts and the CPU reference codecs
//! - [`shaders`]: dispatch planning and the GPU conversion pipelines
//! - [`capture`]: capture-source abstraction and the convert loop
//! - [`validate`]: statistical checks over converted output
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use capture_convert::{ConvertLoop, LoopConfig, TestPatternSource};
//!
//! let source = TestPatternSource::new(1920, 1080, Duration::from_millis(16));
//! let mut convert = ConvertLoop::new(Box::new(source), LoopConfig::default());
//! convert.run_iteration();
//! ```

pub mod capture;
pub mod color;
pub mod config;
pub mod constants;
pub mod errors;
pub mod formats;
pub mod gpu;
pub mod shaders;
pub mod validate;

// Re-export commonly used types
pub use capture::{
    CaptureEvent, CaptureLoopController, CaptureSource, CapturedFrame, ConvertLoop, LoopAction,
    TestPatternSource,
};
pub use color::ColorMatrix;
pub use config::LoopConfig;
pub use errors::{ConvertError, ConvertResult};
pub use formats::{ConversionParams, PixelFormat};
