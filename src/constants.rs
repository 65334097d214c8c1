// SPDX-License-Identifier: GPL-3.0-only

//! Engine-wide constants

/// Work items per axis in one compute workgroup tile
///
/// The dispatch planner and both WGSL kernels must agree on this value;
/// the `@workgroup_size` attributes in the shaders mirror it.
pub const WORKGROUP_SIZE: u32 = 16;

/// Studio-range luma bounds within an 8-bit channel
pub const LUMA_MIN: u8 = 16;
pub const LUMA_MAX: u8 = 235;

/// Studio-range chroma bounds within an 8-bit channel
pub const CHROMA_MIN: u8 = 16;
pub const CHROMA_MAX: u8 = 240;

/// Fraction of out-of-range component bytes above which output validation
/// reports a failure
pub const VALIDATION_MAX_OUT_OF_RANGE: f64 = 0.10;
