// SPDX-License-Identifier: GPL-3.0-only

//! Shared GPU processor infrastructure
//!
//! Provides common functionality for both conversion processors:
//! - Singleton management (OnceLock<Mutex<Option<T>>>)
//! - Buffer allocation with dimension caching
//! - Async staging-buffer readback
//! - Dispatch-size arithmetic

use crate::errors::{ConvertError, ConvertResult};

/// Cached resource dimensions - avoids reallocation when dimensions match
///
/// Used by processors to track if buffers need to be recreated when the
/// input/output dimensions change. The dispatch grid itself is recomputed on
/// every call; only device resources are cached.
#[derive(Default, Clone, Copy, PartialEq, Debug)]
pub struct CachedDimensions {
    pub width: u32,
    pub height: u32,
}

impl CachedDimensions {
    /// Check if dimensions have changed and need update
    pub fn needs_update(&self, width: u32, height: u32) -> bool {
        self.width != width || self.height != height
    }

    /// Update cached dimensions
    pub fn update(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Check if dimensions are initialized (non-zero)
    pub fn is_initialized(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Helper for async buffer readback (map, poll, read, unmap)
///
/// This is the synchronous barrier of the readback path: it blocks until the
/// device-side work feeding `buffer` has completed.
pub async fn read_buffer_async(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> ConvertResult<Vec<u8>> {
    let slice = buffer.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();

    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    let _ = device.poll(wgpu::PollType::wait_indefinitely());

    receiver
        .await
        .map_err(|_| ConvertError::TransientResource("failed to receive buffer mapping".into()))?
        .map_err(|e| ConvertError::TransientResource(format!("failed to map buffer: {:?}", e)))?;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();

    Ok(data)
}

/// Calculate compute shader dispatch size (workgroups needed)
///
/// Given a dimension and workgroup size, returns the number of workgroups
/// needed to cover the entire dimension.
#[inline]
pub fn compute_dispatch_size(dimension: u32, workgroup_size: u32) -> u32 {
    dimension.div_ceil(workgroup_size)
}

/// Macro for generating singleton accessor functions
///
/// Each processor needs a static OnceLock<Mutex<Option<Processor>>> and a
/// get function that lazily initializes it; this macro generates both.
///
/// # Example
/// ```ignore
/// gpu_processor_singleton!(Yuy2EncodeProcessor, GPU_YUY2_ENCODER, get_yuy2_encoder);
/// ```
#[macro_export]
macro_rules! gpu_processor_singleton {
    ($processor:ty, $static_name:ident, $get_fn:ident) => {
        /// Cached GPU processor instance
        static $static_name: std::sync::OnceLock<tokio::sync::Mutex<Option<$processor>>> =
            std::sync::OnceLock::new();

        /// Get or create the shared GPU processor instance
        pub async fn $get_fn() -> $crate::errors::ConvertResult<
            tokio::sync::MutexGuard<'static, Option<$processor>>,
        > {
            let lock = $static_name.get_or_init(|| tokio::sync::Mutex::new(None));
            let mut guard = lock.lock().await;

            if guard.is_none() {
                match <$processor>::new().await {
                    Ok(processor) => {
                        *guard = Some(processor);
                    }
                    Err(e) => {
                        tracing::warn!(
                            concat!("failed to initialize GPU ", stringify!($processor), ": {}"),
                            e
                        );
                        return Err(e);
                    }
                }
            }

            Ok(guard)
        }
    };
}
