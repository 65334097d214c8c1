// SPDX-License-Identifier: GPL-3.0-only

//! GPU initialization utilities for the compute pipelines
//!
//! This module provides helpers for creating wgpu devices for compute
//! operations. The conversion engine issues all of its parallel work through
//! a device and queue obtained here.

use std::sync::Arc;
use tracing::info;

use crate::errors::{ConvertError, ConvertResult};

/// Information about the created GPU device
#[derive(Debug)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, etc.)
    pub backend: wgpu::Backend,
}

/// Create a wgpu device and queue for compute work.
///
/// # Arguments
///
/// * `label` - A label for the device (for debugging)
///
/// # Returns
///
/// A tuple of (Device, Queue, GpuDeviceInfo), or a fatal resource error when
/// no usable adapter or device exists.
pub async fn create_compute_device(
    label: &str,
) -> ConvertResult<(Arc<wgpu::Device>, Arc<wgpu::Queue>, GpuDeviceInfo)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| {
            ConvertError::FatalResource(format!("failed to find suitable GPU adapter: {}", e))
        })?;

    let adapter_info = adapter.get_info();

    info!(
        label = label,
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        "GPU adapter selected for compute"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| ConvertError::FatalResource(format!("failed to create GPU device: {}", e)))?;

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name.clone(),
        backend: adapter_info.backend,
    };

    Ok((Arc::new(device), Arc::new(queue), info))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_compute_device() {
        // This test requires a GPU, so it may be skipped in CI
        match create_compute_device("test_device").await {
            Ok((device, queue, info)) => {
                println!("Created device: {:?}", info);
                assert!(!info.adapter_name.is_empty());
                drop(queue);
                drop(device);
            }
            Err(e) => {
                // Skip if no GPU available
                println!("Skipping test (no GPU): {}", e);
            }
        }
    }
}
