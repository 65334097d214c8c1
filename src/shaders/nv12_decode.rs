// SPDX-License-Identifier: GPL-3.0-only

//! GPU-accelerated NV12 to RGBA conversion
//!
//! One compute work item decodes one pixel: luma from the dense plane,
//! chroma from the 2x2 block entry of the interleaved UV plane. The output
//! is an RGBA8 storage texture that can stay on the GPU; the readback path
//! exists for verification and the CLI decode mode.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::color::ColorMatrix;
use crate::errors::{ConvertError, ConvertResult};
use crate::formats::{ConversionParams, nv12};
use crate::gpu;
use crate::shaders::dispatch::DispatchGrid;
use crate::shaders::gpu_processor::{CachedDimensions, read_buffer_async};

/// Uniform buffer for shader parameters
///
/// Must match the `DecodeParams` struct in `nv12_to_rgba.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DecodeParams {
    width: u32,
    height: u32,
    y_stride: u32,
    uv_stride: u32,
}

/// Result of an NV12 to RGBA conversion
#[derive(Debug)]
pub struct Nv12DecodeResult {
    /// Width of the output image
    pub width: u32,
    /// Height of the output image
    pub height: u32,
    /// RGBA data (4 bytes per pixel) - only populated if read back to CPU
    pub rgba: Option<Vec<u8>>,
    /// GPU texture handle for zero-copy display
    pub texture: Option<Arc<wgpu::Texture>>,
}

/// GPU processor for NV12 to RGBA conversion
pub struct Nv12DecodeProcessor {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    cached_dims: CachedDimensions,
    uniform_buffer: Option<wgpu::Buffer>,
    input_buffer: Option<wgpu::Buffer>,
    output_texture: Option<Arc<wgpu::Texture>>,
    staging_buffer: Option<wgpu::Buffer>,
}

impl Nv12DecodeProcessor {
    /// Create a new NV12 decoder with GPU acceleration
    pub async fn new() -> ConvertResult<Self> {
        let (device, queue, info) = gpu::create_compute_device("NV12 Decode").await?;

        info!(
            adapter_name = %info.adapter_name,
            "GPU device created for NV12 decoding"
        );

        let shader_source = include_str!("nv12_to_rgba.wgsl");
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("NV12 to RGBA Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("NV12 Decode Bind Group Layout"),
            entries: &[
                // Params uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Input NV12 buffer (both planes, raw words)
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Output RGBA texture
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("NV12 Decode Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("NV12 to RGBA Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader_module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            cached_dims: CachedDimensions::default(),
            uniform_buffer: None,
            input_buffer: None,
            output_texture: None,
            staging_buffer: None,
        })
    }

    /// Padded bytes-per-row for texture readback (256-byte alignment)
    fn padded_bytes_per_row(width: u32) -> u32 {
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        unpadded.div_ceil(align) * align
    }

    /// Ensure resources are allocated for the given dimensions
    fn ensure_resources(&mut self, width: u32, height: u32) {
        if !self.cached_dims.needs_update(width, height) {
            return;
        }

        debug!(width, height, "Allocating NV12 decode resources");

        self.uniform_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("NV12 Params Buffer"),
            size: std::mem::size_of::<DecodeParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));

        // Input: both planes in one raw buffer, rounded up to whole words
        let input_size = (nv12::required_size(width, height) as u64).next_multiple_of(4);
        self.input_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("NV12 Input Buffer"),
            size: input_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("RGBA Output Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        self.output_texture = Some(Arc::new(texture));

        let staging_size = (Self::padded_bytes_per_row(width) * height) as u64;
        self.staging_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("RGBA Staging Buffer"),
            size: staging_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        }));

        self.cached_dims.update(width, height);
    }

    /// Convert NV12 data to RGBA on the GPU
    ///
    /// # Arguments
    /// * `src` - NV12 bytes: luma plane followed by the interleaved UV plane
    /// * `params` - Image geometry and plane strides
    /// * `read_back` - If true, read RGBA data back to CPU
    pub async fn convert(
        &mut self,
        src: &[u8],
        params: &ConversionParams,
        read_back: bool,
    ) -> ConvertResult<Nv12DecodeResult> {
        // Fail fast before any resource work
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

        let width = params.width;
        let height = params.height;
        self.ensure_resources(width, height);

        let uniform_buffer = self.uniform_buffer.as_ref().unwrap();
        let input_buffer = self.input_buffer.as_ref().unwrap();
        let output_texture = self.output_texture.as_ref().unwrap();

        let shader_params = DecodeParams {
            width,
            height,
            y_stride: params.y_stride,
            uv_stride: params.uv_stride,
        };
        self.queue
            .write_buffer(uniform_buffer, 0, bytemuck::bytes_of(&shader_params));

        // Upload both planes; pad the tail so the write stays word-aligned
        if src.len() % 4 == 0 {
            self.queue.write_buffer(input_buffer, 0, src);
        } else {
            let mut padded = src.to_vec();
            padded.resize(src.len().next_multiple_of(4), 0);
            self.queue.write_buffer(input_buffer, 0, &padded);
        }

        let output_view = output_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("NV12 Decode Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: input_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&output_view),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("NV12 Decode Encoder"),
            });

        // One work item per pixel
        let grid = DispatchGrid::for_pixels(width, height);

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("NV12 to RGBA Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(grid.groups_x, grid.groups_y, 1);
        }

        let padded_bytes_per_row = Self::padded_bytes_per_row(width);
        if read_back {
            let staging_buffer = self.staging_buffer.as_ref().unwrap();
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture: output_texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: staging_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_bytes_per_row),
                        rows_per_image: Some(height),
                    },
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));

        let rgba = if read_back {
            let staging_buffer = self.staging_buffer.as_ref().unwrap();
            let padded = read_buffer_async(&self.device, staging_buffer).await?;

            // Drop the per-row alignment padding
            let tight_row = (width * 4) as usize;
            let mut data = Vec::with_capacity(tight_row * height as usize);
            for row in 0..height as usize {
                let start = row * padded_bytes_per_row as usize;
                data.extend_from_slice(&padded[start..start + tight_row]);
            }
            Some(data)
        } else {
            None
        };

        Ok(Nv12DecodeResult {
            width,
            height,
            rgba,
            texture: Some(Arc::clone(output_texture)),
        })
    }

    /// Get the GPU device for sharing with other GPU operations
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// Get the current output texture (if any)
    pub fn output_texture(&self) -> Option<&Arc<wgpu::Texture>> {
        self.output_texture.as_ref()
    }
}

// Global shared processor instance using the standard macro
crate::gpu_processor_singleton!(Nv12DecodeProcessor, GPU_NV12_DECODER, get_nv12_decoder);

/// Remembers a fatal GPU initialization failure so subsequent calls go
/// straight to the CPU path instead of re-probing the adapter
static GPU_UNAVAILABLE: AtomicBool = AtomicBool::new(false);

/// Decode one NV12 frame to RGBA
///
/// Tries the shared GPU processor first and falls back to the CPU codec
/// when the GPU is unavailable. Input rejections are propagated as-is.
pub async fn decode_nv12_frame(src: &[u8], params: &ConversionParams) -> ConvertResult<Vec<u8>> {
    if !GPU_UNAVAILABLE.load(Ordering::Relaxed) {
        match decode_gpu(src, params).await {
            Ok(data) => return Ok(data),
            Err(e @ ConvertError::RejectedInput(_)) => return Err(e),
            Err(e @ ConvertError::FatalResource(_)) => {
                GPU_UNAVAILABLE.store(true, Ordering::Relaxed);
                info!(error = %e, "GPU decode unavailable, continuing on the CPU path");
            }
            Err(e) => {
                debug!(error = %e, "GPU decode failed, using CPU path for this frame");
            }
        }
    }

    nv12::decode_to_rgba(src, params, &ColorMatrix::bt601())
}

async fn decode_gpu(src: &[u8], params: &ConversionParams) -> ConvertResult<Vec<u8>> {
    let mut guard = get_nv12_decoder().await?;
    let processor = guard
        .as_mut()
        .ok_or_else(|| ConvertError::FatalResource("NV12 GPU processor not available".into()))?;

    let result = processor.convert(src, params, true).await?;
    result
        .rgba
        .ok_or_else(|| ConvertError::TransientResource("no RGBA data returned".into()))
}
