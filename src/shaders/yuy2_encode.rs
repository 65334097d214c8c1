// SPDX-License-Identifier: GPL-3.0-only

//! GPU-accelerated packed color to YUY2 (4:2:2) conversion
//!
//! One compute work item encodes one horizontal pixel pair into a 4-byte
//! macropixel. The output is a raw buffer laid out exactly as downstream
//! video consumers expect: `ceil(W/2) * 4` bytes per row, [Y0, U, Y1, V].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::capture::CapturedFrame;
use crate::color::ColorMatrix;
use crate::errors::{ConvertError, ConvertResult};
use crate::formats::{ConversionParams, PixelFormat, yuy2};
use crate::gpu;
use crate::shaders::dispatch::DispatchGrid;
use crate::shaders::gpu_processor::{CachedDimensions, read_buffer_async};

/// Uniform buffer for shader parameters
///
/// Must match the `EncodeParams` struct in `rgba_to_yuy2.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct EncodeParams {
    width: u32,
    height: u32,
    source_order: u32,
    words_per_row: u32,
}

/// Result of a packed-color to YUY2 conversion
#[derive(Debug)]
pub struct Yuy2EncodeResult {
    /// Width of the source image in pixels
    pub width: u32,
    /// Height of the source image in pixels
    pub height: u32,
    /// YUY2 bytes - only populated if read back to CPU
    pub yuy2: Option<Vec<u8>>,
}

/// GPU processor for packed color to YUY2 conversion
pub struct Yuy2EncodeProcessor {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    // Cached resources for reuse across same-sized frames
    cached_dims: CachedDimensions,
    uniform_buffer: Option<wgpu::Buffer>,
    input_buffer: Option<wgpu::Buffer>,
    output_buffer: Option<wgpu::Buffer>,
    staging_buffer: Option<wgpu::Buffer>,
}

impl Yuy2EncodeProcessor {
    /// Create a new YUY2 encoder with GPU acceleration
    pub async fn new() -> ConvertResult<Self> {
        let (device, queue, info) = gpu::create_compute_device("YUY2 Encode").await?;

        info!(
            adapter_name = %info.adapter_name,
            "GPU device created for YUY2 encoding"
        );

        let shader_source = include_str!("rgba_to_yuy2.wgsl");
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("RGBA to YUY2 Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("YUY2 Encode Bind Group Layout"),
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
                // Input packed-color buffer
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
                // Output YUY2 buffer (raw words, one per macropixel)
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("YUY2 Encode Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("RGBA to YUY2 Pipeline"),
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
            output_buffer: None,
            staging_buffer: None,
        })
    }

    /// Ensure resources are allocated for the given dimensions
    fn ensure_resources(&mut self, width: u32, height: u32) {
        if !self.cached_dims.needs_update(width, height) {
            return;
        }

        debug!(width, height, "Allocating YUY2 encode resources");

        self.uniform_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("YUY2 Params Buffer"),
            size: std::mem::size_of::<EncodeParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));

        // Input: 4 bytes per pixel, tightly packed rows
        let input_size = (width * height * 4) as u64;
        self.input_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Packed Color Input Buffer"),
            size: input_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));

        // Output: one 32-bit macropixel per pixel pair
        let output_size = yuy2::encoded_size(width, height) as u64;
        self.output_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("YUY2 Output Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        }));

        // Staging buffer for reading back to CPU (optional)
        self.staging_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("YUY2 Staging Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        }));

        self.cached_dims.update(width, height);
    }

    /// Convert packed 32-bit color to YUY2 on the GPU
    ///
    /// # Arguments
    /// * `src` - Packed color bytes covering the geometry in `params`
    /// * `format` - Source channel order (sRGB variants convert as linear)
    /// * `params` - Image geometry; `y_stride` is the packed row stride
    /// * `read_back` - If true, read YUY2 data back to CPU
    pub async fn convert(
        &mut self,
        src: &[u8],
        format: PixelFormat,
        params: &ConversionParams,
        read_back: bool,
    ) -> ConvertResult<Yuy2EncodeResult> {
        // Fail fast before any resource work
        params.validate_packed()?;
        let required = params.packed_required_bytes();
        if src.len() < required {
            return Err(ConvertError::RejectedInput(format!(
                "packed source is {} bytes, geometry needs {}",
                src.len(),
                required
            )));
        }

        let width = params.width;
        let height = params.height;
        self.ensure_resources(width, height);

        let uniform_buffer = self.uniform_buffer.as_ref().unwrap();
        let input_buffer = self.input_buffer.as_ref().unwrap();
        let output_buffer = self.output_buffer.as_ref().unwrap();

        let shader_params = EncodeParams {
            width,
            height,
            source_order: format.kernel_order(),
            words_per_row: yuy2::macropixels_per_row(width),
        };
        self.queue
            .write_buffer(uniform_buffer, 0, bytemuck::bytes_of(&shader_params));

        // Upload the source, dropping any row padding so the kernel sees
        // tightly packed rows
        let tight_row = (width * 4) as usize;
        if params.y_stride as usize == tight_row {
            self.queue
                .write_buffer(input_buffer, 0, &src[..tight_row * height as usize]);
        } else {
            let stride = params.y_stride as usize;
            for row in 0..height as usize {
                self.queue.write_buffer(
                    input_buffer,
                    (row * tight_row) as u64,
                    &src[row * stride..row * stride + tight_row],
                );
            }
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("YUY2 Encode Bind Group"),
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
                    resource: output_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("YUY2 Encode Encoder"),
            });

        // One work item per pixel pair
        let grid = DispatchGrid::for_pixel_pairs(width, height);

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("RGBA to YUY2 Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(grid.groups_x, grid.groups_y, 1);
        }

        if read_back {
            let staging_buffer = self.staging_buffer.as_ref().unwrap();
            encoder.copy_buffer_to_buffer(
                output_buffer,
                0,
                staging_buffer,
                0,
                yuy2::encoded_size(width, height) as u64,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));

        let yuy2 = if read_back {
            let staging_buffer = self.staging_buffer.as_ref().unwrap();
            Some(read_buffer_async(&self.device, staging_buffer).await?)
        } else {
            None
        };

        Ok(Yuy2EncodeResult {
            width,
            height,
            yuy2,
        })
    }

    /// Get the GPU device for sharing with other GPU operations
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// Get the GPU queue for sharing with other GPU operations
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }
}

// Global shared processor instance using the standard macro
crate::gpu_processor_singleton!(Yuy2EncodeProcessor, GPU_YUY2_ENCODER, get_yuy2_encoder);

/// Remembers a fatal GPU initialization failure so subsequent frames go
/// straight to the CPU path instead of re-probing the adapter
static GPU_UNAVAILABLE: AtomicBool = AtomicBool::new(false);

/// Convert one captured frame to YUY2
///
/// This is the main entry point for the capture loop: it tries the shared
/// GPU processor first and falls back to the CPU codec when the GPU is
/// unavailable. Input rejections are propagated as-is - they would fail on
/// either path.
pub async fn encode_frame(frame: &CapturedFrame) -> ConvertResult<Vec<u8>> {
    let params = ConversionParams::packed_with_stride(frame.width, frame.height, frame.stride);

    if !GPU_UNAVAILABLE.load(Ordering::Relaxed) {
        match encode_gpu(frame, &params).await {
            Ok(data) => return Ok(data),
            Err(e @ ConvertError::RejectedInput(_)) => return Err(e),
            Err(e @ ConvertError::FatalResource(_)) => {
                GPU_UNAVAILABLE.store(true, Ordering::Relaxed);
                info!(error = %e, "GPU encode unavailable, continuing on the CPU path");
            }
            Err(e) => {
                debug!(error = %e, "GPU encode failed, using CPU path for this frame");
            }
        }
    }

    yuy2::encode_from_packed(&frame.data, frame.format, &params, &ColorMatrix::bt601())
}

async fn encode_gpu(frame: &CapturedFrame, params: &ConversionParams) -> ConvertResult<Vec<u8>> {
    let mut guard = get_yuy2_encoder().await?;
    let processor = guard
        .as_mut()
        .ok_or_else(|| ConvertError::FatalResource("YUY2 GPU processor not available".into()))?;

    let result = processor
        .convert(&frame.data, frame.format, params, true)
        .await?;
    result
        .yuy2
        .ok_or_else(|| ConvertError::TransientResource("no YUY2 data returned".into()))
}
