use std::sync::Arc;

use bevy::prelude::*;
use wgpu::util::DeviceExt;

use crate::error::{StreamError, StreamResult};

pub mod decode;
pub mod depth;

pub use decode::GpuDecoder;
pub use depth::GpuDepthKernel;


pub const WORKGROUP_SIZE: u32 = 256;
const MAX_WORKGROUPS_PER_DIM: u32 = 65535;


/// device and queue shared by every compute kernel
#[derive(Clone)]
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_name: String,
}

impl GpuContext {
    pub async fn new() -> StreamResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| StreamError::DeviceUnavailable("no compatible adapter".to_string()))?;

        let info = adapter.get_info();
        let limits = adapter.limits();
        info!(
            adapter = %info.name,
            backend = ?info.backend,
            max_storage_mb = limits.max_storage_buffer_binding_size / (1024 * 1024),
            "compute adapter selected",
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("splat_stream_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|err| StreamError::DeviceUnavailable(err.to_string()))?;

        device.on_uncaptured_error(Box::new(|err| {
            error!("uncaptured wgpu error: {err}");
        }));

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name: info.name,
        })
    }

    pub fn new_blocking() -> StreamResult<Self> {
        pollster::block_on(Self::new())
    }

    pub fn buffer_init<T: bytemuck::Pod>(
        &self,
        label: &str,
        data: &[T],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(data),
            usage,
        })
    }

    pub fn buffer(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    pub fn compute_pipeline(
        &self,
        label: &str,
        source: &'static str,
        entry_point: &str,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::ComputePipeline {
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });

        self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(entry_point),
            compilation_options: default(),
            cache: None,
        })
    }

    /// copies `buffer` into a staging buffer and blocks until the mapped bytes are back on the host
    pub fn read_buffer_blocking<T: bytemuck::Pod>(
        &self,
        encoder: wgpu::CommandEncoder,
        buffer: &wgpu::Buffer,
        count: usize,
    ) -> StreamResult<Vec<T>> {
        let size = (count * std::mem::size_of::<T>()) as u64;
        if size == 0 {
            self.queue.submit(Some(encoder.finish()));
            return Ok(Vec::new());
        }

        let staging = self.buffer(
            "splat_stream_staging",
            size,
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        );

        let mut encoder = encoder;
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);

        pollster::block_on(rx.receive())
            .ok_or_else(|| StreamError::Readback("map callback dropped".to_string()))?
            .map_err(|err| StreamError::Readback(err.to_string()))?;

        let data = slice.get_mapped_range();
        let values = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();

        Ok(values)
    }
}


pub fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// one invocation per item, folded into a second dimension past the per-dimension workgroup limit
pub fn dispatch_size(count: usize) -> (u32, u32) {
    let workgroups = (count as u32).div_ceil(WORKGROUP_SIZE).max(1);
    let x = workgroups.min(MAX_WORKGROUPS_PER_DIM);
    let y = workgroups.div_ceil(x);

    (x, y)
}
