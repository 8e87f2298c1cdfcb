use bevy::prelude::*;
use bytemuck::{
    Pod,
    Zeroable,
};

use crate::{
    error::StreamResult,
    gaussian::f32::SplatPoint,
    gpu::{
        GpuContext,
        dispatch_size,
        storage_entry,
        uniform_entry,
    },
    sort::{
        DepthKernel,
        SortEntry,
    },
};


#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct DepthParams {
    model_view: [[f32; 4]; 4],
    point_count: u32,
    _pad: [u32; 3],
}


/// view depth per point on the gpu; `compute_keys` waits for the readback before returning
pub struct GpuDepthKernel {
    context: GpuContext,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl GpuDepthKernel {
    pub fn new(context: GpuContext) -> Self {
        let layout = context.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("splat_depth_layout"),
            entries: &[
                storage_entry(0, true),
                uniform_entry(1),
                storage_entry(2, false),
            ],
        });

        let pipeline = context.compute_pipeline(
            "splat_depth",
            include_str!("depth.wgsl"),
            "depth",
            &layout,
        );

        Self {
            context,
            layout,
            pipeline,
        }
    }
}

impl DepthKernel for GpuDepthKernel {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn compute_keys(
        &self,
        points: &[SplatPoint],
        model_view: Mat4,
        entries: &mut Vec<SortEntry>,
    ) -> StreamResult<()> {
        let count = points.len();
        if count == 0 {
            entries.clear();
            return Ok(());
        }

        let context = &self.context;

        let point_buffer = context.buffer_init("splat_depth_points", points, wgpu::BufferUsages::STORAGE);
        let params = context.buffer_init(
            "splat_depth_params",
            &[DepthParams {
                model_view: model_view.to_cols_array_2d(),
                point_count: count as u32,
                _pad: [0; 3],
            }],
            wgpu::BufferUsages::UNIFORM,
        );
        let entry_buffer = context.buffer(
            "splat_depth_entries",
            (count * std::mem::size_of::<SortEntry>()) as u64,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        );

        let bind_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("splat_depth_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: point_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: entry_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = context.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("splat_depth_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("splat_depth_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);

            let (x, y) = dispatch_size(count);
            pass.dispatch_workgroups(x, y, 1);
        }

        *entries = context.read_buffer_blocking(encoder, &entry_buffer, count)?;
        Ok(())
    }
}
