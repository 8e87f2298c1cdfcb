use bevy::prelude::*;
use bytemuck::{
    Pod,
    Zeroable,
};

use crate::{
    decode::{
        AttributeDecoder,
        DecodeInput,
        layout::CHANNEL_COUNT,
    },
    error::StreamResult,
    gaussian::f32::{POINT_FLOATS, SplatPoint},
    gpu::{
        GpuContext,
        dispatch_size,
        storage_entry,
        uniform_entry,
    },
};


#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct DecodeParams {
    point_count: u32,
    offset: [f32; 3],
}


/// runs the attribute kernel as a wgpu compute pass
pub struct GpuDecoder {
    context: GpuContext,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl GpuDecoder {
    pub fn new(context: GpuContext) -> Self {
        let layout = context.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("splat_decode_layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                uniform_entry(2),
                storage_entry(3, false),
            ],
        });

        let pipeline = context.compute_pipeline(
            "splat_decode",
            include_str!("decode.wgsl"),
            "decode",
            &layout,
        );

        Self {
            context,
            layout,
            pipeline,
        }
    }

    /// fails with `DeviceUnavailable` when no adapter can be acquired
    pub fn new_blocking() -> StreamResult<Self> {
        Ok(Self::new(GpuContext::new_blocking()?))
    }
}

/// every plane back to back, padded out to whole words
fn pack_planes(planes: &[&[u8]; CHANNEL_COUNT]) -> Vec<u32> {
    let bytes: usize = planes.iter().map(|plane| plane.len()).sum();
    let mut words = vec![0u32; bytes.div_ceil(4).max(1)];

    let packed: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
    let mut cursor = 0;
    for plane in planes {
        packed[cursor..cursor + plane.len()].copy_from_slice(plane);
        cursor += plane.len();
    }

    words
}

impl AttributeDecoder for GpuDecoder {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn decode_points(&self, input: &DecodeInput<'_>) -> StreamResult<Vec<SplatPoint>> {
        let shape = input.validate()?;
        let count = shape.point_count();
        let context = &self.context;

        let planes = context.buffer_init(
            "splat_decode_planes",
            &pack_planes(&shape.planes),
            wgpu::BufferUsages::STORAGE,
        );
        let ranges = context.buffer_init(
            "splat_decode_ranges",
            &input.ranges.to_flat(),
            wgpu::BufferUsages::STORAGE,
        );
        let params = context.buffer_init(
            "splat_decode_params",
            &[DecodeParams {
                point_count: count as u32,
                offset: input.initial_offset.to_array(),
            }],
            wgpu::BufferUsages::UNIFORM,
        );
        let points = context.buffer(
            "splat_decode_points",
            (count.max(1) * POINT_FLOATS * std::mem::size_of::<f32>()) as u64,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        );

        let bind_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("splat_decode_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: planes.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: ranges.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: points.as_entire_binding(),
                },
            ],
        });

        let mut encoder = context.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("splat_decode_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("splat_decode_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);

            let (x, y) = dispatch_size(count);
            pass.dispatch_workgroups(x, y, 1);
        }

        let floats: Vec<f32> = context.read_buffer_blocking(encoder, &points, count * POINT_FLOATS)?;
        debug!(frame = input.frame, points = count, "gpu decode complete");

        Ok(bytemuck::cast_slice::<f32, SplatPoint>(&floats).to_vec())
    }
}
