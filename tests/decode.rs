use std::sync::Arc;

use bevy::math::Vec3;
use bevy_splat_stream::{
    FrameGroup,
    StreamScheduler,
    AttributeDecoder,
    CpuDecoder,
    decode::{
        DecodeInput,
        layout::{
            CHANNEL_COUNT,
            POSITION_DIVISOR,
        },
        quantize::{DequantRange, FrameRanges},
    },
    gaussian::f32::SplatPoint,
    io::{
        manifest::DequantManifest,
        source::{
            ChannelPlane,
            MemorySource,
        },
    },
    stream::{
        ExecutionMode,
        SchedulerConfig,
    },
};


const OFFSET: Vec3 = Vec3::new(0.0, -0.6, 0.5);

/// 2x2 planes where the position codes differ per pixel
fn position_planes() -> (Vec<ChannelPlane>, [[u32; 3]; 4]) {
    let codes: [[u32; 3]; 4] = [
        [0, 65535, 32768],
        [1, 256, 1000],
        [40000, 12, 65534],
        [255, 511, 30000],
    ];

    let mut planes: Vec<ChannelPlane> = (0..CHANNEL_COUNT).map(|_| ChannelPlane::filled(2, 2, 255)).collect();
    for (pixel, code) in codes.iter().enumerate() {
        for axis in 0..3 {
            planes[axis * 2].data_mut()[pixel] = (code[axis] & 0xff) as u8;
            planes[axis * 2 + 1].data_mut()[pixel] = (code[axis] >> 8) as u8;
        }
    }

    (planes, codes)
}

fn expected(code: u32, range: DequantRange, offset: f32) -> f32 {
    let mut value = code as f32 * (range.max - range.min) / POSITION_DIVISOR + range.min;
    value += offset;
    value
}


#[test]
fn single_frame_group_decodes_exactly() {
    let range = DequantRange::new(0.0, 100.0);
    let (planes, codes) = position_planes();

    let mut source = MemorySource::new();
    source.insert_frame(0, planes.into_iter().map(Some).collect());

    let scheduler = StreamScheduler::new(
        SchedulerConfig {
            initial_offset: OFFSET,
            execution: ExecutionMode::Manual,
            ..Default::default()
        },
        vec![FrameGroup::new(0, 0, 0)],
        Arc::new(source),
        Arc::new(CpuDecoder),
        Arc::new(DequantManifest::uniform(1, range)),
    )
    .unwrap();

    let report = scheduler.decode_initial();
    assert_eq!(report.published, 1);

    let points: Vec<SplatPoint> = scheduler
        .window()
        .with_cloud_mut(0, |cloud| cloud.primary().to_vec())
        .unwrap();
    assert_eq!(points.len(), 4);

    for (point, code) in points.iter().zip(codes.iter()) {
        assert_eq!(point.position[0], expected(code[0], range, OFFSET.x));
        assert_eq!(point.position[1], expected(code[1], range, OFFSET.y));
        assert_eq!(point.position[2], expected(code[2], range, OFFSET.z));

        assert_eq!(point.opacity, 100.0);
        assert_eq!(point.rotation, [100.0; 4]);
        assert_eq!(point.sh_rest, [0.0; 9]);
    }
}

#[test]
fn missing_channel_leaves_the_slot_empty() {
    let mut source = MemorySource::with_uniform_frames(0..3, 2, 2, 7);
    let mut broken: Vec<Option<ChannelPlane>> = (0..CHANNEL_COUNT).map(|_| Some(ChannelPlane::filled(2, 2, 7))).collect();
    broken[12] = None;
    source.insert_frame(1, broken);

    let scheduler = StreamScheduler::new(
        SchedulerConfig {
            execution: ExecutionMode::Manual,
            ..Default::default()
        },
        vec![FrameGroup::new(0, 0, 2)],
        Arc::new(source),
        Arc::new(CpuDecoder),
        Arc::new(DequantManifest::uniform(3, DequantRange::new(0.0, 1.0))),
    )
    .unwrap();

    let report = scheduler.decode_initial();

    assert_eq!(report.published, 2);
    assert_eq!(report.failed, 1);
    assert!(!report.cancelled);
    assert_eq!(scheduler.window().occupied_frames(), vec![0, 2]);
    assert_eq!(scheduler.completed_groups(), vec![0]);
}

#[test]
fn frame_ranges_are_per_attribute() {
    let planes: Vec<ChannelPlane> = (0..CHANNEL_COUNT).map(|_| ChannelPlane::filled(1, 1, 255)).collect();
    let refs: [Option<&ChannelPlane>; CHANNEL_COUNT] = std::array::from_fn(|c| Some(&planes[c]));

    let flat: Vec<f32> = (0..FrameRanges::FLAT_LEN / 2)
        .flat_map(|pair| [0.0, pair as f32 + 1.0])
        .collect();
    let ranges = FrameRanges::from_flat(&flat).unwrap();

    let input = DecodeInput {
        frame: 0,
        planes: refs,
        ranges: &ranges,
        initial_offset: Vec3::ZERO,
    };
    let point = CpuDecoder.decode_points(&input).unwrap()[0];

    assert_eq!(point.position, [1.0, 2.0, 3.0]);
    assert_eq!(point.sh_dc, [4.0, 5.0, 6.0]);
    assert_eq!(point.opacity, 7.0);
    assert_eq!(point.scale, [8.0, 9.0, 10.0]);
    assert_eq!(point.rotation, [11.0, 12.0, 13.0, 14.0]);
}
