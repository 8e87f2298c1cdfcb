use std::path::PathBuf;

use bevy::math::{Quat, Vec3};
use byte_unit::{Byte, UnitType};
use clap::Parser;

use bevy_splat_stream::{
    FrameGroup,
    SplatPoint,
    StreamResult,
    decode::layout::CHANNEL_COUNT,
    io::{
        encode::{
            encode_planes,
            fit_ranges,
        },
        image_source::ImageSequenceSource,
        manifest::{
            DequantManifest,
            GroupManifest,
        },
    },
};


/// writes a synthetic plane sequence the viewer can stream
#[derive(Debug, Parser)]
#[command(about = "synthesize a splat stream", version, long_about = None)]
struct SynthArgs {
    #[arg(long, default_value = "assets/stream")]
    out: PathBuf,

    #[arg(long, default_value = "60")]
    frames: usize,

    #[arg(long, default_value = "15")]
    group_size: usize,

    /// plane side length, `side * side` points per frame
    #[arg(long, default_value = "128")]
    side: u32,
}


fn golden_sphere(frame: usize, count: usize) -> Vec<SplatPoint> {
    let spin = Quat::from_rotation_y(frame as f32 * 0.05);
    let golden = std::f32::consts::PI * (3.0 - 5f32.sqrt());

    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let radius = (1.0 - y * y).sqrt();
            let theta = golden * i as f32;
            let wobble = 1.0 + 0.1 * (theta * 0.01 + frame as f32 * 0.2).sin();

            let position = spin * Vec3::new(radius * theta.cos(), y, radius * theta.sin()) * wobble;

            SplatPoint {
                position: position.to_array(),
                opacity: 2.0,
                scale: [-4.5, -4.5, -4.5],
                rotation: [1.0, 0.0, 0.0, 0.0],
                sh_dc: [position.x, position.y, position.z],
                ..Default::default()
            }
        })
        .collect()
}


fn main() -> StreamResult<()> {
    let args = SynthArgs::parse();
    let count = (args.side * args.side) as usize;
    let source = ImageSequenceSource::new(&args.out);

    let groups: Vec<FrameGroup> = (0..args.frames)
        .step_by(args.group_size.max(1))
        .enumerate()
        .map(|(id, first)| FrameGroup::new(id as u32, first, (first + args.group_size.max(1)).min(args.frames) - 1))
        .collect();

    println!("writing {} frames in {} groups to `{}`", args.frames, groups.len(), args.out.display());

    let mut ranges = DequantManifest::default();
    let mut written = 0u64;

    for group in &groups {
        for frame in group.frames() {
            let points = golden_sphere(frame, count);
            let frame_ranges = fit_ranges(&points);

            let planes = encode_planes(&points, args.side, args.side, &frame_ranges);
            for (channel, plane) in planes.iter().enumerate().take(CHANNEL_COUNT) {
                let path = source.plane_path(group.id, channel, frame);
                ImageSequenceSource::write_plane(&path, plane)?;
                written += std::fs::metadata(&path)?.len();
            }

            ranges.insert(frame, frame_ranges);
        }
    }

    std::fs::write(args.out.join("group_info.json"), GroupManifest { groups }.to_json())?;
    std::fs::write(args.out.join("viewer_min_max.json"), ranges.to_json())?;

    println!(
        "plane bytes: {}",
        Byte::from_u64(written).get_appropriate_unit(UnitType::Decimal),
    );

    Ok(())
}
