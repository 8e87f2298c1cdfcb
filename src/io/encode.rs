use crate::{
    decode::{
        layout::{CHANNEL_COUNT, CHANNEL_LAYOUT},
        quantize::{DequantRange, FrameRanges},
    },
    gaussian::f32::{Attribute, SplatPoint},
    io::source::ChannelPlane,
};


/// per-attribute (min, max) over `points`, widened slightly so constant attributes keep a non-empty range
pub fn fit_ranges(points: &[SplatPoint]) -> FrameRanges {
    FrameRanges(std::array::from_fn(|index| {
        let offset = CHANNEL_LAYOUT[index].attribute.float_offset();

        let (min, max) = points
            .iter()
            .map(|point| point.as_floats()[offset])
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), value| {
                (min.min(value), max.max(value))
            });

        if min > max {
            DequantRange::new(0.0, 1.0)
        } else if min == max {
            DequantRange::new(min - 0.5, max + 0.5)
        } else {
            DequantRange::new(min, max)
        }
    }))
}


/// quantizes row-major `points` into the 17 channel planes read back by the decoders
pub fn encode_planes(
    points: &[SplatPoint],
    width: u32,
    height: u32,
    ranges: &FrameRanges,
) -> Vec<ChannelPlane> {
    let count = (width * height) as usize;
    let mut planes: Vec<ChannelPlane> = (0..CHANNEL_COUNT)
        .map(|_| ChannelPlane::filled(width, height, 0))
        .collect();

    for (pixel, point) in points.iter().take(count).enumerate() {
        let floats = point.as_floats();

        for (index, source) in CHANNEL_LAYOUT.iter().enumerate() {
            let code = ranges
                .get(index)
                .quantize(floats[source.attribute.float_offset()], source.divisor());

            planes[source.low].data_mut()[pixel] = (code & 0xff) as u8;
            if let Some(high) = source.high {
                planes[high].data_mut()[pixel] = (code >> 8) as u8;
            }
        }
    }

    planes
}


/// lays the ranges out the way the dequantization manifest stores them: 6 position values,
/// 6 unused, 6 color values, then the remaining 16
pub fn manifest_info(ranges: &FrameRanges) -> Vec<f32> {
    let flat = ranges.to_flat();
    let color_end = (Attribute::ShDcB as usize + 1) * 2;

    let mut info = Vec::with_capacity(flat.len() + 6);
    info.extend_from_slice(&flat[..6]);
    info.extend_from_slice(&[0.0; 6]);
    info.extend_from_slice(&flat[6..color_end]);
    info.extend_from_slice(&flat[color_end..]);

    info
}
