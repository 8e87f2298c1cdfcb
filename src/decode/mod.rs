use bevy::prelude::*;

#[cfg(feature = "sort_rayon")]
use rayon::prelude::*;

use crate::{
    error::{StreamError, StreamResult},
    gaussian::{
        cloud::{CloudOptions, PointCloud},
        f32::{POINT_FLOATS, SplatPoint},
    },
    io::source::ChannelPlane,
    stream::FrameIndex,
};

pub mod filter;
pub mod layout;
pub mod quantize;

use layout::{CHANNEL_COUNT, CHANNEL_LAYOUT};
use quantize::FrameRanges;


/// everything the attribute kernel needs for one frame
#[derive(Clone, Copy, Debug)]
pub struct DecodeInput<'a> {
    pub frame: FrameIndex,
    pub planes: [Option<&'a ChannelPlane>; CHANNEL_COUNT],
    pub ranges: &'a FrameRanges,
    pub initial_offset: Vec3,
}

/// planes checked present and equally sized
pub struct FramePlanes<'a> {
    pub width: u32,
    pub height: u32,
    pub planes: [&'a [u8]; CHANNEL_COUNT],
}

impl FramePlanes<'_> {
    pub fn point_count(&self) -> usize {
        (self.width * self.height) as usize
    }
}

impl<'a> DecodeInput<'a> {
    pub fn validate(&self) -> StreamResult<FramePlanes<'a>> {
        let empty: &'a [u8] = &[];
        let mut planes = [empty; CHANNEL_COUNT];
        let mut shape: Option<&'a ChannelPlane> = None;

        for (channel, plane) in self.planes.iter().copied().enumerate() {
            let plane = plane.ok_or(StreamError::DecodeInputMissing {
                frame: self.frame,
                channel,
            })?;

            match shape {
                Some(first) if !first.same_shape(plane) => {
                    return Err(StreamError::PlaneSizeMismatch {
                        frame: self.frame,
                        channel,
                    });
                }
                Some(_) => {}
                None => shape = Some(plane),
            }

            planes[channel] = plane.data();
        }

        let shape = shape.ok_or(StreamError::DecodeInputMissing {
            frame: self.frame,
            channel: 0,
        })?;

        Ok(FramePlanes {
            width: shape.width(),
            height: shape.height(),
            planes,
        })
    }
}


/// reconstructs and dequantizes the point stored at one pixel
pub fn decode_point(
    planes: &[&[u8]; CHANNEL_COUNT],
    pixel: usize,
    ranges: &FrameRanges,
    initial_offset: Vec3,
) -> SplatPoint {
    let mut floats = [0.0; POINT_FLOATS];

    for (index, source) in CHANNEL_LAYOUT.iter().enumerate() {
        let code = source.code(planes, pixel);
        floats[source.attribute.float_offset()] = ranges.get(index).dequantize(code, source.divisor());
    }

    floats[0] += initial_offset.x;
    floats[1] += initial_offset.y;
    floats[2] += initial_offset.z;

    SplatPoint::from_floats(&floats)
}


pub trait AttributeDecoder: Send + Sync {
    fn name(&self) -> &'static str;

    /// one point per pixel, row-major
    fn decode_points(&self, input: &DecodeInput<'_>) -> StreamResult<Vec<SplatPoint>>;

    fn decode(&self, input: &DecodeInput<'_>, options: &CloudOptions) -> StreamResult<PointCloud> {
        let shape = input.validate()?;
        let points = self.decode_points(input)?;
        debug_assert_eq!(points.len(), shape.point_count());

        let cloud = PointCloud::from_decoded(input.frame, shape.width, shape.height, points, options);
        debug!(
            frame = input.frame,
            points = cloud.len(),
            valid = cloud.valid_count(),
            decoder = self.name(),
            "decoded point cloud",
        );

        Ok(cloud)
    }
}


#[derive(Clone, Copy, Debug, Default)]
pub struct CpuDecoder;

impl AttributeDecoder for CpuDecoder {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn decode_points(&self, input: &DecodeInput<'_>) -> StreamResult<Vec<SplatPoint>> {
        let shape = input.validate()?;
        let mut points = vec![SplatPoint::default(); shape.point_count()];

        #[cfg(feature = "sort_rayon")]
        points.par_iter_mut().enumerate().for_each(|(pixel, point)| {
            *point = decode_point(&shape.planes, pixel, input.ranges, input.initial_offset);
        });

        #[cfg(not(feature = "sort_rayon"))]
        points.iter_mut().enumerate().for_each(|(pixel, point)| {
            *point = decode_point(&shape.planes, pixel, input.ranges, input.initial_offset);
        });

        Ok(points)
    }
}
