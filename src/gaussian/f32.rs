use bevy::prelude::*;
use bytemuck::{
    Pod,
    Zeroable,
};
use serde::{
    Deserialize,
    Serialize,
};
use static_assertions::const_assert_eq;


pub type Position = [f32; 3];

pub const SH_REST_COUNT: usize = 9;
pub const POINT_FLOATS: usize = 23;

/// one gaussian splat as laid out in the point buffer and the decode/depth kernels
#[derive(
    Clone,
    Debug,
    Default,
    Copy,
    PartialEq,
    Reflect,
    Pod,
    Zeroable,
    Serialize,
    Deserialize,
)]
#[repr(C)]
pub struct SplatPoint {
    pub position: Position,
    pub opacity: f32,
    pub scale: [f32; 3],
    pub rotation: [f32; 4],
    pub sh_dc: [f32; 3],
    pub sh_rest: [f32; SH_REST_COUNT],
}

const_assert_eq!(std::mem::size_of::<SplatPoint>(), POINT_FLOATS * 4);

impl SplatPoint {
    pub fn position_vec3(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn is_valid(&self) -> bool {
        self.opacity != crate::decode::filter::FILTERED_OPACITY
    }

    pub fn as_floats(&self) -> &[f32; POINT_FLOATS] {
        bytemuck::cast_ref(self)
    }

    pub fn from_floats(floats: &[f32; POINT_FLOATS]) -> Self {
        bytemuck::cast(*floats)
    }
}


/// decoded attribute slots, in dequantization-range order
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    Reflect,
)]
pub enum Attribute {
    PositionX,
    PositionY,
    PositionZ,
    ShDcR,
    ShDcG,
    ShDcB,
    Opacity,
    Scale0,
    Scale1,
    Scale2,
    Rotation0,
    Rotation1,
    Rotation2,
    Rotation3,
}

impl Attribute {
    pub const COUNT: usize = 14;

    pub fn is_position(self) -> bool {
        matches!(self, Attribute::PositionX | Attribute::PositionY | Attribute::PositionZ)
    }

    /// float offset of this attribute inside `SplatPoint`
    pub fn float_offset(self) -> usize {
        match self {
            Attribute::PositionX => 0,
            Attribute::PositionY => 1,
            Attribute::PositionZ => 2,
            Attribute::Opacity => 3,
            Attribute::Scale0 => 4,
            Attribute::Scale1 => 5,
            Attribute::Scale2 => 6,
            Attribute::Rotation0 => 7,
            Attribute::Rotation1 => 8,
            Attribute::Rotation2 => 9,
            Attribute::Rotation3 => 10,
            Attribute::ShDcR => 11,
            Attribute::ShDcG => 12,
            Attribute::ShDcB => 13,
        }
    }
}
