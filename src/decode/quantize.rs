use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::{StreamError, StreamResult},
    gaussian::f32::Attribute,
};


#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
)]
pub struct DequantRange {
    pub min: f32,
    pub max: f32,
}

impl DequantRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn dequantize(&self, code: u32, divisor: f32) -> f32 {
        code as f32 * (self.max - self.min) / divisor + self.min
    }

    pub fn quantize(&self, value: f32, divisor: f32) -> u32 {
        let span = self.max - self.min;
        if span == 0.0 {
            return 0;
        }

        let code = ((value - self.min) / span * divisor).round();
        code.clamp(0.0, divisor) as u32
    }

    pub fn step(&self, divisor: f32) -> f32 {
        (self.max - self.min) / divisor
    }
}


/// per-frame (min, max) pairs, one per decoded attribute
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Serialize,
    Deserialize,
)]
pub struct FrameRanges(pub [DequantRange; Attribute::COUNT]);

impl FrameRanges {
    pub const FLAT_LEN: usize = Attribute::COUNT * 2;

    pub fn uniform(range: DequantRange) -> Self {
        Self([range; Attribute::COUNT])
    }

    /// `[min0, max0, min1, max1, ...]`
    pub fn from_flat(flat: &[f32]) -> StreamResult<Self> {
        if flat.len() != Self::FLAT_LEN {
            return Err(StreamError::malformed(format!(
                "expected {} dequantization values, found {}",
                Self::FLAT_LEN,
                flat.len(),
            )));
        }

        Ok(Self(std::array::from_fn(|i| DequantRange::new(flat[i * 2], flat[i * 2 + 1]))))
    }

    pub fn to_flat(&self) -> [f32; Self::FLAT_LEN] {
        std::array::from_fn(|i| {
            let range = &self.0[i / 2];
            if i % 2 == 0 { range.min } else { range.max }
        })
    }

    pub fn get(&self, index: usize) -> &DequantRange {
        &self.0[index]
    }
}
