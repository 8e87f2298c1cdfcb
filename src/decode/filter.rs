use bevy::prelude::*;
use rand::Rng;
use serde::{
    Deserialize,
    Serialize,
};

use crate::gaussian::f32::SplatPoint;


/// opacity is stored pre-activation, so this activates to fully transparent
pub const FILTERED_OPACITY: f32 = f32::NEG_INFINITY;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Reflect,
    Serialize,
    Deserialize,
)]
pub struct PointFilter {
    /// drop points farther than this from the origin, disabled at or below 0.001
    pub clip_radius: f32,
    /// keep probability, disabled at 0
    pub downsample: f32,
}

impl PointFilter {
    pub fn is_noop(&self) -> bool {
        self.clip_radius <= 0.001 && self.downsample <= 0.0
    }

    fn rejects(&self, point: &SplatPoint, rng: &mut impl Rng) -> bool {
        if self.clip_radius > 0.001 && point.position_vec3().length() > self.clip_radius {
            return true;
        }

        self.downsample > 0.0 && rng.gen_range(0.0..=1.0) > self.downsample
    }

    /// marks rejected points invalid in place and returns how many remain valid
    pub fn apply(&self, points: &mut [SplatPoint]) -> usize {
        if self.is_noop() {
            return points.len();
        }

        let mut rng = rand::thread_rng();
        let mut valid = 0;
        for point in points.iter_mut() {
            if self.rejects(point, &mut rng) {
                point.opacity = FILTERED_OPACITY;
            } else {
                valid += 1;
            }
        }

        valid
    }
}
