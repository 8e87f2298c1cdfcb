use bevy::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    decode::filter::PointFilter,
    gaussian::cloud::CloudOptions,
    render::DrawOrder,
    sort::{
        DepthBackend,
        SortMode,
    },
    stream::{
        ExecutionMode,
        SchedulerConfig,
    },
};


#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    Reflect,
    Serialize,
    Deserialize,
)]
pub enum DecodeBackend {
    #[default]
    Cpu,
    Gpu,
}


#[derive(
    Clone,
    Debug,
    PartialEq,
    Reflect,
    Resource,
    Serialize,
    Deserialize,
)]
#[reflect(Resource)]
#[serde(default)]
pub struct StreamSettings {
    /// render ticks per frame
    pub stride: u64,
    /// decoded-ahead frame count above which ingestion suspends
    pub high_water: usize,
    pub sort_interval: u64,
    pub initial_offset: Vec3,
    pub draw_order: DrawOrder,
    pub sort_mode: SortMode,
    pub depth_backend: DepthBackend,
    pub decode_backend: DecodeBackend,
    pub filter: PointFilter,
    /// euler xyz, radians
    pub model_rotation: Vec3,
    pub model_scale: f32,
    pub execution: ExecutionMode,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            stride: 2,
            high_water: 220,
            sort_interval: 4,
            initial_offset: Vec3::new(0.0, -0.6, 0.5),
            draw_order: DrawOrder::default(),
            sort_mode: SortMode::default(),
            depth_backend: DepthBackend::default(),
            decode_backend: DecodeBackend::default(),
            filter: PointFilter::default(),
            model_rotation: Vec3::ZERO,
            model_scale: 1.0,
            execution: ExecutionMode::default(),
        }
    }
}

impl StreamSettings {
    pub fn model_transform(&self) -> Transform {
        Transform {
            translation: Vec3::ZERO,
            rotation: Quat::from_euler(
                EulerRot::XYZ,
                self.model_rotation.x,
                self.model_rotation.y,
                self.model_rotation.z,
            ),
            scale: Vec3::splat(self.model_scale),
        }
    }

    pub fn cloud_options(&self) -> CloudOptions {
        CloudOptions {
            filter: self.filter,
            draw_order: self.draw_order,
            sort_interval: self.sort_interval,
            model: self.model_transform().compute_matrix(),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            high_water: self.high_water,
            initial_offset: self.initial_offset,
            cloud: self.cloud_options(),
            execution: self.execution,
        }
    }
}
