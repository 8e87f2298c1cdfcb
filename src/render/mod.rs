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

use crate::{
    gaussian::f32::SplatPoint,
    stream::FrameIndex,
};

pub mod sink;

pub use sink::{DrawRecord, DrawRecorder, SplatRenderPass, SplatRenderSink};


/// triangle strip corners expanded per instance by the splat vertex shader
pub const QUAD_VERTICES: [[f32; 2]; 4] = [
    [1.0, -1.0],
    [1.0, 1.0],
    [-1.0, -1.0],
    [-1.0, 1.0],
];


/// how the sorted index buffer reaches the draw
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
pub enum DrawOrder {
    /// instances map to raw point slots, the sorted indices are not consulted
    SlotOrder,
    /// instance `i` draws `points[indices[i]]`
    IndexIndirection,
    /// the sort gathers the point buffer itself into draw order
    #[default]
    PermutePoints,
}


/// camera state consumed each tick, the core does no camera handling of its own
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    /// world to view
    pub view: Mat4,
    /// view to clip
    pub projection: Mat4,
    pub world_position: Vec3,
}

impl CameraPose {
    pub fn from_transform(camera: &GlobalTransform, projection: Mat4) -> Self {
        Self {
            view: camera.compute_matrix().inverse(),
            projection,
            world_position: camera.translation(),
        }
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 1.0, 0.01, 100.0),
            world_position: Vec3::ZERO,
        }
    }
}


/// exponential ease toward 0 or 1, read by the shader as interaction feedback
#[derive(Clone, Copy, Debug, Default, PartialEq, Reflect)]
pub struct DragTween {
    pub value: f32,
    pub target: f32,
}

impl DragTween {
    pub fn set_dragging(&mut self, dragging: bool) {
        self.target = if dragging { 1.0 } else { 0.0 };
    }

    pub fn update(&mut self) {
        self.value -= (self.value - self.target) * 0.1;
    }
}


#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Pod,
    Zeroable,
)]
#[repr(C)]
pub struct SplatUniforms {
    pub projection_matrix: [[f32; 4]; 4],
    pub model_matrix: [[f32; 4]; 4],
    pub view_matrix: [[f32; 4]; 4],
    pub model_view_matrix: [[f32; 4]; 4],
    pub inv_model_view_matrix: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub camera_pos_orig: [f32; 4],
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub focal_x: f32,
    pub focal_y: f32,
    pub tan_fovx: f32,
    pub tan_fovy: f32,
    pub drag_alpha: f32,
    pub time: f32,
}

const_assert_eq!(std::mem::size_of::<SplatUniforms>() % 16, 0);

impl SplatUniforms {
    pub fn compute(
        pose: &CameraPose,
        model: Mat4,
        viewport: Vec2,
        time: f32,
        drag_alpha: f32,
    ) -> Self {
        let model_view = pose.view * model;

        let tan_fovx = 1.0 / pose.projection.x_axis.x;
        let tan_fovy = 1.0 / pose.projection.y_axis.y;

        let camera_pos = pose.world_position.extend(1.0);
        let camera_pos_orig = model.inverse() * camera_pos;

        Self {
            projection_matrix: pose.projection.to_cols_array_2d(),
            model_matrix: model.to_cols_array_2d(),
            view_matrix: pose.view.to_cols_array_2d(),
            model_view_matrix: model_view.to_cols_array_2d(),
            inv_model_view_matrix: model_view.inverse().to_cols_array_2d(),
            camera_pos: camera_pos.to_array(),
            camera_pos_orig: camera_pos_orig.to_array(),
            viewport_width: viewport.x,
            viewport_height: viewport.y,
            focal_x: viewport.x / (2.0 * tan_fovx),
            focal_y: viewport.y / (2.0 * tan_fovy),
            tan_fovx,
            tan_fovy,
            drag_alpha,
            time,
        }
    }

    pub fn model_view(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model_view_matrix)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}


/// one instanced draw, borrowing the cloud's buffers for a single submission
#[derive(Clone, Copy, Debug)]
pub struct DrawCall<'a> {
    pub frame: FrameIndex,
    pub quad: &'static [[f32; 2]; 4],
    pub points: &'a [SplatPoint],
    pub indices: Option<&'a [u32]>,
    pub uniforms: SplatUniforms,
}

impl<'a> DrawCall<'a> {
    pub fn vertex_count(&self) -> u32 {
        self.quad.len() as u32
    }

    pub fn instance_count(&self) -> u32 {
        self.points.len() as u32
    }

    /// the point each instance ends up rasterizing, in submission order
    pub fn instances(&self) -> impl Iterator<Item = &'a SplatPoint> + 'a {
        let points = self.points;
        let indices = self.indices;

        (0..points.len()).map(move |instance| match indices {
            Some(indices) => &points[indices[instance] as usize],
            None => &points[instance],
        })
    }
}
