use std::collections::VecDeque;

use bevy::prelude::*;

use crate::{
    render::DrawCall,
    stream::FrameIndex,
};


/// the external render pass, invoked once per frame for the visible cloud
pub trait SplatRenderPass: Send + Sync + 'static {
    fn draw(&mut self, call: &DrawCall<'_>);
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawRecord {
    pub frame: FrameIndex,
    pub vertex_count: u32,
    pub instance_count: u32,
    pub indexed: bool,
    pub time: f32,
}

/// keeps the last submitted draws, useful headless and in tests
#[derive(Default)]
pub struct DrawRecorder {
    pub records: VecDeque<DrawRecord>,
    pub capacity: usize,
}

impl DrawRecorder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn last(&self) -> Option<&DrawRecord> {
        self.records.back()
    }
}

impl SplatRenderPass for DrawRecorder {
    fn draw(&mut self, call: &DrawCall<'_>) {
        if self.capacity > 0 && self.records.len() >= self.capacity {
            self.records.pop_front();
        }

        self.records.push_back(DrawRecord {
            frame: call.frame,
            vertex_count: call.vertex_count(),
            instance_count: call.instance_count(),
            indexed: call.indices.is_some(),
            time: call.uniforms.time,
        });
    }
}


#[derive(Resource)]
pub struct SplatRenderSink(pub Box<dyn SplatRenderPass>);

impl SplatRenderSink {
    pub fn new(pass: impl SplatRenderPass) -> Self {
        Self(Box::new(pass))
    }

    pub fn draw(&mut self, call: &DrawCall<'_>) {
        self.0.draw(call);
    }
}

/// records the last 64 draws, it does not rasterize
impl Default for SplatRenderSink {
    fn default() -> Self {
        Self::new(DrawRecorder::with_capacity(64))
    }
}
