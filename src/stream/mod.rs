use std::ops::RangeInclusive;

use bevy::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

pub mod cancel;
pub mod clock;
pub mod scheduler;
pub mod window;

pub use cancel::CancellationToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{ExecutionMode, GroupReport, GroupUnit, RunStep, SchedulerConfig, StreamScheduler};
pub use window::LiveWindow;


pub type FrameIndex = usize;


/// contiguous inclusive range of frames sharing one set of channel streams
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
pub struct FrameGroup {
    pub id: u32,
    pub first: FrameIndex,
    pub last: FrameIndex,
}

impl FrameGroup {
    pub fn new(id: u32, first: FrameIndex, last: FrameIndex) -> Self {
        debug_assert!(first <= last);
        Self { id, first, last }
    }

    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, frame: FrameIndex) -> bool {
        self.frames().contains(&frame)
    }

    pub fn frames(&self) -> RangeInclusive<FrameIndex> {
        self.first..=self.last
    }

    pub fn offset_of(&self, frame: FrameIndex) -> Option<usize> {
        self.contains(frame).then(|| frame - self.first)
    }
}


pub fn total_frames(groups: &[FrameGroup]) -> usize {
    groups.last().map(|group| group.last + 1).unwrap_or(0)
}

pub fn group_containing(groups: &[FrameGroup], frame: FrameIndex) -> Option<(usize, &FrameGroup)> {
    groups
        .iter()
        .enumerate()
        .find(|(_, group)| group.contains(frame))
}
