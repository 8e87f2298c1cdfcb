use bevy::prelude::*;

use crate::{
    error::StreamResult,
    stream::{
        FrameIndex,
        GroupReport,
        LiveWindow,
        StreamScheduler,
    },
};


#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Reflect,
)]
pub struct PlaybackState {
    /// render ticks since frame 0, a frame boundary every `stride` ticks
    pub step: u64,
    pub paused: bool,
    /// set once playback has looped back to the start
    pub wrapped: bool,
}


#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlaybackEvent {
    /// reached the last frame and seeked back to frame 0
    Looped,
    Paused,
    /// at the end of the sequence, waiting for the loop
    Held,
    Advanced {
        from: Option<FrameIndex>,
        to: FrameIndex,
    },
    /// the next frame is not decoded yet, the step counter stays at the previous boundary
    Stalled(FrameIndex),
    Stepped,
}


/// advances the active frame one boundary every `stride` render ticks
#[derive(Clone, Debug)]
pub struct PlaybackDriver {
    stride: u64,
    total: usize,
    state: PlaybackState,
    active: Option<FrameIndex>,
    /// every slot below this has been released or consumed
    released_below: FrameIndex,
}

impl PlaybackDriver {
    pub fn new(stride: u64, total: usize) -> Self {
        Self {
            stride: stride.max(1),
            total,
            state: PlaybackState::default(),
            active: None,
            released_below: 0,
        }
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn active(&self) -> Option<FrameIndex> {
        self.active
    }

    pub fn current_frame(&self) -> FrameIndex {
        (self.state.step / self.stride) as FrameIndex
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.state.paused = paused;
    }

    /// swaps `frame` into the active set, releasing the previously active slot and
    /// anything a seek left behind it
    fn activate(
        &mut self,
        frame: FrameIndex,
        window: &LiveWindow,
        scheduler: &StreamScheduler,
    ) -> Option<FrameIndex> {
        let previous = self.active.replace(frame);

        if let Some(previous) = previous.filter(|&previous| previous != frame) {
            window.take(previous);
        }

        for behind in self.released_below..frame {
            if Some(behind) != previous {
                window.take(behind);
                scheduler.consume_frame();
            }
        }
        self.released_below = self.released_below.max(frame);

        scheduler.consume_frame();

        previous
    }

    /// shows frame 0 once the initial group is resident
    pub fn begin(&mut self, window: &LiveWindow, scheduler: &StreamScheduler) -> bool {
        if self.active.is_none() && window.is_ready(0) {
            self.activate(0, window, scheduler);
        }

        self.active.is_some()
    }

    /// one render tick
    pub fn tick(&mut self, window: &LiveWindow, scheduler: &StreamScheduler) -> StreamResult<PlaybackEvent> {
        let stride = self.stride;
        let total = self.total as u64;

        scheduler.update_backpressure();

        if self.state.paused {
            return Ok(PlaybackEvent::Paused);
        }

        if total > 1 && self.state.step == (total - 1) * stride {
            self.seek(0, window, scheduler)?;
            self.state.wrapped = true;
            debug!(total, "looping playback");
            return Ok(PlaybackEvent::Looped);
        }

        self.state.step += 1;
        if self.state.step == stride * total {
            self.state.step -= 1;
            return Ok(PlaybackEvent::Held);
        }

        if self.state.step % stride != 0 {
            return Ok(PlaybackEvent::Stepped);
        }

        let frame = (self.state.step / stride) as FrameIndex;
        if !window.is_ready(frame) {
            self.state.step -= 1;
            debug!(frame, "frame not decoded yet, stalling");
            return Ok(PlaybackEvent::Stalled(frame));
        }

        let from = self.activate(frame, window, scheduler);
        Ok(PlaybackEvent::Advanced {
            from,
            to: frame,
        })
    }

    /// jumps straight to `frame`, blocking until its group is decoded
    pub fn seek(
        &mut self,
        frame: FrameIndex,
        window: &LiveWindow,
        scheduler: &StreamScheduler,
    ) -> StreamResult<GroupReport> {
        let report = scheduler.select_frame(frame)?;

        self.state.step = frame as u64 * self.stride;
        self.active = None;
        self.released_below = report.group.first;
        if window.is_ready(frame) {
            self.activate(frame, window, scheduler);
        }

        Ok(report)
    }
}
