use std::{
    collections::VecDeque,
    sync::{
        Arc,
        Condvar,
        Mutex,
        MutexGuard,
        PoisonError,
    },
    thread::JoinHandle,
    time::Duration,
};

use bevy::prelude::*;
#[cfg(feature = "sort_rayon")]
use rayon::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    decode::{
        AttributeDecoder,
        DecodeInput,
    },
    error::{StreamError, StreamResult},
    gaussian::cloud::CloudOptions,
    io::{
        manifest::DequantManifest,
        source::{
            FrameSource,
            GroupPlanes,
        },
    },
    stream::{
        CancellationToken,
        Clock,
        FrameGroup,
        FrameIndex,
        LiveWindow,
        SystemClock,
        group_containing,
        total_frames,
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
pub enum ExecutionMode {
    /// groups only run when `run_next` is called
    Manual,
    /// one background worker drains the queue
    #[default]
    Threaded,
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    pub high_water: usize,
    pub initial_offset: Vec3,
    pub cloud: CloudOptions,
    pub execution: ExecutionMode,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            high_water: 220,
            initial_offset: Vec3::new(0.0, -0.6, 0.5),
            cloud: CloudOptions::default(),
            execution: ExecutionMode::default(),
        }
    }
}


/// a queued group together with the generation it was queued under
#[derive(Clone, Debug)]
pub struct GroupUnit {
    pub group: FrameGroup,
    pub token: CancellationToken,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum FrameOutcome {
    Published,
    Discarded,
    Failed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroupReport {
    pub group: FrameGroup,
    pub published: usize,
    /// decoded but refused by the window, cancelled or slot still occupied
    pub discarded: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RunStep {
    Processed(GroupReport),
    Suspended,
    Idle,
}


struct SchedulerState {
    queue: VecDeque<GroupUnit>,
    ahead: usize,
    suspended: bool,
    generation: CancellationToken,
    in_flight: Option<u32>,
    completed: Vec<u32>,
    shutdown: bool,
}

struct Shared {
    config: SchedulerConfig,
    groups: Vec<FrameGroup>,
    window: Arc<LiveWindow>,
    source: Arc<dyn FrameSource>,
    decoder: Arc<dyn AttributeDecoder>,
    ranges: Arc<DequantManifest>,
    clock: Arc<dyn Clock>,
    state: Mutex<SchedulerState>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_backpressure(&self, state: &mut SchedulerState) {
        let high_water = self.config.high_water;

        if state.ahead > high_water && !state.suspended {
            state.suspended = true;
            info!(ahead = state.ahead, high_water, "decoded-ahead over high water, suspending ingestion");
        } else if state.ahead < high_water && state.suspended {
            state.suspended = false;
            info!(ahead = state.ahead, high_water, "resuming ingestion");
        }
    }

    fn decode_frame(
        &self,
        planes: &GroupPlanes,
        frame: FrameIndex,
        token: &CancellationToken,
    ) -> FrameOutcome {
        if token.is_cancelled() {
            return FrameOutcome::Discarded;
        }

        let Some(ranges) = self.ranges.ranges(frame) else {
            warn!(frame, "no dequantization ranges, slot stays empty");
            return FrameOutcome::Failed;
        };

        let input = DecodeInput {
            frame,
            planes: planes.frame_planes(frame),
            ranges,
            initial_offset: self.config.initial_offset,
        };

        match self.decoder.decode(&input, &self.config.cloud) {
            Ok(cloud) => {
                if self.window.insert_if_empty(cloud, token) {
                    FrameOutcome::Published
                } else {
                    FrameOutcome::Discarded
                }
            }
            Err(err) if err.is_frame_local() => {
                warn!(frame, "frame decode failed, slot stays empty: {err}");
                FrameOutcome::Failed
            }
            Err(err) => {
                error!(frame, decoder = self.decoder.name(), "decoder error: {err}");
                FrameOutcome::Failed
            }
        }
    }

    fn decode_frames(&self, planes: &GroupPlanes, token: &CancellationToken) -> Vec<FrameOutcome> {
        let frames = planes.group.frames();

        #[cfg(feature = "sort_rayon")]
        return frames
            .into_par_iter()
            .map(|frame| self.decode_frame(planes, frame, token))
            .collect();

        #[cfg(not(feature = "sort_rayon"))]
        std::thread::scope(|scope| {
            let handles: Vec<_> = frames
                .map(|frame| scope.spawn(move || self.decode_frame(planes, frame, token)))
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or(FrameOutcome::Failed))
                .collect()
        })
    }

    /// decodes every frame of the unit in parallel, returning once all have finished
    fn process_group(&self, unit: &GroupUnit) -> GroupReport {
        let started = self.clock.now();
        let group = unit.group;
        let mut report = GroupReport {
            group,
            ..default()
        };

        if unit.token.is_cancelled() {
            report.cancelled = true;
            return report;
        }

        match self.source.load_group(&group) {
            Ok(planes) => {
                for outcome in self.decode_frames(&planes, &unit.token) {
                    match outcome {
                        FrameOutcome::Published => report.published += 1,
                        FrameOutcome::Discarded => report.discarded += 1,
                        FrameOutcome::Failed => report.failed += 1,
                    }
                }
            }
            Err(err) => {
                warn!(group = group.id, "failed to load group planes: {err}");
                report.failed = group.len();
            }
        }

        {
            let mut state = self.lock();
            report.cancelled = unit.token.is_cancelled();

            if !report.cancelled {
                state.ahead += group.len();
                state.completed.push(group.id);
                self.apply_backpressure(&mut state);
            }
        }
        self.wake.notify_all();

        report.elapsed = self.clock.now().saturating_sub(started);
        debug!(
            group = group.id,
            first = group.first,
            last = group.last,
            published = report.published,
            discarded = report.discarded,
            failed = report.failed,
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "group decoded",
        );

        report
    }

    fn next_unit_blocking(&self) -> Option<GroupUnit> {
        let mut state = self.lock();

        loop {
            if state.shutdown {
                return None;
            }

            if !state.suspended {
                if let Some(unit) = state.queue.pop_front() {
                    state.in_flight = Some(unit.group.id);
                    return Some(unit);
                }
            }

            state = self.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn worker_loop(&self) {
        while let Some(unit) = self.next_unit_blocking() {
            self.process_group(&unit);
            self.lock().in_flight = None;
        }

        debug!("stream worker stopped");
    }
}


/// serial group queue feeding the live window ahead of playback
pub struct StreamScheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl StreamScheduler {
    pub fn new(
        config: SchedulerConfig,
        groups: Vec<FrameGroup>,
        source: Arc<dyn FrameSource>,
        decoder: Arc<dyn AttributeDecoder>,
        ranges: Arc<DequantManifest>,
    ) -> StreamResult<Self> {
        Self::with_clock(config, groups, source, decoder, ranges, Arc::new(SystemClock::default()))
    }

    pub fn with_clock(
        config: SchedulerConfig,
        groups: Vec<FrameGroup>,
        source: Arc<dyn FrameSource>,
        decoder: Arc<dyn AttributeDecoder>,
        ranges: Arc<DequantManifest>,
        clock: Arc<dyn Clock>,
    ) -> StreamResult<Self> {
        if groups.is_empty() {
            return Err(StreamError::ManifestMissing("no frame groups to schedule".to_string()));
        }

        let window = Arc::new(LiveWindow::new(total_frames(&groups)));

        let shared = Arc::new(Shared {
            config,
            groups,
            window,
            source,
            decoder,
            ranges,
            clock,
            state: Mutex::new(SchedulerState {
                queue: VecDeque::new(),
                ahead: 0,
                suspended: false,
                generation: CancellationToken::new(),
                in_flight: None,
                completed: Vec::new(),
                shutdown: false,
            }),
            wake: Condvar::new(),
        });

        let worker = match config.execution {
            ExecutionMode::Manual => None,
            ExecutionMode::Threaded => {
                let shared = shared.clone();
                Some(
                    std::thread::Builder::new()
                        .name("splat-stream-decode".to_string())
                        .spawn(move || shared.worker_loop())?,
                )
            }
        };

        info!(
            groups = shared.groups.len(),
            frames = shared.window.len(),
            decoder = shared.decoder.name(),
            execution = ?config.execution,
            "stream scheduler ready",
        );

        Ok(Self { shared, worker })
    }

    pub fn window(&self) -> Arc<LiveWindow> {
        self.shared.window.clone()
    }

    pub fn groups(&self) -> &[FrameGroup] {
        &self.shared.groups
    }

    pub fn total_frames(&self) -> usize {
        self.shared.window.len()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// synchronously decodes group 0 so playback has a first frame
    pub fn decode_initial(&self) -> GroupReport {
        let unit = GroupUnit {
            group: self.shared.groups[0],
            token: self.shared.lock().generation.clone(),
        };

        self.shared.process_group(&unit)
    }

    pub fn enqueue_all(&self, skip_first: bool) {
        {
            let mut state = self.shared.lock();
            let token = state.generation.clone();

            let skip = usize::from(skip_first);
            for group in self.shared.groups.iter().skip(skip) {
                state.queue.push_back(GroupUnit {
                    group: *group,
                    token: token.clone(),
                });
            }
        }

        self.shared.wake.notify_all();
    }

    /// runs the next queued group on the calling thread, for `ExecutionMode::Manual`
    pub fn run_next(&self) -> RunStep {
        let unit = {
            let mut state = self.shared.lock();
            if state.suspended {
                return RunStep::Suspended;
            }

            let Some(unit) = state.queue.pop_front() else {
                return RunStep::Idle;
            };
            state.in_flight = Some(unit.group.id);
            unit
        };

        let report = self.shared.process_group(&unit);
        self.shared.lock().in_flight = None;

        RunStep::Processed(report)
    }

    /// drains the queue until it is empty or suspended
    pub fn run_until_blocked(&self) -> Vec<GroupReport> {
        let mut reports = Vec::new();
        while let RunStep::Processed(report) = self.run_next() {
            reports.push(report);
        }
        reports
    }

    /// runs a unit directly, bypassing the queue
    pub fn process_group(&self, unit: &GroupUnit) -> GroupReport {
        self.shared.process_group(unit)
    }

    /// re-evaluates suspension against the high water mark, returning whether ingestion is suspended
    pub fn update_backpressure(&self) -> bool {
        let suspended = {
            let mut state = self.shared.lock();
            self.shared.apply_backpressure(&mut state);
            state.suspended
        };

        self.shared.wake.notify_all();
        suspended
    }

    /// playback moved past a decoded frame
    pub fn consume_frame(&self) {
        {
            let mut state = self.shared.lock();
            state.ahead = state.ahead.saturating_sub(1);
            self.shared.apply_backpressure(&mut state);
        }

        self.shared.wake.notify_all();
    }

    /// hard discontinuity: abandons all queued and in-flight work, then decodes the group spanning `target`
    pub fn select_frame(&self, target: FrameIndex) -> StreamResult<GroupReport> {
        let total = self.total_frames();
        let (position, group) = group_containing(&self.shared.groups, target)
            .ok_or(StreamError::FrameOutOfRange { frame: target, total })?;
        let group = *group;

        let token = {
            let mut state = self.shared.lock();
            state.generation.cancel();
            state.generation = CancellationToken::new();
            state.queue.clear();
            state.ahead = 0;
            state.suspended = false;
            state.generation.clone()
        };

        self.shared.window.clear();
        info!(target, group = group.id, "seeking");

        let report = self.shared.process_group(&GroupUnit {
            group,
            token: token.clone(),
        });

        {
            let mut state = self.shared.lock();
            if !token.is_cancelled() {
                for later in &self.shared.groups[position + 1..] {
                    state.queue.push_back(GroupUnit {
                        group: *later,
                        token: token.clone(),
                    });
                }
            }
        }
        self.shared.wake.notify_all();

        Ok(report)
    }

    pub fn decoded_ahead(&self) -> usize {
        self.shared.lock().ahead
    }

    pub fn is_suspended(&self) -> bool {
        self.shared.lock().suspended
    }

    pub fn queued_groups(&self) -> Vec<u32> {
        self.shared.lock().queue.iter().map(|unit| unit.group.id).collect()
    }

    pub fn in_flight(&self) -> Option<u32> {
        self.shared.lock().in_flight
    }

    /// groups completed under a live generation, in completion order
    pub fn completed_groups(&self) -> Vec<u32> {
        self.shared.lock().completed.clone()
    }

    /// true once nothing is queued or running
    pub fn is_idle(&self) -> bool {
        let state = self.shared.lock();
        state.queue.is_empty() && state.in_flight.is_none()
    }

    pub fn shutdown(&mut self) {
        {
            let mut state = self.shared.lock();
            state.shutdown = true;
            state.generation.cancel();
            state.queue.clear();
        }
        self.shared.wake.notify_all();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("stream worker panicked");
            }
        }
    }
}

impl Drop for StreamScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
