use bevy::prelude::*;

use crate::{
    decode::filter::PointFilter,
    error::StreamResult,
    gaussian::f32::SplatPoint,
    render::{
        CameraPose,
        DragTween,
        DrawCall,
        DrawOrder,
        QUAD_VERTICES,
        SplatUniforms,
    },
    sort::{
        DepthSorter,
        SortEntry,
        SortFlight,
        SortOutcome,
    },
    stream::FrameIndex,
};


pub const DEFAULT_SORT_INTERVAL: u64 = 4;


#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    Reflect,
)]
pub enum SortState {
    #[default]
    Decoded,
    Sorting,
    Stable,
}


/// per-cloud settings fixed at decode time
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CloudOptions {
    pub filter: PointFilter,
    pub draw_order: DrawOrder,
    pub sort_interval: u64,
    pub model: Mat4,
}

impl Default for CloudOptions {
    fn default() -> Self {
        Self {
            filter: PointFilter::default(),
            draw_order: DrawOrder::default(),
            sort_interval: DEFAULT_SORT_INTERVAL,
            model: Mat4::IDENTITY,
        }
    }
}


/// one decoded frame, owned by its live window slot
#[derive(Debug)]
pub struct PointCloud {
    pub frame: FrameIndex,
    pub width: u32,
    pub height: u32,

    primary: Vec<SplatPoint>,
    scratch: Vec<SplatPoint>,
    indices: Vec<u32>,
    entries: Vec<SortEntry>,

    uniforms: SplatUniforms,
    model: Mat4,
    drag: DragTween,

    ticks: u64,
    sort_interval: u64,
    state: SortState,
    flight: SortFlight,
    valid: usize,
    draw_order: DrawOrder,
}

impl PointCloud {
    pub fn from_decoded(
        frame: FrameIndex,
        width: u32,
        height: u32,
        mut points: Vec<SplatPoint>,
        options: &CloudOptions,
    ) -> Self {
        let valid = options.filter.apply(&mut points);
        let count = points.len();

        Self {
            frame,
            width,
            height,
            scratch: points.clone(),
            primary: points,
            indices: (0..count as u32).collect(),
            entries: Vec::with_capacity(count),
            uniforms: SplatUniforms::compute(&CameraPose::default(), options.model, Vec2::ONE, 0.0, 0.0),
            model: options.model,
            drag: DragTween::default(),
            ticks: 0,
            sort_interval: options.sort_interval.max(1),
            state: SortState::Decoded,
            flight: SortFlight::default(),
            valid,
            draw_order: options.draw_order,
        }
    }

    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.valid
    }

    pub fn primary(&self) -> &[SplatPoint] {
        &self.primary
    }

    pub fn scratch(&self) -> &[SplatPoint] {
        &self.scratch
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn uniforms(&self) -> &SplatUniforms {
        &self.uniforms
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    pub fn state(&self) -> SortState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn draw_order(&self) -> DrawOrder {
        self.draw_order
    }

    /// handle on the single-flight guard, shared with whoever else may sort this cloud
    pub fn flight(&self) -> SortFlight {
        self.flight.clone()
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.drag.set_dragging(dragging);
    }

    pub fn drag_alpha(&self) -> f32 {
        self.drag.value
    }

    /// scene-update pass, runs before `render` each tick
    pub fn update_uniforms(
        &mut self,
        pose: &CameraPose,
        model: Mat4,
        viewport: Vec2,
        time: f32,
    ) {
        self.model = model;
        self.uniforms = SplatUniforms::compute(pose, model, viewport, time, self.drag.value);
        self.drag.update();
    }

    /// advances the tick counter, sorting on every `sort_interval`-th tick starting with the first
    pub fn render(&mut self, sorter: &DepthSorter) -> StreamResult<SortOutcome> {
        let due = self.ticks % self.sort_interval == 0;
        self.ticks += 1;

        if !due {
            return Ok(SortOutcome::Throttled);
        }

        let Some(_permit) = self.flight.try_acquire() else {
            debug!(frame = self.frame, tick = self.ticks, "sort already in flight, skipping");
            return Ok(SortOutcome::Skipped);
        };

        self.sort_now(sorter)?;
        Ok(SortOutcome::Sorted)
    }

    /// sorts against the current uniforms, bypassing the tick throttle but not the flight guard holder
    pub fn sort_now(&mut self, sorter: &DepthSorter) -> StreamResult<()> {
        self.state = SortState::Sorting;

        let result = sorter.sort(
            &self.primary,
            self.uniforms.model_view(),
            &mut self.entries,
            &mut self.indices,
        );

        if result.is_ok() && self.draw_order == DrawOrder::PermutePoints {
            self.permute_points();
        }

        self.state = SortState::Stable;
        result
    }

    /// gathers the primary buffer through the index buffer, leaving both point buffers in draw order
    fn permute_points(&mut self) {
        for (slot, &index) in self.scratch.iter_mut().zip(self.indices.iter()) {
            *slot = self.primary[index as usize];
        }

        std::mem::swap(&mut self.primary, &mut self.scratch);
        self.scratch.copy_from_slice(&self.primary);
    }

    pub fn draw(&self) -> DrawCall<'_> {
        let indices = match self.draw_order {
            DrawOrder::IndexIndirection => Some(self.indices.as_slice()),
            DrawOrder::SlotOrder | DrawOrder::PermutePoints => None,
        };

        DrawCall {
            frame: self.frame,
            quad: &QUAD_VERTICES,
            points: &self.primary,
            indices,
            uniforms: self.uniforms,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn cloud(depths: &[f32], draw_order: DrawOrder) -> PointCloud {
        let points = depths
            .iter()
            .map(|&z| SplatPoint {
                position: [0.0, 0.0, -z],
                opacity: z,
                ..default()
            })
            .collect();

        PointCloud::from_decoded(
            0,
            depths.len() as u32,
            1,
            points,
            &CloudOptions {
                draw_order,
                ..default()
            },
        )
    }

    fn identity_pose(cloud: &mut PointCloud) {
        let pose = CameraPose {
            view: Mat4::IDENTITY,
            ..default()
        };
        cloud.update_uniforms(&pose, Mat4::IDENTITY, Vec2::ONE, 0.0);
    }

    #[test]
    fn sorts_on_first_and_every_fourth_tick() {
        let mut cloud = cloud(&[1.0, 2.0], DrawOrder::SlotOrder);
        let sorter = DepthSorter::default();

        let outcomes: Vec<SortOutcome> = (0..9).map(|_| cloud.render(&sorter).unwrap()).collect();

        let sorted: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| **outcome == SortOutcome::Sorted)
            .map(|(tick, _)| tick)
            .collect();
        assert_eq!(sorted, vec![0, 4, 8]);
        assert_eq!(cloud.ticks(), 9);
        assert_eq!(cloud.state(), SortState::Stable);
    }

    #[test]
    fn held_flight_skips_without_blocking() {
        let mut cloud = cloud(&[1.0, 2.0], DrawOrder::SlotOrder);
        let sorter = DepthSorter::default();

        let flight = cloud.flight();
        let permit = flight.try_acquire();
        assert!(permit.is_some());

        assert_eq!(cloud.render(&sorter).unwrap(), SortOutcome::Skipped);
        assert_eq!(cloud.state(), SortState::Decoded);

        drop(permit);
        for _ in 1..4 {
            assert_eq!(cloud.render(&sorter).unwrap(), SortOutcome::Throttled);
        }
        assert_eq!(cloud.render(&sorter).unwrap(), SortOutcome::Sorted);
    }

    #[test]
    fn slot_order_leaves_points_in_place() {
        let mut cloud = cloud(&[1.0, 3.0, 2.0], DrawOrder::SlotOrder);
        identity_pose(&mut cloud);
        cloud.sort_now(&DepthSorter::default()).unwrap();

        assert_eq!(cloud.indices(), &[1, 2, 0]);
        let draw = cloud.draw();
        assert!(draw.indices.is_none());
        let order: Vec<f32> = draw.instances().map(|p| p.opacity).collect();
        assert_eq!(order, vec![1.0, 3.0, 2.0]);
    }

    #[test]
    fn indirection_draws_back_to_front() {
        let mut cloud = cloud(&[1.0, 3.0, 2.0], DrawOrder::IndexIndirection);
        identity_pose(&mut cloud);
        cloud.sort_now(&DepthSorter::default()).unwrap();

        let order: Vec<f32> = cloud.draw().instances().map(|p| p.opacity).collect();
        assert_eq!(order, vec![3.0, 2.0, 1.0]);
        assert_eq!(cloud.primary(), cloud.scratch());
    }

    #[test]
    fn permute_points_reorders_buffers() {
        let mut cloud = cloud(&[1.0, 3.0, 2.0, 0.5], DrawOrder::PermutePoints);
        identity_pose(&mut cloud);
        cloud.sort_now(&DepthSorter::default()).unwrap();

        let order: Vec<f32> = cloud.draw().instances().map(|p| p.opacity).collect();
        assert_eq!(order, vec![3.0, 2.0, 1.0, 0.5]);
        assert_eq!(cloud.primary(), cloud.scratch());

        let mut indices = cloud.indices().to_vec();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn filtered_points_keep_buffer_length() {
        let points = vec![
            SplatPoint {
                position: [0.5, 0.0, 0.0],
                ..default()
            },
            SplatPoint {
                position: [5.0, 0.0, 0.0],
                ..default()
            },
        ];

        let cloud = PointCloud::from_decoded(
            3,
            2,
            1,
            points,
            &CloudOptions {
                filter: PointFilter {
                    clip_radius: 1.0,
                    downsample: 0.0,
                },
                ..default()
            },
        );

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.valid_count(), 1);
        assert_eq!(cloud.draw().instance_count(), 2);
    }
}
