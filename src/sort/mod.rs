use std::{
    cmp::Ordering,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering as AtomicOrdering},
    },
};

use bevy::prelude::*;
use bytemuck::{
    Pod,
    Zeroable,
};
use serde::{
    Deserialize,
    Serialize,
};
use static_assertions::assert_cfg;

use crate::{
    error::StreamResult,
    gaussian::f32::SplatPoint,
};


#[cfg(feature = "sort_rayon")]
pub mod rayon;

#[cfg(feature = "sort_std")]
pub mod std_sort;


assert_cfg!(
    any(
        feature = "sort_rayon",
        feature = "sort_std",
    ),
    "no sort mode enabled",
);


/// comparison sort run after the depth keys are ready
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    Reflect,
    Serialize,
    Deserialize,
)]
pub enum SortMode {
    #[cfg(feature = "sort_rayon")]
    Rayon,

    #[cfg(feature = "sort_std")]
    Std,
}

impl Default for SortMode {
    #[allow(unreachable_code)]
    fn default() -> Self {
        #[cfg(feature = "sort_rayon")]
        return Self::Rayon;

        #[cfg(feature = "sort_std")]
        return Self::Std;
    }
}


/// where the per-point depth keys are computed
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
pub enum DepthBackend {
    #[default]
    Cpu,
    Gpu,
}


/// `key` holds the bits of the point's view depth
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Reflect,
    Pod,
    Zeroable,
)]
#[repr(C)]
pub struct SortEntry {
    pub key: u32,
    pub index: u32,
}

impl SortEntry {
    pub fn new(depth: f32, index: u32) -> Self {
        Self {
            key: bytemuck::cast(depth),
            index,
        }
    }

    pub fn depth(&self) -> f32 {
        bytemuck::cast(self.key)
    }
}

/// distance along the camera's forward axis, larger is farther
pub fn view_depth(model_view: &Mat4, position: Vec3) -> f32 {
    -model_view.transform_point3(position).z
}

/// farthest first, ties keep slot order
pub fn back_to_front(a: &SortEntry, b: &SortEntry) -> Ordering {
    b.depth()
        .total_cmp(&a.depth())
        .then_with(|| a.index.cmp(&b.index))
}


pub trait DepthKernel: Send + Sync {
    fn name(&self) -> &'static str;

    /// fills one entry per point, returning only once every key is written
    fn compute_keys(
        &self,
        points: &[SplatPoint],
        model_view: Mat4,
        entries: &mut Vec<SortEntry>,
    ) -> StreamResult<()>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CpuDepthKernel;

impl DepthKernel for CpuDepthKernel {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn compute_keys(
        &self,
        points: &[SplatPoint],
        model_view: Mat4,
        entries: &mut Vec<SortEntry>,
    ) -> StreamResult<()> {
        entries.resize(points.len(), SortEntry::default());

        #[cfg(feature = "sort_rayon")]
        rayon::compute_keys(points, &model_view, entries);

        #[cfg(not(feature = "sort_rayon"))]
        points
            .iter()
            .zip(entries.iter_mut())
            .enumerate()
            .for_each(|(idx, (point, entry))| {
                *entry = SortEntry::new(view_depth(&model_view, point.position_vec3()), idx as u32);
            });

        Ok(())
    }
}


/// depth kernel then comparison sort, strictly sequenced
pub struct DepthSorter {
    pub mode: SortMode,
    kernel: Box<dyn DepthKernel>,
}

impl Default for DepthSorter {
    fn default() -> Self {
        Self::new(SortMode::default())
    }
}

impl DepthSorter {
    pub fn new(mode: SortMode) -> Self {
        Self::with_kernel(mode, CpuDepthKernel)
    }

    pub fn with_kernel(mode: SortMode, kernel: impl DepthKernel + 'static) -> Self {
        Self {
            mode,
            kernel: Box::new(kernel),
        }
    }

    pub fn kernel_name(&self) -> &'static str {
        self.kernel.name()
    }

    /// rewrites `indices` into back-to-front draw order for `points` under `model_view`
    pub fn sort(
        &self,
        points: &[SplatPoint],
        model_view: Mat4,
        entries: &mut Vec<SortEntry>,
        indices: &mut [u32],
    ) -> StreamResult<()> {
        debug_assert_eq!(points.len(), indices.len());

        self.kernel.compute_keys(points, model_view, entries)?;

        match self.mode {
            #[cfg(feature = "sort_rayon")]
            SortMode::Rayon => rayon::sort_entries(entries),

            #[cfg(feature = "sort_std")]
            SortMode::Std => std_sort::sort_entries(entries),
        }

        for (slot, entry) in indices.iter_mut().zip(entries.iter()) {
            *slot = entry.index;
        }

        Ok(())
    }
}


/// at most one sort outstanding per cloud
#[derive(Clone, Debug, Default)]
pub struct SortFlight {
    busy: Arc<AtomicBool>,
}

impl SortFlight {
    /// `None` when a sort is already in flight, never blocks
    pub fn try_acquire(&self) -> Option<SortPermit> {
        self.busy
            .compare_exchange(false, true, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .ok()
            .map(|_| SortPermit {
                busy: self.busy.clone(),
            })
    }

    pub fn in_flight(&self) -> bool {
        self.busy.load(AtomicOrdering::Acquire)
    }
}

#[must_use]
#[derive(Debug)]
pub struct SortPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for SortPermit {
    fn drop(&mut self) {
        self.busy.store(false, AtomicOrdering::Release);
    }
}


#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortOutcome {
    Sorted,
    /// a sort was due but another was still in flight
    Skipped,
    /// not a sort tick
    Throttled,
}
