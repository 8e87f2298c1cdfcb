use std::sync::{
    Mutex,
    MutexGuard,
    PoisonError,
};

use crate::{
    gaussian::cloud::PointCloud,
    stream::{
        CancellationToken,
        FrameIndex,
    },
};


/// one slot per frame of the sequence, each empty or owning a decoded cloud
#[derive(Debug)]
pub struct LiveWindow {
    slots: Vec<Mutex<Option<PointCloud>>>,
}

impl LiveWindow {
    pub fn new(total_frames: usize) -> Self {
        Self {
            slots: (0..total_frames).map(|_| Mutex::new(None)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, frame: FrameIndex) -> Option<MutexGuard<'_, Option<PointCloud>>> {
        self.slots
            .get(frame)
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// publishes a decoded cloud, refusing occupied slots and cancelled work
    pub fn insert_if_empty(&self, cloud: PointCloud, token: &CancellationToken) -> bool {
        let Some(mut slot) = self.slot(cloud.frame) else {
            return false;
        };

        if token.is_cancelled() || slot.is_some() {
            return false;
        }

        *slot = Some(cloud);
        true
    }

    pub fn is_ready(&self, frame: FrameIndex) -> bool {
        self.slot(frame).is_some_and(|slot| slot.is_some())
    }

    /// empties the slot, handing the cloud back for release
    pub fn take(&self, frame: FrameIndex) -> Option<PointCloud> {
        self.slot(frame)?.take()
    }

    pub fn clear(&self) {
        for frame in 0..self.slots.len() {
            self.take(frame);
        }
    }

    /// runs `f` against the resident cloud while holding its slot
    pub fn with_cloud_mut<R>(
        &self,
        frame: FrameIndex,
        f: impl FnOnce(&mut PointCloud) -> R,
    ) -> Option<R> {
        let mut slot = self.slot(frame)?;
        slot.as_mut().map(f)
    }

    pub fn occupied_frames(&self) -> Vec<FrameIndex> {
        (0..self.slots.len())
            .filter(|&frame| self.is_ready(frame))
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied_frames().len()
    }
}
