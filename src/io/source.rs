use std::{
    collections::HashMap,
    sync::Mutex,
};

use crate::{
    decode::layout::CHANNEL_COUNT,
    error::{
        StreamError,
        StreamResult,
    },
    stream::{
        FrameGroup,
        FrameIndex,
    },
};


/// one single-channel 8 bit image produced by the external video decoder
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelPlane {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ChannelPlane {
    /// `data` must hold exactly `width * height` row-major bytes
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> StreamResult<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(StreamError::PlaneLength {
                width,
                height,
                len: data.len(),
            });
        }

        Ok(Self { width, height, data })
    }

    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// pixels are writable, the length is fixed
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn same_shape(&self, other: &ChannelPlane) -> bool {
        self.width == other.width && self.height == other.height && self.data.len() == other.data.len()
    }
}


/// planes for every frame of a group, indexed `[channel][frame offset]`
#[derive(Clone, Debug, Default)]
pub struct GroupPlanes {
    pub group: FrameGroup,
    channels: Vec<Vec<Option<ChannelPlane>>>,
}

impl GroupPlanes {
    pub fn new(group: FrameGroup) -> Self {
        Self {
            group,
            channels: vec![vec![None; group.len()]; CHANNEL_COUNT],
        }
    }

    pub fn set(&mut self, channel: usize, frame: FrameIndex, plane: ChannelPlane) {
        if let Some(offset) = self.group.offset_of(frame) {
            if let Some(frames) = self.channels.get_mut(channel) {
                frames[offset] = Some(plane);
            }
        }
    }

    pub fn get(&self, channel: usize, frame: FrameIndex) -> Option<&ChannelPlane> {
        let offset = self.group.offset_of(frame)?;
        self.channels.get(channel)?.get(offset)?.as_ref()
    }

    pub fn frame_planes(&self, frame: FrameIndex) -> [Option<&ChannelPlane>; CHANNEL_COUNT] {
        std::array::from_fn(|channel| self.get(channel, frame))
    }
}


/// external collaborator that turns a group's channel streams into planes
pub trait FrameSource: Send + Sync {
    fn load_group(&self, group: &FrameGroup) -> StreamResult<GroupPlanes>;
}


/// in-memory planes keyed by frame index, for embedders that decode video themselves
#[derive(Default)]
pub struct MemorySource {
    frames: HashMap<FrameIndex, Vec<Option<ChannelPlane>>>,
    loads: Mutex<Vec<u32>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_frame(&mut self, frame: FrameIndex, planes: Vec<Option<ChannelPlane>>) {
        self.frames.insert(frame, planes);
    }

    pub fn with_uniform_frames(frames: impl IntoIterator<Item = FrameIndex>, width: u32, height: u32, value: u8) -> Self {
        let mut source = Self::new();
        for frame in frames {
            source.insert_frame(
                frame,
                (0..CHANNEL_COUNT).map(|_| Some(ChannelPlane::filled(width, height, value))).collect(),
            );
        }
        source
    }

    /// group ids in the order they were loaded
    pub fn loaded_groups(&self) -> Vec<u32> {
        self.loads.lock().map(|loads| loads.clone()).unwrap_or_default()
    }
}

impl FrameSource for MemorySource {
    fn load_group(&self, group: &FrameGroup) -> StreamResult<GroupPlanes> {
        if let Ok(mut loads) = self.loads.lock() {
            loads.push(group.id);
        }

        let mut planes = GroupPlanes::new(*group);
        for frame in group.frames() {
            let Some(channels) = self.frames.get(&frame) else {
                continue;
            };

            for (channel, plane) in channels.iter().enumerate().take(CHANNEL_COUNT) {
                if let Some(plane) = plane {
                    planes.set(channel, frame, plane.clone());
                }
            }
        }

        Ok(planes)
    }
}
