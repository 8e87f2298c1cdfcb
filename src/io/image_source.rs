use std::path::{Path, PathBuf};

use bevy::prelude::*;

use crate::{
    decode::layout::CHANNEL_COUNT,
    error::StreamResult,
    io::source::{
        ChannelPlane,
        FrameSource,
        GroupPlanes,
    },
    stream::{
        FrameGroup,
        FrameIndex,
    },
};


/// grayscale png planes laid out as `<root>/group<id>/<channel>/<frame:04>.png`
#[derive(Clone, Debug)]
pub struct ImageSequenceSource {
    pub root: PathBuf,
}

impl ImageSequenceSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    pub fn plane_path(&self, group: u32, channel: usize, frame: FrameIndex) -> PathBuf {
        self.root
            .join(format!("group{group}"))
            .join(channel.to_string())
            .join(format!("{frame:04}.png"))
    }

    pub fn read_plane(path: &Path) -> StreamResult<ChannelPlane> {
        let luma = image::open(path)?.to_luma8();
        let (width, height) = luma.dimensions();

        ChannelPlane::new(width, height, luma.into_raw())
    }

    pub fn write_plane(path: &Path, plane: &ChannelPlane) -> StreamResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        image::save_buffer(
            path,
            plane.data(),
            plane.width(),
            plane.height(),
            image::ExtendedColorType::L8,
        )?;
        Ok(())
    }
}

impl FrameSource for ImageSequenceSource {
    fn load_group(&self, group: &FrameGroup) -> StreamResult<GroupPlanes> {
        let mut planes = GroupPlanes::new(*group);

        for frame in group.frames() {
            for channel in 0..CHANNEL_COUNT {
                let path = self.plane_path(group.id, channel, frame);

                match Self::read_plane(&path) {
                    Ok(plane) => planes.set(channel, frame, plane),
                    Err(err) => warn!(
                        frame,
                        channel,
                        path = %path.display(),
                        "unreadable channel plane: {err}",
                    ),
                }
            }
        }

        Ok(planes)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_png() {
        let root = std::env::temp_dir().join(format!("splat_stream_png_{}", std::process::id()));
        let source = ImageSequenceSource::new(&root);
        let group = FrameGroup::new(4, 8, 8);

        for channel in 0..CHANNEL_COUNT {
            let plane = ChannelPlane::new(2, 1, vec![channel as u8, 200]).unwrap();
            ImageSequenceSource::write_plane(&source.plane_path(4, channel, 8), &plane).unwrap();
        }
        std::fs::remove_file(source.plane_path(4, 16, 8)).unwrap();

        let planes = source.load_group(&group).unwrap();
        assert_eq!(planes.get(3, 8).unwrap().data(), &[3, 200]);
        assert!(planes.get(16, 8).is_none());

        std::fs::remove_dir_all(root).ok();
    }
}
