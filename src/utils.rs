use std::path::{Path, PathBuf};

use bevy::prelude::*;
use bevy_args::{
    Deserialize,
    Parser,
    Serialize,
};

use crate::{
    error::StreamResult,
    gaussian::settings::{
        DecodeBackend,
        StreamSettings,
    },
    sort::DepthBackend,
};


#[derive(
    Debug,
    Resource,
    Serialize,
    Deserialize,
    Parser,
)]
#[command(about = "bevy_splat_stream viewer", version, long_about = None)]
pub struct StreamArgs {
    #[arg(long, default_value = "true")]
    pub press_esc_close: bool,

    #[arg(long, default_value = "1920.0")]
    pub width: f32,

    #[arg(long, default_value = "1080.0")]
    pub height: f32,

    #[arg(long, default_value = "bevy_splat_stream")]
    pub name: String,

    /// directory holding `group<id>/<channel>/<frame>.png` planes
    #[arg(long, default_value = "assets/stream")]
    pub frames_dir: PathBuf,

    /// defaults to `<frames_dir>/group_info.json`
    #[arg(long)]
    pub group_manifest: Option<PathBuf>,

    /// defaults to `<frames_dir>/viewer_min_max.json`
    #[arg(long)]
    pub dequant_manifest: Option<PathBuf>,

    /// json `StreamSettings`, command line values win
    #[arg(long)]
    pub settings: Option<PathBuf>,

    #[arg(long)]
    pub stride: Option<u64>,

    #[arg(long)]
    pub high_water: Option<usize>,

    #[arg(long, default_value = "false")]
    pub paused: bool,

    /// decode and depth-key on the gpu
    #[arg(long, default_value = "false")]
    pub gpu: bool,
}

impl Default for StreamArgs {
    fn default() -> StreamArgs {
        StreamArgs {
            press_esc_close: true,
            width: 1920.0,
            height: 1080.0,
            name: "bevy_splat_stream".to_string(),
            frames_dir: PathBuf::from("assets/stream"),
            group_manifest: None,
            dequant_manifest: None,
            settings: None,
            stride: None,
            high_water: None,
            paused: false,
            gpu: false,
        }
    }
}

impl StreamArgs {
    pub fn group_manifest_path(&self) -> PathBuf {
        self.group_manifest
            .clone()
            .unwrap_or_else(|| self.frames_dir.join("group_info.json"))
    }

    pub fn dequant_manifest_path(&self) -> PathBuf {
        self.dequant_manifest
            .clone()
            .unwrap_or_else(|| self.frames_dir.join("viewer_min_max.json"))
    }

    pub fn stream_settings(&self) -> StreamResult<StreamSettings> {
        let mut settings = match &self.settings {
            Some(path) => load_settings(path)?,
            None => StreamSettings::default(),
        };

        if let Some(stride) = self.stride {
            settings.stride = stride;
        }
        if let Some(high_water) = self.high_water {
            settings.high_water = high_water;
        }
        if self.gpu {
            settings.decode_backend = DecodeBackend::Gpu;
            settings.depth_backend = DepthBackend::Gpu;
        }

        Ok(settings)
    }
}


pub fn load_settings(path: impl AsRef<Path>) -> StreamResult<StreamSettings> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}


/// manifests from disk, planes from the png sequence under `frames_dir`
#[cfg(feature = "io_image")]
pub fn open_image_stream(args: &StreamArgs, settings: &StreamSettings) -> StreamResult<crate::plugin::SplatStream> {
    use std::sync::Arc;

    use crate::io::{
        image_source::ImageSequenceSource,
        manifest::{
            DequantManifest,
            GroupManifest,
        },
    };

    let groups = GroupManifest::from_path(args.group_manifest_path())?;
    let ranges = DequantManifest::from_path(args.dequant_manifest_path())?;

    info!(
        groups = groups.groups.len(),
        frames = groups.total_frames(),
        root = %args.frames_dir.display(),
        "opening image sequence",
    );

    crate::plugin::SplatStream::new(
        settings,
        groups.groups,
        Arc::new(ImageSequenceSource::new(args.frames_dir.clone())),
        ranges,
    )
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_overrides_settings() {
        let args = StreamArgs::try_parse_from([
            "viewer",
            "--frames-dir",
            "clips/dance",
            "--stride",
            "3",
            "--high-water",
            "40",
        ])
        .unwrap();

        let settings = args.stream_settings().unwrap();
        assert_eq!(settings.stride, 3);
        assert_eq!(settings.high_water, 40);
        assert_eq!(settings.sort_interval, 4);
        assert_eq!(settings.decode_backend, DecodeBackend::Cpu);

        assert_eq!(args.group_manifest_path(), PathBuf::from("clips/dance/group_info.json"));
        assert_eq!(args.dequant_manifest_path(), PathBuf::from("clips/dance/viewer_min_max.json"));
    }

    #[test]
    fn missing_settings_file_is_io_error() {
        let args = StreamArgs {
            settings: Some(PathBuf::from("does/not/exist.json")),
            ..default()
        };

        assert!(matches!(args.stream_settings(), Err(crate::StreamError::Io(_))));
    }
}
