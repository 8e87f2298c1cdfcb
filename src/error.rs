use crate::stream::FrameIndex;


pub type StreamResult<T> = Result<T, StreamError>;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("no compute device available: {0}")]
    DeviceUnavailable(String),

    #[error("frame {frame} is missing channel plane {channel}")]
    DecodeInputMissing {
        frame: FrameIndex,
        channel: usize,
    },

    #[error("frame {frame} channel plane {channel} does not match the frame dimensions")]
    PlaneSizeMismatch {
        frame: FrameIndex,
        channel: usize,
    },

    #[error("plane of {width}x{height} given {len} bytes")]
    PlaneLength {
        width: u32,
        height: u32,
        len: usize,
    },

    #[error("gpu readback failed: {0}")]
    Readback(String),

    #[error("manifest missing: {0}")]
    ManifestMissing(String),

    #[error("manifest malformed: {0}")]
    ManifestMalformed(String),

    #[error("frame {frame} is outside the sequence of {total} frames")]
    FrameOutOfRange {
        frame: FrameIndex,
        total: usize,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "io_image")]
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl StreamError {
    pub fn malformed(message: impl Into<String>) -> Self {
        StreamError::ManifestMalformed(message.into())
    }

    /// per-frame failures leave the slot empty and the group running
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            StreamError::DecodeInputMissing { .. } | StreamError::PlaneSizeMismatch { .. }
        )
    }
}
