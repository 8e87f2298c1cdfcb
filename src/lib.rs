pub use camera::SplatCamera;
pub use decode::{
    AttributeDecoder,
    CpuDecoder,
};
pub use error::{
    StreamError,
    StreamResult,
};
pub use gaussian::{
    cloud::PointCloud,
    f32::SplatPoint,
    settings::StreamSettings,
};
pub use playback::{
    PlaybackDriver,
    PlaybackEvent,
};
pub use plugin::{
    PlaybackControl,
    SeekRequest,
    SplatStream,
    SplatStreamPlugin,
};
pub use render::{
    DrawCall,
    DrawOrder,
    SplatRenderPass,
    SplatRenderSink,
};
pub use sort::DepthSorter;
pub use stream::{
    FrameGroup,
    FrameIndex,
    LiveWindow,
    StreamScheduler,
};

pub mod camera;
pub mod decode;
pub mod error;
pub mod gaussian;
pub mod io;
pub mod playback;
pub mod plugin;
pub mod render;
pub mod sort;
pub mod stream;
pub mod utils;

#[cfg(feature = "gpu")]
pub mod gpu;
