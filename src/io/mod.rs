pub mod encode;
pub mod manifest;
pub mod source;

#[cfg(feature = "io_image")]
pub mod image_source;
