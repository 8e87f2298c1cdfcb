pub mod cloud;
pub mod f32;
pub mod rand;
pub mod settings;
