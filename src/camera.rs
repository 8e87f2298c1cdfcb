use bevy::prelude::*;


/// marks the camera whose pose and viewport feed the splat uniforms
#[derive(
    Clone,
    Component,
    Debug,
    Default,
    Reflect,
)]
#[reflect(Component)]
pub struct SplatCamera;
