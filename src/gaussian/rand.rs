use rand::{
    prelude::Distribution,
    Rng,
};

use crate::{
    decode::layout::CHANNEL_COUNT,
    gaussian::f32::{
        SH_REST_COUNT,
        SplatPoint,
    },
    io::source::ChannelPlane,
};


impl Distribution<SplatPoint> for rand::distributions::Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SplatPoint {
        SplatPoint {
            position: [
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-20.0..20.0),
                rng.gen_range(-20.0..20.0),
            ],
            opacity: rng.gen_range(-4.0..4.0),
            scale: [
                rng.gen_range(-6.0..0.0),
                rng.gen_range(-6.0..0.0),
                rng.gen_range(-6.0..0.0),
            ],
            rotation: [
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            ],
            sh_dc: [
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            ],
            sh_rest: [0.0; SH_REST_COUNT],
        }
    }
}

pub fn random_points(n: usize) -> Vec<SplatPoint> {
    let mut rng = rand::thread_rng();
    let mut points: Vec<SplatPoint> = Vec::with_capacity(n);

    for _ in 0..n {
        points.push(rng.r#gen());
    }

    points
}

/// one random byte plane per channel, for exercising the decoders
pub fn random_planes(width: u32, height: u32) -> Vec<ChannelPlane> {
    let mut rng = rand::thread_rng();

    (0..CHANNEL_COUNT)
        .map(|_| {
            let mut plane = ChannelPlane::filled(width, height, 0);
            rng.fill(plane.data_mut());
            plane
        })
        .collect()
}
