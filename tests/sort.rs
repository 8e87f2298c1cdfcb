use bevy::math::{Mat4, Vec2, Vec3};
use rand::Rng;

use bevy_splat_stream::{
    DepthSorter,
    DrawOrder,
    PointCloud,
    gaussian::{
        cloud::CloudOptions,
        rand::random_points,
    },
    render::CameraPose,
    sort::{
        SortMode,
        SortOutcome,
        view_depth,
    },
};


fn is_permutation(indices: &[u32]) -> bool {
    let mut seen = vec![false; indices.len()];
    for &index in indices {
        match seen.get_mut(index as usize) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    seen.into_iter().all(|slot| slot)
}

fn orbit_pose(rng: &mut impl Rng) -> CameraPose {
    let eye = Vec3::new(
        rng.gen_range(-40.0..40.0),
        rng.gen_range(-40.0..40.0),
        rng.gen_range(-40.0..40.0),
    );

    CameraPose {
        view: Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y),
        world_position: eye,
        ..Default::default()
    }
}


#[test]
fn index_buffer_stays_a_permutation() {
    let mut rng = rand::thread_rng();
    let sorter = DepthSorter::default();

    for draw_order in [DrawOrder::SlotOrder, DrawOrder::IndexIndirection, DrawOrder::PermutePoints] {
        let mut cloud = PointCloud::from_decoded(
            0,
            64,
            32,
            random_points(64 * 32),
            &CloudOptions {
                draw_order,
                ..Default::default()
            },
        );
        assert!(is_permutation(cloud.indices()));

        for tick in 0..24 {
            let pose = orbit_pose(&mut rng);
            cloud.update_uniforms(&pose, Mat4::IDENTITY, Vec2::new(1280.0, 720.0), tick as f32);
            cloud.render(&sorter).unwrap();

            assert!(is_permutation(cloud.indices()), "{draw_order:?} tick {tick}");
        }
    }
}

#[test]
fn drawn_instances_run_back_to_front() {
    let mut rng = rand::thread_rng();
    let sorter = DepthSorter::default();

    for draw_order in [DrawOrder::IndexIndirection, DrawOrder::PermutePoints] {
        let mut cloud = PointCloud::from_decoded(
            0,
            500,
            1,
            random_points(500),
            &CloudOptions {
                draw_order,
                ..Default::default()
            },
        );

        let pose = orbit_pose(&mut rng);
        cloud.update_uniforms(&pose, Mat4::IDENTITY, Vec2::ONE, 0.0);
        assert_eq!(cloud.render(&sorter).unwrap(), SortOutcome::Sorted);

        let model_view = cloud.uniforms().model_view();
        let depths: Vec<f32> = cloud
            .draw()
            .instances()
            .map(|point| view_depth(&model_view, point.position_vec3()))
            .collect();

        assert!(depths.windows(2).all(|pair| pair[0] >= pair[1]), "{draw_order:?}");
    }
}

#[test]
fn sort_modes_produce_the_same_order() {
    let points = random_points(2_000);
    let model_view = Mat4::look_at_rh(Vec3::new(3.0, 9.0, 27.0), Vec3::ZERO, Vec3::Y);

    let orders: Vec<Vec<u32>> = [
        #[cfg(feature = "sort_rayon")]
        SortMode::Rayon,
        #[cfg(feature = "sort_std")]
        SortMode::Std,
    ]
    .into_iter()
    .map(|mode| {
        let mut entries = Vec::new();
        let mut indices: Vec<u32> = (0..points.len() as u32).collect();
        DepthSorter::new(mode).sort(&points, model_view, &mut entries, &mut indices).unwrap();
        indices
    })
    .collect();

    assert!(orders.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn concurrent_sort_is_skipped_not_queued() {
    let sorter = DepthSorter::default();
    let mut cloud = PointCloud::from_decoded(0, 8, 1, random_points(8), &CloudOptions::default());

    let flight = cloud.flight();
    let holder = std::thread::spawn(move || {
        let permit = flight.try_acquire();
        assert!(permit.is_some());
        permit
    });
    let permit = holder.join().unwrap();

    assert_eq!(cloud.render(&sorter).unwrap(), SortOutcome::Skipped);
    assert!(cloud.flight().in_flight());

    drop(permit);
    assert!(!cloud.flight().in_flight());
    for _ in 0..3 {
        assert_eq!(cloud.render(&sorter).unwrap(), SortOutcome::Throttled);
    }
    assert_eq!(cloud.render(&sorter).unwrap(), SortOutcome::Sorted);
}
