use std::sync::Arc;

use bevy_splat_stream::{
    PlaybackDriver,
    PlaybackEvent,
    StreamError,
    stream::{
        ExecutionMode,
        RunStep,
    },
};

use _harness::{
    GatedSource,
    groups_of,
    scheduler_with,
    uniform_source,
    wait_until,
};


#[test]
fn backpressure_holds_ingestion_until_playback_drains() {
    let groups = groups_of(&[2, 2, 2, 2]);
    let source = Arc::new(uniform_source(&groups));
    let scheduler = scheduler_with(groups, 3, ExecutionMode::Manual, source.clone());

    scheduler.decode_initial();
    scheduler.enqueue_all(true);

    assert!(matches!(scheduler.run_next(), RunStep::Processed(_)));
    assert_eq!(scheduler.decoded_ahead(), 4);
    assert!(scheduler.is_suspended());

    for _ in 0..3 {
        assert_eq!(scheduler.run_next(), RunStep::Suspended);
    }
    assert_eq!(source.loaded_groups(), vec![0, 1]);

    scheduler.consume_frame();
    assert!(scheduler.update_backpressure(), "at the mark the queue stays suspended");

    scheduler.consume_frame();
    assert!(!scheduler.update_backpressure());

    assert!(matches!(scheduler.run_next(), RunStep::Processed(_)));
    assert_eq!(source.loaded_groups(), vec![0, 1, 2]);
}

#[test]
fn seek_leaves_only_the_target_group() {
    let groups = groups_of(&[2, 3, 2]);
    let scheduler = scheduler_with(groups.clone(), 100, ExecutionMode::Manual, Arc::new(uniform_source(&groups)));
    let window = scheduler.window();

    scheduler.decode_initial();
    scheduler.enqueue_all(true);

    let report = scheduler.select_frame(6).unwrap();
    assert_eq!(report.group.id, 2);
    assert_eq!(report.published, 2);

    assert_eq!(window.occupied_frames(), vec![5, 6]);
    assert!(scheduler.queued_groups().is_empty());
    assert_eq!(scheduler.decoded_ahead(), 2);
}

#[test]
fn seek_past_the_end_is_rejected() {
    let groups = groups_of(&[2, 2]);
    let scheduler = scheduler_with(groups.clone(), 100, ExecutionMode::Manual, Arc::new(uniform_source(&groups)));

    let err = scheduler.select_frame(4).unwrap_err();
    assert!(matches!(err, StreamError::FrameOutOfRange { frame: 4, total: 4 }));
}

#[test]
fn seek_abandons_the_group_in_flight() {
    let groups = groups_of(&[2, 2, 2, 2]);
    let source = Arc::new(GatedSource::new(uniform_source(&groups), 1));
    let scheduler = scheduler_with(groups, 100, ExecutionMode::Threaded, source.clone());
    let window = scheduler.window();

    scheduler.decode_initial();
    scheduler.enqueue_all(true);
    source.wait_entered();
    assert_eq!(scheduler.in_flight(), Some(1));

    scheduler.select_frame(7).unwrap();
    source.open();
    wait_until("worker to drain", || scheduler.is_idle());

    assert_eq!(window.occupied_frames(), vec![6, 7]);

    let completed = scheduler.completed_groups();
    assert!(completed.contains(&3));
    assert!(!completed.contains(&1));
    assert!(!completed.contains(&2));
    assert_eq!(source.loaded_groups(), vec![0, 3, 1]);
}

#[test]
fn threaded_worker_fills_the_window() {
    let groups = groups_of(&[3, 3, 3]);
    let scheduler = scheduler_with(groups.clone(), 100, ExecutionMode::Threaded, Arc::new(uniform_source(&groups)));
    let window = scheduler.window();

    scheduler.decode_initial();
    scheduler.enqueue_all(true);
    wait_until("all groups", || scheduler.completed_groups().len() == 3);

    assert_eq!(window.occupied_count(), 9);
    assert_eq!(scheduler.decoded_ahead(), 9);
}

#[test]
fn nothing_behind_the_playhead_stays_resident() {
    let groups = groups_of(&[2, 2, 2, 2, 2]);
    let scheduler = scheduler_with(groups.clone(), 3, ExecutionMode::Manual, Arc::new(uniform_source(&groups)));
    let window = scheduler.window();

    scheduler.decode_initial();
    scheduler.enqueue_all(true);

    let mut driver = PlaybackDriver::new(2, window.len());
    assert!(driver.begin(&window, &scheduler));

    for _ in 0..40 {
        scheduler.run_next();
        let event = driver.tick(&window, &scheduler).unwrap();
        if event == PlaybackEvent::Looped {
            break;
        }

        let active = driver.active().unwrap();
        let behind: Vec<usize> = window
            .occupied_frames()
            .into_iter()
            .filter(|&frame| frame <= active)
            .collect();

        assert_eq!(behind, vec![active]);
        assert!(window.occupied_count() <= 3 + 2 + 1);
    }
}

#[test]
fn seek_into_a_group_releases_the_frames_before_the_target() {
    let groups = groups_of(&[2, 6]);
    let scheduler = scheduler_with(groups.clone(), 100, ExecutionMode::Manual, Arc::new(uniform_source(&groups)));
    let window = scheduler.window();

    scheduler.decode_initial();
    scheduler.enqueue_all(true);

    let mut driver = PlaybackDriver::new(2, window.len());
    assert!(driver.begin(&window, &scheduler));

    driver.seek(5, &window, &scheduler).unwrap();
    assert_eq!(window.occupied_frames(), vec![5, 6, 7]);
    assert_eq!(scheduler.decoded_ahead(), 2);

    for _ in 0..4 {
        driver.tick(&window, &scheduler).unwrap();

        let active = driver.active().unwrap();
        assert!(window.occupied_frames().iter().all(|&frame| frame >= active));
    }

    assert_eq!(driver.active(), Some(7));
    assert_eq!(window.occupied_frames(), vec![7]);
    assert_eq!(scheduler.decoded_ahead(), 0);
}
