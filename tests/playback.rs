use std::{
    sync::Arc,
    time::Duration,
};

use bevy_splat_stream::{
    PlaybackDriver,
    PlaybackEvent,
    stream::ExecutionMode,
};

use _harness::{
    groups_of,
    scheduler_with,
    uniform_source,
};


#[test]
fn threaded_playback_visits_every_frame_then_loops() {
    let groups = groups_of(&[3, 4, 2, 5, 1]);
    let scheduler = scheduler_with(groups.clone(), 4, ExecutionMode::Threaded, Arc::new(uniform_source(&groups)));
    let window = scheduler.window();

    scheduler.decode_initial();
    scheduler.enqueue_all(true);

    let mut driver = PlaybackDriver::new(2, window.len());
    assert!(driver.begin(&window, &scheduler));

    let mut visited = vec![0];
    let mut stalls = 0;
    loop {
        match driver.tick(&window, &scheduler).unwrap() {
            PlaybackEvent::Advanced { from, to } => {
                assert_eq!(from, visited.last().copied());
                visited.push(to);
            }
            PlaybackEvent::Stalled(_) => {
                stalls += 1;
                assert!(stalls < 5_000, "playback never caught up with decode");
                std::thread::sleep(Duration::from_millis(1));
            }
            PlaybackEvent::Looped => break,
            PlaybackEvent::Stepped => {}
            event => panic!("unexpected {event:?}"),
        }
    }

    assert_eq!(visited, (0..window.len()).collect::<Vec<_>>());
    assert!(driver.state().wrapped);
    assert_eq!(driver.active(), Some(0));
    assert!(window.is_ready(0));
}

#[test]
fn seek_while_paused_shows_the_target() {
    let groups = groups_of(&[2, 2, 2]);
    let scheduler = scheduler_with(groups.clone(), 100, ExecutionMode::Manual, Arc::new(uniform_source(&groups)));
    let window = scheduler.window();

    scheduler.decode_initial();
    scheduler.enqueue_all(true);

    let mut driver = PlaybackDriver::new(3, window.len());
    driver.begin(&window, &scheduler);
    driver.set_paused(true);

    driver.seek(3, &window, &scheduler).unwrap();
    assert_eq!(driver.active(), Some(3));
    assert_eq!(driver.current_frame(), 3);
    assert_eq!(window.occupied_frames(), vec![3]);
    assert_eq!(scheduler.queued_groups(), vec![2]);

    assert_eq!(driver.tick(&window, &scheduler).unwrap(), PlaybackEvent::Paused);
    assert_eq!(driver.active(), Some(3));
}

#[test]
fn single_frame_sequence_never_loops() {
    let groups = groups_of(&[1]);
    let scheduler = scheduler_with(groups.clone(), 100, ExecutionMode::Manual, Arc::new(uniform_source(&groups)));
    let window = scheduler.window();

    scheduler.decode_initial();

    let mut driver = PlaybackDriver::new(2, 1);
    driver.begin(&window, &scheduler);

    assert_eq!(driver.tick(&window, &scheduler).unwrap(), PlaybackEvent::Stepped);
    for _ in 0..4 {
        assert_eq!(driver.tick(&window, &scheduler).unwrap(), PlaybackEvent::Held);
    }
    assert_eq!(driver.active(), Some(0));
}
