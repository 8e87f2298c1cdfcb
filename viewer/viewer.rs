//! headless-rendering viewer: it streams, decodes, sorts and plays the sequence, but the
//! default `SplatRenderSink` only records draw calls. Insert a `SplatRenderSink` wrapping
//! your own `SplatRenderPass` to rasterize.

use bevy::{
    app::AppExit,
    prelude::*,
};
use bevy_args::{
    BevyArgsPlugin,
    parse_args,
};

use bevy_splat_stream::{
    PlaybackControl,
    SeekRequest,
    SplatCamera,
    SplatStream,
    SplatStreamPlugin,
    utils::{
        StreamArgs,
        open_image_stream,
    },
};


fn setup_stream(
    mut commands: Commands,
    args: Res<StreamArgs>,
    mut control: ResMut<PlaybackControl>,
) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(Vec3::new(0.0, 0.0, 3.0)).looking_at(Vec3::ZERO, Vec3::Y),
        SplatCamera,
    ));

    let settings = match args.stream_settings() {
        Ok(settings) => settings,
        Err(err) => {
            error!("failed to load stream settings: {err}");
            return;
        }
    };

    match open_image_stream(&args, &settings) {
        Ok(stream) => {
            info!("draw calls go to the recording sink, nothing is rasterized without a render pass");
            control.paused = args.paused;
            commands.insert_resource(settings);
            commands.insert_resource(stream);
        }
        Err(err) => error!("failed to open {}: {err}", args.frames_dir.display()),
    }
}


fn playback_input(
    keys: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    stream: Option<Res<SplatStream>>,
    mut control: ResMut<PlaybackControl>,
    mut seeks: EventWriter<SeekRequest>,
) {
    if keys.just_pressed(KeyCode::Space) {
        control.paused = !control.paused;
    }

    control.dragging = mouse.pressed(MouseButton::Left);

    let Some(stream) = stream else {
        return;
    };

    let current = stream.driver.current_frame();
    let last = stream.driver.total().saturating_sub(1);

    if keys.just_pressed(KeyCode::ArrowRight) {
        seeks.write(SeekRequest { frame: (current + 10).min(last) });
    }
    if keys.just_pressed(KeyCode::ArrowLeft) {
        seeks.write(SeekRequest { frame: current.saturating_sub(10) });
    }
    if keys.just_pressed(KeyCode::Home) {
        seeks.write(SeekRequest { frame: 0 });
    }
}


fn report_progress(
    stream: Option<Res<SplatStream>>,
    time: Res<Time>,
    mut last: Local<f32>,
) {
    let Some(stream) = stream else {
        return;
    };

    let now = time.elapsed_secs();
    if now - *last < 2.0 {
        return;
    }
    *last = now;

    info!(
        frame = ?stream.active_frame(),
        ahead = stream.scheduler.decoded_ahead(),
        resident = stream.window().occupied_count(),
        suspended = stream.scheduler.is_suspended(),
        "playback",
    );
}


pub fn esc_close(
    keys: Res<ButtonInput<KeyCode>>,
    mut exit: EventWriter<AppExit>,
) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}


fn viewer_app() {
    let config = parse_args::<StreamArgs>();
    let mut app = App::new();

    app.insert_resource(ClearColor(Color::srgb_u8(0, 0, 0)));
    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    mode: bevy::window::WindowMode::Windowed,
                    present_mode: bevy::window::PresentMode::AutoVsync,
                    resolution: bevy::window::WindowResolution::new(config.width, config.height),
                    title: config.name.clone(),
                    ..default()
                }),
                ..default()
            }),
    );
    app.add_plugins(BevyArgsPlugin::<StreamArgs>::default());

    if config.press_esc_close {
        app.add_systems(Update, esc_close);
    }

    app.add_plugins(SplatStreamPlugin);
    app.add_systems(Startup, setup_stream);
    app.add_systems(Update, (playback_input, report_progress));

    app.run();
}


pub fn main() {
    viewer_app();
}
