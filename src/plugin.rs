use std::sync::Arc;

use bevy::prelude::*;

use crate::{
    camera::SplatCamera,
    decode::{
        AttributeDecoder,
        CpuDecoder,
    },
    error::StreamResult,
    gaussian::settings::{
        DecodeBackend,
        StreamSettings,
    },
    io::{
        manifest::DequantManifest,
        source::FrameSource,
    },
    playback::{
        PlaybackDriver,
        PlaybackEvent,
    },
    render::{
        CameraPose,
        SplatRenderSink,
    },
    sort::{
        DepthBackend,
        DepthSorter,
        SortOutcome,
    },
    stream::{
        FrameGroup,
        FrameIndex,
        LiveWindow,
        StreamScheduler,
    },
};


/// jump playback to `frame`, decoding its group before the next tick
#[derive(Clone, Copy, Debug, Event, PartialEq, Eq)]
pub struct SeekRequest {
    pub frame: FrameIndex,
}


#[derive(Clone, Copy, Debug, Default, Reflect, Resource)]
#[reflect(Resource)]
pub struct PlaybackControl {
    pub paused: bool,
    /// user is interacting with the scene, eased into the uniforms
    pub dragging: bool,
}


/// scheduler, playback driver and sorter for one streamed sequence
#[derive(Resource)]
pub struct SplatStream {
    pub scheduler: StreamScheduler,
    pub driver: PlaybackDriver,
    pub sorter: DepthSorter,
    window: Arc<LiveWindow>,
    last_event: Option<PlaybackEvent>,
    last_sort: Option<SortOutcome>,
}

impl SplatStream {
    /// picks the decode and depth backends from `settings`
    pub fn new(
        settings: &StreamSettings,
        groups: Vec<FrameGroup>,
        source: Arc<dyn FrameSource>,
        ranges: DequantManifest,
    ) -> StreamResult<Self> {
        let (decoder, sorter) = backends(settings)?;
        Self::with_backends(settings, groups, source, decoder, sorter, ranges)
    }

    /// decodes the first group synchronously, queues the rest and shows frame 0
    pub fn with_backends(
        settings: &StreamSettings,
        groups: Vec<FrameGroup>,
        source: Arc<dyn FrameSource>,
        decoder: Arc<dyn AttributeDecoder>,
        sorter: DepthSorter,
        ranges: DequantManifest,
    ) -> StreamResult<Self> {
        let total = crate::stream::total_frames(&groups);

        let missing = ranges.missing_frames(total);
        if !missing.is_empty() {
            warn!(
                missing = missing.len(),
                first = missing[0],
                "dequantization ranges missing, those frames will never be decoded",
            );
        }

        let scheduler = StreamScheduler::new(
            settings.scheduler_config(),
            groups,
            source,
            decoder,
            Arc::new(ranges),
        )?;
        let window = scheduler.window();

        let report = scheduler.decode_initial();
        scheduler.enqueue_all(true);

        let mut driver = PlaybackDriver::new(settings.stride, total);
        if !driver.begin(&window, &scheduler) {
            warn!(
                published = report.published,
                failed = report.failed,
                "frame 0 did not decode, playback waits for a seek",
            );
        }

        info!(
            frames = total,
            stride = settings.stride,
            depth = sorter.kernel_name(),
            "splat stream started",
        );

        Ok(Self {
            scheduler,
            driver,
            sorter,
            window,
            last_event: None,
            last_sort: None,
        })
    }

    pub fn window(&self) -> &LiveWindow {
        &self.window
    }

    pub fn active_frame(&self) -> Option<FrameIndex> {
        self.driver.active()
    }

    pub fn last_event(&self) -> Option<PlaybackEvent> {
        self.last_event
    }

    pub fn last_sort(&self) -> Option<SortOutcome> {
        self.last_sort
    }

    pub fn tick(&mut self) -> StreamResult<PlaybackEvent> {
        let event = self.driver.tick(&self.window, &self.scheduler)?;
        self.last_event = Some(event);
        Ok(event)
    }

    pub fn seek(&mut self, frame: FrameIndex) -> StreamResult<()> {
        let report = self.driver.seek(frame, &self.window, &self.scheduler)?;
        debug!(
            frame,
            group = report.group.id,
            published = report.published,
            "seek complete",
        );
        Ok(())
    }
}


#[cfg(feature = "gpu")]
fn backends(settings: &StreamSettings) -> StreamResult<(Arc<dyn AttributeDecoder>, DepthSorter)> {
    use crate::gpu::{
        GpuContext,
        GpuDecoder,
        GpuDepthKernel,
    };

    let wants_gpu = settings.decode_backend == DecodeBackend::Gpu
        || settings.depth_backend == DepthBackend::Gpu;
    let context = if wants_gpu {
        Some(GpuContext::new_blocking()?)
    } else {
        None
    };

    let decoder: Arc<dyn AttributeDecoder> = match (settings.decode_backend, &context) {
        (DecodeBackend::Gpu, Some(context)) => Arc::new(GpuDecoder::new(context.clone())),
        _ => Arc::new(CpuDecoder),
    };

    let sorter = match (settings.depth_backend, context) {
        (DepthBackend::Gpu, Some(context)) => DepthSorter::with_kernel(settings.sort_mode, GpuDepthKernel::new(context)),
        _ => DepthSorter::new(settings.sort_mode),
    };

    Ok((decoder, sorter))
}

#[cfg(not(feature = "gpu"))]
fn backends(settings: &StreamSettings) -> StreamResult<(Arc<dyn AttributeDecoder>, DepthSorter)> {
    use crate::error::StreamError;

    if settings.decode_backend == DecodeBackend::Gpu || settings.depth_backend == DepthBackend::Gpu {
        return Err(StreamError::DeviceUnavailable(
            "built without the `gpu` feature".to_string(),
        ));
    }

    Ok((Arc::new(CpuDecoder), DepthSorter::new(settings.sort_mode)))
}


pub struct SplatStreamPlugin;

impl Plugin for SplatStreamPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<StreamSettings>();
        app.register_type::<PlaybackControl>();
        app.register_type::<SplatCamera>();

        app.init_resource::<StreamSettings>();
        app.init_resource::<PlaybackControl>();
        app.init_resource::<SplatRenderSink>();
        app.add_event::<SeekRequest>();

        app.add_systems(
            Update,
            (
                advance_playback,
                update_cloud_uniforms,
                submit_active_cloud,
            )
                .chain()
                .run_if(resource_exists::<SplatStream>),
        );
    }
}


pub fn advance_playback(
    mut stream: ResMut<SplatStream>,
    control: Res<PlaybackControl>,
    mut seeks: EventReader<SeekRequest>,
) {
    if let Some(request) = seeks.read().last() {
        if let Err(err) = stream.seek(request.frame) {
            warn!("seek to frame {} rejected: {err}", request.frame);
        }
    }

    stream.driver.set_paused(control.paused);

    match stream.tick() {
        Ok(PlaybackEvent::Stalled(frame)) => {
            debug!(frame, ahead = stream.scheduler.decoded_ahead(), "playback waiting on decode");
        }
        Ok(_) => {}
        Err(err) => error!("playback tick failed: {err}"),
    }
}


pub fn update_cloud_uniforms(
    stream: Res<SplatStream>,
    settings: Res<StreamSettings>,
    control: Res<PlaybackControl>,
    time: Res<Time>,
    cameras: Query<(&GlobalTransform, &Camera), With<SplatCamera>>,
) {
    let Some(active) = stream.active_frame() else {
        return;
    };

    let Some((transform, camera)) = cameras.iter().find(|(_, camera)| camera.is_active) else {
        return;
    };

    let pose = CameraPose::from_transform(transform, camera.clip_from_view());
    let viewport = camera.logical_viewport_size().unwrap_or(Vec2::ONE);
    let model = settings.model_transform().compute_matrix();
    let elapsed = time.elapsed_secs();

    stream.window().with_cloud_mut(active, |cloud| {
        cloud.set_dragging(control.dragging);
        cloud.update_uniforms(&pose, model, viewport, elapsed);
    });
}


pub fn submit_active_cloud(
    mut stream: ResMut<SplatStream>,
    mut sink: ResMut<SplatRenderSink>,
) {
    let Some(active) = stream.active_frame() else {
        return;
    };

    let stream = &mut *stream;
    let outcome = stream.window.with_cloud_mut(active, |cloud| {
        let outcome = cloud.render(&stream.sorter);
        sink.draw(&cloud.draw());
        outcome
    });

    match outcome {
        Some(Ok(outcome)) => stream.last_sort = Some(outcome),
        Some(Err(err)) => {
            stream.last_sort = None;
            error!(frame = active, "depth sort failed: {err}");
        }
        None => debug!(frame = active, "active frame released before draw"),
    }
}
