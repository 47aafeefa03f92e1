use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::assets::store::DecodedAssets;
use crate::audio::device::CpalEngine;
use crate::audio::engine::AudioEngine;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};
use crate::playback::controller::{PlaybackController, PlaybackStatus};
use crate::playback::scheduler::TickScheduler;
use crate::project::model::Project;
use crate::render::compositor::{Compositor, RenderInput};
use crate::render::frame::FrameRGBA;

/// Player configuration knobs.
#[derive(Clone, Debug)]
pub struct PlayerOpts {
    /// Tick cadence used by [`Player::run_blocking`].
    pub tick_fps: f64,
    /// Preferred audio output device name; default device when `None`.
    pub audio_device: Option<String>,
    /// Master volume applied at load, clamped to `[0.0, 1.0]`.
    pub initial_volume: f32,
    /// Initial surface dimensions; the project's aspect-ratio default when
    /// `None`.
    pub canvas: Option<Canvas>,
}

impl Default for PlayerOpts {
    fn default() -> Self {
        Self {
            tick_fps: 30.0,
            audio_device: None,
            initial_volume: 1.0,
            canvas: None,
        }
    }
}

/// A loaded, playable narrated slideshow.
///
/// Owns the decoded assets, the audio engine, the playback state machine
/// and the compositor for one project's display lifetime. The host turns
/// the crank with [`Player::tick`] (or [`Player::run_blocking`]) and blits
/// [`Player::frame`] however it presents pixels.
pub struct Player {
    project: Project,
    assets: DecodedAssets,
    controller: PlaybackController,
    scheduler: TickScheduler,
    compositor: Compositor,
    width: u32,
    height: u32,
    last_frame: Option<FrameRGBA>,
    tick_fps: f64,
}

impl Player {
    /// Load a project for playback on the platform audio device.
    ///
    /// Decodes every segment's payloads up front. Failure to construct the
    /// audio subsystem aborts the load entirely; no partial playback is
    /// offered.
    pub fn load(project: Project, opts: PlayerOpts) -> ReelResult<Self> {
        let engine = CpalEngine::new(opts.audio_device.as_deref()).map_err(|e| {
            error!(error = %e, "audio subsystem construction failed, aborting load");
            e
        })?;
        Self::load_with_engine(project, opts, Box::new(engine))
    }

    /// Load a project against a caller-supplied audio engine.
    pub fn load_with_engine(
        project: Project,
        opts: PlayerOpts,
        engine: Box<dyn AudioEngine>,
    ) -> ReelResult<Self> {
        Self::load_impl(project, opts, engine, |_| {})
    }

    /// Load with an observer receiving decode progress percentages.
    pub fn load_with_progress(
        project: Project,
        opts: PlayerOpts,
        engine: Box<dyn AudioEngine>,
        progress: impl FnMut(u8),
    ) -> ReelResult<Self> {
        Self::load_impl(project, opts, engine, progress)
    }

    fn load_impl(
        project: Project,
        opts: PlayerOpts,
        engine: Box<dyn AudioEngine>,
        progress: impl FnMut(u8),
    ) -> ReelResult<Self> {
        project.validate()?;

        let mut controller = PlaybackController::new(engine, project.segment_count());
        controller.set_volume(opts.initial_volume);

        info!(project = %project.id, segments = project.segment_count(), "decoding project assets");
        let assets = DecodedAssets::prepare_with_progress(&project, progress);
        controller.mark_ready();

        let canvas = opts
            .canvas
            .unwrap_or_else(|| project.aspect_ratio.default_canvas());
        let compositor = Compositor::new(project.segment_count());

        Ok(Self {
            project,
            assets,
            controller,
            scheduler: TickScheduler::new(),
            compositor,
            width: canvas.width,
            height: canvas.height,
            last_frame: None,
            tick_fps: opts.tick_fps,
        })
    }

    /// Start or resume playback.
    pub fn play(&mut self) -> ReelResult<()> {
        self.controller
            .play(&self.assets, &mut self.scheduler, Instant::now())
    }

    /// Suspend the audio clock, freezing the timeline in place.
    pub fn pause(&mut self) -> ReelResult<()> {
        self.controller.pause(Instant::now())
    }

    /// Set master volume, clamped to `[0.0, 1.0]`.
    pub fn set_volume(&mut self, volume: f32) {
        self.controller.set_volume(volume);
    }

    /// Current lifecycle status.
    pub fn status(&self) -> PlaybackStatus {
        self.controller.status()
    }

    /// Index of the segment being presented.
    pub fn segment_index(&self) -> usize {
        self.controller.segment_index()
    }

    /// Cross-segment timeline progress in `[0, 1]`.
    pub fn overall_progress(&self) -> f32 {
        let state = self.controller.state();
        if state.status == PlaybackStatus::Finished {
            return 1.0;
        }
        let elapsed = state.segment_elapsed(Instant::now()).as_secs_f64();
        self.assets.overall_fraction(state.segment_index, elapsed)
    }

    /// The project being presented.
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Resize the drawing surface. No-op when dimensions are unchanged.
    pub fn set_surface_size(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width.max(1);
        self.height = height.max(1);
    }

    /// Current surface dimensions.
    pub fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The most recently rendered frame, if any.
    pub fn frame(&self) -> Option<&FrameRGBA> {
        self.last_frame.as_ref()
    }

    /// Perform one scheduled tick: apply pending completion signals, render
    /// a frame, and report whether another tick is wanted.
    ///
    /// Returns `false` without rendering when no tick is scheduled. The
    /// scheduler stays armed only while status is `Playing`; after a pause
    /// at most one further (idempotent) frame renders before it stops.
    pub fn tick(&mut self) -> ReelResult<bool> {
        self.tick_at(Instant::now())
    }

    pub(crate) fn tick_at(&mut self, now: Instant) -> ReelResult<bool> {
        if !self.scheduler.is_armed() {
            return Ok(false);
        }

        self.controller
            .drain_completions(&self.assets, &mut self.scheduler, now)?;

        if matches!(
            self.controller.status(),
            PlaybackStatus::Playing | PlaybackStatus::Paused
        ) {
            let frame = self.compose(now)?;
            self.last_frame = Some(frame);
        }

        if self.controller.status() != PlaybackStatus::Playing {
            self.scheduler.stop();
        }
        Ok(self.scheduler.is_armed())
    }

    /// Render a frame immediately, regardless of scheduling.
    ///
    /// Rendering is idempotent; hosts call this after a resize or whenever
    /// they need pixels outside the tick cadence.
    pub fn render_now(&mut self) -> ReelResult<&FrameRGBA> {
        let frame = self.compose(Instant::now())?;
        Ok(self.last_frame.insert(frame))
    }

    /// Drive ticks at the configured cadence until playback stops.
    ///
    /// Returns when the scheduler disarms (pause, finish, or teardown).
    /// Intended for headless hosts; windowed hosts integrate
    /// [`Player::tick`] into their own frame loop instead.
    pub fn run_blocking(&mut self) -> ReelResult<()> {
        let period = Duration::from_secs_f64(1.0 / self.tick_fps.max(1.0));
        while self.tick()? {
            std::thread::sleep(period);
        }
        Ok(())
    }

    /// Export the timeline as a video file. Deferred: always returns
    /// [`ReelError::Unimplemented`] and never affects playback state.
    pub fn download(&self) -> ReelResult<()> {
        Err(ReelError::unimplemented("video export is not available yet"))
    }

    /// Tear down playback and return control upstream.
    ///
    /// Stops the bound audio source and cancels pending ticks before the
    /// decoded assets are released. Disposal of the project itself is the
    /// caller's responsibility.
    pub fn restart(mut self) {
        self.controller.shutdown(&mut self.scheduler);
    }

    fn compose(&mut self, now: Instant) -> ReelResult<FrameRGBA> {
        let state = self.controller.state();
        let display_index = state
            .segment_index
            .min(self.assets.len().saturating_sub(1));

        let finished = state.status == PlaybackStatus::Finished;
        let elapsed = state.segment_elapsed(now).as_secs_f64();
        let duration = self.assets.segment_duration_secs(display_index);
        let segment_progress = if finished {
            1.0
        } else if duration > 0.0 {
            (elapsed / duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let overall_progress = if finished {
            1.0
        } else {
            self.assets.overall_fraction(state.segment_index, elapsed)
        };

        let image = self.assets.image(display_index).ok_or_else(|| {
            ReelError::validation(format!("no decoded image for segment {display_index}"))
        })?;
        let caption = self
            .project
            .segments
            .get(display_index)
            .map(|s| s.narration.as_str())
            .unwrap_or_default();

        let input = RenderInput {
            segment_index: display_index,
            segment_progress,
            overall_progress,
            image,
            caption,
            aspect: self.project.aspect_ratio,
        };
        self.compositor.render(&input, self.width, self.height)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.controller.shutdown(&mut self.scheduler);
    }
}

#[cfg(test)]
#[path = "../tests/unit/player.rs"]
mod tests;
