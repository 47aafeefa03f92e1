use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::assets::store::DecodedAssets;
use crate::audio::engine::{AudioEngine, AudioEvent, SourceGeneration};
use crate::foundation::error::{ReelError, ReelResult};
use crate::playback::scheduler::TickScheduler;

/// Lifecycle of one loaded timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// Assets are still being decoded.
    Loading,
    /// Decode phase finished; idle at segment 0.
    Ready,
    /// The current segment's narration is audible.
    Playing,
    /// The audio clock is suspended; visuals are frozen.
    Paused,
    /// Every segment has played. Terminal until an explicit restart.
    Finished,
}

/// The single explicit record of playback/animation state.
///
/// Owned by the controller; the renderer and scheduler read it by
/// reference. Invariant: `segment_index == segment_count` iff status is
/// [`PlaybackStatus::Finished`].
#[derive(Clone, Debug)]
pub struct PlaybackState {
    /// Current lifecycle status.
    pub status: PlaybackStatus,
    /// Index of the segment being presented, in `[0, segment_count]`.
    pub segment_index: usize,
    segment_started_at: Option<Instant>,
    elapsed_before_pause: Duration,
}

impl PlaybackState {
    fn new() -> Self {
        Self {
            status: PlaybackStatus::Loading,
            segment_index: 0,
            segment_started_at: None,
            elapsed_before_pause: Duration::ZERO,
        }
    }

    /// Wall-clock time spent presenting the current segment.
    ///
    /// Spans paused stretches are excluded, so pan/zoom and the progress
    /// bar freeze while paused and continue seamlessly on resume.
    pub fn segment_elapsed(&self, now: Instant) -> Duration {
        let live = self
            .segment_started_at
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(Duration::ZERO);
        self.elapsed_before_pause + live
    }
}

/// The state machine that sequences segments and owns transport operations.
///
/// Forward progression is driven solely by narration completion signals:
/// the audio engine queues a [`AudioEvent::Completed`] for the bound
/// source's generation, and the controller — the only consumer — applies it
/// from the single-threaded control path (a transport command or the
/// per-tick callback). Segment transitions are strictly sequential and
/// index-monotonic.
pub struct PlaybackController {
    state: PlaybackState,
    engine: Box<dyn AudioEngine>,
    generation: SourceGeneration,
    segment_count: usize,
}

impl PlaybackController {
    /// Create a controller for a timeline of `segment_count` segments.
    ///
    /// Starts in [`PlaybackStatus::Loading`]; callers flip it to `Ready`
    /// with [`PlaybackController::mark_ready`] once the decode phase ends.
    pub fn new(engine: Box<dyn AudioEngine>, segment_count: usize) -> Self {
        Self {
            state: PlaybackState::new(),
            engine,
            generation: 0,
            segment_count,
        }
    }

    /// Transition LOADING → READY after the decode phase.
    pub fn mark_ready(&mut self) {
        if self.state.status == PlaybackStatus::Loading {
            self.state.status = PlaybackStatus::Ready;
        }
    }

    /// Read-only view of the playback state record.
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Current lifecycle status.
    pub fn status(&self) -> PlaybackStatus {
        self.state.status
    }

    /// Index of the segment being presented.
    pub fn segment_index(&self) -> usize {
        self.state.segment_index
    }

    /// Start or resume playback.
    ///
    /// Resumes a suspended audio engine; restarts from segment 0 when
    /// finished; otherwise continues the current segment and re-arms the
    /// render scheduler. Completion signals that raced a pause are applied
    /// here, at most one, before resuming.
    pub fn play(
        &mut self,
        assets: &DecodedAssets,
        scheduler: &mut TickScheduler,
        now: Instant,
    ) -> ReelResult<()> {
        if self.engine.is_suspended() {
            self.engine.resume()?;
        }

        match self.state.status {
            PlaybackStatus::Loading => {
                warn!("play ignored while loading");
                Ok(())
            }
            PlaybackStatus::Playing => Ok(()),
            PlaybackStatus::Finished => self.play_segment(0, assets, scheduler, now),
            PlaybackStatus::Ready => {
                self.play_segment(self.state.segment_index, assets, scheduler, now)
            }
            PlaybackStatus::Paused => {
                if self.take_matching_completion() {
                    let next = self.state.segment_index + 1;
                    return self.play_segment(next, assets, scheduler, now);
                }
                self.state.status = PlaybackStatus::Playing;
                self.state.segment_started_at = Some(now);
                scheduler.start();
                debug!(segment = self.state.segment_index, "resumed");
                Ok(())
            }
        }
    }

    /// Suspend the audio engine without discarding state.
    ///
    /// The scheduler stays armed so one more frame may render (harmless:
    /// rendering is idempotent); it stops on that tick because status is no
    /// longer `Playing`. Completion events are left queued while paused.
    pub fn pause(&mut self, now: Instant) -> ReelResult<()> {
        if self.state.status != PlaybackStatus::Playing {
            return Ok(());
        }
        self.engine.suspend()?;
        if let Some(started) = self.state.segment_started_at.take() {
            self.state.elapsed_before_pause += now.saturating_duration_since(started);
        }
        self.state.status = PlaybackStatus::Paused;
        debug!(segment = self.state.segment_index, "paused");
        Ok(())
    }

    /// Begin presenting segment `index`, or finish the timeline when the
    /// index is past the end.
    ///
    /// Any currently bound source is stopped first — two narrations are
    /// never audible at once. The new source's completion signal, not a
    /// timer, is what advances to `index + 1`.
    pub fn play_segment(
        &mut self,
        index: usize,
        assets: &DecodedAssets,
        scheduler: &mut TickScheduler,
        now: Instant,
    ) -> ReelResult<()> {
        if index >= self.segment_count {
            self.engine.stop_current();
            self.state.status = PlaybackStatus::Finished;
            self.state.segment_index = self.segment_count;
            self.state.segment_started_at = None;
            self.state.elapsed_before_pause = Duration::ZERO;
            scheduler.stop();
            info!(segments = self.segment_count, "timeline finished");
            return Ok(());
        }

        self.engine.stop_current();

        let narration = assets.narration(index).ok_or_else(|| {
            ReelError::validation(format!("no decoded narration for segment {index}"))
        })?;
        self.generation += 1;
        self.engine.bind(narration, self.generation)?;
        if self.engine.is_suspended() {
            self.engine.resume()?;
        }

        self.state.segment_index = index;
        self.state.segment_started_at = Some(now);
        self.state.elapsed_before_pause = Duration::ZERO;
        self.state.status = PlaybackStatus::Playing;
        scheduler.start();
        debug!(segment = index, generation = self.generation, "segment started");
        Ok(())
    }

    /// Apply pending completion signals. Called from the per-tick callback.
    ///
    /// Only acts while `Playing`, so a completion racing a pause stays
    /// queued until the next `play`. Signals whose generation does not
    /// match the bound source are stale and discarded.
    pub fn drain_completions(
        &mut self,
        assets: &DecodedAssets,
        scheduler: &mut TickScheduler,
        now: Instant,
    ) -> ReelResult<()> {
        while self.state.status == PlaybackStatus::Playing {
            match self.engine.poll_event() {
                Some(AudioEvent::Completed(generation)) if generation == self.generation => {
                    let next = self.state.segment_index + 1;
                    self.play_segment(next, assets, scheduler, now)?;
                }
                Some(AudioEvent::Completed(generation)) => {
                    debug!(generation, current = self.generation, "stale completion dropped");
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Set master volume, clamped to `[0.0, 1.0]`.
    pub fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume);
    }

    /// Stop the bound source and cancel pending ticks.
    ///
    /// Called on restart and teardown, before decoded assets are released,
    /// so no dangling callback can touch freed state.
    pub fn shutdown(&mut self, scheduler: &mut TickScheduler) {
        self.engine.stop_current();
        scheduler.stop();
        debug!("playback controller shut down");
    }

    fn take_matching_completion(&mut self) -> bool {
        let mut matched = false;
        while let Some(AudioEvent::Completed(generation)) = self.engine.poll_event() {
            if generation == self.generation {
                matched = true;
            } else {
                debug!(generation, current = self.generation, "stale completion dropped");
            }
        }
        matched
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/controller.rs"]
mod tests;
