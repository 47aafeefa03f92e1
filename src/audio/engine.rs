use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::assets::store::NarrationBuffer;
use crate::foundation::error::ReelResult;

/// Monotonically increasing tag identifying one bound audio source.
///
/// Every `bind` gets a fresh generation; completion events carry the
/// generation of the source that finished, so the controller can discard
/// notifications from sources it has already stopped.
pub type SourceGeneration = u64;

/// Asynchronous notification from the audio subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioEvent {
    /// The source bound under this generation played to its end.
    Completed(SourceGeneration),
}

/// The platform audio subsystem as an explicit resource.
///
/// The core only issues start/stop commands and observes completion
/// notifications; actual playback runs wherever the implementation puts it
/// (a cpal stream callback for [`crate::CpalEngine`], nowhere for
/// [`ManualAudioEngine`]). Exactly one source is bound at a time:
/// implementations stop any current source before binding a new one.
///
/// Dropping an engine releases the underlying platform resource.
pub trait AudioEngine {
    /// Bind `narration` as a fresh source under `generation`, stopping any
    /// currently bound source first.
    fn bind(&mut self, narration: &NarrationBuffer, generation: SourceGeneration)
    -> ReelResult<()>;

    /// Stop and unbind the current source without emitting a completion.
    fn stop_current(&mut self);

    /// Suspend the audio clock, freezing the bound source in place.
    fn suspend(&mut self) -> ReelResult<()>;

    /// Resume a suspended audio clock.
    fn resume(&mut self) -> ReelResult<()>;

    /// Return `true` while the audio clock is suspended.
    fn is_suspended(&self) -> bool;

    /// Set master volume, clamped to `[0.0, 1.0]`.
    fn set_volume(&mut self, volume: f32);

    /// Take the next pending notification, if any. Non-blocking.
    fn poll_event(&mut self) -> Option<AudioEvent>;
}

/// Operations observed by a [`ManualAudioEngine`], in call order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineOp {
    /// `bind` was called with this generation.
    Bind(SourceGeneration),
    /// `stop_current` was called.
    Stop,
    /// `suspend` was called.
    Suspend,
    /// `resume` was called.
    Resume,
}

#[derive(Debug)]
struct ManualState {
    bound: Option<SourceGeneration>,
    suspended: bool,
    volume: f32,
    pending: VecDeque<AudioEvent>,
    history: Vec<EngineOp>,
}

impl ManualState {
    fn new() -> Self {
        Self {
            bound: None,
            suspended: false,
            volume: 1.0,
            pending: VecDeque::new(),
            history: Vec::new(),
        }
    }
}

/// In-memory audio engine for headless hosts and tests.
///
/// No audio is produced; completion is driven by the paired
/// [`ManualEngineHandle`], which marks the bound source as played to its
/// end whenever the host decides it is.
#[derive(Debug)]
pub struct ManualAudioEngine {
    state: Arc<Mutex<ManualState>>,
}

/// Shared handle driving and observing a [`ManualAudioEngine`] after the
/// engine itself has been handed to a player.
#[derive(Clone, Debug)]
pub struct ManualEngineHandle {
    state: Arc<Mutex<ManualState>>,
}

impl Default for ManualAudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualAudioEngine {
    /// Create an engine with nothing bound and the clock running.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState::new())),
        }
    }

    /// Create an engine plus the handle that keeps driving it.
    pub fn with_handle() -> (Self, ManualEngineHandle) {
        let engine = Self::new();
        let handle = ManualEngineHandle {
            state: Arc::clone(&engine.state),
        };
        (engine, handle)
    }
}

impl ManualEngineHandle {
    /// Mark the bound source as played to its end, queueing its completion
    /// event. Returns `false` when no source is bound.
    pub fn finish_current(&self) -> bool {
        let mut state = self.state.lock();
        match state.bound.take() {
            Some(generation) => {
                state.pending.push_back(AudioEvent::Completed(generation));
                true
            }
            None => false,
        }
    }

    /// Generation of the currently bound source, if any.
    pub fn bound_generation(&self) -> Option<SourceGeneration> {
        self.state.lock().bound
    }

    /// Return `true` while the engine's audio clock is suspended.
    pub fn is_suspended(&self) -> bool {
        self.state.lock().suspended
    }

    /// Current master volume.
    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    /// All operations issued against the engine, in order.
    pub fn history(&self) -> Vec<EngineOp> {
        self.state.lock().history.clone()
    }
}

impl AudioEngine for ManualAudioEngine {
    fn bind(
        &mut self,
        _narration: &NarrationBuffer,
        generation: SourceGeneration,
    ) -> ReelResult<()> {
        let mut state = self.state.lock();
        state.bound = None;
        state.history.push(EngineOp::Bind(generation));
        state.bound = Some(generation);
        Ok(())
    }

    fn stop_current(&mut self) {
        let mut state = self.state.lock();
        state.history.push(EngineOp::Stop);
        state.bound = None;
    }

    fn suspend(&mut self) -> ReelResult<()> {
        let mut state = self.state.lock();
        state.history.push(EngineOp::Suspend);
        state.suspended = true;
        Ok(())
    }

    fn resume(&mut self) -> ReelResult<()> {
        let mut state = self.state.lock();
        state.history.push(EngineOp::Resume);
        state.suspended = false;
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        self.state.lock().suspended
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().volume = volume.clamp(0.0, 1.0);
    }

    fn poll_event(&mut self) -> Option<AudioEvent> {
        self.state.lock().pending.pop_front()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/engine.rs"]
mod tests;
