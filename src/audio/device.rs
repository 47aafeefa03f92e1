use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::assets::store::NarrationBuffer;
use crate::audio::engine::{AudioEngine, AudioEvent, SourceGeneration};
use crate::foundation::error::{ReelError, ReelResult};

/// The source currently fed to the output stream.
///
/// Shared between the control thread and the cpal callback behind one small
/// mutex, locked once per output buffer.
pub(crate) struct ActiveSource {
    samples: Arc<Vec<f32>>,
    /// Source frames advanced per output frame (sample-rate ratio).
    step: f64,
    pos: f64,
    generation: SourceGeneration,
    done: bool,
}

impl ActiveSource {
    pub(crate) fn new(narration: &NarrationBuffer, generation: SourceGeneration, device_rate: u32) -> Self {
        Self {
            samples: Arc::clone(&narration.samples),
            step: f64::from(narration.sample_rate) / f64::from(device_rate.max(1)),
            pos: 0.0,
            generation,
            done: false,
        }
    }

    /// Produce the next output sample with linear-interpolation resampling.
    ///
    /// Sends exactly one completion event when the buffer empties, then
    /// yields silence.
    pub(crate) fn next_sample(&mut self, events: &Sender<AudioEvent>) -> f32 {
        if self.done {
            return 0.0;
        }
        let len = self.samples.len();
        let i0 = self.pos.floor() as usize;
        if i0 >= len {
            self.done = true;
            let _ = events.send(AudioEvent::Completed(self.generation));
            return 0.0;
        }
        let i1 = (i0 + 1).min(len - 1);
        let frac = (self.pos - i0 as f64) as f32;
        let v0 = self.samples[i0];
        let v1 = self.samples[i1];
        self.pos += self.step;
        v0 + (v1 - v0) * frac
    }
}

/// Audio engine backed by a cpal output stream on the default host.
///
/// The stream runs for the engine's whole lifetime; suspension is a flag the
/// callback observes, so pause/resume never depend on platform stream-pause
/// support. The stream resource is released when the engine is dropped.
pub struct CpalEngine {
    _stream: Stream,
    shared: Arc<Mutex<Option<ActiveSource>>>,
    volume: Arc<Mutex<f32>>,
    suspended: Arc<AtomicBool>,
    events: Receiver<AudioEvent>,
    device_rate: u32,
}

impl CpalEngine {
    /// Open an output stream, preferring `device_name` when given and
    /// falling back to the default output device.
    pub fn new(device_name: Option<&str>) -> ReelResult<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let found = host
                    .output_devices()
                    .map_err(|e| ReelError::audio(format!("enumerate output devices: {e}")))?
                    .find(|d| d.name().ok().as_deref() == Some(name));
                match found {
                    Some(d) => d,
                    None => {
                        warn!(device = name, "requested audio device not found, using default");
                        host.default_output_device()
                            .ok_or_else(|| ReelError::audio("no output device available"))?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| ReelError::audio("no output device available"))?,
        };

        let supported = device
            .default_output_config()
            .map_err(|e| ReelError::audio(format!("query default output config: {e}")))?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();
        let device_rate = config.sample_rate.0;
        let channels = usize::from(config.channels);

        debug!(
            rate = device_rate,
            channels,
            format = ?sample_format,
            "opening audio output stream"
        );

        let shared: Arc<Mutex<Option<ActiveSource>>> = Arc::new(Mutex::new(None));
        let volume = Arc::new(Mutex::new(1.0f32));
        let suspended = Arc::new(AtomicBool::new(false));
        let (tx, rx) = std::sync::mpsc::channel();

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &config,
                channels,
                Arc::clone(&shared),
                Arc::clone(&volume),
                Arc::clone(&suspended),
                tx,
            )?,
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &config,
                channels,
                Arc::clone(&shared),
                Arc::clone(&volume),
                Arc::clone(&suspended),
                tx,
            )?,
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &config,
                channels,
                Arc::clone(&shared),
                Arc::clone(&volume),
                Arc::clone(&suspended),
                tx,
            )?,
            format => {
                return Err(ReelError::audio(format!(
                    "unsupported sample format: {format:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| ReelError::audio(format!("start output stream: {e}")))?;
        info!(rate = device_rate, channels, "audio output stream started");

        Ok(Self {
            _stream: stream,
            shared,
            volume,
            suspended,
            events: rx,
            device_rate,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        channels: usize,
        shared: Arc<Mutex<Option<ActiveSource>>>,
        volume: Arc<Mutex<f32>>,
        suspended: Arc<AtomicBool>,
        events: Sender<AudioEvent>,
    ) -> ReelResult<Stream> {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let vol = *volume.lock();
                    let halted = suspended.load(Ordering::Relaxed);
                    let mut guard = shared.lock();
                    for frame in data.chunks_mut(channels) {
                        let mut v = 0.0f32;
                        if !halted
                            && let Some(src) = guard.as_mut()
                        {
                            v = src.next_sample(&events);
                        }
                        let out = T::from_sample((v * vol).clamp(-1.0, 1.0));
                        for slot in frame.iter_mut() {
                            *slot = out;
                        }
                    }
                },
                |err| {
                    error!(error = %err, "audio output stream error");
                },
                None,
            )
            .map_err(|e| ReelError::audio(format!("build output stream: {e}")))
    }
}

impl AudioEngine for CpalEngine {
    fn bind(
        &mut self,
        narration: &NarrationBuffer,
        generation: SourceGeneration,
    ) -> ReelResult<()> {
        let source = ActiveSource::new(narration, generation, self.device_rate);
        *self.shared.lock() = Some(source);
        Ok(())
    }

    fn stop_current(&mut self) {
        *self.shared.lock() = None;
    }

    fn suspend(&mut self) -> ReelResult<()> {
        self.suspended.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn resume(&mut self) -> ReelResult<()> {
        self.suspended.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Relaxed)
    }

    fn set_volume(&mut self, volume: f32) {
        *self.volume.lock() = volume.clamp(0.0, 1.0);
    }

    fn poll_event(&mut self) -> Option<AudioEvent> {
        match self.events.try_recv() {
            Ok(ev) => Some(ev),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/device.rs"]
mod tests;
