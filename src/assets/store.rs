use std::sync::Arc;

use tracing::{debug, warn};

use crate::assets::decode;
use crate::project::model::Project;

/// Duration assumed for a segment whose narration buffer is absent.
pub const FALLBACK_SEGMENT_SECS: f64 = 5.0;

#[derive(Clone, Debug)]
/// Decoded narration stored as normalized mono `f32` PCM.
pub struct NarrationBuffer {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Mono samples in `[-1.0, 1.0]`.
    pub samples: Arc<Vec<f32>>,
}

impl NarrationBuffer {
    /// Playback duration of this buffer in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

#[derive(Clone, Debug)]
/// Decoded still image in premultiplied RGBA8 form.
pub struct SegmentImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

#[derive(Clone, Debug)]
/// All decoded playable assets for one project, index-aligned with its
/// segments.
///
/// Both sequences always have exactly one entry per segment: a failed decode
/// is filled with a deterministic fallback (silent buffer, blank
/// placeholder), never omitted. Created once during the load phase and
/// discarded together when the project is replaced or the player is torn
/// down.
pub struct DecodedAssets {
    narrations: Vec<NarrationBuffer>,
    images: Vec<SegmentImage>,
}

impl DecodedAssets {
    /// Decode every segment's payloads, front-loading all work before
    /// playback.
    pub fn prepare(project: &Project) -> Self {
        Self::prepare_with_progress(project, |_| {})
    }

    /// Decode sequentially, reporting incremental progress as a percentage.
    ///
    /// Segments are decoded one at a time, not in parallel, which bounds
    /// local resource usage and yields a meaningful progress sequence:
    /// audio and image each count as one step per segment, so the observer
    /// sees `completed_steps / (2 * segment_count) * 100`.
    pub fn prepare_with_progress(project: &Project, mut progress: impl FnMut(u8)) -> Self {
        let n = project.segments.len();
        let total_steps = (2 * n).max(1);
        let mut completed = 0usize;

        let mut narrations = Vec::with_capacity(n);
        let mut images = Vec::with_capacity(n);

        for seg in &project.segments {
            let narration = match decode::try_decode_audio(&seg.audio_b64) {
                Ok(buf) => buf,
                Err(e) => {
                    warn!(segment = %seg.id, error = %e, "narration decode failed, using silence");
                    decode::silent_narration()
                }
            };
            completed += 1;
            progress((completed * 100 / total_steps) as u8);

            let image = match decode::try_decode_image(&seg.image_b64) {
                Ok(img) => img,
                Err(e) => {
                    warn!(segment = %seg.id, error = %e, "image decode failed, using placeholder");
                    decode::placeholder_image()
                }
            };
            completed += 1;
            progress((completed * 100 / total_steps) as u8);

            narrations.push(narration);
            images.push(image);
        }

        debug!(segments = n, "decode phase complete");
        Self { narrations, images }
    }

    /// Number of segments covered by these assets.
    pub fn len(&self) -> usize {
        self.narrations.len()
    }

    /// Return `true` when no segments are present.
    pub fn is_empty(&self) -> bool {
        self.narrations.is_empty()
    }

    /// Decoded narration for segment `index`.
    pub fn narration(&self, index: usize) -> Option<&NarrationBuffer> {
        self.narrations.get(index)
    }

    /// Decoded image for segment `index`.
    pub fn image(&self, index: usize) -> Option<&SegmentImage> {
        self.images.get(index)
    }

    /// Authoritative duration of segment `index` in seconds.
    ///
    /// The decoded narration defines on-screen segment duration; out-of-range
    /// indices fall back to [`FALLBACK_SEGMENT_SECS`].
    pub fn segment_duration_secs(&self, index: usize) -> f64 {
        self.narrations
            .get(index)
            .map(NarrationBuffer::duration_secs)
            .unwrap_or(FALLBACK_SEGMENT_SECS)
    }

    /// Sum of all segment durations in seconds.
    pub fn total_duration_secs(&self) -> f64 {
        self.narrations.iter().map(NarrationBuffer::duration_secs).sum()
    }

    /// Overall timeline progress in `[0, 1]`.
    ///
    /// Computed as completed segment durations plus the elapsed time into
    /// the current segment, over the total duration. Elapsed time is clamped
    /// to the current segment's duration so the fraction is non-decreasing
    /// within a segment and continuous across a segment boundary.
    pub fn overall_fraction(&self, current_index: usize, elapsed_in_current_secs: f64) -> f32 {
        let total = self.total_duration_secs();
        if total <= 0.0 {
            return 0.0;
        }
        if current_index >= self.len() {
            return 1.0;
        }

        let completed: f64 = self.narrations[..current_index]
            .iter()
            .map(NarrationBuffer::duration_secs)
            .sum();
        let current = elapsed_in_current_secs.clamp(0.0, self.segment_duration_secs(current_index));
        (((completed + current) / total) as f32).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
