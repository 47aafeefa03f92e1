//! Storyreel is a synchronized narrated-slideshow playback engine.
//!
//! A generated [`Project`] — an ordered list of segments, each with
//! narration audio, a still image, and caption text — plays back as one
//! continuous timeline: segments auto-advance when their narration
//! finishes, a continuous pan/zoom effect animates each still, captions are
//! word-wrapped over a legibility gradient, and a progress bar tracks the
//! whole timeline.
//!
//! # Pipeline overview
//!
//! 1. **Decode**: `Project -> DecodedAssets` (all payloads decoded up
//!    front, sequentially, with per-segment fallbacks on failure)
//! 2. **Sequence**: [`PlaybackController`] advances segments on narration
//!    completion signals — audio length, not a timer, decides segment
//!    duration
//! 3. **Render**: one [`FrameRGBA`] per cooperative tick while playing
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Single writer**: all playback state transitions happen on the
//!   control thread, from a transport command or the per-tick callback.
//! - **No IO in the core**: the player operates purely on in-memory blobs
//!   already supplied by the upstream generation workflow.
//! - **One source audible**: binding a segment's narration always stops
//!   the previous source first.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod audio;
mod foundation;
mod playback;
mod player;
mod project;
mod render;

pub use assets::decode::{
    FALLBACK_SILENCE_SECS, NARRATION_SAMPLE_RATE, decode_audio, decode_image,
};
pub use assets::store::{
    DecodedAssets, FALLBACK_SEGMENT_SECS, NarrationBuffer, SegmentImage,
};
pub use audio::device::CpalEngine;
pub use audio::engine::{
    AudioEngine, AudioEvent, EngineOp, ManualAudioEngine, ManualEngineHandle, SourceGeneration,
};
pub use foundation::core::{Affine, AspectRatio, Canvas, Point, Rect, Vec2};
pub use foundation::error::{ReelError, ReelResult};
pub use playback::controller::{PlaybackController, PlaybackState, PlaybackStatus};
pub use playback::scheduler::TickScheduler;
pub use player::{Player, PlayerOpts};
pub use project::model::{Project, Segment};
pub use render::caption::{
    CAPTION_LINE_HEIGHT_FACTOR, CAPTION_MAX_WIDTH_FRACTION, MeasureText, caption_font_px,
    caption_max_width_px, wrap_caption,
};
pub use render::compositor::{Compositor, RenderInput, ZOOM_SPAN, overlay_alpha, zoom_scale};
pub use render::frame::FrameRGBA;
