use std::sync::Arc;

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::assets::store::{NarrationBuffer, SegmentImage};
use crate::foundation::error::{ReelError, ReelResult};

/// Sample rate of narration payloads handed across the generation boundary.
pub const NARRATION_SAMPLE_RATE: u32 = 24_000;

/// Duration of the silent buffer substituted for an undecodable narration.
pub const FALLBACK_SILENCE_SECS: f64 = 1.0;

/// Decode a base64 narration payload into a normalized mono buffer.
///
/// The payload is interpreted as 16-bit signed little-endian samples at
/// 24 kHz; an odd trailing byte is dropped and each sample is normalized to
/// `[-1.0, 1.0]`. On any failure this returns a one-second silent buffer
/// instead of raising — a single bad segment must never abort the timeline.
pub fn decode_audio(payload_b64: &str) -> NarrationBuffer {
    try_decode_audio(payload_b64).unwrap_or_else(|_| silent_narration())
}

/// Decode a base64 image payload into premultiplied RGBA8.
///
/// Assumes a JPEG-compatible container. On failure this returns a 1×1 blank
/// placeholder image and never raises to the caller.
pub fn decode_image(payload_b64: &str) -> SegmentImage {
    try_decode_image(payload_b64).unwrap_or_else(|_| placeholder_image())
}

pub(crate) fn try_decode_audio(payload_b64: &str) -> ReelResult<NarrationBuffer> {
    let bytes = BASE64
        .decode(payload_b64.trim())
        .context("decode narration base64")?;

    // chunks_exact drops an odd trailing byte.
    let mut samples = Vec::<f32>::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        let v = i16::from_le_bytes([pair[0], pair[1]]);
        samples.push(f32::from(v) / 32_768.0);
    }

    if samples.is_empty() {
        return Err(ReelError::validation("narration payload has no samples"));
    }

    Ok(NarrationBuffer {
        sample_rate: NARRATION_SAMPLE_RATE,
        samples: Arc::new(samples),
    })
}

pub(crate) fn try_decode_image(payload_b64: &str) -> ReelResult<SegmentImage> {
    let bytes = BASE64
        .decode(payload_b64.trim())
        .context("decode image base64")?;
    let dyn_img = image::load_from_memory(&bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(SegmentImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// One second of silence at the narration sample rate.
pub(crate) fn silent_narration() -> NarrationBuffer {
    let len = (NARRATION_SAMPLE_RATE as f64 * FALLBACK_SILENCE_SECS) as usize;
    NarrationBuffer {
        sample_rate: NARRATION_SAMPLE_RATE,
        samples: Arc::new(vec![0.0; len]),
    }
}

/// A 1×1 opaque black placeholder image.
pub(crate) fn placeholder_image() -> SegmentImage {
    SegmentImage {
        width: 1,
        height: 1,
        rgba8_premul: Arc::new(vec![0, 0, 0, 255]),
    }
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
