use crate::foundation::core::AspectRatio;
use crate::foundation::error::{ReelError, ReelResult};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// A fully generated narrated slideshow.
///
/// A project is a pure data model produced once by the upstream generation
/// workflow and handed to the player. It is immutable for its display
/// lifetime and replaced wholesale (never mutated) when a new generation
/// completes.
pub struct Project {
    /// Stable project identifier.
    pub id: String,
    /// Topic the project was generated for.
    pub topic: String,
    /// Visual style label chosen at generation time.
    pub style: String,
    /// Frame orientation.
    pub aspect_ratio: AspectRatio,
    /// Ordered segments making up the timeline.
    pub segments: Vec<Segment>,
    /// Creation timestamp, milliseconds since the Unix epoch.
    pub created_at_unix_ms: i64,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// One narrated scene within a [`Project`].
pub struct Segment {
    /// Stable segment identifier.
    pub id: String,
    /// Narration text; also rendered as the on-screen caption.
    pub narration: String,
    /// Prompt used to generate the still image. Carried for the upstream
    /// workflow; the player does not consume it.
    pub visual_prompt: String,
    /// Base64 still image payload in a JPEG-compatible container.
    pub image_b64: String,
    /// Base64 narration payload: PCM, 16-bit signed little-endian, mono,
    /// 24 kHz.
    pub audio_b64: String,
    /// Nominal duration in seconds, superseded by the decoded audio's true
    /// duration once available.
    pub nominal_duration_secs: f64,
}

impl Project {
    /// Parse a project from its JSON boundary form and validate it.
    pub fn from_json(json: &str) -> ReelResult<Self> {
        let project: Self = serde_json::from_str(json)
            .map_err(|e| ReelError::serde(format!("parse project json: {e}")))?;
        project.validate()?;
        Ok(project)
    }

    /// Check structural invariants required before playback.
    pub fn validate(&self) -> ReelResult<()> {
        if self.segments.is_empty() {
            return Err(ReelError::validation(
                "project must contain at least one segment",
            ));
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if seg.id.is_empty() {
                return Err(ReelError::validation(format!(
                    "segment {i} has an empty id"
                )));
            }
        }
        Ok(())
    }

    /// Number of segments in the timeline.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/project/model.rs"]
mod tests;
