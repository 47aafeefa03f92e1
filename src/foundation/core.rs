pub use kurbo::{Affine, Point, Rect, Vec2};

/// Frame orientation requested for a generated project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AspectRatio {
    /// 16:9 wide frame.
    Landscape,
    /// 9:16 tall frame.
    Portrait,
}

impl AspectRatio {
    /// Default frame dimensions used until a host sizes the surface.
    pub fn default_canvas(self) -> Canvas {
        match self {
            Self::Landscape => Canvas {
                width: 1280,
                height: 720,
            },
            Self::Portrait => Canvas {
                width: 720,
                height: 1280,
            },
        }
    }
}

/// Output surface dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
