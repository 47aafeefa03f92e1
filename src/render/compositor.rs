use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::store::SegmentImage;
use crate::foundation::core::{Affine, AspectRatio};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::caption::{
    self, CAPTION_BAND_CENTER, CAPTION_LINE_HEIGHT_FACTOR, MeasureText,
};
use crate::render::frame::FrameRGBA;

/// Additional scale gained across one segment's presentation.
pub const ZOOM_SPAN: f64 = 0.15;

/// Pan/zoom scale factor at normalized segment progress `t`.
///
/// 1.0 at the start of a segment, 1.15 at its end, strictly monotonic
/// between; anchored at frame center by the compositor.
pub fn zoom_scale(t: f64) -> f64 {
    1.0 + ZOOM_SPAN * t.clamp(0.0, 1.0)
}

/// Opacity of the caption-legibility overlay at normalized frame height
/// `t`.
///
/// Transparent above 40% of the frame, ramping to 90% opaque black by 90%
/// height and holding from there to the bottom edge.
pub fn overlay_alpha(t: f64) -> f64 {
    if t <= 0.40 {
        0.0
    } else if t < 0.90 {
        (t - 0.40) / 0.50 * 0.90
    } else {
        0.90
    }
}

/// Transform placing an `img_w`×`img_h` image into a `frame_w`×`frame_h`
/// frame with cover-fit scaling (aspect-preserving, center-cropped
/// overflow) and a zoom factor anchored at frame center.
pub(crate) fn cover_fit_transform(
    frame_w: u32,
    frame_h: u32,
    img_w: u32,
    img_h: u32,
    zoom: f64,
) -> Affine {
    let fw = f64::from(frame_w.max(1));
    let fh = f64::from(frame_h.max(1));
    let iw = f64::from(img_w.max(1));
    let ih = f64::from(img_h.max(1));

    let cover = (fw / iw).max(fh / ih);
    let scale = cover * zoom;
    Affine::translate((fw / 2.0, fh / 2.0))
        * Affine::scale(scale)
        * Affine::translate((-iw / 2.0, -ih / 2.0))
}

/// Everything the compositor needs to draw one frame.
pub struct RenderInput<'a> {
    /// Index of the segment being presented.
    pub segment_index: usize,
    /// Normalized progress through the current segment, `[0, 1]`.
    pub segment_progress: f64,
    /// Cross-segment timeline progress, `[0, 1]`.
    pub overall_progress: f32,
    /// Decoded still image for the segment.
    pub image: &'a SegmentImage,
    /// Narration text rendered as the caption.
    pub caption: &'a str,
    /// Frame orientation, which drives caption sizing.
    pub aspect: AspectRatio,
}

#[derive(Clone)]
struct ImagePaint {
    paint: vello_cpu::Image,
    w: u32,
    h: u32,
}

/// Brush carried through caption layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct CaptionBrush {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl CaptionBrush {
    const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };
}

struct ShapedLine {
    width: f32,
    layout: parley::Layout<CaptionBrush>,
}

struct CaptionLayout {
    segment_index: usize,
    frame_width: u32,
    font_px: f32,
    lines: Vec<ShapedLine>,
}

/// Shaping engine for caption lines: Parley contexts plus a cache of font
/// data handed to the raster backend.
pub(crate) struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<CaptionBrush>,
    fonts: HashMap<u64, vello_cpu::peniko::FontData>,
}

impl TextEngine {
    fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            fonts: HashMap::new(),
        }
    }

    /// Shape `text` as a single unbroken line.
    fn shape_line(&mut self, text: &str, font_size_px: f32) -> parley::Layout<CaptionBrush> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Single(parley::style::FontFamily::Generic(
                parley::style::GenericFamily::SansSerif,
            )),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font_size_px));
        builder.push_default(parley::style::StyleProperty::Brush(CaptionBrush::WHITE));
        let mut layout = builder.build(text);
        layout.break_all_lines(None);
        layout
    }

    /// Backend font data rebuilt from raw font bytes, cached by blob id.
    ///
    /// Copying the bytes keeps the raster backend decoupled from the
    /// shaping stack's blob type.
    fn font_data_cached(
        &mut self,
        key: u64,
        bytes: &[u8],
        index: u32,
    ) -> vello_cpu::peniko::FontData {
        self.fonts
            .entry(key)
            .or_insert_with(|| {
                vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(bytes.to_vec()),
                    index,
                )
            })
            .clone()
    }
}

impl MeasureText for TextEngine {
    fn measure(&mut self, text: &str, font_size_px: f32) -> f32 {
        self.shape_line(text, font_size_px).width()
    }
}

/// Per-frame visual composition on the CPU raster backend.
///
/// Holds the raster context (recreated only when the surface dimensions
/// change) plus caches for per-segment image paints, the overlay gradient,
/// and the current segment's caption layout. Rendering is idempotent: the
/// same input produces the same frame.
pub struct Compositor {
    ctx: Option<vello_cpu::RenderContext>,
    image_paints: Vec<Option<ImagePaint>>,
    gradient: Option<(u32, u32, vello_cpu::Image)>,
    captions: Option<CaptionLayout>,
    text: TextEngine,
}

impl Compositor {
    /// Create a compositor for a timeline of `segment_count` segments.
    pub fn new(segment_count: usize) -> Self {
        let mut image_paints = Vec::new();
        image_paints.resize_with(segment_count, || None);
        Self {
            ctx: None,
            image_paints,
            gradient: None,
            captions: None,
            text: TextEngine::new(),
        }
    }

    /// Draw one frame at the given surface dimensions.
    pub fn render(&mut self, input: &RenderInput<'_>, width: u32, height: u32) -> ReelResult<FrameRGBA> {
        let w16: u16 = width
            .try_into()
            .map_err(|_| ReelError::render("surface width exceeds u16"))?;
        let h16: u16 = height
            .try_into()
            .map_err(|_| ReelError::render("surface height exceeds u16"))?;
        if width == 0 || height == 0 {
            return Err(ReelError::render("surface dimensions must be non-zero"));
        }

        let image_paint = self.image_paint_for(input.segment_index, input.image)?;
        let grad = self.gradient_paint(width, height)?;
        self.ensure_captions(input, width);

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w16 && ctx.height() == h16 => ctx,
            _ => vello_cpu::RenderContext::new(w16, h16),
        };
        ctx.reset();
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        let fw = f64::from(width);
        let fh = f64::from(height);
        let full = vello_cpu::kurbo::Rect::new(0.0, 0.0, fw, fh);

        // Base fill, visible only until the cover-fit image lands on top.
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255));
        ctx.fill_rect(&full);

        // Background image: cover-fit, then continuous center-anchored zoom.
        let zoom = zoom_scale(input.segment_progress);
        let tr = cover_fit_transform(width, height, image_paint.w, image_paint.h, zoom);
        ctx.set_transform(affine_to_cpu(tr));
        ctx.set_paint(image_paint.paint.clone());
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(image_paint.w),
            f64::from(image_paint.h),
        ));

        // Caption-legibility gradient.
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(grad.clone());
        ctx.fill_rect(&full);

        // Caption block, horizontally centered around the caption band.
        if let Some(cap) = &self.captions {
            let line_h = cap.font_px * CAPTION_LINE_HEIGHT_FACTOR;
            let total_h = line_h * cap.lines.len() as f32;
            let top = fh as f32 * CAPTION_BAND_CENTER - total_h / 2.0;
            for (i, line) in cap.lines.iter().enumerate() {
                let x = (width as f32 - line.width) / 2.0;
                let y = top + line_h * i as f32;
                Self::draw_line(&mut ctx, &mut self.text, line, x, y);
            }
        }

        // Cross-segment progress bar along the bottom edge.
        let bar_h = (fh / 160.0).ceil().max(3.0);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 64));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, fh - bar_h, fw, fh));
        let filled = fw * f64::from(input.overall_progress.clamp(0.0, 1.0));
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 230));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, fh - bar_h, filled, fh));

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        ctx.render_to_pixmap(&mut pixmap);
        let data = pixmap.data_as_u8_slice().to_vec();
        self.ctx = Some(ctx);

        Ok(FrameRGBA {
            width,
            height,
            data,
            premultiplied: true,
        })
    }

    fn draw_line(
        ctx: &mut vello_cpu::RenderContext,
        text: &mut TextEngine,
        line: &ShapedLine,
        x: f32,
        y: f32,
    ) {
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            f64::from(x),
            f64::from(y),
        )));
        for row in line.layout.lines() {
            for item in row.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let run_font = run.run().font();
                let font =
                    text.font_data_cached(run_font.data.id(), run_font.data.as_ref(), run_font.index);
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }

    fn image_paint_for(&mut self, index: usize, image: &SegmentImage) -> ReelResult<ImagePaint> {
        if index >= self.image_paints.len() {
            self.image_paints.resize_with(index + 1, || None);
        }
        if let Some(p) = &self.image_paints[index] {
            return Ok(p.clone());
        }
        let paint = rgba_premul_to_image(&image.rgba8_premul, image.width, image.height)?;
        let out = ImagePaint {
            paint,
            w: image.width,
            h: image.height,
        };
        self.image_paints[index] = Some(out.clone());
        Ok(out)
    }

    fn gradient_paint(&mut self, w: u32, h: u32) -> ReelResult<vello_cpu::Image> {
        if let Some((gw, gh, img)) = &self.gradient
            && *gw == w
            && *gh == h
        {
            return Ok(img.clone());
        }
        let mut bytes = vec![0u8; (w as usize).saturating_mul(h as usize).saturating_mul(4)];
        let h1 = (h.max(1) - 1) as f64;
        for y in 0..h {
            let t = if h1 <= 0.0 { 0.0 } else { f64::from(y) / h1 };
            let a = (overlay_alpha(t) * 255.0).round().clamp(0.0, 255.0) as u8;
            // Premultiplied black: only the alpha channel carries the ramp.
            for x in 0..w {
                let idx = ((y as usize) * (w as usize) + (x as usize)) * 4 + 3;
                bytes[idx] = a;
            }
        }
        let img = rgba_premul_to_image(&bytes, w, h)?;
        self.gradient = Some((w, h, img.clone()));
        Ok(img)
    }

    fn ensure_captions(&mut self, input: &RenderInput<'_>, width: u32) {
        let font_px = caption::caption_font_px(input.aspect, width);
        if let Some(cap) = &self.captions
            && cap.segment_index == input.segment_index
            && cap.frame_width == width
            && cap.font_px == font_px
        {
            return;
        }

        let max_width = caption::caption_max_width_px(width);
        let wrapped = caption::wrap_caption(input.caption, font_px, max_width, &mut self.text);
        let lines = wrapped
            .into_iter()
            .map(|text| {
                let layout = self.text.shape_line(&text, font_px);
                ShapedLine {
                    width: layout.width(),
                    layout,
                }
            })
            .collect();

        self.captions = Some(CaptionLayout {
            segment_index: input.segment_index,
            frame_width: width,
            font_px,
            lines,
        });
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> ReelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ReelError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ReelError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ReelError::render("pixmap byte len mismatch"));
    }
    // Pixmap stores PremulRgba8; our bytes are already premultiplied.
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

fn rgba_premul_to_image(
    bytes_premul: &[u8],
    width: u32,
    height: u32,
) -> ReelResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes_premul, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
