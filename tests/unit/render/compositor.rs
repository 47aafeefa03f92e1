use std::sync::Arc;

use super::*;
use crate::foundation::core::Point;

#[test]
fn zoom_scale_endpoints_and_monotonicity() {
    assert_eq!(zoom_scale(0.0), 1.0);
    assert!((zoom_scale(1.0) - 1.15).abs() < 1e-12);

    let mut last = zoom_scale(0.0);
    for step in 1..=100 {
        let t = f64::from(step) / 100.0;
        let z = zoom_scale(t);
        assert!(z > last, "zoom not strictly increasing at t={t}");
        last = z;
    }

    // Out-of-range progress clamps.
    assert_eq!(zoom_scale(-0.5), 1.0);
    assert!((zoom_scale(2.0) - 1.15).abs() < 1e-12);
}

#[test]
fn overlay_alpha_ramp_shape() {
    assert_eq!(overlay_alpha(0.0), 0.0);
    assert_eq!(overlay_alpha(0.40), 0.0);
    assert!((overlay_alpha(0.65) - 0.45).abs() < 1e-12);
    assert!((overlay_alpha(0.90) - 0.90).abs() < 1e-12);
    assert!((overlay_alpha(1.0) - 0.90).abs() < 1e-12);

    let mut last = 0.0;
    for step in 0..=100 {
        let a = overlay_alpha(f64::from(step) / 100.0);
        assert!(a >= last);
        last = a;
    }
}

#[test]
fn cover_fit_covers_frame_and_centers_crop() {
    // 100x50 image into a 200x200 frame: width overflows, height fits
    // exactly.
    let tr = cover_fit_transform(200, 200, 100, 50, 1.0);
    let tl = tr * Point::new(0.0, 0.0);
    let br = tr * Point::new(100.0, 50.0);

    assert!((tl.x - -100.0).abs() < 1e-9);
    assert!((tl.y - 0.0).abs() < 1e-9);
    assert!((br.x - 300.0).abs() < 1e-9);
    assert!((br.y - 200.0).abs() < 1e-9);
}

#[test]
fn zoom_is_anchored_at_frame_center() {
    for zoom in [1.0, 1.075, 1.15] {
        let tr = cover_fit_transform(200, 100, 80, 40, zoom);
        let center = tr * Point::new(40.0, 20.0);
        assert!((center.x - 100.0).abs() < 1e-9);
        assert!((center.y - 50.0).abs() < 1e-9);
    }
}

fn white_image(w: u32, h: u32) -> SegmentImage {
    SegmentImage {
        width: w,
        height: h,
        rgba8_premul: Arc::new(vec![255u8; (w * h * 4) as usize]),
    }
}

#[test]
fn render_produces_full_opaque_frame() {
    let mut comp = Compositor::new(1);
    let image = white_image(2, 2);
    let input = RenderInput {
        segment_index: 0,
        segment_progress: 0.5,
        overall_progress: 0.5,
        image: &image,
        caption: "",
        aspect: crate::foundation::core::AspectRatio::Landscape,
    };

    let frame = comp.render(&input, 32, 24).unwrap();
    assert_eq!((frame.width, frame.height), (32, 24));
    assert_eq!(frame.data.len(), 32 * 24 * 4);
    assert!(frame.premultiplied);

    // Every pixel is opaque: base fill + cover-fit image leave no holes.
    for px in frame.data.chunks_exact(4) {
        assert_eq!(px[3], 255);
    }

    // Top rows show the white image untinted by the overlay.
    assert!(frame.data[0] > 200);
}

#[test]
fn render_is_idempotent_for_equal_input() {
    let mut comp = Compositor::new(1);
    let image = white_image(2, 2);
    let input = RenderInput {
        segment_index: 0,
        segment_progress: 0.25,
        overall_progress: 0.1,
        image: &image,
        caption: "",
        aspect: crate::foundation::core::AspectRatio::Portrait,
    };

    let a = comp.render(&input, 16, 16).unwrap();
    let b = comp.render(&input, 16, 16).unwrap();
    assert_eq!(a.data, b.data);
}

#[test]
fn render_rejects_zero_dimensions() {
    let mut comp = Compositor::new(1);
    let image = white_image(1, 1);
    let input = RenderInput {
        segment_index: 0,
        segment_progress: 0.0,
        overall_progress: 0.0,
        image: &image,
        caption: "",
        aspect: crate::foundation::core::AspectRatio::Landscape,
    };
    assert!(comp.render(&input, 0, 16).is_err());
}
