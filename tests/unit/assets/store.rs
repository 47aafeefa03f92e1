use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::*;
use crate::foundation::core::AspectRatio;
use crate::project::model::{Project, Segment};

fn zero_audio_b64(sample_count: usize) -> String {
    BASE64.encode(vec![0u8; sample_count * 2])
}

fn project_with_audio(payloads: Vec<String>) -> Project {
    let segments = payloads
        .into_iter()
        .enumerate()
        .map(|(i, audio_b64)| Segment {
            id: format!("s{i}"),
            narration: format!("segment {i}"),
            visual_prompt: String::new(),
            image_b64: String::new(),
            audio_b64,
            nominal_duration_secs: 4.0,
        })
        .collect();
    Project {
        id: "p".to_string(),
        topic: "t".to_string(),
        style: "s".to_string(),
        aspect_ratio: AspectRatio::Landscape,
        segments,
        created_at_unix_ms: 0,
    }
}

#[test]
fn prepare_keeps_sequences_aligned_despite_corrupt_payloads() {
    let project = project_with_audio(vec![
        zero_audio_b64(24_000),
        "corrupt!!".to_string(),
        String::new(),
    ]);
    let assets = DecodedAssets::prepare(&project);
    assert_eq!(assets.len(), 3);
    for i in 0..3 {
        assert!(assets.narration(i).is_some());
        assert!(assets.image(i).is_some());
    }
}

#[test]
fn prepare_reports_incremental_percentages() {
    let project = project_with_audio(vec![zero_audio_b64(100), zero_audio_b64(100)]);
    let mut seen = Vec::new();
    let _ = DecodedAssets::prepare_with_progress(&project, |pct| seen.push(pct));
    assert_eq!(seen, vec![25, 50, 75, 100]);
}

#[test]
fn decoded_audio_supersedes_nominal_duration() {
    let project = project_with_audio(vec![zero_audio_b64(12_000)]);
    let assets = DecodedAssets::prepare(&project);
    // 12k samples at 24 kHz is 0.5 s, not the 4 s nominal.
    assert!((assets.segment_duration_secs(0) - 0.5).abs() < 1e-9);
}

#[test]
fn corrupt_audio_falls_back_to_one_second() {
    let project = project_with_audio(vec!["??".to_string()]);
    let assets = DecodedAssets::prepare(&project);
    assert!((assets.segment_duration_secs(0) - 1.0).abs() < 1e-9);
}

#[test]
fn out_of_range_duration_uses_fallback() {
    let project = project_with_audio(vec![zero_audio_b64(100)]);
    let assets = DecodedAssets::prepare(&project);
    assert_eq!(assets.segment_duration_secs(9), FALLBACK_SEGMENT_SECS);
}

#[test]
fn total_duration_sums_segments() {
    let project = project_with_audio(vec![zero_audio_b64(24_000), zero_audio_b64(48_000)]);
    let assets = DecodedAssets::prepare(&project);
    assert!((assets.total_duration_secs() - 3.0).abs() < 1e-9);
}

#[test]
fn overall_fraction_is_monotonic_and_continuous_at_boundaries() {
    // 3 s and 2 s segments.
    let project = project_with_audio(vec![zero_audio_b64(72_000), zero_audio_b64(48_000)]);
    let assets = DecodedAssets::prepare(&project);

    let mut last = 0.0f32;
    for step in 0..=30 {
        let elapsed = 3.0 * f64::from(step) / 30.0;
        let f = assets.overall_fraction(0, elapsed);
        assert!(f >= last, "fraction regressed at {elapsed}");
        last = f;
    }

    // End of segment 0 equals start of segment 1.
    let end0 = assets.overall_fraction(0, 3.0);
    let start1 = assets.overall_fraction(1, 0.0);
    assert!((end0 - start1).abs() < 1e-6);
    assert!((end0 - 0.6).abs() < 1e-6);

    // Elapsed overshoot clamps to the segment duration.
    assert!((assets.overall_fraction(0, 99.0) - 0.6).abs() < 1e-6);
    assert_eq!(assets.overall_fraction(2, 0.0), 1.0);
}
