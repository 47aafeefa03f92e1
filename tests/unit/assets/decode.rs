use std::io::Cursor;

use super::*;

fn audio_b64(samples: &[i16]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    BASE64.encode(bytes)
}

#[test]
fn decode_audio_normalizes_pcm16le() {
    let buf = decode_audio(&audio_b64(&[0, 16_384, -16_384, i16::MAX, i16::MIN]));
    assert_eq!(buf.sample_rate, NARRATION_SAMPLE_RATE);
    let s = buf.samples.as_slice();
    assert_eq!(s.len(), 5);
    assert_eq!(s[0], 0.0);
    assert_eq!(s[1], 0.5);
    assert_eq!(s[2], -0.5);
    assert!((s[3] - (32_767.0 / 32_768.0)).abs() < 1e-6);
    assert_eq!(s[4], -1.0);
}

#[test]
fn decode_audio_drops_odd_trailing_byte() {
    let mut bytes = vec![0u8, 0, 0, 64]; // two samples
    bytes.push(0x7f); // trailing half-sample
    let buf = decode_audio(&BASE64.encode(bytes));
    assert_eq!(buf.samples.len(), 2);
}

#[test]
fn decode_audio_malformed_returns_one_second_of_silence() {
    for payload in ["not base64 !!!", ""] {
        let buf = decode_audio(payload);
        assert_eq!(buf.sample_rate, NARRATION_SAMPLE_RATE);
        assert_eq!(buf.samples.len(), NARRATION_SAMPLE_RATE as usize);
        assert!(buf.samples.iter().all(|&s| s == 0.0));
        assert!((buf.duration_secs() - FALLBACK_SILENCE_SECS).abs() < 1e-9);
    }
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let src_rgba = vec![100u8, 50u8, 200u8, 128u8];
    let img = image::RgbaImage::from_raw(1, 1, src_rgba).unwrap();

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let decoded = decode_image(&BASE64.encode(buf));
    assert_eq!(decoded.width, 1);
    assert_eq!(decoded.height, 1);
    assert_eq!(
        decoded.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn decode_image_jpeg_container_accepted() {
    let img = image::RgbImage::from_pixel(8, 4, image::Rgb([200, 10, 10]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();

    let decoded = decode_image(&BASE64.encode(buf));
    assert_eq!((decoded.width, decoded.height), (8, 4));
}

#[test]
fn decode_image_malformed_returns_placeholder() {
    for payload in ["not base64 !!!", "", &BASE64.encode([1u8, 2, 3, 4])] {
        let decoded = decode_image(payload);
        assert_eq!((decoded.width, decoded.height), (1, 1));
        assert_eq!(decoded.rgba8_premul.as_slice(), &[0, 0, 0, 255]);
    }
}
