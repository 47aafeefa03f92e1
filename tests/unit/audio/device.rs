use std::sync::Arc;
use std::sync::mpsc::channel;

use super::*;

fn narration(samples: Vec<f32>, sample_rate: u32) -> NarrationBuffer {
    NarrationBuffer {
        sample_rate,
        samples: Arc::new(samples),
    }
}

#[test]
fn same_rate_source_passes_samples_through() {
    let (tx, rx) = channel();
    let buf = narration(vec![0.0, 1.0, -1.0], 24_000);
    let mut src = ActiveSource::new(&buf, 3, 24_000);

    assert_eq!(src.next_sample(&tx), 0.0);
    assert_eq!(src.next_sample(&tx), 1.0);
    assert_eq!(src.next_sample(&tx), -1.0);

    // Exhaustion yields silence and exactly one tagged completion.
    assert_eq!(src.next_sample(&tx), 0.0);
    assert_eq!(src.next_sample(&tx), 0.0);
    assert_eq!(rx.try_recv().unwrap(), AudioEvent::Completed(3));
    assert!(rx.try_recv().is_err());
}

#[test]
fn upsampling_interpolates_linearly() {
    let (tx, _rx) = channel();
    let buf = narration(vec![0.0, 1.0], 24_000);
    // Output at twice the source rate: half a source frame per output frame.
    let mut src = ActiveSource::new(&buf, 1, 48_000);

    assert_eq!(src.next_sample(&tx), 0.0);
    assert!((src.next_sample(&tx) - 0.5).abs() < 1e-6);
    assert_eq!(src.next_sample(&tx), 1.0);
}

#[test]
fn completion_fires_once_for_empty_tail() {
    let (tx, rx) = channel();
    let buf = narration(vec![0.25], 24_000);
    let mut src = ActiveSource::new(&buf, 9, 24_000);

    assert_eq!(src.next_sample(&tx), 0.25);
    for _ in 0..8 {
        assert_eq!(src.next_sample(&tx), 0.0);
    }
    assert_eq!(rx.try_recv().unwrap(), AudioEvent::Completed(9));
    assert!(rx.try_recv().is_err());
}
