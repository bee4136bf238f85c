//! Recorder and distribution tests.

use relay_hist::{Distribution, LatencyRecorder};

#[test]
fn record_clamps_to_max() {
    let mut recorder = LatencyRecorder::new(1_000);
    recorder.record(500);
    recorder.record(5_000);

    let dist = recorder.snapshot_and_reset();
    assert_eq!(dist.stats.count, 2);
    assert_eq!(dist.stats.min, 500);
    assert_eq!(dist.stats.max, 1_000, "oversized sample clamped");
}

#[test]
fn expected_interval_backfills_missing_samples() {
    let mut recorder = LatencyRecorder::new(u64::MAX);
    // A 1000ns observation against a 100ns expected interval hides nine
    // stalled sends: 900, 800, ..., 100.
    recorder.record_with_expected_interval(1_000, 100);
    assert_eq!(recorder.len(), 10);

    let dist = recorder.snapshot_and_reset();
    assert_eq!(dist.stats.min, 100);
    assert_eq!(dist.stats.max, 1_000);
    assert_eq!(dist.stats.mean, 550.0);
}

#[test]
fn expected_interval_zero_records_single_sample() {
    let mut recorder = LatencyRecorder::new(u64::MAX);
    recorder.record_with_expected_interval(1_000, 0);
    assert_eq!(recorder.len(), 1);
}

#[test]
fn value_at_or_below_interval_has_no_backfill() {
    let mut recorder = LatencyRecorder::new(u64::MAX);
    recorder.record_with_expected_interval(100, 100);
    recorder.record_with_expected_interval(99, 100);
    assert_eq!(recorder.len(), 2);
}

#[test]
fn snapshot_resets_the_window() {
    let mut recorder = LatencyRecorder::new(u64::MAX);
    for i in 0..100 {
        recorder.record(i);
    }
    let first = recorder.snapshot_and_reset();
    assert_eq!(first.stats.count, 100);
    assert!(recorder.is_empty(), "snapshot drains the window");

    recorder.record(7);
    assert_eq!(recorder.len(), 1, "fresh window starts at one");
    let second = recorder.snapshot_and_reset();
    assert_eq!(second.stats.count, 1);
    assert_eq!(second.stats.p50, 7);
}

#[test]
fn percentiles_on_uniform_ramp() {
    let mut recorder = LatencyRecorder::new(u64::MAX);
    for i in 1..=1000 {
        recorder.record(i);
    }
    let stats = recorder.snapshot_and_reset().stats;
    assert_eq!(stats.min, 1);
    assert_eq!(stats.max, 1000);
    assert_eq!(stats.p50, 500);
    assert_eq!(stats.p90, 900);
    assert_eq!(stats.p99, 990);
    assert_eq!(stats.p999, 999);
}

#[test]
fn empty_snapshot_is_zeroed() {
    let mut recorder = LatencyRecorder::new(u64::MAX);
    let stats = recorder.snapshot_and_reset().stats;
    assert_eq!(stats.count, 0);
    assert_eq!(stats.max, 0);
}

#[test]
fn distribution_writes_artifact() {
    let mut recorder = LatencyRecorder::new(u64::MAX);
    for i in 0..10 {
        recorder.record(i * 100);
    }
    let dist: Distribution = recorder.snapshot_and_reset();

    let dir = std::env::temp_dir();
    let path = dist.write_file(&dir, "rtt-test").expect("write artifact");
    assert!(path.file_name().unwrap().to_str().unwrap().ends_with(".hgram"));

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("samples: 10"));
    assert!(text.contains("p99"));
    let _ = std::fs::remove_file(&path);
}
