//! End-to-end harness tests: sequence integrity, RTT bounds, and the
//! periodic snapshot boundary.

use relay_config::HarnessConfig;
use relay_harness::{Echo, Publisher, Receiver};
use relay_hist::now_ns;
use relay_ipc::{ChannelConfig, Topology, WaitPolicy};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

fn test_cfg(label: &str) -> (HarnessConfig, ChannelConfig, PathBuf) {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let tag = format!(
        "{label}_{}_{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let output_dir = std::env::temp_dir().join(format!("relay_harness_{tag}"));
    std::fs::create_dir_all(&output_dir).unwrap();

    let cfg = HarnessConfig {
        message_count: 1000,
        ring_capacity: 1 << 14,
        message_size: 64,
        publish_delay_ns: 0,
        output_dir: output_dir.to_str().unwrap().to_string(),
        in_path: format!("/tmp/relay_harness_in_{tag}"),
        out_path: format!("/tmp/relay_harness_out_{tag}"),
        ..HarnessConfig::default()
    };
    cfg.validate().unwrap();
    let channel = ChannelConfig {
        in_path: PathBuf::from(&cfg.in_path),
        out_path: PathBuf::from(&cfg.out_path),
        capacity: cfg.ring_capacity,
        wait: WaitPolicy::Spin,
        attach_timeout: Duration::from_secs(5),
    };
    (cfg, channel, output_dir)
}

struct Cleanup(Vec<PathBuf>);

impl Drop for Cleanup {
    fn drop(&mut self) {
        for p in &self.0 {
            let _ = std::fs::remove_file(p);
            let _ = std::fs::remove_dir_all(p);
        }
    }
}

/// Publisher and echo run as real roles; the test drains the "out" ring
/// itself to inspect every echoed payload.
#[test]
fn sequences_arrive_in_order_with_sane_rtts() {
    let (cfg, channel, output_dir) = test_cfg("seq");
    let _cleanup = Cleanup(vec![
        channel.in_path.clone(),
        channel.out_path.clone(),
        output_dir,
    ]);

    let (client, server) = Topology::create_pair(&channel).unwrap();
    let shutdown = Arc::new(AtomicBool::new(false));

    let echo = Echo::new(server, shutdown.clone());
    let echo_handle = std::thread::spawn(move || echo.run());

    let mut publisher = Publisher::new(client.publisher, &cfg, shutdown.clone());
    let mut subscriber = client.subscriber;
    let mut published = 0u64;
    let mut next_expected = 0i64;
    let deadline = Instant::now() + Duration::from_secs(10);
    // Interleave publishing and draining so neither ring ever fills.
    while (next_expected as u64) < cfg.message_count {
        assert!(Instant::now() < deadline, "echo stalled");
        if published < cfg.message_count {
            publisher.publish_one().unwrap();
            published += 1;
        }
        subscriber
            .poll(|payload| {
                assert_eq!(payload.len(), cfg.message_size);

                let mut buf = [0u8; 8];
                buf.copy_from_slice(&payload[..8]);
                let publish_ns = i64::from_ne_bytes(buf);
                let rtt = now_ns() as i64 - publish_ns;
                assert!(rtt >= 0, "RTT must be non-negative");
                assert!(rtt < 10_000_000_000, "RTT below ten seconds");

                buf.copy_from_slice(&payload[payload.len() - 8..]);
                let sequence = i64::from_ne_bytes(buf);
                assert_eq!(sequence, next_expected, "strictly sequential, no gaps");
                next_expected += 1;

                // Interior filler is byte 7, echoed byte-exact.
                assert!(payload[8..payload.len() - 8].iter().all(|&b| b == 7));
            })
            .unwrap();
        std::hint::spin_loop();
    }
    assert_eq!(publisher.sequence(), cfg.message_count);

    shutdown.store(true, Ordering::Relaxed);
    echo_handle.join().unwrap().unwrap();
}

/// After exactly `message_count` receives a snapshot artifact appears and
/// the receiver's counter restarts from zero.
#[test]
fn snapshot_boundary_resets_received_count() {
    let (mut cfg, channel, output_dir) = test_cfg("boundary");
    cfg.message_count = 50;
    let _cleanup = Cleanup(vec![
        channel.in_path.clone(),
        channel.out_path.clone(),
        output_dir.clone(),
    ]);

    let (client, server) = Topology::create_pair(&channel).unwrap();
    let shutdown = Arc::new(AtomicBool::new(false));

    let mut publisher = Publisher::new(client.publisher, &cfg, shutdown.clone());
    let mut echo = Echo::new(server, shutdown.clone());
    let mut receiver = Receiver::new(client.subscriber, &cfg, shutdown.clone());

    let pump = |publisher: &mut Publisher, echo: &mut Echo, receiver: &mut Receiver, n: u64| {
        for _ in 0..n {
            publisher.publish_one().unwrap();
        }
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut reflected = 0;
        while reflected < n as usize {
            assert!(Instant::now() < deadline, "echo stalled");
            reflected += echo.reflect().unwrap();
        }
        let mut drained = 0;
        while drained < n as usize {
            assert!(Instant::now() < deadline, "receiver stalled");
            drained += receiver.drain().unwrap();
        }
    };

    pump(&mut publisher, &mut echo, &mut receiver, 49);
    assert_eq!(receiver.received(), 49);
    assert_eq!(artifact_count(&output_dir), 0, "no snapshot before the boundary");

    pump(&mut publisher, &mut echo, &mut receiver, 1);
    assert_eq!(receiver.received(), 0, "boundary resets the counter");
    assert_eq!(artifact_count(&output_dir), 1, "one artifact per boundary");

    // The 51st record starts a fresh window.
    pump(&mut publisher, &mut echo, &mut receiver, 1);
    assert_eq!(receiver.received(), 1);
    assert_eq!(artifact_count(&output_dir), 1);
}

fn artifact_count(dir: &PathBuf) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|x| x == "hgram"))
        .count()
}
