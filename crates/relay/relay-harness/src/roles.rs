//! The three harness roles, each an owned execution context.
//!
//! Role state (publish sequence, received count) lives as fields of the
//! owning role and resets only at the documented boundaries.

use relay_config::HarnessConfig;
use relay_hist::{LatencyRecorder, now_ns};
use relay_ipc::{DuplexChannel, RingPublisher, RingSubscriber, TransportError};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Spin pause between publish bursts, modelling bursty traffic.
const INTER_BURST_IDLE_NS: u64 = 5_000_000_000;

#[inline]
fn stopping(shutdown: &AtomicBool) -> bool {
    shutdown.load(Ordering::Relaxed)
}

/// Builds timestamped, sequenced records and writes them to the "in" ring.
pub struct Publisher {
    publisher: RingPublisher,
    message: Vec<u8>,
    sequence: u64,
    burst_count: u64,
    delay_ns: u64,
    shutdown: Arc<AtomicBool>,
}

impl Publisher {
    pub fn new(publisher: RingPublisher, cfg: &HarnessConfig, shutdown: Arc<AtomicBool>) -> Self {
        // Interior bytes are opaque filler; only the two i64 stamps matter.
        let message = vec![7u8; cfg.message_size];
        Self {
            publisher,
            message,
            sequence: 0,
            burst_count: cfg.message_count,
            delay_ns: cfg.publish_delay_ns,
            shutdown,
        }
    }

    /// Burst → idle → burst until shutdown. A transport error ends the role.
    pub fn run(mut self) -> Result<(), TransportError> {
        while !stopping(&self.shutdown) {
            for _ in 0..self.burst_count {
                if stopping(&self.shutdown) {
                    return Ok(());
                }
                self.publish_one()?;
            }
            let idle_until = now_ns() + INTER_BURST_IDLE_NS;
            while now_ns() < idle_until && !stopping(&self.shutdown) {
                std::hint::spin_loop();
            }
        }
        Ok(())
    }

    /// Stamp sequence (last 8 bytes) and publish time (first 8), write, and
    /// optionally spin-pace to the target inter-send interval.
    pub fn publish_one(&mut self) -> Result<(), TransportError> {
        let seq_at = self.message.len() - 8;
        self.message[seq_at..].copy_from_slice(&(self.sequence as i64).to_ne_bytes());
        self.sequence += 1;

        let publish_ns = now_ns();
        self.message[..8].copy_from_slice(&(publish_ns as i64).to_ne_bytes());

        self.publisher.write_record(&self.message)?;

        if self.delay_ns != 0 {
            let wait_until = publish_ns + self.delay_ns;
            while now_ns() < wait_until {
                std::hint::spin_loop();
            }
        }
        Ok(())
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Reflects every "in" payload verbatim onto the "out" ring.
pub struct Echo {
    channel: DuplexChannel,
    shutdown: Arc<AtomicBool>,
}

impl Echo {
    pub fn new(channel: DuplexChannel, shutdown: Arc<AtomicBool>) -> Self {
        Self { channel, shutdown }
    }

    pub fn run(mut self) -> Result<(), TransportError> {
        while !stopping(&self.shutdown) {
            self.reflect()?;
        }
        Ok(())
    }

    /// Drain "in" once, copying each record unmodified to "out".
    pub fn reflect(&mut self) -> Result<usize, TransportError> {
        let DuplexChannel {
            publisher,
            subscriber,
        } = &mut self.channel;

        let mut write_err = None;
        let drained = subscriber.poll(|payload| {
            if write_err.is_none()
                && let Err(e) = publisher.write_record(payload)
            {
                write_err = Some(e);
            }
        })?;
        match write_err {
            Some(e) => Err(e),
            None => Ok(drained),
        }
    }
}

/// Computes RTTs from echoed records and snapshots the distribution at
/// every `message_count` boundary.
pub struct Receiver {
    subscriber: RingSubscriber,
    recorder: LatencyRecorder,
    received: u64,
    batch: u64,
    delay_ns: u64,
    output_dir: PathBuf,
    shutdown: Arc<AtomicBool>,
}

impl Receiver {
    pub fn new(subscriber: RingSubscriber, cfg: &HarnessConfig, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            subscriber,
            recorder: LatencyRecorder::new(cfg.max_rtt_ns),
            received: 0,
            batch: cfg.message_count,
            delay_ns: cfg.publish_delay_ns,
            output_dir: PathBuf::from(&cfg.output_dir),
            shutdown,
        }
    }

    pub fn run(mut self) -> Result<(), TransportError> {
        while !stopping(&self.shutdown) {
            self.drain()?;
        }
        Ok(())
    }

    /// Drain "out" once, recording a clamped RTT per record.
    pub fn drain(&mut self) -> Result<usize, TransportError> {
        let recorder = &mut self.recorder;
        let received = &mut self.received;
        let batch = self.batch;
        let delay_ns = self.delay_ns;
        let output_dir = &self.output_dir;

        self.subscriber.poll(|payload| {
            let mut ts = [0u8; 8];
            ts.copy_from_slice(&payload[..8]);
            let publish_ns = i64::from_ne_bytes(ts);
            let rtt_ns = (now_ns() as i64 - publish_ns).max(0) as u64;

            if delay_ns != 0 {
                // Pacing active: correct for coordinated omission.
                recorder.record_with_expected_interval(rtt_ns, delay_ns);
            } else {
                recorder.record(rtt_ns);
            }

            *received += 1;
            if *received == batch {
                let distribution = recorder.snapshot_and_reset();
                match distribution.write_file(output_dir, "rtt") {
                    Ok(path) => {
                        tracing::info!(path = %path.display(), "snapshot written")
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to persist snapshot"),
                }
                *received = 0;
            }
        })
    }

    /// Records received since the last snapshot boundary.
    pub fn received(&self) -> u64 {
        self.received
    }
}
