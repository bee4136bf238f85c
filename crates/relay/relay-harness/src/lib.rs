//! Round-trip latency harness: publisher → echo → receiver over a pair of
//! shared-memory rings, one role per thread.

mod roles;

pub use roles::{Echo, Publisher, Receiver};

use relay_config::HarnessConfig;
use relay_ipc::{ChannelConfig, Topology, TransportError, WaitPolicy};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub struct Orchestrator {
    cfg: HarnessConfig,
}

impl Orchestrator {
    pub fn new(cfg: HarnessConfig) -> Self {
        Self { cfg }
    }

    /// Wire the topology and drive all three roles until `shutdown` flips
    /// (or the publisher hits an unrecoverable transport error, which ends
    /// the run).
    ///
    /// Echo and receiver run on their own threads; the publisher occupies
    /// the calling thread. An echo or receiver failure terminates only that
    /// role — a still-healthy receiver keeps flushing snapshots.
    pub fn run(self, shutdown: Arc<AtomicBool>) -> Result<(), TransportError> {
        let cfg = self.cfg;
        let channel = ChannelConfig {
            in_path: PathBuf::from(&cfg.in_path),
            out_path: PathBuf::from(&cfg.out_path),
            capacity: cfg.ring_capacity,
            wait: WaitPolicy::Spin,
            attach_timeout: Duration::from_secs(5),
        };
        let (client, server) = Topology::create_pair(&channel)?;
        tracing::info!(
            in_path = %channel.in_path.display(),
            out_path = %channel.out_path.display(),
            capacity = channel.capacity,
            message_size = cfg.message_size,
            message_count = cfg.message_count,
            delay_ns = cfg.publish_delay_ns,
            "harness topology created"
        );

        let echo = Echo::new(server, shutdown.clone());
        let receiver = Receiver::new(client.subscriber, &cfg, shutdown.clone());
        let publisher = Publisher::new(client.publisher, &cfg, shutdown.clone());

        let echo_core = cfg.echo_core;
        let echo_handle = std::thread::Builder::new()
            .name("echo".into())
            .spawn(move || {
                if let Some(core) = echo_core {
                    relay_affinity::pin("echo", core);
                }
                if let Err(e) = echo.run() {
                    tracing::error!(error = %e, "echo role terminated");
                }
            })
            .expect("failed to spawn echo thread");

        let receiver_core = cfg.receiver_core;
        let receiver_handle = std::thread::Builder::new()
            .name("receiver".into())
            .spawn(move || {
                if let Some(core) = receiver_core {
                    relay_affinity::pin("receiver", core);
                }
                if let Err(e) = receiver.run() {
                    tracing::error!(error = %e, "receiver role terminated");
                }
            })
            .expect("failed to spawn receiver thread");

        if let Some(core) = cfg.publisher_core {
            relay_affinity::pin("publisher", core);
        }
        let result = publisher.run();
        if let Err(e) = &result {
            tracing::error!(error = %e, "publisher terminated, ending run");
        }

        // Publisher done (shutdown or fatal error): stop the other roles.
        shutdown.store(true, Ordering::Relaxed);
        let _ = echo_handle.join();
        let _ = receiver_handle.join();
        result
    }
}
