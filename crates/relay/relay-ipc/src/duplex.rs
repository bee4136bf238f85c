//! Duplex wiring: two rings make one bidirectional link.
//!
//! The client publishes to the "in" region and subscribes to "out"; the
//! server (echo side) holds the reciprocal pair on the same two files. The
//! two constructing processes must agree on capacity out of band — attach
//! validates only against the stored header.
//!
//! Each side creates its outbound region exactly once and then waits for
//! the peer's region to appear. Recreating a region after the peer may
//! have mapped it would strand the peer on the orphaned inode, so the
//! construction sequence never deletes a file the peer could already hold.

use crate::error::TransportError;
use crate::transport::{RingPublisher, RingSubscriber};
use crate::wait::WaitPolicy;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Paths and sizing shared by both ends of a duplex channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub in_path: PathBuf,
    pub out_path: PathBuf,
    pub capacity: usize,
    pub wait: WaitPolicy,
    /// How long `client`/`server` wait for the peer's region to appear
    /// before giving up with the underlying attach error.
    pub attach_timeout: Duration,
}

/// Attach to the peer's region, retrying while it does not exist yet (or
/// its header bytes are not written yet).
fn attach_when_ready(path: &Path, timeout: Duration) -> Result<RingSubscriber, TransportError> {
    let deadline = Instant::now() + timeout;
    loop {
        match RingSubscriber::attach(path) {
            Ok(subscriber) => return Ok(subscriber),
            Err(TransportError::Io(_) | TransportError::BadHeader(_))
                if Instant::now() < deadline =>
            {
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(e) => return Err(e),
        }
    }
}

/// One side's view of a duplex channel.
pub struct DuplexChannel {
    pub publisher: RingPublisher,
    pub subscriber: RingSubscriber,
}

impl DuplexChannel {
    /// Client side: write "in", read "out".
    ///
    /// Creates the "in" region fresh, then blocks up to
    /// `cfg.attach_timeout` for the server's "out" region. The sides may
    /// start in either order.
    pub fn client(cfg: &ChannelConfig) -> Result<Self, TransportError> {
        let publisher = RingPublisher::create(&cfg.in_path, cfg.capacity, cfg.wait)?;
        let subscriber = attach_when_ready(&cfg.out_path, cfg.attach_timeout)?;
        Ok(Self {
            publisher,
            subscriber,
        })
    }

    /// Server (echo) side: read "in", write "out".
    pub fn server(cfg: &ChannelConfig) -> Result<Self, TransportError> {
        let publisher = RingPublisher::create(&cfg.out_path, cfg.capacity, cfg.wait)?;
        let subscriber = attach_when_ready(&cfg.in_path, cfg.attach_timeout)?;
        Ok(Self {
            publisher,
            subscriber,
        })
    }
}

/// In-process topology: both sides of the channel, with threads standing in
/// for processes.
pub struct Topology;

impl Topology {
    /// Create both regions fresh and wire the four transports.
    ///
    /// Returns `(client, server)`. Construction order matters: both regions
    /// must exist before either side attaches its subscriber.
    pub fn create_pair(cfg: &ChannelConfig) -> Result<(DuplexChannel, DuplexChannel), TransportError> {
        let client_publisher = RingPublisher::create(&cfg.in_path, cfg.capacity, cfg.wait)?;
        let server_publisher = RingPublisher::create(&cfg.out_path, cfg.capacity, cfg.wait)?;
        let server_subscriber = RingSubscriber::attach(&cfg.in_path)?;
        let client_subscriber = RingSubscriber::attach(&cfg.out_path)?;
        Ok((
            DuplexChannel {
                publisher: client_publisher,
                subscriber: client_subscriber,
            },
            DuplexChannel {
                publisher: server_publisher,
                subscriber: server_subscriber,
            },
        ))
    }
}
