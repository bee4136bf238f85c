mod duplex;
mod error;
mod ring;
mod shm_layout;
mod transport;
mod wait;

pub use duplex::{ChannelConfig, DuplexChannel, Topology};
pub use error::TransportError;
pub use ring::{FRAME_HEADER, MIN_CAPACITY, frame_bytes};
pub use transport::{RingPublisher, RingSubscriber};
pub use wait::WaitPolicy;
