//! PTP exchange engine over a feature-report transport

#[cfg(feature = "debug-tools")]
mod capture;
mod config;
mod device;
mod error;
mod keepalive;
mod receiver;
mod session;
#[cfg(test)]
pub(crate) mod testing;
mod transmitter;

#[cfg(feature = "debug-tools")]
pub use capture::CaptureTransport;
pub use config::{KeepAliveConfig, SessionConfig};
pub use device::FeatureTransport;
pub use error::TransportError;
pub use receiver::{ExchangeResult, ReceiveLimits, Receiver};
pub use session::{Session, SessionBuilder};
pub use transmitter::Transmitter;
