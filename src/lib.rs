//! PTP (Packet Transfer Protocol) - chunked JSON exchanges over HID feature reports
//!
//! A peripheral that only speaks fixed-size (244 byte) feature reports can still
//! carry arbitrarily long JSON documents: PTP splits each command into type-tagged
//! frames, and reassembles the device's frames back into one response.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ptp::{FeatureTransport, Session, SessionConfig};
//!
//! fn talk<T: FeatureTransport + 'static>(device: Arc<T>) -> ptp::Result<()> {
//!     let session = Session::open(device, SessionConfig::default())?;
//!     println!("connected to {}", session.device_info());
//!
//!     let value = session.send("config get /a")?;
//!     println!("value = {value}");
//!
//!     session.close()
//! }
//! ```
//!
//! # Features
//!
//! - **Frame codec** - pure layout/parse of the 5-byte outgoing and 6-byte incoming headers
//! - **Serialized exchanges** - one in-flight exchange per session, enforced by a guard
//! - **Bounded receive loop** - per-read and per-exchange timeouts, response size cap
//! - **Optional keep-alive** - jittered `hb` heartbeats on a background thread

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod locale;
pub mod protocol;
pub mod transport;

pub use locale::{Locale, describe};
pub use protocol::{
    Command, Error, ErrorKind, FRAME_SIZE, MAX_MESSAGE_LEN, MessageType, MetricsSnapshot,
    REPORT_ID, Result,
};
pub use transport::{
    FeatureTransport, KeepAliveConfig, Session, SessionBuilder, SessionConfig, TransportError,
};

/// PTP wire revision implemented by this crate
pub const VERSION: &str = "1";
