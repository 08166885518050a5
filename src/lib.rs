//! Client-side media session negotiation for SFU streaming
//!
//! Establishes and tears down a live audio/video publishing session
//! against a selective-forwarding media server, coordinated over a
//! persistent signaling channel:
//!
//! - [`signaling`]: correlated request/acknowledge transport
//! - [`negotiate`]: capability exchange and local engine loading
//! - [`transport`]: the single outbound transport and its handshakes
//! - [`media`]: local track acquisition, producers, enabled-state gating
//! - [`session`]: the supervising lifecycle state machine
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use sfu_client::media::StubDevices;
//! use sfu_client::session::{LectureSession, SessionConfig, StaticAuthorizer};
//!
//! # async fn example() -> sfu_client::Result<()> {
//! let mut session = LectureSession::new(
//!     "lecture-42",
//!     SessionConfig::default(),
//!     Arc::new(StaticAuthorizer::issuing("room-token")),
//!     Arc::new(StubDevices::granting()),
//! );
//!
//! session.initialize_tcp("127.0.0.1:3000", "caller-credential").await?;
//! session.start().await?;
//!
//! session.toggle_video();
//!
//! session.request_end();
//! session.confirm_end();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod media;
pub mod negotiate;
pub mod session;
pub mod signaling;
pub mod transport;

pub use error::{
    Error, MediaError, NegotiationError, Result, SetupError, SignalingError, TransportError,
};
pub use media::{MediaConstraints, MediaDevices, StubDevices, TrackController};
pub use negotiate::{LocalCodecProfile, MediaEngine, MediaKind, RtpCapabilities};
pub use session::{LectureSession, RoomAuthorizer, SessionConfig, SessionPhase};
pub use signaling::{ChannelConfig, ChannelEvent, SignalingChannel};
pub use transport::{ProducerId, SendTransport};
