//! Capability negotiation
//!
//! Obtains the server's media capabilities and initializes a local
//! engine compatible with them. Runs concurrently with room
//! registration during session setup.

pub mod capabilities;
pub mod engine;

pub use capabilities::{
    LocalCodecProfile, MediaKind, RtpCapabilities, RtpCodecCapability, RtpParameters,
};
pub use engine::{fetch_remote_capabilities, MediaEngine};
