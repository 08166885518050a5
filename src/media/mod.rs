//! Local media handling
//!
//! This module provides:
//! - Track acquisition through the device collaborator
//! - Producer binding over the transport's produce handshake
//! - Local enabled-state gating without renegotiation

pub mod controller;
pub mod devices;
pub mod track;

pub use controller::{Producer, TrackController};
pub use devices::{MediaConstraints, MediaDevices, StubDevices};
pub use track::{LocalTrack, MediaSource, TrackHandle};
