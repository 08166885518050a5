//! Signaling layer
//!
//! Request/acknowledge transport over one persistent connection. Every
//! component above this layer talks to the server through
//! [`SignalingChannel::request`]; correlation, timeouts, and
//! disconnect handling live here and nowhere else.

pub mod channel;
pub mod wire;

pub use channel::{ChannelConfig, ChannelEvent, ConnectionStatus, SignalingChannel};
pub use wire::{AckFrame, AckOutcome, RequestBody, RequestFrame};
