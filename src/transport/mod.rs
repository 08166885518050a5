//! Transport management
//!
//! Creates and connects the session's single outbound transport,
//! brokering the two-phase connect and produce handshakes.

pub mod params;
pub mod send;

pub use params::{
    DtlsFingerprint, DtlsParameters, DtlsRole, IceParameters, ProducerId, TransportDirection,
    TransportParams,
};
pub use send::SendTransport;
