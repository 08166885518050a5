//! Transport parameter types
//!
//! Negotiated ICE/DTLS parameters for the single outbound transport,
//! as carried on the signaling wire.

use serde::{Deserialize, Serialize};

/// Direction of a transport, from the client's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportDirection {
    Send,
    Recv,
}

/// ICE credentials assigned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceParameters {
    pub username_fragment: String,
    pub password: String,
}

/// DTLS role for the transport's secure handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DtlsRole {
    Auto,
    Client,
    Server,
}

/// One certificate fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DtlsFingerprint {
    pub algorithm: String,
    pub value: String,
}

/// DTLS parameters exchanged in the connect handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DtlsParameters {
    pub role: DtlsRole,
    pub fingerprint: DtlsFingerprint,
}

/// Server-negotiated parameters returned by `createTransport`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportParams {
    /// Server-assigned transport id
    pub id: String,

    pub ice_parameters: IceParameters,

    /// The server's DTLS parameters
    pub dtls_parameters: DtlsParameters,
}

/// Server-assigned identifier of one producer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProducerId(pub String);

impl std::fmt::Display for ProducerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
