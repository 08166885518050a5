//! Signaling wire format
//!
//! Frames are single-line JSON, newline-terminated. Every request
//! carries a correlation id; the matching acknowledgment carries the
//! same id with either a `data` object or an `error` string:
//!
//! ```text
//! -> {"id":7,"event":"createRoom","payload":{"roomId":"abc"}}
//! <- {"id":7,"data":{}}
//! -> {"id":8,"event":"produce","payload":{...}}
//! <- {"id":8,"error":"codec unsupported"}
//! ```
//!
//! Acknowledgments decode into a tagged [`AckOutcome`] rather than an
//! object with an optional error field, so a rejection can never be
//! mistaken for success.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SignalingError;
use crate::negotiate::{MediaKind, RtpCapabilities, RtpParameters};
use crate::transport::{DtlsParameters, TransportDirection, TransportParams};

/// One client request, tagged by wire event name
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum RequestBody {
    /// Fetch the server's RTP capabilities
    GetRtpCapabilities,
    /// Register a room under the authorized token
    #[serde(rename_all = "camelCase")]
    CreateRoom { room_id: String },
    /// Negotiate parameters for one transport
    #[serde(rename_all = "camelCase")]
    CreateTransport {
        direction: TransportDirection,
        room_id: String,
    },
    /// Complete the transport's one-shot connect handshake
    #[serde(rename_all = "camelCase")]
    ConnectTransport {
        transport_id: String,
        dtls_parameters: DtlsParameters,
    },
    /// Attach one local track as a server-side producer
    #[serde(rename_all = "camelCase")]
    Produce {
        room_id: String,
        transport_id: String,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    },
}

impl RequestBody {
    /// Wire event name (for logging)
    pub fn event(&self) -> &'static str {
        match self {
            RequestBody::GetRtpCapabilities => "getRtpCapabilities",
            RequestBody::CreateRoom { .. } => "createRoom",
            RequestBody::CreateTransport { .. } => "createTransport",
            RequestBody::ConnectTransport { .. } => "connectTransport",
            RequestBody::Produce { .. } => "produce",
        }
    }
}

/// Outbound frame: correlation id plus the tagged request body
#[derive(Debug, Serialize)]
pub struct RequestFrame {
    pub id: u64,
    #[serde(flatten)]
    pub body: RequestBody,
}

/// Inbound acknowledgment frame
#[derive(Debug, Deserialize)]
pub struct AckFrame {
    pub id: u64,
    #[serde(flatten)]
    pub outcome: AckOutcome,
}

/// Acknowledgment result. The error variant is tried first so a frame
/// carrying `error` can never decode as success.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AckOutcome {
    Err {
        error: String,
    },
    Ok {
        #[serde(default)]
        data: Value,
    },
}

impl AckOutcome {
    /// Convert into the channel-level result
    pub fn into_result(self) -> Result<Value, SignalingError> {
        match self {
            AckOutcome::Ok { data } => Ok(data),
            AckOutcome::Err { error } => Err(SignalingError::Rejected(error)),
        }
    }
}

/// `getRtpCapabilities` success payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCapabilitiesAck {
    pub rtp_capabilities: RtpCapabilities,
}

/// `createTransport` success payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportCreatedAck {
    pub transport_params: TransportParams,
}

/// `produce` success payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducedAck {
    pub producer_id: String,
}

/// Decode a typed success payload out of an acknowledgment's `data`
pub fn decode_data<T: DeserializeOwned>(data: Value) -> Result<T, SignalingError> {
    serde_json::from_value(data)
        .map_err(|e| SignalingError::Rejected(format!("malformed acknowledgment: {}", e)))
}
