//! Outbound media transport
//!
//! A session has at most one send transport. Creation is a signaling
//! round trip (`createTransport`); the connect handshake
//! (`connectTransport`) fires lazily, exactly once, the first time the
//! transport needs to carry media, and is reused by every later
//! producer. Each produce is its own correlated request, so per-kind
//! failures leave the transport and existing producers valid.

use crate::error::TransportError;
use crate::negotiate::{MediaEngine, MediaKind, RtpParameters};
use crate::signaling::wire::{decode_data, ProducedAck, RequestBody, TransportCreatedAck};
use crate::signaling::SignalingChannel;
use crate::transport::params::{DtlsParameters, ProducerId, TransportDirection, TransportParams};

/// The single outbound transport of a session
#[derive(Debug)]
pub struct SendTransport {
    /// Server-assigned transport id
    id: String,

    room_id: String,

    channel: SignalingChannel,

    /// Parameters negotiated by the server at creation
    params: TransportParams,

    /// Our DTLS parameters, offered in the connect handshake
    local_dtls: DtlsParameters,

    /// Latched after the one-shot connect handshake succeeds
    connected: bool,
}

impl SendTransport {
    /// Negotiate and construct the send transport.
    ///
    /// One `createTransport` round trip; the returned parameters bind
    /// this transport to the server side. No media can flow until the
    /// first produce triggers the connect handshake.
    pub async fn create(
        channel: &SignalingChannel,
        engine: &MediaEngine,
        room_id: &str,
    ) -> Result<Self, TransportError> {
        let data = channel
            .request(RequestBody::CreateTransport {
                direction: TransportDirection::Send,
                room_id: room_id.to_string(),
            })
            .await
            .map_err(TransportError::CreateRejected)?;

        let ack: TransportCreatedAck = decode_data(data).map_err(TransportError::CreateRejected)?;
        let params = ack.transport_params;

        tracing::info!(transport = %params.id, room = room_id, "Send transport created");

        Ok(Self {
            id: params.id.clone(),
            room_id: room_id.to_string(),
            channel: channel.clone(),
            params,
            local_dtls: engine.local_dtls().clone(),
            connected: false,
        })
    }

    /// Server-assigned transport id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the connect handshake has completed
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Parameters the server negotiated at creation
    pub fn params(&self) -> &TransportParams {
        &self.params
    }

    /// Run the connect handshake if it has not run yet.
    ///
    /// At most once per transport: once latched, later producers reuse
    /// the established connection.
    async fn ensure_connected(&mut self) -> Result<(), TransportError> {
        if self.connected {
            return Ok(());
        }

        self.channel
            .request(RequestBody::ConnectTransport {
                transport_id: self.id.clone(),
                dtls_parameters: self.local_dtls.clone(),
            })
            .await
            .map_err(TransportError::ConnectRejected)?;

        self.connected = true;
        tracing::debug!(transport = %self.id, "Connect handshake complete");
        Ok(())
    }

    /// Attach one track kind as a server-side producer.
    ///
    /// Triggers the connect handshake on first use, then one `produce`
    /// request. Rejection fails only this attach
    /// ([`TransportError::ProduceRejected`]); the transport stays
    /// usable.
    pub async fn produce(
        &mut self,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<ProducerId, TransportError> {
        self.ensure_connected().await?;

        let data = self
            .channel
            .request(RequestBody::Produce {
                room_id: self.room_id.clone(),
                transport_id: self.id.clone(),
                kind,
                rtp_parameters,
            })
            .await
            .map_err(TransportError::ProduceRejected)?;

        let ack: ProducedAck = decode_data(data).map_err(TransportError::ProduceRejected)?;
        let producer_id = ProducerId(ack.producer_id);

        tracing::info!(transport = %self.id, %kind, producer = %producer_id, "Producer attached");
        Ok(producer_id)
    }
}
