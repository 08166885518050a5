//! Capability negotiation and local media engine
//!
//! One round trip fetches the server's RTP capabilities; loading the
//! engine is purely local computation that intersects them with the
//! codecs this environment can encode. Either failure is fatal to the
//! session: streaming cannot start without a compatible engine.
//!
//! The engine is an explicit value owned by the session, so concurrent
//! sessions (and tests) never share negotiation state.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::NegotiationError;
use crate::negotiate::capabilities::{
    LocalCodecProfile, MediaKind, RtpCapabilities, RtpCodecCapability, RtpParameters,
};
use crate::signaling::wire::{decode_data, RequestBody, RtpCapabilitiesAck};
use crate::signaling::SignalingChannel;
use crate::transport::{DtlsFingerprint, DtlsParameters, DtlsRole};

/// Fetch the server's RTP capabilities. Single request/response round
/// trip; timeout or rejection maps to
/// [`NegotiationError::CapabilitiesUnavailable`].
pub async fn fetch_remote_capabilities(
    channel: &SignalingChannel,
) -> Result<RtpCapabilities, NegotiationError> {
    let data = channel
        .request(RequestBody::GetRtpCapabilities)
        .await
        .map_err(NegotiationError::CapabilitiesUnavailable)?;

    let ack: RtpCapabilitiesAck =
        decode_data(data).map_err(NegotiationError::CapabilitiesUnavailable)?;

    tracing::debug!(
        codecs = ack.rtp_capabilities.codecs.len(),
        "Remote capabilities received"
    );
    Ok(ack.rtp_capabilities)
}

/// Local media engine loaded against the server's capabilities
#[derive(Debug, Clone)]
pub struct MediaEngine {
    /// Codecs both sides support, per kind
    negotiated: Vec<RtpCodecCapability>,

    /// Local DTLS parameters offered during the transport connect
    /// handshake
    dtls: DtlsParameters,
}

impl MediaEngine {
    /// Load an engine from the remote capabilities.
    ///
    /// Fails with [`NegotiationError::UnsupportedCapabilities`] when the
    /// intersection contains no video codec: the environment cannot
    /// construct an engine matching the remote description. Audio is
    /// optional (video-only streaming is valid).
    pub fn load(
        profile: &LocalCodecProfile,
        remote: RtpCapabilities,
    ) -> Result<Self, NegotiationError> {
        let negotiated: Vec<RtpCodecCapability> = profile
            .codecs
            .iter()
            .filter(|local| remote.codecs.iter().any(|r| local.matches(r)))
            .cloned()
            .collect();

        if !negotiated.iter().any(|c| c.kind == MediaKind::Video) {
            return Err(NegotiationError::UnsupportedCapabilities(
                "no shared video codec".into(),
            ));
        }

        tracing::info!(
            video = negotiated.iter().filter(|c| c.kind == MediaKind::Video).count(),
            audio = negotiated.iter().filter(|c| c.kind == MediaKind::Audio).count(),
            "Media engine loaded"
        );

        Ok(Self {
            negotiated,
            dtls: DtlsParameters {
                role: DtlsRole::Auto,
                fingerprint: local_fingerprint(),
            },
        })
    }

    /// Whether a shared codec exists for the kind
    pub fn can_produce(&self, kind: MediaKind) -> bool {
        self.negotiated.iter().any(|c| c.kind == kind)
    }

    /// Send parameters for one kind, if a shared codec exists
    pub fn rtp_parameters(&self, kind: MediaKind) -> Option<RtpParameters> {
        let codecs: Vec<_> = self
            .negotiated
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect();
        if codecs.is_empty() {
            None
        } else {
            Some(RtpParameters { codecs })
        }
    }

    /// Local DTLS parameters for the connect handshake
    pub fn local_dtls(&self) -> &DtlsParameters {
        &self.dtls
    }
}

/// Generate a certificate fingerprint for this engine instance.
///
/// Simple PRNG seeded with the clock; the fingerprint only needs to be
/// distinct per engine, not cryptographically derived here.
fn local_fingerprint() -> DtlsFingerprint {
    static SEQUENCE: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

    let clock = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    // Counter keeps engines distinct even on a coarse clock
    let mut seed = clock ^ SEQUENCE
        .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        .wrapping_mul(0x9E3779B97F4A7C15);

    let mut bytes = [0u8; 32];
    for chunk in bytes.chunks_mut(8) {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        chunk.copy_from_slice(&seed.to_le_bytes());
    }

    let value = bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":");

    DtlsFingerprint {
        algorithm: "sha-256".into(),
        value,
    }
}
