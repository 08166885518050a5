//! RTP capability and parameter types
//!
//! [`RtpCapabilities`] is an immutable value obtained once per session
//! from the server and consumed exactly once to load the local engine.

use serde::{Deserialize, Serialize};

/// Media track kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// One codec a party supports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCodecCapability {
    pub kind: MediaKind,

    /// e.g. "video/VP8", "audio/opus"
    pub mime_type: String,

    pub clock_rate: u32,

    /// Audio channel count (absent for video)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
}

impl RtpCodecCapability {
    pub fn new(kind: MediaKind, mime_type: impl Into<String>, clock_rate: u32) -> Self {
        Self {
            kind,
            mime_type: mime_type.into(),
            clock_rate,
            channels: None,
        }
    }

    pub fn with_channels(mut self, channels: u8) -> Self {
        self.channels = Some(channels);
        self
    }

    /// Codec identity for matching local against remote
    pub fn matches(&self, other: &RtpCodecCapability) -> bool {
        self.kind == other.kind
            && self.mime_type.eq_ignore_ascii_case(&other.mime_type)
            && self.clock_rate == other.clock_rate
    }
}

/// The set of codecs/parameters a party supports, exchanged before
/// media negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCapabilities {
    pub codecs: Vec<RtpCodecCapability>,
}

impl RtpCapabilities {
    pub fn codecs_of_kind(&self, kind: MediaKind) -> impl Iterator<Item = &RtpCodecCapability> {
        self.codecs.iter().filter(move |c| c.kind == kind)
    }
}

/// Negotiated send parameters for one track, carried in a `produce`
/// request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpParameters {
    pub codecs: Vec<RtpCodecCapability>,
}

/// Codecs the local environment can encode
#[derive(Debug, Clone)]
pub struct LocalCodecProfile {
    pub codecs: Vec<RtpCodecCapability>,
}

impl Default for LocalCodecProfile {
    fn default() -> Self {
        Self {
            codecs: vec![
                RtpCodecCapability::new(MediaKind::Video, "video/VP8", 90_000),
                RtpCodecCapability::new(MediaKind::Video, "video/H264", 90_000),
                RtpCodecCapability::new(MediaKind::Audio, "audio/opus", 48_000).with_channels(2),
            ],
        }
    }
}

impl LocalCodecProfile {
    /// Profile with no codecs at all (engine load will always fail)
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_match_ignores_mime_case() {
        let a = RtpCodecCapability::new(MediaKind::Video, "video/VP8", 90_000);
        let b = RtpCodecCapability::new(MediaKind::Video, "video/vp8", 90_000);
        let c = RtpCodecCapability::new(MediaKind::Video, "video/VP8", 30_000);

        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn test_capabilities_wire_shape() {
        let caps = RtpCapabilities {
            codecs: vec![
                RtpCodecCapability::new(MediaKind::Audio, "audio/opus", 48_000).with_channels(2),
            ],
        };
        let json = serde_json::to_value(&caps).unwrap();

        assert_eq!(json["codecs"][0]["mimeType"], "audio/opus");
        assert_eq!(json["codecs"][0]["clockRate"], 48_000);
        assert_eq!(json["codecs"][0]["channels"], 2);
    }
}
