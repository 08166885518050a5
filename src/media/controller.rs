//! Track controller
//!
//! Owns the session's local media source and producers. Binds tracks to
//! the transport's produce handshake and toggles their enabled state
//! without renegotiation. A producer cannot exist without a connected
//! transport; the controller only ever attaches through one.

use crate::error::{MediaError, TransportError};
use crate::media::devices::{MediaConstraints, MediaDevices};
use crate::media::track::{MediaSource, TrackHandle};
use crate::negotiate::{MediaEngine, MediaKind};
use crate::transport::{ProducerId, SendTransport};

/// One server-registered local track
#[derive(Debug)]
pub struct Producer {
    id: ProducerId,
    kind: MediaKind,
    track: TrackHandle,
}

impl Producer {
    pub fn id(&self) -> &ProducerId {
        &self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.track.is_enabled()
    }

    /// Purely local track gating; idempotent, no wire traffic
    pub fn set_enabled(&self, enabled: bool) {
        self.track.set_enabled(enabled);
    }
}

/// Acquires tracks, attaches producers, gates enabled state
#[derive(Debug, Default)]
pub struct TrackController {
    source: Option<MediaSource>,
    video: Option<Producer>,
    audio: Option<Producer>,
}

impl TrackController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire local media through the device collaborator. Replaces
    /// any previously held source (stopping its tracks).
    pub async fn acquire(
        &mut self,
        devices: &dyn MediaDevices,
        constraints: MediaConstraints,
    ) -> Result<(), MediaError> {
        let source = devices.acquire(constraints).await?;
        tracing::debug!(
            video = source.has_video(),
            audio = source.has_audio(),
            "Local media acquired"
        );
        self.release();
        self.source = Some(source);
        Ok(())
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Attach the acquired track of the kind as a producer.
    ///
    /// Returns `Ok(false)` when no local track of the kind exists or no
    /// shared codec was negotiated for it; for audio that is a valid
    /// video-only outcome. Produce rejection propagates unchanged.
    pub async fn attach(
        &mut self,
        transport: &mut SendTransport,
        engine: &MediaEngine,
        kind: MediaKind,
    ) -> Result<bool, TransportError> {
        let track = match self.source.as_ref().and_then(|s| s.track(kind)) {
            Some(track) => track.clone(),
            None => return Ok(false),
        };
        let rtp_parameters = match engine.rtp_parameters(kind) {
            Some(params) => params,
            None => {
                tracing::warn!(%kind, "No shared codec, skipping attach");
                return Ok(false);
            }
        };

        let id = transport.produce(kind, rtp_parameters).await?;
        let producer = Producer { id, kind, track };
        match kind {
            MediaKind::Video => self.video = Some(producer),
            MediaKind::Audio => self.audio = Some(producer),
        }
        Ok(true)
    }

    pub fn producer(&self, kind: MediaKind) -> Option<&Producer> {
        match kind {
            MediaKind::Video => self.video.as_ref(),
            MediaKind::Audio => self.audio.as_ref(),
        }
    }

    /// Toggle a producer's enabled flag. Returns the new state, or
    /// `None` as a no-op when no such producer exists (the control may
    /// be rendered before any producer is).
    pub fn toggle(&self, kind: MediaKind) -> Option<bool> {
        let producer = self.producer(kind)?;
        let enabled = !producer.is_enabled();
        producer.set_enabled(enabled);
        tracing::debug!(%kind, enabled, "Track toggled");
        Some(enabled)
    }

    /// Set a producer's enabled flag. No-op when absent.
    pub fn set_enabled(&self, kind: MediaKind, enabled: bool) -> bool {
        match self.producer(kind) {
            Some(producer) => {
                producer.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Stop all tracks and drop producers and source. Idempotent.
    /// Returns how many tracks were newly stopped.
    pub fn release(&mut self) -> usize {
        self.video = None;
        self.audio = None;
        let stopped = self.source.as_ref().map(MediaSource::stop_all).unwrap_or(0);
        self.source = None;
        if stopped > 0 {
            tracing::debug!(stopped, "Local media released");
        }
        stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::devices::StubDevices;

    #[tokio::test]
    async fn test_toggle_without_producer_is_noop() {
        let controller = TrackController::new();
        assert_eq!(controller.toggle(MediaKind::Video), None);
        assert!(!controller.set_enabled(MediaKind::Audio, false));
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let mut controller = TrackController::new();
        controller
            .acquire(&StubDevices::granting(), MediaConstraints::default())
            .await
            .unwrap();

        assert_eq!(controller.release(), 2);
        assert_eq!(controller.release(), 0);
        assert!(!controller.has_source());
    }

    #[tokio::test]
    async fn test_acquire_replaces_and_stops_previous_source() {
        let mut controller = TrackController::new();
        let devices = StubDevices::granting();

        controller
            .acquire(&devices, MediaConstraints::default())
            .await
            .unwrap();
        // Second acquisition stops the first source's tracks
        controller
            .acquire(&devices, MediaConstraints::video_only())
            .await
            .unwrap();

        assert!(controller.has_source());
        assert_eq!(controller.release(), 1);
    }
}
