//! Local media tracks
//!
//! A track's enabled flag gates media locally and never touches the
//! wire. Stopping is idempotent and must happen on every exit path:
//! a leaked track keeps the camera/microphone indicator lit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::negotiate::MediaKind;

/// One locally originated media track
#[derive(Debug)]
pub struct LocalTrack {
    kind: MediaKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

/// Shared reference to a track. Producers and UI toggles reference the
/// same underlying state.
pub type TrackHandle = Arc<LocalTrack>;

impl LocalTrack {
    pub fn new(kind: MediaKind) -> TrackHandle {
        Arc::new(Self {
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Mute or unmute the track. Purely local gating, no wire traffic.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Stop the track, releasing the underlying device. Returns true
    /// only the first time.
    pub fn stop(&self) -> bool {
        !self.stopped.swap(true, Ordering::AcqRel)
    }
}

/// Tracks acquired together from the device collaborator
#[derive(Debug, Default)]
pub struct MediaSource {
    video: Option<TrackHandle>,
    audio: Option<TrackHandle>,
}

impl MediaSource {
    pub fn new(video: Option<TrackHandle>, audio: Option<TrackHandle>) -> Self {
        Self { video, audio }
    }

    pub fn track(&self, kind: MediaKind) -> Option<&TrackHandle> {
        match kind {
            MediaKind::Video => self.video.as_ref(),
            MediaKind::Audio => self.audio.as_ref(),
        }
    }

    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Stop every track. Returns how many were newly stopped.
    pub fn stop_all(&self) -> usize {
        [self.video.as_ref(), self.audio.as_ref()]
            .into_iter()
            .flatten()
            .filter(|t| t.stop())
            .count()
    }
}

impl Drop for MediaSource {
    // Backstop for the guaranteed-release discipline; normal teardown
    // has already stopped the tracks by the time this runs.
    fn drop(&mut self) {
        let stopped = self.stop_all();
        if stopped > 0 {
            tracing::debug!(stopped, "Tracks stopped on source drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_toggle_is_local_and_reversible() {
        let track = LocalTrack::new(MediaKind::Video);
        assert!(track.is_enabled());

        track.set_enabled(false);
        assert!(!track.is_enabled());
        track.set_enabled(true);
        assert!(track.is_enabled());
    }

    #[test]
    fn test_stop_reports_first_time_only() {
        let track = LocalTrack::new(MediaKind::Audio);
        assert!(track.stop());
        assert!(!track.stop());
        assert!(track.is_stopped());
    }

    #[test]
    fn test_source_stop_all_counts_newly_stopped() {
        let video = LocalTrack::new(MediaKind::Video);
        let audio = LocalTrack::new(MediaKind::Audio);
        let source = MediaSource::new(Some(video.clone()), Some(audio));

        assert_eq!(source.stop_all(), 2);
        assert_eq!(source.stop_all(), 0);
        assert!(video.is_stopped());
    }

    #[test]
    fn test_drop_stops_tracks() {
        let video = LocalTrack::new(MediaKind::Video);
        {
            let _source = MediaSource::new(Some(video.clone()), None);
        }
        assert!(video.is_stopped());
    }
}
