//! Device collaborator
//!
//! Camera/microphone acquisition sits behind a trait: the platform
//! supplies a real implementation, tests supply a scripted one.
//! Acquisition suspends until the platform grants or denies access.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::MediaError;
use crate::media::track::{LocalTrack, MediaSource, TrackHandle};
use crate::negotiate::MediaKind;

/// Per-kind acquisition request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }
}

impl MediaConstraints {
    pub fn video_only() -> Self {
        Self {
            video: true,
            audio: false,
        }
    }
}

/// Local camera/microphone access
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire local tracks. Denial surfaces as
    /// [`MediaError::AccessDenied`]; a missing audio device is not an
    /// error (video-only streaming is valid).
    async fn acquire(&self, constraints: MediaConstraints) -> Result<MediaSource, MediaError>;
}

/// Scripted device collaborator for tests and headless use.
///
/// Remembers every track it hands out so callers can verify the
/// guaranteed-release discipline (no track left unstopped).
#[derive(Debug, Clone)]
pub struct StubDevices {
    deny: bool,
    has_video: bool,
    has_audio: bool,
    issued: Arc<Mutex<Vec<TrackHandle>>>,
}

impl StubDevices {
    /// Grants access with both camera and microphone present
    pub fn granting() -> Self {
        Self {
            deny: false,
            has_video: true,
            has_audio: true,
            issued: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Denies every acquisition
    pub fn denying() -> Self {
        Self {
            deny: true,
            has_video: false,
            has_audio: false,
            issued: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Grants access but no microphone exists
    pub fn without_audio() -> Self {
        Self {
            deny: false,
            has_video: true,
            has_audio: false,
            issued: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every track handed out so far
    pub fn issued_tracks(&self) -> Vec<TrackHandle> {
        self.issued.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaDevices for StubDevices {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<MediaSource, MediaError> {
        if self.deny {
            return Err(MediaError::AccessDenied);
        }
        if constraints.video && !self.has_video {
            return Err(MediaError::NoDevice("video".into()));
        }

        let video = constraints.video.then(|| LocalTrack::new(MediaKind::Video));
        let audio = (constraints.audio && self.has_audio)
            .then(|| LocalTrack::new(MediaKind::Audio));

        let mut issued = self.issued.lock().unwrap();
        issued.extend(video.iter().cloned());
        issued.extend(audio.iter().cloned());

        Ok(MediaSource::new(video, audio))
    }
}
