//! Session lifecycle state machine
//!
//! Tracks one logical lecture session from view entry to teardown.
//! Transitions are guarded: an invalid transition is ignored rather
//! than corrupting the phase, and the terminal phases never change.

use std::time::Instant;

use crate::error::Error;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, nothing started yet
    Idle,
    /// Authorizing, connecting signaling, negotiating capabilities
    Initializing,
    /// Signaling open and engine loaded; streaming can start
    Ready,
    /// Transport connected and at least a video producer live
    Streaming,
    /// Ended by the user or by teardown. Terminal.
    Ended,
    /// A fatal error occurred. Terminal; recovery requires a new
    /// session.
    Failed,
}

impl SessionPhase {
    /// Whether the phase admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Ended | SessionPhase::Failed)
    }
}

/// Complete state of one lecture session
#[derive(Debug)]
pub struct SessionState {
    /// Lecture this session belongs to
    pub lecture_id: String,

    /// Room token from the authorization collaborator, once known
    pub room_id: Option<String>,

    /// Current phase
    phase: SessionPhase,

    /// Session creation time
    pub created_at: Instant,

    /// Time when setup completed
    pub ready_at: Option<Instant>,

    /// Time when streaming started
    pub streaming_at: Option<Instant>,

    /// Cause of failure, set once on entering `Failed`
    error: Option<Error>,
}

impl SessionState {
    /// Create a new idle session state
    pub fn new(lecture_id: impl Into<String>) -> Self {
        Self {
            lecture_id: lecture_id.into(),
            room_id: None,
            phase: SessionPhase::Idle,
            created_at: Instant::now(),
            ready_at: None,
            streaming_at: None,
            error: None,
        }
    }

    /// Current phase
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Failure cause, if the session failed
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Begin setup on view entry
    pub fn begin_initializing(&mut self) {
        if self.phase == SessionPhase::Idle {
            self.phase = SessionPhase::Initializing;
        }
    }

    /// Record the room token once the authorization collaborator
    /// supplies it
    pub fn set_room(&mut self, room_id: impl Into<String>) {
        self.room_id = Some(room_id.into());
    }

    /// Setup complete: signaling open and engine loaded
    pub fn mark_ready(&mut self) {
        if self.phase == SessionPhase::Initializing {
            self.phase = SessionPhase::Ready;
            self.ready_at = Some(Instant::now());
        }
    }

    /// Streaming started
    pub fn begin_streaming(&mut self) {
        if self.phase == SessionPhase::Ready {
            self.phase = SessionPhase::Streaming;
            self.streaming_at = Some(Instant::now());
        }
    }

    /// Streaming retry is possible after a recoverable start failure
    pub fn can_start(&self) -> bool {
        self.phase == SessionPhase::Ready
    }

    /// End the session. Terminal; a no-op once terminal.
    pub fn finish(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = SessionPhase::Ended;
        }
    }

    /// Fail the session with a cause. Terminal; the first cause wins
    /// and later failures are ignored.
    pub fn fail(&mut self, cause: Error) {
        if self.phase.is_terminal() {
            return;
        }
        tracing::error!(lecture = %self.lecture_id, error = %cause, "Session failed");
        self.phase = SessionPhase::Failed;
        self.error = Some(cause);
    }

    /// Whether media is currently flowing
    pub fn is_streaming(&self) -> bool {
        self.phase == SessionPhase::Streaming
    }

    /// Session age
    pub fn duration(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}
