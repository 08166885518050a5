//! Session lifecycle
//!
//! The session state machine composes signaling, negotiation,
//! transport, and media into one supervised lifecycle:
//! `Idle → Initializing → Ready → Streaming → Ended`, with `Failed`
//! reachable from any non-terminal phase.

pub mod authorize;
pub mod lecture;
pub mod state;

pub use authorize::{RoomAuthorizer, StaticAuthorizer};
pub use lecture::{LectureSession, SessionConfig};
pub use state::{SessionPhase, SessionState};
