//! Error types for session setup and streaming
//!
//! Each layer of the negotiation path has its own error enum; the
//! top-level [`Error`] wraps them all. Leaf components return the typed
//! failures and the session state machine alone decides which are fatal.

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Authorization or connection failure before streaming
    Setup(SetupError),
    /// Signaling request failure (timeout, rejection, lost connection)
    Signaling(SignalingError),
    /// Capability exchange or engine initialization failure
    Negotiation(NegotiationError),
    /// Transport or producer handshake failure
    Transport(TransportError),
    /// Local device access failure
    Media(MediaError),
    /// Operation attempted in a lifecycle phase that does not allow it
    InvalidPhase(&'static str),
}

/// Errors that abort session setup before any streaming starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// The authorization collaborator refused to issue a room token
    AuthorizationDenied(String),
    /// The signaling endpoint could not be reached
    ConnectFailed(String),
}

/// Errors produced by the signaling channel itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// The server acknowledged the request with an error payload.
    /// Delivery succeeded; the requested operation did not.
    Rejected(String),
    /// No acknowledgment arrived within the configured bound
    Timeout,
    /// The connection dropped while the request was pending
    ConnectionLost,
    /// The channel was closed before or during the request
    Closed,
}

/// Errors from the capability exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// Remote capabilities could not be obtained (timeout or rejection).
    /// Fatal: streaming cannot start without a compatible engine.
    CapabilitiesUnavailable(SignalingError),
    /// The local environment cannot construct an engine matching the
    /// remote description (e.g., no shared video codec)
    UnsupportedCapabilities(String),
}

/// Errors from the transport and producer handshakes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The createTransport request failed; no transport exists
    CreateRejected(SignalingError),
    /// The one-shot connect handshake failed; the transport is unusable
    ConnectRejected(SignalingError),
    /// A produce request failed. Per-kind: the transport and any
    /// already-attached producers remain valid.
    ProduceRejected(SignalingError),
}

/// Errors from local media acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// The user or platform denied camera/microphone access
    AccessDenied,
    /// No device produced a track of the requested kind
    NoDevice(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Setup(e) => write!(f, "Setup error: {}", e),
            Error::Signaling(e) => write!(f, "Signaling error: {}", e),
            Error::Negotiation(e) => write!(f, "Negotiation error: {}", e),
            Error::Transport(e) => write!(f, "Transport error: {}", e),
            Error::Media(e) => write!(f, "Media error: {}", e),
            Error::InvalidPhase(op) => write!(f, "Operation not valid in current phase: {}", op),
        }
    }
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::AuthorizationDenied(reason) => {
                write!(f, "Authorization denied: {}", reason)
            }
            SetupError::ConnectFailed(reason) => write!(f, "Connect failed: {}", reason),
        }
    }
}

impl std::fmt::Display for SignalingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalingError::Rejected(reason) => write!(f, "Request rejected: {}", reason),
            SignalingError::Timeout => write!(f, "Request timed out"),
            SignalingError::ConnectionLost => write!(f, "Connection lost"),
            SignalingError::Closed => write!(f, "Channel closed"),
        }
    }
}

impl std::fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NegotiationError::CapabilitiesUnavailable(e) => {
                write!(f, "Remote capabilities unavailable: {}", e)
            }
            NegotiationError::UnsupportedCapabilities(reason) => {
                write!(f, "Unsupported capabilities: {}", reason)
            }
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::CreateRejected(e) => write!(f, "Transport creation rejected: {}", e),
            TransportError::ConnectRejected(e) => write!(f, "Connect handshake rejected: {}", e),
            TransportError::ProduceRejected(e) => write!(f, "Produce rejected: {}", e),
        }
    }
}

impl std::fmt::Display for MediaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaError::AccessDenied => write!(f, "Device access denied"),
            MediaError::NoDevice(kind) => write!(f, "No device for kind: {}", kind),
        }
    }
}

impl std::error::Error for Error {}
impl std::error::Error for SetupError {}
impl std::error::Error for SignalingError {}
impl std::error::Error for NegotiationError {}
impl std::error::Error for TransportError {}
impl std::error::Error for MediaError {}

impl From<SetupError> for Error {
    fn from(e: SetupError) -> Self {
        Error::Setup(e)
    }
}

impl From<SignalingError> for Error {
    fn from(e: SignalingError) -> Self {
        Error::Signaling(e)
    }
}

impl From<NegotiationError> for Error {
    fn from(e: NegotiationError) -> Self {
        Error::Negotiation(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

impl From<MediaError> for Error {
    fn from(e: MediaError) -> Self {
        Error::Media(e)
    }
}
