//! Lecture session orchestration
//!
//! `LectureSession` is the only component that invokes lifecycle
//! transitions. It owns the signaling channel, the negotiated engine,
//! the single send transport, and the track controller, and it alone
//! decides which failures are fatal. Every exit path stops local
//! tracks and closes the channel: leaked device handles keep the
//! camera/microphone indicators lit.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::error::{Error, MediaError, Result, SetupError, SignalingError, TransportError};
use crate::media::{MediaConstraints, MediaDevices, Producer, TrackController};
use crate::negotiate::{
    fetch_remote_capabilities, LocalCodecProfile, MediaEngine, MediaKind,
};
use crate::session::authorize::RoomAuthorizer;
use crate::session::state::{SessionPhase, SessionState};
use crate::signaling::{ChannelConfig, ChannelEvent, RequestBody, SignalingChannel};
use crate::transport::SendTransport;

/// Session configuration options
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Signaling channel options (request timeout, buffers)
    pub signaling: ChannelConfig,

    /// Which kinds to request from the device collaborator
    pub constraints: MediaConstraints,

    /// Codecs the local environment can encode
    pub codec_profile: LocalCodecProfile,
}

/// One logical lecture session from view entry to teardown
pub struct LectureSession {
    config: SessionConfig,
    authorizer: Arc<dyn RoomAuthorizer>,
    devices: Arc<dyn MediaDevices>,
    state: SessionState,
    channel: Option<SignalingChannel>,
    events: Option<mpsc::Receiver<ChannelEvent>>,
    engine: Option<MediaEngine>,
    transport: Option<SendTransport>,
    tracks: TrackController,
    end_pending: bool,
}

impl LectureSession {
    /// Create an idle session for a lecture
    pub fn new(
        lecture_id: impl Into<String>,
        config: SessionConfig,
        authorizer: Arc<dyn RoomAuthorizer>,
        devices: Arc<dyn MediaDevices>,
    ) -> Self {
        Self {
            config,
            authorizer,
            devices,
            state: SessionState::new(lecture_id),
            channel: None,
            events: None,
            engine: None,
            transport: None,
            tracks: TrackController::new(),
            end_pending: false,
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    /// Full session state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Failure cause, if the session failed
    pub fn error(&self) -> Option<&Error> {
        self.state.error()
    }

    /// Room token, once authorized
    pub fn room_id(&self) -> Option<&str> {
        self.state.room_id.as_deref()
    }

    /// Producer for a kind, if attached
    pub fn producer(&self, kind: MediaKind) -> Option<&Producer> {
        self.tracks.producer(kind)
    }

    /// Whether the signaling channel is currently open
    pub fn signaling_open(&self) -> bool {
        self.channel.as_ref().is_some_and(SignalingChannel::is_open)
    }

    /// Set up the session over an established signaling byte stream.
    ///
    /// Authorizes the room token, opens the channel, then registers the
    /// room concurrently with capability negotiation: the two requests
    /// race freely and `Ready` is the conjunction of both completing.
    pub async fn initialize<S>(&mut self, io: S, credential: &str) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        if self.state.phase() != SessionPhase::Idle {
            return Err(Error::InvalidPhase("initialize"));
        }
        self.state.begin_initializing();

        let room_id = match self
            .authorizer
            .room_token(&self.state.lecture_id, credential)
            .await
        {
            Ok(room_id) => room_id,
            Err(e) => return Err(self.fail(Error::Setup(e))),
        };
        self.state.set_room(room_id.clone());

        let (channel, events) = SignalingChannel::connect(io, self.config.signaling.clone());
        channel.bind_room(&room_id);
        self.events = Some(events);
        self.channel = Some(channel.clone());

        let register = channel.request(RequestBody::CreateRoom {
            room_id: room_id.clone(),
        });
        let negotiate = async {
            let capabilities = fetch_remote_capabilities(&channel).await?;
            MediaEngine::load(&self.config.codec_profile, capabilities)
        };
        let (registered, engine) = tokio::join!(register, negotiate);

        if let Err(e) = registered {
            return Err(self.fail(Error::Signaling(e)));
        }
        let engine = match engine {
            Ok(engine) => engine,
            Err(e) => return Err(self.fail(Error::Negotiation(e))),
        };

        self.engine = Some(engine);
        self.state.mark_ready();
        tracing::info!(lecture = %self.state.lecture_id, room = %room_id, "Session ready");
        Ok(())
    }

    /// Set up the session against a TCP signaling endpoint.
    pub async fn initialize_tcp(&mut self, addr: &str, credential: &str) -> Result<()> {
        if self.state.phase() != SessionPhase::Idle {
            return Err(Error::InvalidPhase("initialize"));
        }
        let stream = match tokio::net::TcpStream::connect(addr).await {
            Ok(stream) => stream,
            Err(e) => {
                self.state.begin_initializing();
                return Err(self.fail(Error::Setup(SetupError::ConnectFailed(e.to_string()))));
            }
        };
        self.initialize(stream, credential).await
    }

    /// Start streaming. Valid in `Ready` only.
    ///
    /// Acquires local media, creates the send transport, attaches video
    /// and then (optionally) audio. A denied device access releases
    /// everything acquired and leaves the session in `Ready` for a
    /// retry; every other failure is fatal. Audio produce rejection
    /// degrades to video-only streaming.
    pub async fn start(&mut self) -> Result<()> {
        if !self.state.can_start() {
            return Err(Error::InvalidPhase("start"));
        }
        let channel = self.channel.clone().ok_or(Error::InvalidPhase("start"))?;
        let engine = self.engine.clone().ok_or(Error::InvalidPhase("start"))?;
        let room_id = self
            .state
            .room_id
            .clone()
            .ok_or(Error::InvalidPhase("start"))?;

        // Media first: a permission denial must leave zero wire side
        // effects and nothing server-side to orphan.
        let devices = Arc::clone(&self.devices);
        if let Err(e) = self
            .tracks
            .acquire(devices.as_ref(), self.config.constraints)
            .await
        {
            self.tracks.release();
            tracing::warn!(error = %e, "Media acquisition failed, session stays ready");
            return Err(Error::Media(e));
        }

        let mut transport = match SendTransport::create(&channel, &engine, &room_id).await {
            Ok(transport) => transport,
            Err(e) => {
                self.tracks.release();
                return Err(self.fail(Error::Transport(e)));
            }
        };

        match self.tracks.attach(&mut transport, &engine, MediaKind::Video).await {
            Ok(true) => {}
            Ok(false) => {
                self.tracks.release();
                return Err(self.fail(Error::Media(MediaError::NoDevice("video".into()))));
            }
            Err(e) => {
                self.tracks.release();
                return Err(self.fail(Error::Transport(e)));
            }
        }

        match self.tracks.attach(&mut transport, &engine, MediaKind::Audio).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!("No audio track, streaming video-only"),
            Err(TransportError::ProduceRejected(reason)) => {
                // Per-kind failure: the video producer and transport
                // stay live.
                tracing::warn!(error = %reason, "Audio produce rejected, streaming video-only");
            }
            Err(e) => {
                self.tracks.release();
                return Err(self.fail(Error::Transport(e)));
            }
        }

        self.transport = Some(transport);
        self.state.begin_streaming();
        tracing::info!(room = %room_id, "Streaming started");
        Ok(())
    }

    /// User asked to end the session. Teardown waits for
    /// [`confirm_end`](Self::confirm_end); returns whether a
    /// confirmation is now pending.
    pub fn request_end(&mut self) -> bool {
        if self.state.phase().is_terminal() {
            return false;
        }
        self.end_pending = true;
        true
    }

    /// Whether an end confirmation is pending
    pub fn end_pending(&self) -> bool {
        self.end_pending
    }

    /// Dismiss a pending end request
    pub fn cancel_end(&mut self) {
        self.end_pending = false;
    }

    /// Confirmed user end: stop all tracks, close the channel, move to
    /// `Ended`. No-op without a pending request or once terminal.
    /// Returns whether the session ended now.
    pub fn confirm_end(&mut self) -> bool {
        if !self.end_pending || self.state.phase().is_terminal() {
            return false;
        }
        self.release_all();
        self.state.finish();
        tracing::info!(lecture = %self.state.lecture_id, "Session ended");
        true
    }

    /// Teardown without confirmation, for view unmount. Guaranteed
    /// release; idempotent.
    pub fn shutdown(&mut self) {
        self.release_all();
        self.state.finish();
    }

    /// Toggle the video producer's enabled flag. Purely local; `None`
    /// when no producer exists yet.
    pub fn toggle_video(&self) -> Option<bool> {
        self.tracks.toggle(MediaKind::Video)
    }

    /// Toggle the audio producer's enabled flag. Purely local; `None`
    /// when no producer exists yet.
    pub fn toggle_audio(&self) -> Option<bool> {
        self.tracks.toggle(MediaKind::Audio)
    }

    /// Drain channel events and react to them. The owner drives this
    /// after awaiting session operations or on a UI tick.
    pub fn process_events(&mut self) {
        let mut lost = false;
        if let Some(events) = &mut self.events {
            while let Ok(event) = events.try_recv() {
                match event {
                    ChannelEvent::Open => tracing::debug!("Signaling channel open"),
                    ChannelEvent::Disconnected => lost = true,
                }
            }
        }
        if lost {
            self.handle_connection_lost();
        }
    }

    /// Connection loss is fatal: no reconnection path. Tracks stop
    /// exactly once; terminal sessions ignore it.
    fn handle_connection_lost(&mut self) {
        if self.state.phase().is_terminal() {
            return;
        }
        tracing::warn!(lecture = %self.state.lecture_id, "Signaling connection lost");
        self.fail(Error::Signaling(SignalingError::ConnectionLost));
    }

    /// Fail the session: release every resource, then record the cause.
    fn fail(&mut self, cause: Error) -> Error {
        self.release_all();
        self.state.fail(cause.clone());
        cause
    }

    /// Stop tracks, drop producers and transport, close the channel.
    /// Runs on every exit path.
    fn release_all(&mut self) {
        self.end_pending = false;
        self.tracks.release();
        self.transport = None;
        if let Some(channel) = &self.channel {
            channel.close();
        }
    }
}

impl Drop for LectureSession {
    // Guaranteed-release backstop: a dropped session must not keep
    // device handles or the connection alive.
    fn drop(&mut self) {
        self.release_all();
    }
}
