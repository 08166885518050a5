//! End-to-end session lifecycle tests against a scripted SFU peer
//!
//! The peer speaks the signaling wire protocol over an in-memory
//! duplex stream and can be told to stay silent on an event or reject
//! it, which is enough to drive every failure path the session state
//! machine distinguishes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

use sfu_client::error::NegotiationError;
use sfu_client::media::StubDevices;
use sfu_client::session::{LectureSession, SessionConfig, SessionPhase, StaticAuthorizer};
use sfu_client::signaling::ChannelConfig;
use sfu_client::{Error, MediaError, MediaKind, SignalingError};

/// What the scripted peer should do beyond the happy path. Produce
/// behaviors are keyed as `produce:video` / `produce:audio`.
#[derive(Default, Clone)]
struct SfuScript {
    silent: Vec<&'static str>,
    reject: HashMap<&'static str, &'static str>,
}

/// Event log recorded by the peer, keyed the same way as [`SfuScript`]
type SfuLog = Arc<Mutex<Vec<String>>>;

fn spawn_sfu(io: DuplexStream, script: SfuScript) -> (SfuLog, JoinHandle<()>) {
    let log: SfuLog = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&log);

    let handle = tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(io);
        let mut lines = BufReader::new(read).lines();
        let mut producers = 0u32;

        while let Ok(Some(line)) = lines.next_line().await {
            let frame: serde_json::Value = serde_json::from_str(&line).unwrap();
            let id = frame["id"].as_u64().unwrap();
            let event = frame["event"].as_str().unwrap();

            let key = if event == "produce" {
                format!("produce:{}", frame["payload"]["kind"].as_str().unwrap())
            } else {
                event.to_string()
            };
            seen.lock().unwrap().push(key.clone());

            if script.silent.iter().any(|s| *s == key) {
                continue;
            }
            if let Some(reason) = script.reject.get(key.as_str()) {
                let ack = format!(r#"{{"id":{},"error":"{}"}}"#, id, reason);
                write.write_all(ack.as_bytes()).await.unwrap();
                write.write_all(b"\n").await.unwrap();
                continue;
            }

            let data = match event {
                "getRtpCapabilities" => serde_json::json!({
                    "rtpCapabilities": {"codecs": [
                        {"kind": "video", "mimeType": "video/VP8", "clockRate": 90000},
                        {"kind": "audio", "mimeType": "audio/opus", "clockRate": 48000, "channels": 2}
                    ]}
                }),
                "createRoom" | "connectTransport" => serde_json::json!({}),
                "createTransport" => serde_json::json!({
                    "transportParams": {
                        "id": "t-1",
                        "iceParameters": {"usernameFragment": "uf", "password": "pw"},
                        "dtlsParameters": {
                            "role": "server",
                            "fingerprint": {"algorithm": "sha-256", "value": "AA:BB"}
                        }
                    }
                }),
                "produce" => {
                    producers += 1;
                    serde_json::json!({"producerId": format!("p-{}", producers)})
                }
                _ => serde_json::json!({}),
            };

            let ack = serde_json::json!({"id": id, "data": data}).to_string();
            write.write_all(ack.as_bytes()).await.unwrap();
            write.write_all(b"\n").await.unwrap();
        }
    });

    (log, handle)
}

fn count(log: &SfuLog, key: &str) -> usize {
    log.lock().unwrap().iter().filter(|e| *e == key).count()
}

fn session(devices: &StubDevices) -> LectureSession {
    session_with_config(devices, SessionConfig::default())
}

fn session_with_config(devices: &StubDevices, config: SessionConfig) -> LectureSession {
    LectureSession::new(
        "lecture-1",
        config,
        Arc::new(StaticAuthorizer::issuing("room-1")),
        Arc::new(devices.clone()),
    )
}

#[tokio::test]
async fn full_lifecycle_with_confirmed_end() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let (log, _sfu) = spawn_sfu(server_io, SfuScript::default());
    let devices = StubDevices::granting();
    let mut session = session(&devices);

    session.initialize(client_io, "cred").await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Ready);
    assert_eq!(session.room_id(), Some("room-1"));
    assert_eq!(count(&log, "createRoom"), 1);
    assert_eq!(count(&log, "getRtpCapabilities"), 1);

    session.start().await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Streaming);
    assert!(session.producer(MediaKind::Video).is_some());
    assert!(session.producer(MediaKind::Audio).is_some());
    assert_eq!(count(&log, "connectTransport"), 1);

    // End with confirmation
    assert!(session.request_end());
    assert!(session.confirm_end());
    assert_eq!(session.phase(), SessionPhase::Ended);
    assert!(!session.signaling_open());
    assert!(devices.issued_tracks().iter().all(|t| t.is_stopped()));

    // Ending again is a no-op
    assert!(!session.request_end());
    assert!(!session.confirm_end());
    assert_eq!(session.phase(), SessionPhase::Ended);
}

#[tokio::test]
async fn toggles_are_local_and_send_nothing() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let (log, _sfu) = spawn_sfu(server_io, SfuScript::default());
    let devices = StubDevices::granting();
    let mut session = session(&devices);

    session.initialize(client_io, "cred").await.unwrap();
    session.start().await.unwrap();

    let requests_before = log.lock().unwrap().len();

    // Disable then re-enable: observably a no-op at the signaling
    // layer, while the local track state flips each time.
    assert_eq!(session.toggle_video(), Some(false));
    assert!(!session.producer(MediaKind::Video).unwrap().is_enabled());
    assert_eq!(session.toggle_video(), Some(true));
    assert!(session.producer(MediaKind::Video).unwrap().is_enabled());
    assert_eq!(session.toggle_audio(), Some(false));

    // Give any stray frame a chance to arrive before asserting
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(log.lock().unwrap().len(), requests_before);
}

#[tokio::test]
async fn denied_device_access_keeps_session_ready() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let (log, _sfu) = spawn_sfu(server_io, SfuScript::default());
    let devices = StubDevices::denying();
    let mut session = session(&devices);

    session.initialize(client_io, "cred").await.unwrap();
    let err = session.start().await.unwrap_err();

    assert_eq!(err, Error::Media(MediaError::AccessDenied));
    // Never Streaming, and no transport or producer was created
    assert_eq!(session.phase(), SessionPhase::Ready);
    assert!(session.producer(MediaKind::Video).is_none());
    assert_eq!(count(&log, "createTransport"), 0);
    assert_eq!(count(&log, "produce:video"), 0);

    // The failure is recoverable: start is valid again from Ready
    assert!(session.start().await.is_err());
    assert_eq!(session.phase(), SessionPhase::Ready);
}

#[tokio::test]
async fn capability_timeout_is_fatal_before_any_transport() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let (log, _sfu) = spawn_sfu(
        server_io,
        SfuScript {
            silent: vec!["getRtpCapabilities"],
            ..Default::default()
        },
    );
    let devices = StubDevices::granting();
    let mut session = session_with_config(
        &devices,
        SessionConfig {
            signaling: ChannelConfig {
                request_timeout: Duration::from_millis(200),
                ..Default::default()
            },
            ..Default::default()
        },
    );

    let err = session.initialize(client_io, "cred").await.unwrap_err();

    assert_eq!(
        err,
        Error::Negotiation(NegotiationError::CapabilitiesUnavailable(
            SignalingError::Timeout
        ))
    );
    assert_eq!(session.phase(), SessionPhase::Failed);
    assert_eq!(session.error(), Some(&err));
    // No transport request was ever sent
    assert_eq!(count(&log, "createTransport"), 0);
}

#[tokio::test]
async fn audio_produce_rejection_degrades_to_video_only() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let mut script = SfuScript::default();
    script.reject.insert("produce:audio", "codec unsupported");
    let (log, _sfu) = spawn_sfu(server_io, script);
    let devices = StubDevices::granting();
    let mut session = session(&devices);

    session.initialize(client_io, "cred").await.unwrap();
    session.start().await.unwrap();

    assert_eq!(session.phase(), SessionPhase::Streaming);
    assert!(session.producer(MediaKind::Video).is_some());
    assert!(session.producer(MediaKind::Audio).is_none());
    assert_eq!(count(&log, "produce:audio"), 1);

    // Toggling the missing audio producer is a no-op
    assert_eq!(session.toggle_audio(), None);
}

#[tokio::test]
async fn video_produce_rejection_is_fatal() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let mut script = SfuScript::default();
    script.reject.insert("produce:video", "kind not allowed");
    let (_log, _sfu) = spawn_sfu(server_io, script);
    let devices = StubDevices::granting();
    let mut session = session(&devices);

    session.initialize(client_io, "cred").await.unwrap();
    let err = session.start().await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(session.phase(), SessionPhase::Failed);
    assert!(devices.issued_tracks().iter().all(|t| t.is_stopped()));
}

#[tokio::test]
async fn room_registration_rejection_is_fatal() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let mut script = SfuScript::default();
    script.reject.insert("createRoom", "room exists");
    let (_log, _sfu) = spawn_sfu(server_io, script);
    let devices = StubDevices::granting();
    let mut session = session(&devices);

    let err = session.initialize(client_io, "cred").await.unwrap_err();

    assert_eq!(
        err,
        Error::Signaling(SignalingError::Rejected("room exists".into()))
    );
    assert_eq!(session.phase(), SessionPhase::Failed);
    assert!(!session.signaling_open());
}

#[tokio::test]
async fn missing_microphone_streams_video_only() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let (log, _sfu) = spawn_sfu(server_io, SfuScript::default());
    let devices = StubDevices::without_audio();
    let mut session = session(&devices);

    session.initialize(client_io, "cred").await.unwrap();
    session.start().await.unwrap();

    assert_eq!(session.phase(), SessionPhase::Streaming);
    assert!(session.producer(MediaKind::Audio).is_none());
    // Absence of an audio source never reaches the wire
    assert_eq!(count(&log, "produce:audio"), 0);
    assert_eq!(count(&log, "produce:video"), 1);
}

#[tokio::test]
async fn connection_loss_while_streaming_is_fatal() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let (_log, sfu) = spawn_sfu(server_io, SfuScript::default());
    let devices = StubDevices::granting();
    let mut session = session(&devices);

    session.initialize(client_io, "cred").await.unwrap();
    session.start().await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Streaming);

    // Kill the peer: its half of the duplex drops and the channel's
    // reader sees EOF.
    sfu.abort();
    tokio::time::sleep(Duration::from_millis(50)).await;

    session.process_events();

    assert_eq!(session.phase(), SessionPhase::Failed);
    assert_eq!(
        session.error(),
        Some(&Error::Signaling(SignalingError::ConnectionLost))
    );
    let tracks = devices.issued_tracks();
    assert!(!tracks.is_empty());
    assert!(tracks.iter().all(|t| t.is_stopped()));

    // Loss is handled once; further event processing changes nothing
    session.process_events();
    assert_eq!(session.phase(), SessionPhase::Failed);
}
