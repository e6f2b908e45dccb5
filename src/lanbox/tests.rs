//! Unit tests for the LanBox codec and session.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
use tokio::net::TcpListener;

use super::protocol::{encode, encode_password};
use super::session::Session;
use super::types::{AckMode, Command, MixMode, ReplyKind, SessionState, TransportKind};
use crate::config::{ControllerConfig, SessionConfig};
use crate::error::AppError;

fn assert_range_error(command: Command) {
    match encode(&command) {
        Err(AppError::Range { .. }) => {}
        other => panic!("expected range error for {command:?}, got {other:?}"),
    }
}

#[test]
fn test_cue_list_commands_all_ids() {
    for id in 1..=999u16 {
        let frame = encode(&Command::CreateCueList { id }).unwrap();
        assert_eq!(frame.len(), 3 + 2 + 1);
        assert_eq!(&frame[0..3], b"*5F");
        assert_eq!(u16::from_be_bytes([frame[3], frame[4]]), id);
        assert_eq!(frame[5], b'#');
    }
}

#[test]
fn test_cue_list_opcodes() {
    assert_eq!(encode(&Command::LoadCueList { id: 258 }).unwrap(), b"*5D\x01\x02#");
    assert_eq!(encode(&Command::SaveCueList { id: 1 }).unwrap(), b"*5E\x00\x01#");
    assert_eq!(encode(&Command::ClearCueList { id: 999 }).unwrap(), b"*5A\x03\xE7#");
}

#[test]
fn test_insert_step_all_layers_and_steps() {
    for layer in 1..=63u8 {
        for step in 1..=99u8 {
            let frame = encode(&Command::InsertStep { layer, step }).unwrap();
            assert_eq!(frame, [b'*', b'5', b'C', layer, step, b'#']);
        }
    }
}

#[test]
fn test_step_commands() {
    assert_eq!(encode(&Command::AppendStep { layer: 4 }).unwrap(), b"*5C\x04#");
    assert_eq!(encode(&Command::DeleteStep { layer: 4, step: 9 }).unwrap(), b"*5B\x04\x09#");
}

#[test]
fn test_layer_commands() {
    let mode = MixMode::Additive.into();
    assert_eq!(encode(&Command::SetMixMode { layer: 2, mode }).unwrap(), b"*47\x02\x02#");
    assert_eq!(encode(&Command::SetTransparency { layer: 2, depth: 255 }).unwrap(), b"*63\x02\xFF#");
    assert_eq!(encode(&Command::GetLayerStatus { layer: 63 }).unwrap(), b"*49\x3F#");
    assert_eq!(encode(&Command::SetLayerPriority { layer: 1, priority: 0 }).unwrap(), b"*4A\x01\x00#");
}

#[test]
fn test_patch_and_gain_commands() {
    assert_eq!(
        encode(&Command::PatchChannel { dmx: 512, mixer: 3072 }).unwrap(),
        b"*81\x02\x00\x0C\x00#"
    );
    assert_eq!(encode(&Command::PatchChannel { dmx: 1, mixer: 0 }).unwrap(), b"*81\x00\x01\x00\x00#");
    assert_eq!(encode(&Command::GetPatch { dmx: 300 }).unwrap(), b"*80\x01\x2C#");
    assert_eq!(encode(&Command::SetGain { dmx: 7, gain: 128 }).unwrap(), b"*82\x00\x07\x80#");
}

#[test]
fn test_get_gain_is_shorter_than_set_gain() {
    let get = encode(&Command::GetGain { dmx: 7 }).unwrap();
    let set_zero = encode(&Command::SetGain { dmx: 7, gain: 0 }).unwrap();
    assert_eq!(get, b"*82\x00\x07#");
    assert_eq!(set_zero, b"*82\x00\x07\x00#");
    assert_ne!(get, set_zero);
}

#[test]
fn test_system_commands() {
    assert_eq!(encode(&Command::FactoryReset).unwrap(), b"*B1#");
    assert_eq!(encode(&Command::SaveConfiguration).unwrap(), b"*B2#");
    assert_eq!(encode(&Command::GetSystemInfo).unwrap(), b"*B3#");
}

#[test]
fn test_out_of_range_parameters() {
    assert_range_error(Command::CreateCueList { id: 1000 });
    assert_range_error(Command::LoadCueList { id: 0 });
    assert_range_error(Command::InsertStep { layer: 64, step: 1 });
    assert_range_error(Command::InsertStep { layer: 1, step: 100 });
    assert_range_error(Command::AppendStep { layer: 0 });
    assert_range_error(Command::DeleteStep { layer: 1, step: 0 });
    assert_range_error(Command::SetMixMode { layer: 1, mode: 5 });
    assert_range_error(Command::SetTransparency { layer: 64, depth: 0 });
    assert_range_error(Command::GetLayerStatus { layer: 64 });
    assert_range_error(Command::SetLayerPriority { layer: 0, priority: 1 });
    assert_range_error(Command::PatchChannel { dmx: 513, mixer: 0 });
    assert_range_error(Command::PatchChannel { dmx: 1, mixer: 3073 });
    assert_range_error(Command::GetPatch { dmx: 0 });
    assert_range_error(Command::SetGain { dmx: 513, gain: 0 });
    assert_range_error(Command::GetGain { dmx: 513 });
    assert_range_error(Command::SetLayerName {
        layer: 64,
        name: "A".to_string(),
    });
}

#[test]
fn test_range_error_reports_bounds() {
    let err = encode(&Command::PatchChannel { dmx: 513, mixer: 0 }).unwrap_err();
    assert_eq!(err.to_string(), "DMX channel out of range: 513 (allowed 1..=512)");
    assert!(err.is_validation());
}

#[test]
fn test_layer_name_truncated_to_15_chars() {
    let frame = encode(&Command::SetLayerName {
        layer: 3,
        name: "ABCDEFGHIJKLMNOPQRSTUVWXYZ".to_string(),
    })
    .unwrap();
    assert_eq!(&frame[0..3], b"*48");
    assert_eq!(frame[3], 3);
    assert_eq!(frame[4], 15);
    assert_eq!(&frame[5..20], b"ABCDEFGHIJKLMNO");
    assert_eq!(frame[20], b'#');
    assert_eq!(frame.len(), 21);
}

#[test]
fn test_layer_name_short_and_empty() {
    let frame = encode(&Command::SetLayerName {
        layer: 1,
        name: "Wash".to_string(),
    })
    .unwrap();
    assert_eq!(frame, b"*48\x01\x04Wash#");

    let empty = encode(&Command::SetLayerName {
        layer: 1,
        name: String::new(),
    })
    .unwrap();
    assert_eq!(empty, b"*48\x01\x00#");
}

#[test]
fn test_layer_name_non_ascii_rejected() {
    let err = encode(&Command::SetLayerName {
        layer: 1,
        name: "Licht über".to_string(),
    })
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidText(_)));
}

#[test]
fn test_password_frame() {
    assert_eq!(encode_password("777").unwrap(), b"777\r");
    assert!(matches!(
        encode_password(&"9".repeat(16)),
        Err(AppError::Length { len: 16, .. })
    ));
    assert!(matches!(encode_password(""), Err(AppError::Length { .. })));
    assert!(matches!(encode_password("77\r7"), Err(AppError::InvalidText(_))));
}

#[test]
fn test_encode_is_deterministic() {
    let command = Command::PatchChannel { dmx: 42, mixer: 1024 };
    assert_eq!(encode(&command).unwrap(), encode(&command).unwrap());
}

#[test]
fn test_encode_from_many_threads() {
    let command = Command::SetGain { dmx: 100, gain: 35 };
    let expected = encode(&command).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| encode(&command).unwrap())).collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn test_reply_kinds() {
    assert_eq!(Command::GetSystemInfo.reply_kind(), ReplyKind::Data);
    assert_eq!(Command::GetGain { dmx: 1 }.reply_kind(), ReplyKind::Data);
    assert_eq!(Command::SetGain { dmx: 1, gain: 0 }.reply_kind(), ReplyKind::Ack);
    assert_eq!(Command::FactoryReset.reply_kind(), ReplyKind::Ack);
}

#[test]
fn test_mix_mode_parse() {
    assert_eq!("Subtractive".parse::<MixMode>().unwrap(), MixMode::Subtractive);
    assert_eq!("4".parse::<MixMode>().unwrap(), MixMode::Transparent);
    assert!("5".parse::<MixMode>().is_err());
    assert!("blend".parse::<MixMode>().is_err());
    assert_eq!(MixMode::Off.index(), 0);
}

// --- Session ---

fn session_config(ack_mode: AckMode) -> SessionConfig {
    SessionConfig {
        ack_mode,
        response_timeout_secs: 1,
        ..SessionConfig::default()
    }
}

fn session_pair(ack_mode: AckMode) -> (Session<DuplexStream>, DuplexStream) {
    let (client, controller) = duplex(256);
    let session = Session::new(client, TransportKind::Tcp, &session_config(ack_mode));
    (session, controller)
}

async fn read_bytes(controller: &mut DuplexStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    tokio::time::timeout(Duration::from_secs(1), controller.read_exact(&mut buf))
        .await
        .unwrap()
        .unwrap();
    buf
}

#[tokio::test]
async fn test_authenticate_fire_and_forget() {
    let (mut session, mut controller) = session_pair(AckMode::FireAndForget);
    assert_eq!(session.state(), SessionState::Unauthenticated);

    session.authenticate("777").await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(read_bytes(&mut controller, 4).await, b"777\r");
}

#[tokio::test]
async fn test_send_before_authenticate_rejected() {
    let (mut session, _controller) = session_pair(AckMode::FireAndForget);
    let err = session.send(&Command::FactoryReset).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(SessionState::Unauthenticated)));
}

#[tokio::test]
async fn test_authenticate_twice_rejected() {
    let (mut session, _controller) = session_pair(AckMode::FireAndForget);
    session.authenticate("777").await.unwrap();
    let err = session.authenticate("777").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(SessionState::Ready)));
}

#[tokio::test]
async fn test_bad_password_keeps_session_unauthenticated() {
    let (mut session, _controller) = session_pair(AckMode::FireAndForget);
    assert!(session.authenticate("").await.is_err());
    assert_eq!(session.state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_send_writes_frames_in_order() {
    let (mut session, mut controller) = session_pair(AckMode::FireAndForget);
    session.authenticate("777").await.unwrap();

    assert!(session.send(&Command::CreateCueList { id: 5 }).await.unwrap().is_none());
    assert!(session.send(&Command::SaveConfiguration).await.unwrap().is_none());

    assert_eq!(read_bytes(&mut controller, 4).await, b"777\r");
    assert_eq!(read_bytes(&mut controller, 6).await, b"*5F\x00\x05#");
    assert_eq!(read_bytes(&mut controller, 4).await, b"*B2#");
}

#[tokio::test]
async fn test_invalid_command_sends_nothing() {
    let (mut session, mut controller) = session_pair(AckMode::FireAndForget);
    session.authenticate("777").await.unwrap();

    let err = session.send(&Command::GetPatch { dmx: 513 }).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(session.state(), SessionState::Ready);

    session.send(&Command::FactoryReset).await.unwrap();
    assert_eq!(read_bytes(&mut controller, 4).await, b"777\r");
    assert_eq!(read_bytes(&mut controller, 4).await, b"*B1#");
}

#[tokio::test]
async fn test_wait_for_ack_returns_reply() {
    let (mut session, mut controller) = session_pair(AckMode::WaitForAck);
    controller.write_all(b"*#").await.unwrap();
    session.authenticate("777").await.unwrap();

    controller.write_all(b"*B3\x03\x01#").await.unwrap();
    let reply = session.send(&Command::GetSystemInfo).await.unwrap().unwrap();
    assert_eq!(reply.opcode(), Some(&b"B3"[..]));
    assert_eq!(reply.payload(), &[0x03, 0x01]);
}

#[tokio::test]
async fn test_wait_for_ack_splits_concatenated_replies() {
    let (mut session, mut controller) = session_pair(AckMode::WaitForAck);
    controller.write_all(b"*#*#*49\x01\x02#").await.unwrap();
    session.authenticate("777").await.unwrap();

    let ack = session.send(&Command::AppendStep { layer: 1 }).await.unwrap().unwrap();
    assert_eq!(ack.as_bytes(), b"*#");

    let status = session.send(&Command::GetLayerStatus { layer: 1 }).await.unwrap().unwrap();
    assert_eq!(status.payload(), &[0x01, 0x02]);
}

#[tokio::test]
async fn test_missing_auth_ack_closes_session() {
    let (mut session, _controller) = session_pair(AckMode::WaitForAck);
    let err = session.authenticate("777").await.unwrap_err();
    assert!(matches!(err, AppError::Timeout(_)));
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_frame_error_keeps_session_ready() {
    let (mut session, mut controller) = session_pair(AckMode::WaitForAck);
    controller.write_all(b"*#").await.unwrap();
    session.authenticate("777").await.unwrap();

    controller.write_all(b"*49#*49\x07\x00#").await.unwrap();
    let err = session.send(&Command::GetLayerStatus { layer: 7 }).await.unwrap_err();
    assert!(matches!(err, AppError::Frame(_)));
    assert_eq!(session.state(), SessionState::Ready);

    let frame = session.receive(ReplyKind::Data).await.unwrap();
    assert_eq!(frame.payload(), &[0x07, 0x00]);
}

#[tokio::test]
async fn test_write_failure_closes_session() {
    let (mut session, controller) = session_pair(AckMode::FireAndForget);
    session.authenticate("777").await.unwrap();
    drop(controller);

    let err = session.send(&Command::FactoryReset).await.unwrap_err();
    assert!(matches!(err, AppError::Io(_)));
    assert_eq!(session.state(), SessionState::Closed);

    let err = session.send(&Command::FactoryReset).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(SessionState::Closed)));
}

#[tokio::test]
async fn test_peer_eof_closes_session() {
    let (mut session, mut controller) = session_pair(AckMode::FireAndForget);
    session.authenticate("777").await.unwrap();
    read_bytes(&mut controller, 4).await;
    drop(controller);

    let err = session.receive(ReplyKind::Ack).await.unwrap_err();
    assert!(matches!(err, AppError::Io(_)));
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (mut session, mut controller) = session_pair(AckMode::FireAndForget);
    session.authenticate("777").await.unwrap();
    session.close().await.unwrap();
    session.close().await.unwrap();
    assert_eq!(session.state(), SessionState::Closed);

    let mut rest = Vec::new();
    controller.read_to_end(&mut rest).await.unwrap();
    assert_eq!(rest, b"777\r");
}

#[tokio::test]
async fn test_receive_timeout_keeps_session_ready() {
    let (mut session, mut controller) = session_pair(AckMode::FireAndForget);
    session.authenticate("777").await.unwrap();

    let err = session.receive(ReplyKind::Ack).await.unwrap_err();
    assert!(matches!(err, AppError::Timeout(_)));
    assert_eq!(session.state(), SessionState::Ready);

    controller.write_all(b"*#").await.unwrap();
    let frame = session.receive(ReplyKind::Ack).await.unwrap();
    assert_eq!(frame.as_bytes(), b"*#");
}

#[tokio::test]
async fn test_late_data_reply_not_taken_by_next_command() {
    let (mut session, mut controller) = session_pair(AckMode::WaitForAck);
    controller.write_all(b"*#").await.unwrap();
    session.authenticate("777").await.unwrap();

    let err = session.send(&Command::GetPatch { dmx: 1 }).await.unwrap_err();
    assert!(matches!(err, AppError::Timeout(_)));
    assert_eq!(session.state(), SessionState::Ready);

    // GetPatch answer shows up after its deadline, ahead of the GetGain answer
    controller.write_all(b"*80\x00\x01\x00\x05#*82\x00\x01\x7F#").await.unwrap();
    let reply = session.send(&Command::GetGain { dmx: 1 }).await.unwrap().unwrap();
    assert_eq!(reply.opcode(), Some(&b"82"[..]));
    assert_eq!(reply.payload(), &[0x00, 0x01, 0x7F]);
}

#[tokio::test]
async fn test_late_data_reply_skipped_before_ack() {
    let (mut session, mut controller) = session_pair(AckMode::WaitForAck);
    controller.write_all(b"*#").await.unwrap();
    session.authenticate("777").await.unwrap();

    assert!(session.send(&Command::GetSystemInfo).await.is_err());

    controller.write_all(b"*B3\x03\x01#*#").await.unwrap();
    let ack = session.send(&Command::FactoryReset).await.unwrap().unwrap();
    assert_eq!(ack.as_bytes(), b"*#");
}

#[tokio::test]
async fn test_connect_tcp_to_local_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let controller_config = ControllerConfig {
        host: "127.0.0.1".to_string(),
        tcp_port: listener.local_addr().unwrap().port(),
        ..ControllerConfig::default()
    };

    let session_config = SessionConfig::default();
    let (connected, accepted) = tokio::join!(
        Session::connect_tcp(&controller_config, &session_config),
        listener.accept()
    );
    let mut session = connected.unwrap();
    let (mut controller, _) = accepted.unwrap();

    assert_eq!(session.transport(), TransportKind::Tcp);
    assert_eq!(session.ack_mode(), AckMode::FireAndForget);
    assert_eq!(session.state(), SessionState::Unauthenticated);

    session.authenticate("777").await.unwrap();
    session.send(&Command::GetSystemInfo).await.unwrap();

    let mut buf = [0u8; 8];
    tokio::time::timeout(Duration::from_secs(1), controller.read_exact(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf, b"777\r*B3#");

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_connect_tcp_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let controller_config = ControllerConfig {
        host: "127.0.0.1".to_string(),
        tcp_port: port,
        ..ControllerConfig::default()
    };
    let result = Session::connect_tcp(&controller_config, &SessionConfig::default()).await;
    assert!(matches!(result, Err(AppError::ConnectionFailed(_))));
}

#[tokio::test]
async fn test_connect_tcp_rejects_other_transports() {
    for kind in [TransportKind::Serial, TransportKind::Midi, TransportKind::Udp] {
        let controller_config = ControllerConfig {
            transport: kind,
            ..ControllerConfig::default()
        };
        let result = Session::connect_tcp(&controller_config, &SessionConfig::default()).await;
        assert!(matches!(result, Err(AppError::UnsupportedTransport(k)) if k == kind));
    }
}
