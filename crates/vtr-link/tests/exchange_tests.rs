//! End-to-end exchange tests over in-memory pipes
//!
//! These drive the full stack (engine, registry, channel, collector,
//! protocol) against scripted device tasks on the far end of a duplex
//! pipe, the same shape a real deck presents on a serial link.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use vtr_link::{Channel, ChannelConfig, DeckEngine, LinkError};
use vtr_protocol::status::TransportMode;
use vtr_protocol::{DeckReply, DeckRequest, FlexiCartCommand, SonyCommand};

/// Engine with one duplex-backed channel; returns the device-side pipe
fn engine_with_channel(id: &str) -> (DeckEngine<DuplexStream>, DuplexStream) {
    let engine: DeckEngine<DuplexStream> = DeckEngine::new();
    let (near, far) = tokio::io::duplex(256);
    engine.attach_channel(id, Channel::from_io(ChannelConfig::new("pipe-0"), near));
    (engine, far)
}

#[tokio::test]
async fn move_to_bin_resolves_decoded_ack() {
    let (engine, mut far) = engine_with_channel("cart-1");

    // Scripted FlexiCart: verify the frame bit-exactly, then ACK
    let device = tokio::spawn(async move {
        let mut frame = [0u8; 9];
        far.read_exact(&mut frame).await.unwrap();
        assert_eq!(
            frame,
            [0x02, 0x06, 0x01, 0x01, 0x20, 0x10, 0x07, 0x80, 0x41]
        );
        far.write_all(&[0x04]).await.unwrap();
        far
    });

    let outcome = engine
        .submit_request(
            "cart-1",
            DeckRequest::Cart {
                cart: 1,
                command: FlexiCartCommand::MoveToBin { bin: 7 },
            },
        )
        .await
        .unwrap();

    assert!(outcome.success());
    assert_eq!(outcome.reply, DeckReply::Ack);
    assert_eq!(outcome.raw, vec![0x04]);
    assert!(!outcome.partial);

    device.await.unwrap();
}

#[tokio::test]
async fn nak_is_unsuccessful_but_not_an_error() {
    let (engine, mut far) = engine_with_channel("cart-1");

    tokio::spawn(async move {
        let mut frame = [0u8; 9];
        far.read_exact(&mut frame).await.unwrap();
        far.write_all(&[0x05]).await.unwrap();
        // Keep the pipe open so the reply is ended by length, not EOF
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let outcome = engine
        .submit_request(
            "cart-1",
            DeckRequest::Cart {
                cart: 2,
                command: FlexiCartCommand::MoveToBin { bin: 1 },
            },
        )
        .await
        .unwrap();

    assert!(!outcome.success());
    assert_eq!(outcome.reply, DeckReply::Nak);
}

#[tokio::test]
async fn status_sense_decodes_play_mode() {
    let (engine, mut far) = engine_with_channel("vtr-1");

    tokio::spawn(async move {
        let mut frame = [0u8; 4];
        far.read_exact(&mut frame).await.unwrap();
        assert_eq!(frame, [0x61, 0x20, 0x0F, 0x90]);
        far.write_all(&[0xD7, 0xBD, 0x01, 0x00, 0x00]).await.unwrap();
    });

    let outcome = engine
        .submit_request("vtr-1", DeckRequest::Deck(SonyCommand::StatusSense))
        .await
        .unwrap();

    match outcome.reply {
        DeckReply::Status(status) => {
            assert_eq!(status.mode, TransportMode::Play);
            assert_eq!(status.tape_present, Some(true));
            assert_eq!(status.raw_hex, "d7bd010000");
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[tokio::test]
async fn bin_status_decodes_occupancy() {
    let (engine, mut far) = engine_with_channel("cart-1");

    tokio::spawn(async move {
        let mut frame = [0u8; 9];
        far.read_exact(&mut frame).await.unwrap();
        // STX, total=5, occupied=3, ETX
        far.write_all(&[0x02, 0x05, 0x03, 0x03]).await.unwrap();
    });

    let outcome = engine
        .submit_request(
            "cart-1",
            DeckRequest::Cart {
                cart: 1,
                command: FlexiCartCommand::BinStatusSense,
            },
        )
        .await
        .unwrap();

    match outcome.reply {
        DeckReply::Bins(bins) => {
            assert_eq!(bins.total, 5);
            let occupied: Vec<u8> = bins
                .bins
                .iter()
                .filter(|b| b.occupied)
                .map(|b| b.slot)
                .collect();
            assert_eq!(occupied, vec![1, 2, 3]);
        }
        other => panic!("expected Bins, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn slow_fragmented_status_resolves_partial() {
    let (engine, mut far) = engine_with_channel("vtr-1");

    // Device answers two of the five expected bytes, then goes quiet
    tokio::spawn(async move {
        let mut frame = [0u8; 4];
        far.read_exact(&mut frame).await.unwrap();
        far.write_all(&[0xF7, 0x7E]).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let outcome = engine
        .submit_request("vtr-1", DeckRequest::Deck(SonyCommand::StatusSense))
        .await
        .unwrap();

    assert!(outcome.partial);
    assert!(outcome.success());
    match outcome.reply {
        DeckReply::Status(status) => {
            assert_eq!(status.mode, TransportMode::Stop);
            // Two bytes is too short to carry tape presence
            assert_eq!(status.tape_present, None);
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn silent_device_is_response_timeout() {
    let (engine, mut far) = engine_with_channel("vtr-1");

    tokio::spawn(async move {
        let mut frame = [0u8; 2];
        far.read_exact(&mut frame).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let err = engine
        .submit_request("vtr-1", DeckRequest::Deck(SonyCommand::Play))
        .await
        .unwrap_err();
    assert!(matches!(err, LinkError::ResponseTimeout(_)));
}

#[tokio::test]
async fn timecode_sense_decodes_bcd() {
    let (engine, mut far) = engine_with_channel("vtr-1");

    tokio::spawn(async move {
        let mut frame = [0u8; 4];
        far.read_exact(&mut frame).await.unwrap();
        far.write_all(&[0x00, 0x24, 0x59, 0x30, 0x12]).await.unwrap();
    });

    let outcome = engine
        .submit_request("vtr-1", DeckRequest::Deck(SonyCommand::TimecodeSense))
        .await
        .unwrap();

    assert_eq!(outcome.reply, DeckReply::Timecode("12:30:59:24".to_string()));
}

#[tokio::test]
async fn unregistering_mid_session_fails_next_request() {
    let (engine, _far) = engine_with_channel("vtr-1");

    assert!(engine.unregister_channel("vtr-1"));
    assert!(!engine.unregister_channel("vtr-1"));

    let err = engine
        .submit_request("vtr-1", DeckRequest::Deck(SonyCommand::Stop))
        .await
        .unwrap_err();
    assert!(matches!(err, LinkError::NotRegistered(_)));
}

#[tokio::test]
async fn exchanges_on_different_channels_run_concurrently() {
    let engine: DeckEngine<DuplexStream> = DeckEngine::new();
    let (near1, mut far1) = tokio::io::duplex(64);
    let (near2, mut far2) = tokio::io::duplex(64);
    engine.attach_channel("vtr-1", Channel::from_io(ChannelConfig::new("pipe-1"), near1));
    engine.attach_channel("vtr-2", Channel::from_io(ChannelConfig::new("pipe-2"), near2));

    // Device 1 only answers after device 2's exchange has fully resolved;
    // if channels serialized against each other this would deadlock.
    let (unblock_tx, unblock_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        let mut frame = [0u8; 2];
        far1.read_exact(&mut frame).await.unwrap();
        unblock_rx.await.unwrap();
        far1.write_all(&[0x04]).await.unwrap();
    });
    tokio::spawn(async move {
        let mut frame = [0u8; 2];
        far2.read_exact(&mut frame).await.unwrap();
        far2.write_all(&[0x04]).await.unwrap();
    });

    let engine = std::sync::Arc::new(engine);
    let req = DeckRequest::Deck(SonyCommand::Play);

    let blocked = tokio::spawn({
        let engine = engine.clone();
        async move { engine.submit_request("vtr-1", req).await }
    });

    // While vtr-1 is mid-exchange, vtr-2 completes a full exchange
    let second = engine.submit_request("vtr-2", req).await.unwrap();
    assert_eq!(second.reply, DeckReply::Ack);

    let _ = unblock_tx.send(());
    let outcome = blocked.await.unwrap().unwrap();
    assert_eq!(outcome.reply, DeckReply::Ack);
}
