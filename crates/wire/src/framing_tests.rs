// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn write_then_read_round_trips() {
    let payload = br#"{"jsonrpc":"2.0","id":1,"method":"listQueues"}"#;
    let mut buf = Vec::new();
    write_message(&mut buf, payload).await.expect("write failed");

    let mut cursor = std::io::Cursor::new(buf);
    let read_back = read_message(&mut cursor).await.expect("read failed");
    assert_eq!(read_back.as_deref(), Some(payload.as_slice()));
}

#[tokio::test]
async fn write_message_prefixes_version_then_size() {
    let payload = b"hi";
    let mut buf = Vec::new();
    write_message(&mut buf, payload).await.expect("write failed");

    assert_eq!(buf.len(), 8 + payload.len());
    let version = u32::from_be_bytes(buf[0..4].try_into().unwrap());
    let size = u32::from_be_bytes(buf[4..8].try_into().unwrap());
    assert_eq!(version, PROTOCOL_VERSION);
    assert_eq!(size as usize, payload.len());
}

#[tokio::test]
async fn mismatched_version_is_rejected() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&99u32.to_be_bytes());
    buf.extend_from_slice(&2u32.to_be_bytes());
    buf.extend_from_slice(b"hi");

    let mut cursor = std::io::Cursor::new(buf);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, FrameError::VersionMismatch { got: 99, expected: 1 }));
}

#[tokio::test]
async fn clean_eof_at_frame_boundary_yields_none() {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    let result = read_message(&mut cursor).await.expect("should not error");
    assert!(result.is_none());
}

#[tokio::test]
async fn partial_frame_is_an_io_error() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    buf.extend_from_slice(&10u32.to_be_bytes());
    buf.extend_from_slice(b"short");

    let mut cursor = std::io::Cursor::new(buf);
    let result = read_message(&mut cursor).await;
    assert!(matches!(result, Err(FrameError::Io(_))));
}
