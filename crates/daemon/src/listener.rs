// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The accept loop (§4.1): one task per connection, each driving its
//! own read/decode/dispatch/encode/write cycle against `mq-wire`'s
//! framing and JSON-RPC types.
//!
//! Grounded on the teacher's `listener/mod.rs` spawn-per-connection
//! shape. "Hold-until-start" (§4.1) falls out structurally here: a
//! connection's outbound channel and dispatcher routing entry are
//! registered before the read loop ever starts, so there is no window
//! where a packet could arrive and find no handler attached.

use crate::dispatcher::Dispatcher;
use mq_wire::{decode, encode_many, read_message, write_message, EndpointAllocator, EndpointId};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub async fn run(listener: UnixListener, dispatcher: Arc<Dispatcher>, shutdown: CancellationToken) {
    let allocator = Arc::new(EndpointAllocator::new());
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let Ok((stream, _addr)) = accepted else { continue };
                let endpoint = allocator.allocate();
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move { handle_connection(stream, endpoint, dispatcher).await });
            }
            () = shutdown.cancelled() => break,
        }
    }
}

async fn handle_connection(stream: tokio::net::UnixStream, endpoint: EndpointId, dispatcher: Arc<Dispatcher>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let writer_task = tokio::spawn(async move {
        while let Some(payload) = outbound_rx.recv().await {
            if write_message(&mut write_half, &payload).await.is_err() {
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    loop {
        let payload = match read_message(&mut reader).await {
            Ok(Some(payload)) => payload,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(%e, "connection dropped on framing error");
                break;
            }
        };

        let parsed = match decode(&payload) {
            Ok(messages) => messages,
            Err(rpc_error) => {
                let error_message = mq_wire::Message::Error(mq_wire::ErrorResponse { id: None, error: rpc_error });
                if let Ok(bytes) = encode_many(&[error_message]) {
                    let _ = outbound_tx.send(bytes);
                }
                continue;
            }
        };

        let mut responses = Vec::new();
        for result in parsed {
            match result {
                Ok(message) => {
                    if let Some(response) = dispatcher.handle(endpoint, outbound_tx.clone(), message).await {
                        responses.push(response);
                    }
                }
                Err(rpc_error) => {
                    responses.push(mq_wire::Message::Error(mq_wire::ErrorResponse { id: None, error: rpc_error }));
                }
            }
        }

        if !responses.is_empty() {
            if let Ok(bytes) = encode_many(&responses) {
                if outbound_tx.send(bytes).is_err() {
                    break;
                }
            }
        }
    }

    dispatcher.purge_endpoint(endpoint);
    drop(outbound_tx);
    let _ = writer_task.await;
}
