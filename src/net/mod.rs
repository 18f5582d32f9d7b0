// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! TCP transport: length-prefixed JSON frames.
//!
//! Each frame is a big-endian `u32` length followed by one UTF-8 JSON
//! envelope, and earns exactly one response frame. Within a connection
//! delivery is in order; the per-session ordering guarantee builds on that.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::protocol;
use crate::protocol::encode::encode_response;
use crate::protocol::types::{WireError, WireResponse};
use crate::service::{ConnectionId, GraphService};

/// Default listen port, inherited from the editor plugin this service grew
/// out of.
pub const DEFAULT_PORT: u16 = 13377;
pub const DEFAULT_MAX_FRAME: usize = 1 << 20;

#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Frames longer than this are refused and the connection is closed.
    pub max_frame: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self { max_frame: DEFAULT_MAX_FRAME }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },
}

/// Reads one frame; `Ok(None)` on a clean peer close.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_frame: usize,
) -> Result<Option<Vec<u8>>, FrameError> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > max_frame {
        return Err(FrameError::TooLarge { len, max: max_frame });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too long for u32"))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

/// Accept loop. Each connection gets its own task and [`ConnectionId`]; when
/// the task ends the service tears down every session the connection opened.
pub async fn serve(
    listener: TcpListener,
    service: GraphService,
    config: NetConfig,
) -> io::Result<()> {
    let local = listener.local_addr()?;
    tracing::info!(%local, "listening for graph clients");

    let mut next_connection = 0u64;
    loop {
        let (stream, peer) = listener.accept().await?;
        next_connection += 1;
        let connection = ConnectionId::new(next_connection);
        tracing::info!(%connection, %peer, "client connected");

        let service = service.clone();
        let max_frame = config.max_frame;
        tokio::spawn(async move {
            match drive_connection(stream, &service, connection, max_frame).await {
                Ok(()) => tracing::info!(%connection, "client disconnected"),
                Err(err) => tracing::warn!(%connection, error = %err, "connection ended"),
            }
            service.connection_closed(connection);
        });
    }
}

async fn drive_connection(
    mut stream: tokio::net::TcpStream,
    service: &GraphService,
    connection: ConnectionId,
    max_frame: usize,
) -> Result<(), FrameError> {
    let (mut reader, mut writer) = stream.split();

    loop {
        let frame = match read_frame(&mut reader, max_frame).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(()),
            Err(FrameError::TooLarge { len, max }) => {
                // Tell the peer why before dropping the connection; the
                // stream position is unrecoverable past an oversized frame.
                let error = protocol::ProtocolError::MalformedEnvelope {
                    detail: format!("frame of {len} bytes exceeds the {max} byte limit"),
                };
                let response = WireResponse::error(None, WireError::from_protocol(&error));
                let _ = write_frame(&mut writer, &encode_response(&response)).await;
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let response = match protocol::decode(&frame) {
            Ok(envelope) => {
                service
                    .route(envelope.session, envelope.command, Some(connection))
                    .await
            }
            Err(err) => {
                tracing::warn!(%connection, error = %err, "rejected envelope");
                WireResponse::error(None, WireError::from_protocol(&err))
            }
        };
        write_frame(&mut writer, &encode_response(&response)).await?;
    }
}
