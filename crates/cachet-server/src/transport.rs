//! Frame I/O over an async byte stream.
//!
//! A thin layer that moves [`Frame`]s across a socket: read exactly one
//! header, validate it, read exactly the claimed payload. Protocol logic
//! stays in the sans-IO state machines.

use bytes::BytesMut;
use cachet_proto::Frame;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ServerError;

/// Read one complete frame from the stream.
///
/// # Errors
///
/// - `ServerError::Transport` on socket failure or EOF mid-frame
/// - `ServerError::Protocol` if the header does not validate
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, ServerError> {
    let mut header = [0u8; Frame::HEADER_SIZE];
    reader
        .read_exact(&mut header)
        .await
        .map_err(|e| ServerError::Transport(format!("read header failed: {e}")))?;

    // Check the claimed size before allocating; full header validation
    // happens in Frame::decode once the payload is in.
    let payload_size = u32::from_be_bytes([header[6], header[7], header[8], header[9]]) as usize;
    if payload_size > Frame::MAX_PAYLOAD_SIZE {
        return Err(ServerError::Protocol(cachet_proto::ProtocolError::PayloadTooLarge {
            size: payload_size,
            max: Frame::MAX_PAYLOAD_SIZE,
        }));
    }

    let mut buf = BytesMut::with_capacity(Frame::HEADER_SIZE + payload_size);
    buf.extend_from_slice(&header);
    buf.resize(Frame::HEADER_SIZE + payload_size, 0);
    reader
        .read_exact(&mut buf[Frame::HEADER_SIZE..])
        .await
        .map_err(|e| ServerError::Transport(format!("read payload failed: {e}")))?;

    Frame::decode(&buf).map_err(ServerError::Protocol)
}

/// Write one complete frame to the stream and flush.
///
/// # Errors
///
/// - `ServerError::Transport` on socket failure
/// - `ServerError::Protocol` if the frame fails to encode
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), ServerError> {
    let mut wire = Vec::with_capacity(Frame::HEADER_SIZE + frame.payload.len());
    frame.encode(&mut wire)?;

    writer
        .write_all(&wire)
        .await
        .map_err(|e| ServerError::Transport(format!("write failed: {e}")))?;
    writer.flush().await.map_err(|e| ServerError::Transport(format!("flush failed: {e}")))?;

    Ok(())
}
