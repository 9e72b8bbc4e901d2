//! Frame I/O over an async byte stream, client side.

use bytes::BytesMut;
use cachet_proto::Frame;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ClientError;

/// Read one complete frame from the stream.
///
/// # Errors
///
/// - `ClientError::Transport` on socket failure or EOF mid-frame
/// - `ClientError::Protocol` if the header does not validate
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, ClientError> {
    let mut header = [0u8; Frame::HEADER_SIZE];
    reader
        .read_exact(&mut header)
        .await
        .map_err(|e| ClientError::Transport(format!("read header failed: {e}")))?;

    let payload_size = u32::from_be_bytes([header[6], header[7], header[8], header[9]]) as usize;
    if payload_size > Frame::MAX_PAYLOAD_SIZE {
        return Err(ClientError::Protocol(cachet_proto::ProtocolError::PayloadTooLarge {
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
        .map_err(|e| ClientError::Transport(format!("read payload failed: {e}")))?;

    Frame::decode(&buf).map_err(ClientError::Protocol)
}

/// Write one complete frame to the stream and flush.
///
/// # Errors
///
/// - `ClientError::Transport` on socket failure
/// - `ClientError::Protocol` if the frame fails to encode
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), ClientError> {
    let mut wire = Vec::with_capacity(Frame::HEADER_SIZE + frame.payload.len());
    frame.encode(&mut wire)?;

    writer
        .write_all(&wire)
        .await
        .map_err(|e| ClientError::Transport(format!("write failed: {e}")))?;
    writer.flush().await.map_err(|e| ClientError::Transport(format!("flush failed: {e}")))?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cachet_proto::Opcode;

    use super::*;

    #[tokio::test]
    async fn roundtrip_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(4096);

        let frame = Frame::new(Opcode::TokenIssue, vec![9u8; 32]);
        write_frame(&mut a, &frame).await.unwrap();

        let received = read_frame(&mut b).await.unwrap();
        assert_eq!(received, frame);
    }

    #[tokio::test]
    async fn closed_stream_is_transport_error() {
        let (a, mut b) = tokio::io::duplex(4096);
        drop(a);

        let result = read_frame(&mut b).await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }
}
