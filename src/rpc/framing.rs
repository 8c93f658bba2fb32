//! Length-framed transport: a 4-byte big-endian length prefix followed by a
//! UTF-8 JSON payload (spec.md §6 — chosen over newline-framing because
//! tool output, e.g. parse trees and search result text, can legitimately
//! contain embedded newlines that must not be mistaken for frame
//! boundaries). No crate in the corpus grounds this directly, so it's
//! hand-rolled over `tokio::io` rather than reaching for `tokio-util`'s
//! length-delimited codec, which this workspace doesn't otherwise need.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::rpc::protocol::RpcError;

/// Frames larger than this are rejected with `content_too_large` (-32001)
/// rather than read into memory.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Read one frame. Returns `Ok(None)` on a clean EOF before any bytes of
/// the next length prefix arrive (the normal way a stream ends).
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>, RpcError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(RpcError::InternalError(format!("frame read failed: {e}"))),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(RpcError::ContentTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| RpcError::InternalError(format!("frame body read failed: {e}")))?;
    Ok(Some(payload))
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<(), RpcError> {
    if payload.len() > MAX_FRAME_BYTES {
        return Err(RpcError::ContentTooLarge(payload.len()));
    }
    let len = (payload.len() as u32).to_be_bytes();
    writer
        .write_all(&len)
        .await
        .map_err(|e| RpcError::InternalError(format!("frame write failed: {e}")))?;
    writer
        .write_all(payload)
        .await
        .map_err(|e| RpcError::InternalError(format!("frame write failed: {e}")))?;
    writer.flush().await.map_err(|e| RpcError::InternalError(format!("frame flush failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips_a_payload() {
        let mut buf: Vec<u8> = Vec::new();
        write_frame(&mut buf, b"hello").await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let frame = read_frame(&mut cursor).await.unwrap().unwrap();
        assert_eq!(frame, b"hello");
    }

    #[tokio::test]
    async fn read_frame_returns_none_at_clean_eof() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        assert!(read_frame(&mut cursor).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected() {
        let mut buf = ((MAX_FRAME_BYTES + 1) as u32).to_be_bytes().to_vec();
        buf.extend_from_slice(b"irrelevant");
        let mut cursor = std::io::Cursor::new(buf);
        assert!(matches!(read_frame(&mut cursor).await, Err(RpcError::ContentTooLarge(_))));
    }
}
