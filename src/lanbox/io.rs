//! Channel I/O with timeout handling.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, error, warn};

use super::frame::{Frame, ResponseBuffer};
use super::protocol::hex;
use super::types::ReplyKind;
use crate::error::{AppError, Result};

/// Write one frame and flush.
pub(crate) async fn write_frame<W>(channel: &mut W, frame: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    debug!("TX ({} bytes): {}", frame.len(), hex(frame));
    channel.write_all(frame).await.map_err(|e| {
        error!("Write failed: {e}");
        AppError::Io(e)
    })?;
    channel.flush().await.map_err(|e| {
        error!("Flush failed: {e}");
        AppError::Io(e)
    })?;
    Ok(())
}

/// Read until `buffer` yields one complete frame.
///
/// Bytes already pending in `buffer` are decoded first. A frame error
/// resynchronizes the buffer before it is returned.
pub(crate) async fn read_frame<R>(
    channel: &mut R,
    buffer: &mut ResponseBuffer,
    kind: ReplyKind,
    timeout_duration: Duration,
) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    timeout(timeout_duration, fill_until_frame(channel, buffer, kind))
        .await
        .map_err(|_| {
            error!("Read timeout waiting for {kind:?} frame");
            AppError::Timeout(format!("no {kind:?} reply within {timeout_duration:?}"))
        })?
}

async fn fill_until_frame<R>(channel: &mut R, buffer: &mut ResponseBuffer, kind: ReplyKind) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 256];
    loop {
        match buffer.next_frame(kind) {
            Ok(Some(frame)) => {
                debug!("RX ({} bytes): {}", frame.as_bytes().len(), hex(frame.as_bytes()));
                return Ok(frame);
            }
            Ok(None) => {}
            Err(e) => {
                let dropped = buffer.resync();
                warn!("Discarded {dropped} bytes: {e}");
                return Err(e);
            }
        }

        let n = channel.read(&mut chunk).await.map_err(|e| {
            error!("Read failed: {e}");
            AppError::Io(e)
        })?;
        if n == 0 {
            error!("Channel closed by peer");
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "channel closed by peer",
            )));
        }
        if let Err(e) = buffer.push(&chunk[..n]) {
            buffer.clear();
            warn!("Receive buffer reset: {e}");
            return Err(e);
        }
    }
}
