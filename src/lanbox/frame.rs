//! Response framing over a stream transport.
//!
//! Responses are `*`-led and `#`-terminated. A frame is complete once the
//! first terminator arrives; bytes after it belong to the next frame.

use bytes::{Buf, Bytes, BytesMut};

use super::protocol::hex;
use super::types::{FRAME_LEAD, ReplyKind, TERMINATOR};
use crate::error::{AppError, Result};

/// Receive buffer limit. A peer that never sends a terminator cannot grow it past this.
pub const MAX_PENDING: usize = 4096;

/// Outcome of scanning a buffer snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A frame occupies the first `n` bytes, terminator included.
    Complete(usize),
    /// No terminator yet.
    Incomplete,
}

/// Scan `buf` for one complete response frame.
///
/// Never consumes anything; the caller decides what to drop.
pub fn decode(buf: &[u8], kind: ReplyKind) -> Result<Decoded> {
    let Some(end) = buf.iter().position(|&b| b == TERMINATOR) else {
        return Ok(Decoded::Incomplete);
    };
    let len = end + 1;

    if buf[0] != FRAME_LEAD {
        return Err(AppError::frame(format!(
            "frame starts with {:#04X}, expected '*': {}",
            buf[0],
            hex(&buf[..len])
        )));
    }
    if len < kind.min_frame_len() {
        return Err(AppError::frame(format!(
            "{kind:?} frame too short: {len} bytes (min {}): {}",
            kind.min_frame_len(),
            hex(&buf[..len])
        )));
    }

    Ok(Decoded::Complete(len))
}

/// One complete response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    raw: Bytes,
}

impl Frame {
    /// Raw bytes, lead and terminator included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Two-byte opcode echo, when present.
    pub fn opcode(&self) -> Option<&[u8]> {
        (self.raw.len() >= ReplyKind::Data.min_frame_len()).then(|| &self.raw[1..3])
    }

    /// Bytes after the opcode echo, terminator excluded.
    pub fn payload(&self) -> &[u8] {
        if self.raw.len() >= ReplyKind::Data.min_frame_len() {
            &self.raw[3..self.raw.len() - 1]
        } else {
            &[]
        }
    }
}

/// Accumulates bytes from a stream channel and hands out complete frames.
///
/// Single writer, single reader: one task pushes, one task takes frames.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    buffer: BytesMut,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256),
        }
    }

    /// Append received bytes.
    ///
    /// Fails without storing anything if the buffer would exceed `MAX_PENDING`.
    pub fn push(&mut self, data: &[u8]) -> Result<()> {
        if self.buffer.len() + data.len() > MAX_PENDING {
            return Err(AppError::frame(format!(
                "receive buffer full: {} pending + {} new bytes exceeds {MAX_PENDING}",
                self.buffer.len(),
                data.len()
            )));
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Take the first complete frame, leaving the rest pending.
    ///
    /// A malformed frame is left in place; call `resync` to drop it.
    pub fn next_frame(&mut self, kind: ReplyKind) -> Result<Option<Frame>> {
        match decode(&self.buffer, kind)? {
            Decoded::Complete(len) => Ok(Some(Frame {
                raw: self.buffer.split_to(len).freeze(),
            })),
            Decoded::Incomplete => Ok(None),
        }
    }

    /// Drop everything up to and including the next terminator.
    ///
    /// Returns the number of bytes discarded.
    pub fn resync(&mut self) -> usize {
        let drop = self
            .buffer
            .iter()
            .position(|&b| b == TERMINATOR)
            .map_or(self.buffer.len(), |end| end + 1);
        self.buffer.advance(drop);
        drop
    }

    /// Bytes received but not yet returned as a frame.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
