//! Payload fragmentation and reassembly.

use std::collections::VecDeque;

use crate::core::FrameError;
use crate::core::constants::HEADER_SIZE;

use super::frame::{Frame, FrameKind};

/// Payload bytes that fit in one frame of `max_frame_size`.
pub fn capacity(max_frame_size: usize) -> usize {
    max_frame_size.saturating_sub(HEADER_SIZE)
}

/// Split `payload` into frames no larger than `max_frame_size`.
///
/// A payload that fits (including an empty one) becomes one `Single`.
/// Anything larger becomes `Fragment`s closed by a `FragmentLast`.
/// Sequence numbers are left at 0; the engine assigns them on send.
pub fn split(payload: &[u8], max_frame_size: usize) -> Result<VecDeque<Frame>, FrameError> {
    let capacity = capacity(max_frame_size);
    if capacity == 0 {
        return Err(FrameError::FrameSizeTooSmall(max_frame_size));
    }

    if payload.len() <= capacity {
        return Ok(VecDeque::from([Frame::with_payload(
            FrameKind::Single,
            payload.to_vec(),
        )]));
    }

    let count = payload.len().div_ceil(capacity);
    let frames = payload
        .chunks(capacity)
        .enumerate()
        .map(|(i, chunk)| {
            let kind = if i + 1 == count {
                FrameKind::FragmentLast
            } else {
                FrameKind::Fragment
            };
            Frame::with_payload(kind, chunk.to_vec())
        })
        .collect::<VecDeque<_>>();

    tracing::trace!(
        len = payload.len(),
        capacity,
        fragments = frames.len(),
        "split payload"
    );
    Ok(frames)
}

/// Accumulates fragment payloads into one message.
#[derive(Debug, Clone, Default)]
pub struct Reassembler {
    buffer: Vec<u8>,
}

impl Reassembler {
    /// Create an empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the payload of `frame`.
    pub fn reassemble(&mut self, frame: &Frame) {
        self.buffer.extend_from_slice(frame.payload());
    }

    /// Return the accumulated bytes and clear the buffer.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Drop any partial message.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
