//! In-process transport wiring an initiator straight into a responder.
//!
//! Handy for tests and demos, and a reference for real adapters: one
//! `write` is one call to [`Responder::on_frame`]. Faults can be injected to
//! exercise resume and retransmission.

use std::sync::Arc;

use crate::core::{ResponseHandler, Transport};
use crate::responder::Responder;

/// Loopback link to a [`Responder`].
pub struct LoopbackTransport<H: ResponseHandler> {
    responder: Arc<Responder<H>>,
    max_frame_size: usize,
    /// Frames carried so far.
    writes: usize,
    /// Length of every frame carried.
    frame_sizes: Vec<usize>,
    /// Link goes down once this many frames were carried.
    fail_after: Option<usize>,
    /// Deliver the next frame but lose its reply.
    drop_next_reply: bool,
}

impl<H: ResponseHandler> LoopbackTransport<H> {
    /// Connect to `responder`, advertising its configured frame size.
    pub fn new(responder: Arc<Responder<H>>) -> Self {
        let max_frame_size = responder.config().max_frame_size;
        Self {
            responder,
            max_frame_size,
            writes: 0,
            frame_sizes: Vec::new(),
            fail_after: None,
            drop_next_reply: false,
        }
    }

    /// Advertise a different frame size.
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Get the responder on the far end.
    pub fn responder(&self) -> &Arc<Responder<H>> {
        &self.responder
    }

    /// Frames carried so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Length of every frame carried so far, in order.
    pub fn frame_sizes(&self) -> &[usize] {
        &self.frame_sizes
    }

    /// Drop the link after `count` more frames; later writes fail.
    pub fn fail_after(&mut self, count: usize) {
        self.fail_after = Some(self.writes + count);
    }

    /// Deliver the next frame to the responder but lose the reply.
    pub fn drop_next_reply(&mut self) {
        self.drop_next_reply = true;
    }

    /// Bring the link back up, clearing injected faults.
    pub fn reconnect(&mut self) {
        self.fail_after = None;
        self.drop_next_reply = false;
    }

    /// Change the advertised frame size, as after a transport hand-off.
    pub fn set_max_frame_size(&mut self, size: usize) {
        self.max_frame_size = size;
    }
}

impl<H: ResponseHandler> Transport for LoopbackTransport<H> {
    fn write(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        if self.fail_after.is_some_and(|limit| self.writes >= limit) {
            tracing::trace!("loopback: link down");
            return None;
        }
        self.writes += 1;
        self.frame_sizes.push(frame.len());

        let reply = self.responder.on_frame(frame);
        if std::mem::take(&mut self.drop_next_reply) {
            tracing::trace!(len = reply.len(), "loopback: reply dropped");
            return None;
        }
        Some(reply)
    }

    fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}
