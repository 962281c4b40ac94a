//! Responder session state.
//!
//! Everything the responder remembers between two frames of the same peer.
//! The engine keeps one instance behind a single mutex so that reading the
//! last exchange, deciding, and recording the next one is atomic.

use std::collections::VecDeque;

use crate::frame::{Frame, Reassembler};

/// Per-peer responder state.
#[derive(Debug)]
pub struct ResponderSession {
    /// Last reply sent, resent verbatim on a repeated request.
    pub(crate) last_sent: Option<Frame>,

    /// Last request accepted.
    pub(crate) last_received: Option<Frame>,

    /// Outbound fragments waiting for the initiator to pull them.
    pub(crate) queue: VecDeque<Frame>,

    /// Incoming multi-fragment request.
    pub(crate) reassembler: Reassembler,

    /// Consecutive repeats of the current request.
    pub(crate) retransmits: u32,

    /// Largest frame the local transport carries.
    pub(crate) capability: usize,

    /// Frame size in effect for outbound fragmentation.
    pub(crate) max_frame_size: usize,
}

impl ResponderSession {
    /// Create an empty session for a transport carrying `capability` bytes.
    pub fn new(capability: usize) -> Self {
        Self {
            last_sent: None,
            last_received: None,
            queue: VecDeque::new(),
            reassembler: Reassembler::new(),
            retransmits: 0,
            capability,
            max_frame_size: capability,
        }
    }

    /// Drop all exchange state. Frame sizes survive.
    pub fn reset(&mut self) {
        self.last_sent = None;
        self.last_received = None;
        self.queue.clear();
        self.reassembler.clear();
        self.retransmits = 0;
    }

    /// Check if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.last_sent.is_none()
            && self.last_received.is_none()
            && self.queue.is_empty()
            && self.reassembler.is_empty()
            && self.retransmits == 0
    }

    /// Last reply sent.
    pub fn last_sent(&self) -> Option<&Frame> {
        self.last_sent.as_ref()
    }

    /// Last request accepted.
    pub fn last_received(&self) -> Option<&Frame> {
        self.last_received.as_ref()
    }

    /// Number of queued outbound fragments.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Frame size in effect.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameKind;

    #[test]
    fn test_new_session_is_empty() {
        let session = ResponderSession::new(245);
        assert!(session.is_empty());
        assert_eq!(session.max_frame_size(), 245);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut session = ResponderSession::new(53);
        session.last_sent = Some(Frame::new(FrameKind::Single));
        session.queue.push_back(Frame::pull());
        session.retransmits = 3;
        session.max_frame_size = 20;

        session.reset();
        assert!(session.is_empty());
        session.reset();
        assert!(session.is_empty());
        assert_eq!(session.max_frame_size(), 20);
    }
}
