//! Initiator session state.

use std::collections::VecDeque;

use crate::core::PeerId;
use crate::frame::{Frame, FrameKind, Reassembler};

/// Per-peer initiator state, kept across physical reconnects.
#[derive(Debug)]
pub struct InitiatorSession {
    /// `start_session` was called and the session has not finished.
    pub(crate) active: bool,

    /// Next handshake asks the peer to drop its session state.
    pub(crate) first_contact: bool,

    /// Last request the peer acknowledged.
    pub(crate) last_sent: Option<Frame>,

    /// Outbound frames; the head stays queued until its reply arrives.
    pub(crate) queue: VecDeque<Frame>,

    /// Incoming multi-fragment reply.
    pub(crate) reassembler: Reassembler,

    /// Frame size agreed in the last handshake.
    pub(crate) max_frame_size: usize,

    /// Identifier from the last handshake.
    pub(crate) peer: Option<PeerId>,

    /// Peer holds outbound data from an interrupted transaction.
    pub(crate) resume: bool,
}

impl InitiatorSession {
    /// Create an inactive session.
    pub fn new() -> Self {
        Self {
            active: false,
            first_contact: true,
            last_sent: None,
            queue: VecDeque::new(),
            reassembler: Reassembler::new(),
            max_frame_size: 0,
            peer: None,
            resume: false,
        }
    }

    /// Drop all exchange state. The next handshake is a first contact.
    pub fn reset(&mut self) {
        self.soft_reset();
        self.first_contact = true;
        self.peer = None;
        self.max_frame_size = 0;
    }

    /// Drop exchange state but keep the first-contact flag.
    pub fn soft_reset(&mut self) {
        self.last_sent = None;
        self.queue.clear();
        self.reassembler.clear();
        self.resume = false;
    }

    /// Check if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.last_sent.is_none() && self.queue.is_empty() && self.reassembler.is_empty()
    }

    /// Check if only keep-alive heartbeats are outstanding.
    pub fn is_heartbeat_only(&self) -> bool {
        self.reassembler.is_empty()
            && self
                .queue
                .iter()
                .all(|frame| frame.kind() == FrameKind::PollingRequest)
    }

    /// Check if the session is active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Check if the next handshake is a first contact.
    pub fn is_first_contact(&self) -> bool {
        self.first_contact
    }

    /// Last acknowledged request.
    pub fn last_sent(&self) -> Option<&Frame> {
        self.last_sent.as_ref()
    }

    /// Number of queued outbound frames.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl Default for InitiatorSession {
    fn default() -> Self {
        Self::new()
    }
}
