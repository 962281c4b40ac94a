//! Frame encoding and decoding.
//!
//! Wire format of every non-handshake frame:
//! ```text
//! +-----------+-------+--------+------------------+
//! | Sequence  | Empty | Kind   | Payload          |
//! | bits 4-7  | bit 3 | 0-2    | 0..n bytes       |
//! +-----------+-------+--------+------------------+
//! ```
//!
//! Handshake frames and the READ BINARY probe are fixed byte patterns
//! recognised by exact match before the header is parsed.

use crate::core::FrameError;
use crate::core::constants::{
    EMPTY_MARKER, HEADER_SIZE, KIND_ERROR, KIND_ERROR_REPLY, KIND_FRAGMENT, KIND_FRAGMENT_LAST,
    KIND_MASK, KIND_POLLING_REQUEST, KIND_POLLING_RESPONSE, KIND_SINGLE, PROBE_REPLY,
    PROBE_REQUEST, SEQUENCE_MODULUS, SEQUENCE_SHIFT,
};

use super::handshake::HandshakeTier;

/// Frame kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Part of a larger payload; empty payload means "send the next fragment".
    Fragment,
    /// Final part of a larger payload.
    FragmentLast,
    /// Whole payload in one frame.
    Single,
    /// Heartbeat asking for a polling response.
    PollingRequest,
    /// Heartbeat acknowledgment; also invites a deferred reply.
    PollingResponse,
    /// Sender hit a protocol failure and reset its session.
    Error,
    /// The request caused an application failure on the sender's side.
    ErrorReply,
    /// READ BINARY injected by the reader stack after an idle period.
    ReadBinaryProbe,
    /// SELECT AID handshake for one of the three frame size tiers.
    Handshake(HandshakeTier),
}

impl FrameKind {
    /// Parse a header kind tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            KIND_FRAGMENT => Some(Self::Fragment),
            KIND_FRAGMENT_LAST => Some(Self::FragmentLast),
            KIND_POLLING_REQUEST => Some(Self::PollingRequest),
            KIND_SINGLE => Some(Self::Single),
            KIND_ERROR => Some(Self::Error),
            KIND_POLLING_RESPONSE => Some(Self::PollingResponse),
            KIND_ERROR_REPLY => Some(Self::ErrorReply),
            _ => None,
        }
    }

    /// Header tag of this kind, `None` for the fixed-pattern kinds.
    pub fn tag(self) -> Option<u8> {
        match self {
            Self::Fragment => Some(KIND_FRAGMENT),
            Self::FragmentLast => Some(KIND_FRAGMENT_LAST),
            Self::PollingRequest => Some(KIND_POLLING_REQUEST),
            Self::Single => Some(KIND_SINGLE),
            Self::Error => Some(KIND_ERROR),
            Self::PollingResponse => Some(KIND_POLLING_RESPONSE),
            Self::ErrorReply => Some(KIND_ERROR_REPLY),
            Self::ReadBinaryProbe | Self::Handshake(_) => None,
        }
    }
}

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    sequence: u8,
    payload: Vec<u8>,
    first_contact: bool,
}

impl Frame {
    /// Create a frame with an empty payload and sequence 0.
    pub fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            sequence: 0,
            payload: Vec::new(),
            first_contact: false,
        }
    }

    /// Create a frame carrying `payload`.
    pub fn with_payload(kind: FrameKind, payload: Vec<u8>) -> Self {
        Self {
            payload,
            ..Self::new(kind)
        }
    }

    /// Create a handshake frame.
    pub fn handshake(tier: HandshakeTier, first_contact: bool) -> Self {
        Self {
            first_contact,
            ..Self::new(FrameKind::Handshake(tier))
        }
    }

    /// Empty `Fragment`: asks the peer for its next queued fragment.
    pub fn pull() -> Self {
        Self::new(FrameKind::Fragment)
    }

    /// Set the sequence number.
    pub fn with_sequence(mut self, sequence: u8) -> Self {
        self.sequence = sequence % SEQUENCE_MODULUS;
        self
    }

    /// Get the frame kind.
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Get the sequence number.
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Get the payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the frame, returning its payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Check if the wire encoding carries a placeholder instead of payload.
    pub fn is_empty_marker(&self) -> bool {
        self.kind.tag().is_some() && self.payload.is_empty()
    }

    /// Check if this handshake asks the peer to drop all session state.
    pub fn is_first_contact(&self) -> bool {
        self.first_contact
    }

    /// Check if this is an empty `Fragment` asking for the next fragment.
    pub fn is_pull(&self) -> bool {
        self.kind == FrameKind::Fragment && self.payload.is_empty()
    }

    /// True iff this frame's sequence follows `previous` (0 when there is none).
    pub fn matches(&self, previous: Option<&Frame>) -> bool {
        self.sequence == next_sequence(previous)
    }

    /// True iff this frame repeats the sequence of `previous`.
    pub fn is_repeat_of(&self, previous: Option<&Frame>) -> bool {
        previous.is_some_and(|prev| prev.sequence == self.sequence)
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let tag = match self.kind {
            FrameKind::Handshake(tier) => return tier.pattern(self.first_contact).to_vec(),
            FrameKind::ReadBinaryProbe => return PROBE_REPLY.to_vec(),
            kind => kind.tag().unwrap_or(KIND_MASK),
        };

        // Never emit a bare header: some controllers reject 1-byte frames.
        let empty = self.payload.is_empty();
        let empty_bit = if empty { EMPTY_MARKER } else { 0 };
        let header = (tag & KIND_MASK) | empty_bit | (self.sequence << SEQUENCE_SHIFT);

        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len().max(1));
        buf.push(header);
        if empty {
            buf.push(0);
        } else {
            buf.extend_from_slice(&self.payload);
        }
        buf
    }

    /// Parse wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes == PROBE_REQUEST {
            return Ok(Self::new(FrameKind::ReadBinaryProbe));
        }
        if let Some((tier, first_contact)) = HandshakeTier::recognize(bytes) {
            return Ok(Self::handshake(tier, first_contact));
        }

        let header = *bytes.first().ok_or(FrameError::Empty)?;
        let kind = FrameKind::from_tag(header & KIND_MASK)
            .ok_or(FrameError::UnknownKind(header & KIND_MASK))?;
        let empty = header & EMPTY_MARKER != 0;

        let payload = if empty {
            Vec::new()
        } else {
            bytes[HEADER_SIZE..].to_vec()
        };

        Ok(Self {
            kind,
            sequence: header >> SEQUENCE_SHIFT,
            payload,
            first_contact: false,
        })
    }

    /// Read the sequence bits of a raw header without validating the kind.
    pub fn peek_sequence(bytes: &[u8]) -> Option<u8> {
        bytes.first().map(|header| header >> SEQUENCE_SHIFT)
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}/{} len:{}",
            self.kind,
            self.sequence,
            self.payload.len()
        )
    }
}

/// Sequence number of the frame following `previous` (0 when there is none).
pub fn next_sequence(previous: Option<&Frame>) -> u8 {
    previous.map_or(0, |prev| (prev.sequence + 1) % SEQUENCE_MODULUS)
}
