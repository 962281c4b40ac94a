//! Handshake patterns and the handshake reply payload.
//!
//! The initiator opens every contact with an ISO 7816-4 SELECT AID whose last
//! AID byte encodes the frame size tier of its transport:
//! ```text
//! +-------------+----+----------------------+------+----+
//! | CLA INS P1 P2| Lc | F0 F0 07 77 FF 65    | tier | Le |
//! | 00 A4 04 00 | 07 | (65 -> 64 on first)  |      | 14 |
//! +-------------+----+----------------------+------+----+
//! ```
//!
//! The responder answers with a `Single` frame, sequence 0, carrying:
//! ```text
//! +--------+------------------+---------------------+
//! | Resume | Max frame size   | Peer identifier     |
//! | 1 byte | 2 bytes (BE16)   | 16 bytes            |
//! +--------+------------------+---------------------+
//! ```

use crate::core::constants::{
    FIRST_CONTACT_MARKER, FIRST_CONTACT_POSITION, HANDSHAKE_MEDIUM, HANDSHAKE_REPLY_SIZE,
    HANDSHAKE_SIZE, HANDSHAKE_SMALL, HANDSHAKE_UNBOUNDED, MAX_ADVERTISED_FRAME_SIZE,
    MEDIUM_FRAME_SIZE, PEER_ID_SIZE, SMALL_FRAME_SIZE, UNBOUNDED_FRAME_SIZE,
};
use crate::core::{FrameError, PeerId};

/// Frame size tier announced by the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeTier {
    /// No practical limit (extended-length APDUs).
    Unbounded,
    /// 53 byte frames.
    Small,
    /// 245 byte frames.
    Medium,
}

impl HandshakeTier {
    /// Pick the tier for a transport's maximum frame size.
    ///
    /// Only the exact tier sizes are recognised.
    pub fn from_frame_size(size: usize) -> Option<Self> {
        match size {
            SMALL_FRAME_SIZE => Some(Self::Small),
            MEDIUM_FRAME_SIZE => Some(Self::Medium),
            UNBOUNDED_FRAME_SIZE => Some(Self::Unbounded),
            _ => None,
        }
    }

    /// Largest frame a responder may grant for this tier.
    pub fn frame_limit(self) -> usize {
        match self {
            Self::Unbounded => MAX_ADVERTISED_FRAME_SIZE,
            Self::Small => SMALL_FRAME_SIZE,
            Self::Medium => MEDIUM_FRAME_SIZE,
        }
    }

    /// Wire pattern, with the first-contact byte substituted when requested.
    pub fn pattern(self, first_contact: bool) -> [u8; HANDSHAKE_SIZE] {
        let mut pattern = match self {
            Self::Unbounded => HANDSHAKE_UNBOUNDED,
            Self::Small => HANDSHAKE_SMALL,
            Self::Medium => HANDSHAKE_MEDIUM,
        };
        if first_contact {
            pattern[FIRST_CONTACT_POSITION] = FIRST_CONTACT_MARKER;
        }
        pattern
    }

    /// Exact-match `bytes` against the six handshake patterns.
    pub fn recognize(bytes: &[u8]) -> Option<(Self, bool)> {
        if bytes.len() != HANDSHAKE_SIZE {
            return None;
        }
        [Self::Unbounded, Self::Small, Self::Medium]
            .into_iter()
            .flat_map(|tier| [(tier, false), (tier, true)])
            .find(|&(tier, first)| tier.pattern(first) == bytes)
    }
}

/// Payload of the responder's handshake reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeReply {
    /// Responder still holds outbound data from an interrupted transaction.
    pub resume: bool,
    /// Negotiated maximum frame size.
    pub max_frame_size: u16,
    /// Responder identity.
    pub peer: PeerId,
}

impl HandshakeReply {
    /// Serialize to the 19-byte payload.
    pub fn to_bytes(&self) -> [u8; HANDSHAKE_REPLY_SIZE] {
        let mut buf = [0u8; HANDSHAKE_REPLY_SIZE];
        buf[0] = u8::from(self.resume);
        buf[1..3].copy_from_slice(&self.max_frame_size.to_be_bytes());
        buf[3..].copy_from_slice(self.peer.as_bytes());
        buf
    }

    /// Parse from a handshake reply payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() != HANDSHAKE_REPLY_SIZE {
            return Err(FrameError::InvalidHandshakeReply {
                expected: HANDSHAKE_REPLY_SIZE,
                actual: bytes.len(),
            });
        }

        let mut id = [0u8; PEER_ID_SIZE];
        id.copy_from_slice(&bytes[3..]);

        Ok(Self {
            resume: bytes[0] != 0,
            max_frame_size: u16::from_be_bytes([bytes[1], bytes[2]]),
            peer: PeerId::from_bytes(id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_frame_size() {
        assert_eq!(HandshakeTier::from_frame_size(53), Some(HandshakeTier::Small));
        assert_eq!(HandshakeTier::from_frame_size(245), Some(HandshakeTier::Medium));
        assert_eq!(
            HandshakeTier::from_frame_size(usize::MAX),
            Some(HandshakeTier::Unbounded)
        );
        assert_eq!(HandshakeTier::from_frame_size(64), None);
    }

    #[test]
    fn test_patterns() {
        let small = HandshakeTier::Small.pattern(false);
        assert_eq!(hex::encode(small), "00a4040007f0f00777ff653614");

        let first = HandshakeTier::Medium.pattern(true);
        assert_eq!(hex::encode(first), "00a4040007f0f00777ff64f514");
    }

    #[test]
    fn test_recognize() {
        for tier in [HandshakeTier::Unbounded, HandshakeTier::Small, HandshakeTier::Medium] {
            assert_eq!(HandshakeTier::recognize(&tier.pattern(false)), Some((tier, false)));
            assert_eq!(HandshakeTier::recognize(&tier.pattern(true)), Some((tier, true)));
        }

        let mut foreign = HANDSHAKE_SMALL;
        foreign[11] = 0x42;
        assert_eq!(HandshakeTier::recognize(&foreign), None);
        assert_eq!(HandshakeTier::recognize(&HANDSHAKE_SMALL[..12]), None);
    }

    #[test]
    fn test_reply_layout() {
        let reply = HandshakeReply {
            resume: true,
            max_frame_size: 245,
            peer: PeerId::from_bytes([0x11; PEER_ID_SIZE]),
        };
        let bytes = reply.to_bytes();
        assert_eq!(bytes.len(), 19);
        assert_eq!(&bytes[..3], &[0x01, 0x00, 0xF5]);
        assert_eq!(&bytes[3..], &[0x11; PEER_ID_SIZE]);

        assert_eq!(HandshakeReply::from_bytes(&bytes).unwrap(), reply);
    }

    #[test]
    fn test_reply_wrong_size() {
        assert_eq!(
            HandshakeReply::from_bytes(&[0u8; 18]),
            Err(FrameError::InvalidHandshakeReply {
                expected: 19,
                actual: 18
            })
        );
    }
}
