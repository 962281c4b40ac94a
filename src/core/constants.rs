//! Protocol constants for the tapwire wire format.
//!
//! These values are fixed by the wire format and MUST NOT be changed; a peer
//! built against different constants will not interoperate.

// =============================================================================
// FRAME HEADER
// =============================================================================

/// Size of the one-byte header carried by every non-handshake frame.
pub const HEADER_SIZE: usize = 1;

/// Bits 0-2 of the header: frame kind tag.
pub const KIND_MASK: u8 = 0x07;

/// Bit 3 of the header: payload is logically empty, trailing byte is a placeholder.
pub const EMPTY_MARKER: u8 = 0x08;

/// Bits 4-7 of the header: sequence number.
pub const SEQUENCE_SHIFT: u8 = 4;

/// Sequence numbers wrap at this value.
pub const SEQUENCE_MODULUS: u8 = 16;

// =============================================================================
// FRAME KIND TAGS
// =============================================================================

/// Middle fragment of a multi-frame payload (or an empty "pull").
pub const KIND_FRAGMENT: u8 = 0;

/// Final fragment of a multi-frame payload.
pub const KIND_FRAGMENT_LAST: u8 = 1;

/// Heartbeat asking the peer to answer with a polling response.
pub const KIND_POLLING_REQUEST: u8 = 2;

/// Whole payload in a single frame.
pub const KIND_SINGLE: u8 = 3;

/// Protocol-level failure on the sender's side.
pub const KIND_ERROR: u8 = 4;

/// Heartbeat acknowledgment.
pub const KIND_POLLING_RESPONSE: u8 = 5;

/// The request being answered caused an application failure on the sender's side.
pub const KIND_ERROR_REPLY: u8 = 6;

// =============================================================================
// HANDSHAKE (ISO 7816-4 SELECT AID)
// =============================================================================

/// Length of every handshake pattern.
pub const HANDSHAKE_SIZE: usize = 13;

/// Index of the byte overwritten to flag first contact.
pub const FIRST_CONTACT_POSITION: usize = 10;

/// Value written at [`FIRST_CONTACT_POSITION`] on a first-contact handshake.
pub const FIRST_CONTACT_MARKER: u8 = 0x64;

/// SELECT AID for the unbounded tier.
pub const HANDSHAKE_UNBOUNDED: [u8; HANDSHAKE_SIZE] = [
    0x00, 0xA4, 0x04, 0x00, 0x07, 0xF0, 0xF0, 0x07, 0x77, 0xFF, 0x65, 0x00, 0x14,
];

/// SELECT AID for the small (53 byte) tier.
pub const HANDSHAKE_SMALL: [u8; HANDSHAKE_SIZE] = [
    0x00, 0xA4, 0x04, 0x00, 0x07, 0xF0, 0xF0, 0x07, 0x77, 0xFF, 0x65, 0x36, 0x14,
];

/// SELECT AID for the medium (245 byte) tier.
pub const HANDSHAKE_MEDIUM: [u8; HANDSHAKE_SIZE] = [
    0x00, 0xA4, 0x04, 0x00, 0x07, 0xF0, 0xF0, 0x07, 0x77, 0xFF, 0x65, 0xF5, 0x14,
];

/// Transport frame size selecting the small tier.
pub const SMALL_FRAME_SIZE: usize = 53;

/// Transport frame size selecting the medium tier.
pub const MEDIUM_FRAME_SIZE: usize = 245;

/// Transport frame size selecting the unbounded tier.
pub const UNBOUNDED_FRAME_SIZE: usize = usize::MAX;

/// Largest frame size that fits the two-byte length field of a handshake reply.
pub const MAX_ADVERTISED_FRAME_SIZE: usize = u16::MAX as usize;

/// Peer identifier size (128 bit).
pub const PEER_ID_SIZE: usize = 16;

/// Handshake reply payload: resume flag + max length (BE16) + peer identifier.
pub const HANDSHAKE_REPLY_SIZE: usize = 1 + 2 + PEER_ID_SIZE;

// =============================================================================
// READ BINARY PROBE
// =============================================================================

/// READ BINARY command some readers inject after an idle period.
pub const PROBE_REQUEST: [u8; 5] = [0x00, 0xB0, 0x00, 0x00, 0x01];

/// Fixed answer to [`PROBE_REQUEST`].
pub const PROBE_REPLY: [u8; 1] = [0x00];

// =============================================================================
// RETRANSMISSION
// =============================================================================

/// Consecutive repeats of one request the responder answers from cache.
pub const DEFAULT_MAX_RETRANSMITS: u32 = 8;
