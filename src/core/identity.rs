//! Peer identifiers exchanged during the handshake.

use sha2::{Digest, Sha256};

use super::constants::PEER_ID_SIZE;

/// Opaque 128-bit identifier of a responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PeerId([u8; PEER_ID_SIZE]);

impl PeerId {
    /// Create a peer ID from bytes.
    pub fn from_bytes(bytes: [u8; PEER_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Generate a random peer ID.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Derive a stable peer ID from arbitrary data (e.g. a public key).
    ///
    /// SHA-256 of the input, with the upper half XOR-folded onto the lower.
    pub fn from_hash(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut id = [0u8; PEER_ID_SIZE];
        for (i, byte) in id.iter_mut().enumerate() {
            *byte = digest[i] ^ digest[i + PEER_ID_SIZE];
        }
        Self(id)
    }

    /// Get the peer ID as bytes.
    pub fn as_bytes(&self) -> &[u8; PEER_ID_SIZE] {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; PEER_ID_SIZE]> for PeerId {
    fn from(bytes: [u8; PEER_ID_SIZE]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl AsRef<[u8]> for PeerId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
