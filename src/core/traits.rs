//! Collaborator traits for tapwire.
//!
//! The protocol engines never touch radio hardware or application logic
//! directly. They talk to a [`Transport`] for round trips and to a handler
//! for payloads and events.

use super::deferred::DeferredReply;
use super::error::HandlerError;
use super::identity::PeerId;

/// One blocking request/response round trip over the physical link.
///
/// # Example
///
/// ```ignore
/// struct IsoDepTransport { tag: IsoDep }
///
/// impl Transport for IsoDepTransport {
///     fn write(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
///         self.tag.transceive(frame).ok()
///     }
///
///     fn max_frame_size(&self) -> usize {
///         self.tag.max_transceive_length()
///     }
/// }
/// ```
pub trait Transport {
    /// Send one frame and block until the peer's reply arrives.
    ///
    /// Returns `None` when the link is lost or the peer did not answer.
    fn write(&mut self, frame: &[u8]) -> Option<Vec<u8>>;

    /// Largest frame the link can carry in one round trip.
    ///
    /// Selects the handshake tier, so it must be one of the tier sizes
    /// (`SMALL_FRAME_SIZE`, `MEDIUM_FRAME_SIZE`, `UNBOUNDED_FRAME_SIZE`).
    fn max_frame_size(&self) -> usize;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        (**self).write(frame)
    }

    fn max_frame_size(&self) -> usize {
        (**self).max_frame_size()
    }
}

/// Application side of the initiator (reader) role.
pub trait InitiatorHandler: Send + Sync {
    /// Check whether another message should be sent in this session.
    fn has_more_messages(&self) -> bool;

    /// Produce the next message.
    ///
    /// `Ok(None)` means "nothing yet, keep the link up and poll".
    fn next_message(&self) -> Result<Option<Vec<u8>>, HandlerError>;

    /// A complete reply was reassembled.
    fn on_message_received(&self, message: Vec<u8>) -> Result<(), HandlerError>;

    /// Intermediate progress report.
    fn on_status(&self, status: &str);

    /// The session failed and was reset.
    fn on_failed(&self, reason: &str);

    /// A peer became reachable.
    fn on_peer_found(&self) {}

    /// The handshake revealed the peer's identifier.
    fn on_peer_identified(&self, peer: PeerId) {
        let _ = peer;
    }

    /// The link dropped; a later contact may resume.
    fn on_peer_lost(&self) {}

    /// The session finished and was marked inactive.
    fn on_done(&self) {}
}

/// Application side of the responder (card) role.
pub trait ResponseHandler: Send + Sync {
    /// A complete request was reassembled.
    ///
    /// Return `Ok(Some(reply))` to answer immediately, or `Ok(None)` to answer
    /// later through `deferred`; the initiator polls until it is set.
    ///
    /// Called while the responder holds its session lock: do not call back
    /// into the [`Responder`](crate::responder::Responder) from here. Setting
    /// `deferred`, even before returning, is fine.
    fn on_message_received(
        &self,
        message: Vec<u8>,
        deferred: &DeferredReply,
    ) -> Result<Option<Vec<u8>>, HandlerError>;

    /// The session failed and was reset.
    fn on_failed(&self, reason: &str);

    /// Identifier announced in handshake replies.
    fn identifier(&self) -> PeerId;
}

impl<H: InitiatorHandler + ?Sized> InitiatorHandler for std::sync::Arc<H> {
    fn has_more_messages(&self) -> bool {
        (**self).has_more_messages()
    }

    fn next_message(&self) -> Result<Option<Vec<u8>>, HandlerError> {
        (**self).next_message()
    }

    fn on_message_received(&self, message: Vec<u8>) -> Result<(), HandlerError> {
        (**self).on_message_received(message)
    }

    fn on_status(&self, status: &str) {
        (**self).on_status(status)
    }

    fn on_failed(&self, reason: &str) {
        (**self).on_failed(reason)
    }

    fn on_peer_found(&self) {
        (**self).on_peer_found()
    }

    fn on_peer_identified(&self, peer: PeerId) {
        (**self).on_peer_identified(peer)
    }

    fn on_peer_lost(&self) {
        (**self).on_peer_lost()
    }

    fn on_done(&self) {
        (**self).on_done()
    }
}

impl<H: ResponseHandler + ?Sized> ResponseHandler for std::sync::Arc<H> {
    fn on_message_received(
        &self,
        message: Vec<u8>,
        deferred: &DeferredReply,
    ) -> Result<Option<Vec<u8>>, HandlerError> {
        (**self).on_message_received(message, deferred)
    }

    fn on_failed(&self, reason: &str) {
        (**self).on_failed(reason)
    }

    fn identifier(&self) -> PeerId {
        (**self).identifier()
    }
}
