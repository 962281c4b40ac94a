//! Responder (card role) protocol engine.
//!
//! Provides `Responder<H>`, which answers one incoming frame at a time and
//! never blocks: replies the application produces later are handed over
//! through a [`DeferredReply`] and picked up by the initiator's polling.

use parking_lot::Mutex;

use super::session::ResponderSession;
use crate::core::constants::{
    DEFAULT_MAX_RETRANSMITS, MAX_ADVERTISED_FRAME_SIZE, MEDIUM_FRAME_SIZE,
};
use crate::core::{DeferredReply, ProtocolError, ProtocolResult, ResponseHandler};
use crate::frame::{
    Frame, FrameKind, HandshakeReply, HandshakeTier, capacity, next_sequence, split,
};

/// Responder configuration.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Largest frame the local transport carries.
    pub max_frame_size: usize,

    /// Consecutive repeats of one request answered from cache before giving up.
    pub max_retransmits: u32,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            max_frame_size: MEDIUM_FRAME_SIZE,
            max_retransmits: DEFAULT_MAX_RETRANSMITS,
        }
    }
}

/// Builder for creating a `ResponderConfig`.
#[derive(Debug)]
pub struct ResponderConfigBuilder {
    config: ResponderConfig,
}

impl ResponderConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ResponderConfig::default(),
        }
    }

    /// Set the largest frame the local transport carries.
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set the retransmit cap.
    pub fn max_retransmits(mut self, max: u32) -> Self {
        self.config.max_retransmits = max;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ResponderConfig {
        self.config
    }
}

impl Default for ResponderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the link went away, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deactivation {
    /// The RF field or connection was lost.
    LinkLoss,
    /// The reader selected another application.
    Deselected,
}

impl std::fmt::Display for Deactivation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Deactivation::LinkLoss => f.write_str("link loss"),
            Deactivation::Deselected => f.write_str("deselected"),
        }
    }
}

/// A frame that ended the session: the reply to send and the cause.
struct Abort {
    reply: Frame,
    error: ProtocolError,
}

impl Abort {
    fn new(sequence: u8, error: ProtocolError) -> Self {
        // Failures raised by our own application are blamed on the request.
        let kind = match error {
            ProtocolError::LocalError(_) => FrameKind::ErrorReply,
            _ => FrameKind::Error,
        };
        Self {
            reply: Frame::new(kind).with_sequence(sequence),
            error,
        }
    }
}

/// Responder protocol engine.
///
/// # Example
///
/// ```ignore
/// use tapwire::responder::{Responder, ResponderConfigBuilder};
///
/// let config = ResponderConfigBuilder::new().max_frame_size(245).build();
/// let responder = Responder::new(MyHandler::default(), config);
///
/// // From the platform's APDU callback:
/// let reply = responder.on_frame(&command_apdu);
/// ```
pub struct Responder<H: ResponseHandler> {
    config: ResponderConfig,
    handler: H,
    session: Mutex<ResponderSession>,
    deferred: DeferredReply,
}

impl<H: ResponseHandler> Responder<H> {
    /// Create a responder.
    pub fn new(handler: H, config: ResponderConfig) -> Self {
        let session = Mutex::new(ResponderSession::new(config.max_frame_size));
        Self {
            config,
            handler,
            session,
            deferred: DeferredReply::new(),
        }
    }

    /// Get the application handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Get the configuration.
    pub fn config(&self) -> &ResponderConfig {
        &self.config
    }

    /// Get the deferred reply register handed to the application.
    pub fn deferred(&self) -> &DeferredReply {
        &self.deferred
    }

    /// Frame size currently used for outbound fragmentation.
    pub fn negotiated_frame_size(&self) -> usize {
        self.session.lock().max_frame_size
    }

    /// Check if unacknowledged outbound data is waiting for the initiator.
    pub fn has_pending_output(&self) -> bool {
        !self.session.lock().queue.is_empty() || self.deferred.is_pending()
    }

    /// Check if the session holds no exchange state.
    pub fn is_idle(&self) -> bool {
        self.session.lock().is_empty()
    }

    /// The transport renegotiated its frame size (e.g. a hand-off).
    pub fn set_max_frame_size(&self, size: usize) {
        let mut session = self.session.lock();
        tracing::debug!(
            from = session.max_frame_size,
            to = size,
            "responder: frame size revised"
        );
        session.capability = size;
        session.max_frame_size = size;
    }

    /// Drop all session state, including a pending deferred reply.
    pub fn reset(&self) {
        let mut session = self.session.lock();
        session.reset();
        self.deferred.clear();
        tracing::debug!("responder: reset");
    }

    /// The platform reported that the link went away.
    ///
    /// Session state is kept so that the next contact can resume.
    pub fn on_deactivated(&self, reason: Deactivation) {
        tracing::debug!(%reason, "responder: deactivated");
        self.handler.on_failed(&format!("link deactivated: {reason}"));
    }

    /// Process one incoming frame and return the reply bytes.
    pub fn on_frame(&self, raw: &[u8]) -> Vec<u8> {
        let outcome = {
            let mut session = self.session.lock();
            let outcome = match Frame::decode(raw) {
                Ok(frame) => {
                    tracing::trace!(%frame, "responder: received");
                    self.process(&mut session, frame)
                }
                Err(err) => Err(Abort::new(
                    Frame::peek_sequence(raw).unwrap_or(0),
                    err.into(),
                )),
            };
            if outcome.is_err() {
                session.reset();
                self.deferred.clear();
            }
            outcome
        };

        match outcome {
            Ok(reply) => {
                tracing::trace!(%reply, "responder: sending");
                reply.encode()
            }
            Err(Abort { reply, error }) => {
                tracing::error!(%error, "responder: session reset");
                self.handler.on_failed(&error.to_string());
                reply.encode()
            }
        }
    }

    fn process(&self, session: &mut ResponderSession, frame: Frame) -> Result<Frame, Abort> {
        if frame.is_first_contact() {
            tracing::debug!("responder: first contact, dropping session state");
            session.reset();
            self.deferred.clear();
        }

        match frame.kind() {
            FrameKind::Handshake(tier) => return Ok(self.handshake_reply(session, tier)),
            // Reader keep-alive, outside the sequence space
            FrameKind::ReadBinaryProbe => return Ok(frame),
            _ => {}
        }

        let sequence = frame.sequence();
        let last_received = session.last_received.as_ref();
        let matches = frame.matches(last_received);
        let repeat = frame.is_repeat_of(last_received);
        let expected = next_sequence(last_received);

        if matches {
            session.retransmits = 0;
            let reply = self
                .dispatch(session, &frame)
                .map_err(|error| Abort::new(sequence, error))?
                .with_sequence(sequence);
            session.last_received = Some(frame);
            session.last_sent = Some(reply.clone());
            return Ok(reply);
        }

        if repeat {
            return self
                .retransmit(session, sequence)
                .map_err(|error| Abort::new(sequence, error));
        }

        tracing::warn!(expected, actual = sequence, "responder: out of order frame");
        Err(Abort::new(
            sequence,
            ProtocolError::SequenceMismatch {
                expected,
                actual: sequence,
            },
        ))
    }

    fn handshake_reply(&self, session: &mut ResponderSession, tier: HandshakeTier) -> Frame {
        let negotiated = session
            .capability
            .min(tier.frame_limit())
            .min(MAX_ADVERTISED_FRAME_SIZE);
        session.max_frame_size = negotiated;

        let resume = !session.queue.is_empty() || self.deferred.is_pending();
        tracing::debug!(?tier, negotiated, resume, "responder: handshake");

        let reply = HandshakeReply {
            resume,
            max_frame_size: u16::try_from(negotiated).unwrap_or(u16::MAX),
            peer: self.handler.identifier(),
        };
        Frame::with_payload(FrameKind::Single, reply.to_bytes().to_vec())
    }

    fn retransmit(&self, session: &mut ResponderSession, sequence: u8) -> ProtocolResult<Frame> {
        let cached = session.last_sent.clone().ok_or_else(|| {
            ProtocolError::ProtocolViolation(format!("repeat of {sequence} with no reply sent"))
        })?;

        session.retransmits += 1;
        if session.retransmits > self.config.max_retransmits {
            return Err(ProtocolError::RetransmitLimit(self.config.max_retransmits));
        }

        let room = capacity(session.max_frame_size);
        if cached.payload().len() > room {
            return Err(ProtocolError::ProtocolViolation(format!(
                "cached reply of {} bytes no longer fits {} byte frames",
                cached.payload().len(),
                session.max_frame_size
            )));
        }

        tracing::warn!(
            sequence,
            attempt = session.retransmits,
            "responder: resending cached reply"
        );
        Ok(cached)
    }

    fn dispatch(&self, session: &mut ResponderSession, frame: &Frame) -> ProtocolResult<Frame> {
        match frame.kind() {
            FrameKind::Single => self.deliver(session, frame.payload().to_vec()),
            FrameKind::Fragment if frame.is_pull() => {
                session.queue.pop_front().ok_or_else(|| {
                    ProtocolError::ProtocolViolation("fragment pulled but nothing is queued".into())
                })
            }
            FrameKind::Fragment => {
                session.reassembler.reassemble(frame);
                Ok(Frame::pull())
            }
            FrameKind::FragmentLast if frame.payload().is_empty() => Err(
                ProtocolError::ProtocolViolation("final fragment without payload".into()),
            ),
            FrameKind::FragmentLast => {
                session.reassembler.reassemble(frame);
                let message = session.reassembler.take();
                self.deliver(session, message)
            }
            FrameKind::PollingResponse => self.poll(session),
            FrameKind::PollingRequest => Ok(Frame::new(FrameKind::PollingResponse)),
            FrameKind::Error | FrameKind::ErrorReply => Err(ProtocolError::RemoteError(
                "initiator reported an error".into(),
            )),
            kind @ (FrameKind::ReadBinaryProbe | FrameKind::Handshake(_)) => Err(
                ProtocolError::ProtocolViolation(format!("{kind:?} inside the sequence space")),
            ),
        }
    }

    fn deliver(&self, session: &mut ResponderSession, message: Vec<u8>) -> ProtocolResult<Frame> {
        tracing::debug!(len = message.len(), "responder: message received");
        match self.handler.on_message_received(message, &self.deferred) {
            Ok(Some(reply)) => self.enqueue_reply(session, &reply),
            Ok(None) => {
                tracing::debug!("responder: reply deferred, asking initiator to poll");
                Ok(Frame::new(FrameKind::PollingRequest))
            }
            Err(err) => Err(ProtocolError::LocalError(err.to_string())),
        }
    }

    fn poll(&self, session: &mut ResponderSession) -> ProtocolResult<Frame> {
        // Leftovers of an interrupted reply go first
        if let Some(next) = session.queue.pop_front() {
            return Ok(next);
        }
        match self.deferred.take() {
            Some(reply) => {
                tracing::debug!(len = reply.len(), "responder: deferred reply picked up");
                self.enqueue_reply(session, &reply)
            }
            None => Ok(Frame::new(FrameKind::PollingRequest)),
        }
    }

    fn enqueue_reply(&self, session: &mut ResponderSession, reply: &[u8]) -> ProtocolResult<Frame> {
        if !session.queue.is_empty() {
            tracing::warn!(
                stale = session.queue.len(),
                "responder: discarding unsent fragments"
            );
        }
        session.queue = split(reply, session.max_frame_size)?;
        tracing::debug!(
            len = reply.len(),
            fragments = session.queue.len(),
            "responder: reply queued"
        );
        session.queue.pop_front().ok_or_else(|| {
            ProtocolError::ProtocolViolation("nothing to return, reply queue is empty".into())
        })
    }
}
