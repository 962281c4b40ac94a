//! Initiator (reader) protocol engine.
//!
//! Provides `Initiator<H>`, which drives one full interaction with a peer
//! once the platform reports it reachable: handshake, resume of an
//! interrupted transaction, the message drain loop and optional keep-alive.

use parking_lot::Mutex;

use super::session::InitiatorSession;
use crate::core::{InitiatorHandler, PeerId, ProtocolError, ProtocolResult, Transport};
use crate::frame::{Frame, FrameKind, HandshakeReply, HandshakeTier, capacity, next_sequence, split};

/// Initiator configuration.
#[derive(Debug, Clone, Default)]
pub struct InitiatorConfig {
    /// Start exchanging messages without a handshake.
    pub skip_handshake: bool,

    /// Keep polling after the last message until the link drops.
    pub keep_alive: bool,
}

/// Builder for creating an `InitiatorConfig`.
#[derive(Debug, Default)]
pub struct InitiatorConfigBuilder {
    config: InitiatorConfig,
}

impl InitiatorConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the handshake.
    pub fn skip_handshake(mut self, skip: bool) -> Self {
        self.config.skip_handshake = skip;
        self
    }

    /// Keep the link alive after the last message.
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.config.keep_alive = keep_alive;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> InitiatorConfig {
        self.config
    }
}

/// Initiator protocol engine.
///
/// # Example
///
/// ```ignore
/// use tapwire::initiator::{Initiator, InitiatorConfig};
///
/// let initiator = Initiator::new(MyApp::default(), InitiatorConfig::default());
/// initiator.start_session();
///
/// // From the platform's "tag discovered" callback:
/// initiator.process_peer(&mut iso_dep)?;
/// ```
pub struct Initiator<H: InitiatorHandler> {
    config: InitiatorConfig,
    handler: H,
    session: Mutex<InitiatorSession>,
}

impl<H: InitiatorHandler> Initiator<H> {
    /// Create an initiator. The session starts inactive.
    pub fn new(handler: H, config: InitiatorConfig) -> Self {
        Self {
            config,
            handler,
            session: Mutex::new(InitiatorSession::new()),
        }
    }

    /// Get the application handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Get the configuration.
    pub fn config(&self) -> &InitiatorConfig {
        &self.config
    }

    /// Reset and activate the session; the next handshake is a first contact.
    pub fn start_session(&self) {
        let mut session = self.session.lock();
        session.reset();
        session.active = true;
        tracing::debug!("initiator: session started");
    }

    /// Deactivate the session. State is kept until the next start.
    pub fn stop_session(&self) {
        self.session.lock().active = false;
        tracing::debug!("initiator: session stopped");
    }

    /// Drop all exchange state.
    pub fn reset(&self) {
        self.session.lock().reset();
        tracing::debug!("initiator: reset");
    }

    /// Check if the session is active.
    pub fn is_active(&self) -> bool {
        self.session.lock().active
    }

    /// Identifier of the peer from the last handshake.
    pub fn peer(&self) -> Option<PeerId> {
        self.session.lock().peer
    }

    /// Frame size agreed in the last handshake.
    pub fn negotiated_frame_size(&self) -> usize {
        self.session.lock().max_frame_size
    }

    /// The transport revised its frame size (e.g. a hand-off).
    ///
    /// Applies to messages queued from now on; frames already queued keep
    /// their size. The next handshake negotiates again.
    pub fn set_max_frame_size(&self, size: usize) {
        let mut session = self.session.lock();
        tracing::debug!(
            from = session.max_frame_size,
            to = size,
            "initiator: frame size revised"
        );
        session.max_frame_size = size;
    }

    /// Number of frames waiting to be sent.
    pub fn queued(&self) -> usize {
        self.session.lock().queue.len()
    }

    /// Drive one interaction with a reachable peer.
    ///
    /// Returns `Err(LinkLost)` when the peer went away mid-transaction; the
    /// session stays active and the next call resumes where this one stopped.
    /// Fatal errors reset the session and are reported to `on_failed`.
    pub fn process_peer<T: Transport>(&self, mut transport: T) -> ProtocolResult<()> {
        if !self.is_active() {
            return Err(ProtocolError::Inactive);
        }
        self.handler.on_peer_found();

        match self.run(&mut transport) {
            Ok(()) => {
                self.session.lock().active = false;
                tracing::debug!("initiator: done");
                self.handler.on_done();
                Ok(())
            }
            Err(ProtocolError::LinkLost) => {
                tracing::warn!("initiator: link lost, state kept for resume");
                self.handler.on_status(&ProtocolError::LinkLost.to_string());
                self.handler.on_peer_lost();
                Err(ProtocolError::LinkLost)
            }
            Err(err) => {
                tracing::error!(%err, "initiator: session reset");
                self.session.lock().reset();
                self.handler.on_failed(&err.to_string());
                Err(err)
            }
        }
    }

    fn run<T: Transport>(&self, transport: &mut T) -> ProtocolResult<()> {
        if self.config.skip_handshake {
            let mut session = self.session.lock();
            if session.max_frame_size == 0 {
                session.max_frame_size = transport.max_frame_size();
            }
        } else {
            self.handshake(transport)?;
        }

        self.resume();
        self.drain_messages(transport)?;

        if self.config.keep_alive {
            self.keep_alive(transport)?;
        }
        Ok(())
    }

    fn handshake<T: Transport>(&self, transport: &mut T) -> ProtocolResult<()> {
        let capability = transport.max_frame_size();
        let tier = HandshakeTier::from_frame_size(capability).ok_or_else(|| {
            ProtocolError::HandshakeFailure(format!("unsupported transport frame size {capability}"))
        })?;

        let peer = {
            let mut session = self.session.lock();
            let first_contact = session.first_contact;
            let request = Frame::handshake(tier, first_contact);
            tracing::debug!(?tier, first_contact, "initiator: handshake");

            // Link loss leaves the first-contact flag untouched for the retry
            let raw = transport
                .write(&request.encode())
                .ok_or(ProtocolError::LinkLost)?;
            let reply = Frame::decode(&raw)
                .map_err(|err| ProtocolError::HandshakeFailure(err.to_string()))?;
            if reply.kind() != FrameKind::Single || reply.sequence() != 0 {
                return Err(ProtocolError::HandshakeFailure(format!(
                    "unexpected handshake reply {reply}"
                )));
            }
            let parsed = HandshakeReply::from_bytes(reply.payload())
                .map_err(|err| ProtocolError::HandshakeFailure(err.to_string()))?;

            let negotiated = capability.min(usize::from(parsed.max_frame_size));
            if capacity(negotiated) == 0 {
                return Err(ProtocolError::HandshakeFailure(format!(
                    "peer granted frame size {negotiated}"
                )));
            }

            session.first_contact = false;
            session.max_frame_size = negotiated;
            session.peer = Some(parsed.peer);
            session.resume = parsed.resume;
            tracing::debug!(
                peer = %parsed.peer,
                negotiated,
                resume = parsed.resume,
                "initiator: handshake complete"
            );
            parsed.peer
        };

        self.handler.on_peer_identified(peer);
        self.handler.on_status("handshake complete");
        Ok(())
    }

    /// Invite the peer to hand over data it held when the link dropped.
    fn resume(&self) {
        let mut session = self.session.lock();
        if !session.queue.is_empty() {
            tracing::debug!(queued = session.queue.len(), "initiator: resuming transaction");
        } else if session.resume {
            tracing::debug!("initiator: peer has pending data, polling it");
            session.queue.push_back(Frame::new(FrameKind::PollingResponse));
        }
        session.resume = false;
    }

    fn drain_messages<T: Transport>(&self, transport: &mut T) -> ProtocolResult<()> {
        loop {
            self.pump(transport)?;

            if !self.handler.has_more_messages() {
                return Ok(());
            }
            let message = self
                .handler
                .next_message()
                .map_err(|err| ProtocolError::LocalError(err.to_string()))?;
            self.enqueue(message)?;
        }
    }

    fn keep_alive<T: Transport>(&self, transport: &mut T) -> ProtocolResult<()> {
        tracing::debug!("initiator: keeping link alive");
        loop {
            let result = if self.handler.has_more_messages() {
                self.drain_messages(transport)
            } else {
                self.session
                    .lock()
                    .queue
                    .push_back(Frame::new(FrameKind::PollingRequest));
                self.pump(transport)
            };

            match result {
                Ok(()) => {}
                Err(ProtocolError::LinkLost) => {
                    let mut session = self.session.lock();
                    // A message was in flight; keep it for the resume
                    if !session.is_heartbeat_only() {
                        return Err(ProtocolError::LinkLost);
                    }
                    session.reset();
                    tracing::debug!("initiator: keep-alive ended by link loss");
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Queue a message, or a heartbeat when the application has nothing yet.
    fn enqueue(&self, message: Option<Vec<u8>>) -> ProtocolResult<()> {
        let mut session = self.session.lock();
        match message {
            Some(message) => {
                let frames = split(&message, session.max_frame_size)?;
                tracing::debug!(
                    len = message.len(),
                    fragments = frames.len(),
                    "initiator: message queued"
                );
                session.queue.extend(frames);
            }
            None => session.queue.push_back(Frame::new(FrameKind::PollingRequest)),
        }
        Ok(())
    }

    /// Drain the queue, recovering from a sequence mismatch.
    fn pump<T: Transport>(&self, transport: &mut T) -> ProtocolResult<()> {
        match self.drain_queue(transport) {
            Err(err @ ProtocolError::SequenceMismatch { .. }) => self.recover(transport, err),
            other => other,
        }
    }

    fn recover<T: Transport>(&self, transport: &mut T, err: ProtocolError) -> ProtocolResult<()> {
        tracing::warn!(%err, "initiator: dropping transaction, messages must be resent");
        {
            let mut session = self.session.lock();
            session.soft_reset();
            // The peer still counts from its old sequence; make it start over
            // too, even if the link drops before the handshake gets through
            if !self.config.skip_handshake {
                session.first_contact = true;
            }
        }
        self.handler.on_status(&err.to_string());

        if !self.config.skip_handshake {
            self.handshake(transport)?;
        }
        Ok(())
    }

    fn drain_queue<T: Transport>(&self, transport: &mut T) -> ProtocolResult<()> {
        loop {
            let (delivered, queued) = {
                let mut session = self.session.lock();
                let Some(head) = session.queue.front() else {
                    return Ok(());
                };
                let request = head
                    .clone()
                    .with_sequence(next_sequence(session.last_sent.as_ref()));
                tracing::trace!(%request, "initiator: sending");

                let raw = transport
                    .write(&request.encode())
                    .ok_or(ProtocolError::LinkLost)?;
                let reply = Frame::decode(&raw)?;
                tracing::trace!(%reply, "initiator: received");

                if reply.sequence() != request.sequence() {
                    return Err(ProtocolError::SequenceMismatch {
                        expected: request.sequence(),
                        actual: reply.sequence(),
                    });
                }

                session.queue.pop_front();
                session.last_sent = Some(request);
                let delivered = Self::dispatch(&mut session, reply)?;
                (delivered, session.queue.len())
            };

            if let Some(message) = delivered {
                tracing::debug!(len = message.len(), "initiator: message received");
                self.handler
                    .on_message_received(message)
                    .map_err(|err| ProtocolError::LocalError(err.to_string()))?;
            }
            self.handler.on_status(&format!("{queued} frames queued"));
        }
    }

    /// Act on a reply; returns a complete message when one arrived.
    fn dispatch(session: &mut InitiatorSession, reply: Frame) -> ProtocolResult<Option<Vec<u8>>> {
        match reply.kind() {
            FrameKind::Single | FrameKind::FragmentLast if !reply.payload().is_empty() => {
                session.reassembler.reassemble(&reply);
                Ok(Some(session.reassembler.take()))
            }
            FrameKind::Single => Ok(Some(Vec::new())),
            FrameKind::Fragment if !reply.payload().is_empty() => {
                session.reassembler.reassemble(&reply);
                session.queue.push_back(Frame::pull());
                Ok(None)
            }
            FrameKind::Fragment | FrameKind::FragmentLast => {
                if session.queue.is_empty() {
                    return Err(ProtocolError::ProtocolViolation(
                        "peer pulled a fragment but nothing is queued".into(),
                    ));
                }
                Ok(None)
            }
            FrameKind::PollingRequest => {
                session.queue.push_back(Frame::new(FrameKind::PollingResponse));
                Ok(None)
            }
            FrameKind::PollingResponse => Ok(None),
            FrameKind::Error => Err(ProtocolError::RemoteError(
                "responder reset its session".into(),
            )),
            FrameKind::ErrorReply => Err(ProtocolError::RemoteError(
                "request failed on the responder".into(),
            )),
            kind @ (FrameKind::ReadBinaryProbe | FrameKind::Handshake(_)) => Err(
                ProtocolError::ProtocolViolation(format!("{kind:?} received as a reply")),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::core::HandlerError;
    use crate::core::constants::{MEDIUM_FRAME_SIZE, SMALL_FRAME_SIZE};

    #[derive(Default)]
    struct App {
        outgoing: Mutex<VecDeque<Option<Vec<u8>>>>,
        received: Mutex<Vec<Vec<u8>>>,
        statuses: Mutex<Vec<String>>,
        failures: Mutex<Vec<String>>,
        done: AtomicUsize,
    }

    impl App {
        fn sending(messages: Vec<Option<Vec<u8>>>) -> Self {
            Self {
                outgoing: Mutex::new(messages.into()),
                ..Default::default()
            }
        }
    }

    impl InitiatorHandler for App {
        fn has_more_messages(&self) -> bool {
            !self.outgoing.lock().is_empty()
        }

        fn next_message(&self) -> Result<Option<Vec<u8>>, HandlerError> {
            Ok(self.outgoing.lock().pop_front().flatten())
        }

        fn on_message_received(&self, message: Vec<u8>) -> Result<(), HandlerError> {
            self.received.lock().push(message);
            Ok(())
        }

        fn on_status(&self, status: &str) {
            self.statuses.lock().push(status.to_string());
        }

        fn on_failed(&self, reason: &str) {
            self.failures.lock().push(reason.to_string());
        }

        fn on_done(&self) {
            self.done.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Transport replaying canned replies and recording what was written.
    struct Script {
        replies: VecDeque<Option<Vec<u8>>>,
        written: Vec<Vec<u8>>,
        max_frame_size: usize,
    }

    impl Script {
        fn new(max_frame_size: usize, replies: Vec<Option<Vec<u8>>>) -> Self {
            Self {
                replies: replies.into(),
                written: Vec::new(),
                max_frame_size,
            }
        }
    }

    impl Transport for Script {
        fn write(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
            self.written.push(frame.to_vec());
            self.replies.pop_front().flatten()
        }

        fn max_frame_size(&self) -> usize {
            self.max_frame_size
        }
    }

    fn handshake_reply(resume: bool, max_frame_size: u16) -> Vec<u8> {
        let reply = HandshakeReply {
            resume,
            max_frame_size,
            peer: PeerId::from_bytes([0x24; 16]),
        };
        Frame::with_payload(FrameKind::Single, reply.to_bytes().to_vec()).encode()
    }

    fn skipping() -> InitiatorConfig {
        InitiatorConfigBuilder::new().skip_handshake(true).build()
    }

    #[test]
    fn test_inactive_session_refuses() {
        let initiator = Initiator::new(App::default(), InitiatorConfig::default());
        let mut transport = Script::new(MEDIUM_FRAME_SIZE, vec![]);
        assert_eq!(
            initiator.process_peer(&mut transport),
            Err(ProtocolError::Inactive)
        );
        assert!(transport.written.is_empty());
    }

    #[test]
    fn test_handshake_then_single_exchange() {
        let app = App::sending(vec![Some(b"ping".to_vec())]);
        let initiator = Initiator::new(app, InitiatorConfig::default());
        initiator.start_session();

        let mut transport = Script::new(
            SMALL_FRAME_SIZE,
            vec![
                Some(handshake_reply(false, 53)),
                Some(Frame::with_payload(FrameKind::Single, b"pong".to_vec()).encode()),
            ],
        );
        initiator.process_peer(&mut transport).unwrap();

        assert_eq!(
            hex::encode(&transport.written[0]),
            "00a4040007f0f00777ff643614"
        );
        let mut single = vec![0x03];
        single.extend_from_slice(b"ping");
        assert_eq!(transport.written[1], single);
        assert_eq!(*initiator.handler().received.lock(), vec![b"pong".to_vec()]);
        assert_eq!(initiator.peer(), Some(PeerId::from_bytes([0x24; 16])));
        assert_eq!(initiator.negotiated_frame_size(), 53);
        assert!(!initiator.is_active());
        assert_eq!(initiator.handler().done.load(Ordering::SeqCst), 1);
        assert!(
            initiator
                .handler()
                .statuses
                .lock()
                .contains(&"handshake complete".to_string())
        );
    }

    #[test]
    fn test_second_contact_not_first() {
        let initiator = Initiator::new(App::default(), InitiatorConfig::default());
        initiator.start_session();

        let mut transport = Script::new(MEDIUM_FRAME_SIZE, vec![None]);
        assert_eq!(
            initiator.process_peer(&mut transport),
            Err(ProtocolError::LinkLost)
        );
        assert!(initiator.session.lock().is_first_contact());

        let mut transport = Script::new(MEDIUM_FRAME_SIZE, vec![Some(handshake_reply(false, 245))]);
        initiator.process_peer(&mut transport).unwrap();
        assert_eq!(transport.written[0][10], 0x64);

        initiator.session.lock().active = true;
        let mut transport = Script::new(MEDIUM_FRAME_SIZE, vec![Some(handshake_reply(false, 245))]);
        initiator.process_peer(&mut transport).unwrap();
        assert_eq!(transport.written[0][10], 0x65);
    }

    #[test]
    fn test_sequence_mismatch_soft_resets() {
        let app = App::sending(vec![Some(vec![1, 2, 3])]);
        let initiator = Initiator::new(app, skipping());
        initiator.start_session();
        {
            let mut session = initiator.session.lock();
            session.first_contact = false;
            session.last_sent = Some(Frame::new(FrameKind::Single).with_sequence(4));
        }

        let mut transport = Script::new(
            MEDIUM_FRAME_SIZE,
            vec![Some(
                Frame::with_payload(FrameKind::Single, vec![9]).with_sequence(7).encode(),
            )],
        );
        initiator.process_peer(&mut transport).unwrap();

        // Request went out as sequence 5
        assert_eq!(transport.written[0][0] >> 4, 5);

        let session = initiator.session.lock();
        assert!(session.is_empty());
        assert!(!session.is_first_contact());
        drop(session);

        let app = initiator.handler();
        assert!(app.received.lock().is_empty());
        assert!(app.failures.lock().is_empty());
        assert!(app.statuses.lock()[0].contains("sequence mismatch: expected 5, got 7"));
    }

    #[test]
    fn test_mismatch_rehandshakes_with_first_contact() {
        let app = App::sending(vec![Some(vec![1])]);
        let initiator = Initiator::new(app, InitiatorConfig::default());
        initiator.start_session();

        let mut transport = Script::new(
            MEDIUM_FRAME_SIZE,
            vec![
                Some(handshake_reply(false, 245)),
                Some(Frame::with_payload(FrameKind::Single, vec![1]).with_sequence(3).encode()),
                Some(handshake_reply(false, 245)),
            ],
        );
        initiator.process_peer(&mut transport).unwrap();

        assert_eq!(transport.written.len(), 3);
        assert_eq!(transport.written[2][10], 0x64);
        assert!(!initiator.session.lock().is_first_contact());
    }

    #[test]
    fn test_mismatch_then_link_loss_keeps_first_contact() {
        let app = App::sending(vec![Some(vec![1])]);
        let initiator = Initiator::new(app, InitiatorConfig::default());
        initiator.start_session();

        // The re-handshake after the mismatch never gets an answer
        let mut transport = Script::new(
            MEDIUM_FRAME_SIZE,
            vec![
                Some(handshake_reply(false, 245)),
                Some(Frame::with_payload(FrameKind::Single, vec![1]).with_sequence(3).encode()),
                None,
            ],
        );
        assert_eq!(
            initiator.process_peer(&mut transport),
            Err(ProtocolError::LinkLost)
        );
        assert_eq!(transport.written[2][10], 0x64);
        assert!(initiator.is_active());
        assert!(initiator.session.lock().is_first_contact());

        // The reconnect still asks the peer to start over
        let mut transport = Script::new(MEDIUM_FRAME_SIZE, vec![Some(handshake_reply(false, 245))]);
        initiator.process_peer(&mut transport).unwrap();
        assert_eq!(transport.written[0][10], 0x64);
        assert!(!initiator.session.lock().is_first_contact());
    }

    #[test]
    fn test_unknown_reply_kind_is_violation() {
        let app = App::sending(vec![Some(vec![1])]);
        let initiator = Initiator::new(app, skipping());
        initiator.start_session();

        let mut transport = Script::new(MEDIUM_FRAME_SIZE, vec![Some(vec![0x07, 0x01])]);
        let result = initiator.process_peer(&mut transport);

        assert!(matches!(result, Err(ProtocolError::ProtocolViolation(_))));
        assert!(initiator.session.lock().is_empty());
        assert_eq!(initiator.handler().failures.lock().len(), 1);
    }

    #[test]
    fn test_unsupported_frame_size() {
        let initiator = Initiator::new(App::default(), InitiatorConfig::default());
        initiator.start_session();

        let mut transport = Script::new(64, vec![]);
        let result = initiator.process_peer(&mut transport);

        assert!(matches!(result, Err(ProtocolError::HandshakeFailure(_))));
        assert!(transport.written.is_empty());
    }

    #[test]
    fn test_malformed_handshake_reply() {
        let initiator = Initiator::new(App::default(), InitiatorConfig::default());
        initiator.start_session();

        let short = Frame::with_payload(FrameKind::Single, vec![0; 18]).encode();
        let mut transport = Script::new(MEDIUM_FRAME_SIZE, vec![Some(short)]);
        let result = initiator.process_peer(&mut transport);
        assert!(matches!(result, Err(ProtocolError::HandshakeFailure(_))));

        initiator.start_session();
        let mut reply = handshake_reply(false, 245);
        reply[0] |= 0x10;
        let mut transport = Script::new(MEDIUM_FRAME_SIZE, vec![Some(reply)]);
        let result = initiator.process_peer(&mut transport);
        assert!(matches!(result, Err(ProtocolError::HandshakeFailure(_))));
        assert_eq!(initiator.handler().failures.lock().len(), 2);
    }

    #[test]
    fn test_link_loss_keeps_queue() {
        let app = App::sending(vec![Some(vec![5; 10])]);
        let initiator = Initiator::new(app, skipping());
        initiator.start_session();

        let mut transport = Script::new(MEDIUM_FRAME_SIZE, vec![None]);
        assert_eq!(
            initiator.process_peer(&mut transport),
            Err(ProtocolError::LinkLost)
        );
        assert!(initiator.is_active());
        assert_eq!(initiator.queued(), 1);

        // Same frame, same sequence on the retry
        let mut transport = Script::new(
            MEDIUM_FRAME_SIZE,
            vec![Some(Frame::with_payload(FrameKind::Single, vec![6]).encode())],
        );
        initiator.process_peer(&mut transport).unwrap();
        assert_eq!(transport.written[0], Frame::with_payload(FrameKind::Single, vec![5; 10]).encode());
        assert_eq!(*initiator.handler().received.lock(), vec![vec![6]]);
    }

    #[test]
    fn test_remote_error_resets() {
        let app = App::sending(vec![Some(vec![1])]);
        let initiator = Initiator::new(app, skipping());
        initiator.start_session();

        let mut transport = Script::new(
            MEDIUM_FRAME_SIZE,
            vec![Some(Frame::new(FrameKind::ErrorReply).encode())],
        );
        let result = initiator.process_peer(&mut transport);

        assert!(matches!(result, Err(ProtocolError::RemoteError(_))));
        assert!(initiator.session.lock().is_empty());
    }

    #[test]
    fn test_polling_until_answer() {
        let app = App::sending(vec![Some(vec![1])]);
        let initiator = Initiator::new(app, skipping());
        initiator.start_session();

        let mut transport = Script::new(
            MEDIUM_FRAME_SIZE,
            vec![
                Some(Frame::new(FrameKind::PollingRequest).encode()),
                Some(Frame::new(FrameKind::PollingRequest).with_sequence(1).encode()),
                Some(Frame::with_payload(FrameKind::Single, vec![2]).with_sequence(2).encode()),
            ],
        );
        initiator.process_peer(&mut transport).unwrap();

        let polls: Vec<_> = transport.written[1..].iter().map(|f| f[0]).collect();
        assert_eq!(polls, vec![0x1D, 0x2D]);
        assert_eq!(*initiator.handler().received.lock(), vec![vec![2]]);
    }

    #[test]
    fn test_resume_flag_polls_peer() {
        let initiator = Initiator::new(App::default(), InitiatorConfig::default());
        initiator.start_session();

        let mut transport = Script::new(
            MEDIUM_FRAME_SIZE,
            vec![
                Some(handshake_reply(true, 245)),
                Some(Frame::with_payload(FrameKind::Single, vec![3]).encode()),
            ],
        );
        initiator.process_peer(&mut transport).unwrap();

        assert_eq!(transport.written[1], Frame::new(FrameKind::PollingResponse).encode());
        assert_eq!(*initiator.handler().received.lock(), vec![vec![3]]);
    }

    #[test]
    fn test_keep_alive_until_link_loss() {
        let config = InitiatorConfigBuilder::new()
            .skip_handshake(true)
            .keep_alive(true)
            .build();
        let initiator = Initiator::new(App::default(), config);
        initiator.start_session();

        let mut transport = Script::new(
            MEDIUM_FRAME_SIZE,
            vec![
                Some(Frame::new(FrameKind::PollingResponse).encode()),
                Some(Frame::new(FrameKind::PollingResponse).with_sequence(1).encode()),
                None,
            ],
        );
        initiator.process_peer(&mut transport).unwrap();

        assert_eq!(transport.written.len(), 3);
        assert!(!initiator.is_active());
        assert_eq!(initiator.handler().done.load(Ordering::SeqCst), 1);

        // The unanswered heartbeat is not left behind
        let session = initiator.session.lock();
        assert!(session.is_empty());
        assert!(session.is_first_contact());
    }

    #[test]
    fn test_set_max_frame_size_applies_to_next_message() {
        let app = App::sending(vec![Some(vec![7; 100])]);
        let initiator = Initiator::new(app, skipping());
        initiator.start_session();
        initiator.set_max_frame_size(SMALL_FRAME_SIZE);

        let mut transport = Script::new(
            MEDIUM_FRAME_SIZE,
            vec![
                Some(Frame::pull().encode()),
                Some(Frame::with_payload(FrameKind::Single, vec![8]).with_sequence(1).encode()),
            ],
        );
        initiator.process_peer(&mut transport).unwrap();

        // 100 bytes at 52 per fragment, despite the transport's 245
        assert_eq!(transport.written.len(), 2);
        assert_eq!(transport.written[0].len(), SMALL_FRAME_SIZE);
        assert_eq!(transport.written[1].len(), 49);
        assert_eq!(initiator.negotiated_frame_size(), SMALL_FRAME_SIZE);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let initiator = Initiator::new(App::default(), InitiatorConfig::default());
        initiator.reset();
        initiator.reset();
        let session = initiator.session.lock();
        assert!(session.is_empty());
        assert!(session.is_first_contact());
    }
}
