//! # tapwire
//!
//! Reliable, fragmenting request/response messaging over half-duplex,
//! length-limited links such as NFC host card emulation.
//!
//! The link carries one frame per round trip and each frame is small (53 or
//! 245 bytes on common controllers). tapwire provides:
//!
//! - **Fragmentation**: arbitrary payloads split into frames and reassembled
//! - **Stop-and-wait sequencing**: 4-bit sequence numbers, duplicate suppression
//! - **Resume**: interrupted transactions continue after the peer reconnects
//! - **Deferred replies**: the responder may answer later; the initiator polls
//!
//! ## Feature Flags
//!
//! - `initiator` (default): Reader role, [`initiator::Initiator`]
//! - `responder` (default): Card role, [`responder::Responder`]
//! - `loopback` (default): In-process [`transport::LoopbackTransport`]
//! - `runtime`: Run the initiator on tokio's blocking pool
//!
//! ## Modules
//!
//! - [`core`]: Collaborator traits, constants, and error types (always included)
//! - [`frame`]: Wire codec and fragmentation (always included)
//! - [`initiator`]: Initiator engine (requires `initiator` feature)
//! - [`responder`]: Responder engine (requires `responder` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! use tapwire::prelude::*;
//!
//! struct Echo;
//!
//! impl ResponseHandler for Echo {
//!     fn on_message_received(
//!         &self,
//!         message: Vec<u8>,
//!         _deferred: &DeferredReply,
//!     ) -> Result<Option<Vec<u8>>, HandlerError> {
//!         Ok(Some(message))
//!     }
//!
//!     fn on_failed(&self, _reason: &str) {}
//!
//!     fn identifier(&self) -> PeerId {
//!         PeerId::from_hash(b"echo")
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Ping {
//!     sent: AtomicBool,
//! }
//!
//! impl InitiatorHandler for Ping {
//!     fn has_more_messages(&self) -> bool {
//!         !self.sent.load(Ordering::SeqCst)
//!     }
//!
//!     fn next_message(&self) -> Result<Option<Vec<u8>>, HandlerError> {
//!         self.sent.store(true, Ordering::SeqCst);
//!         Ok(Some(vec![0x42; 1000]))
//!     }
//!
//!     fn on_message_received(&self, message: Vec<u8>) -> Result<(), HandlerError> {
//!         assert_eq!(message, vec![0x42; 1000]);
//!         Ok(())
//!     }
//!
//!     fn on_status(&self, _status: &str) {}
//!
//!     fn on_failed(&self, _reason: &str) {}
//! }
//!
//! let responder = Arc::new(Responder::new(Echo, ResponderConfig::default()));
//! let initiator = Initiator::new(Ping::default(), InitiatorConfig::default());
//!
//! initiator.start_session();
//! initiator
//!     .process_peer(LoopbackTransport::new(responder))
//!     .unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Wire codec (always included)
pub mod frame;

// Initiator engine (feature-gated)
#[cfg(feature = "initiator")]
#[cfg_attr(docsrs, doc(cfg(feature = "initiator")))]
pub mod initiator;

// Responder engine (feature-gated)
#[cfg(feature = "responder")]
#[cfg_attr(docsrs, doc(cfg(feature = "responder")))]
pub mod responder;

// In-process transport (feature-gated)
#[cfg(feature = "loopback")]
#[cfg_attr(docsrs, doc(cfg(feature = "loopback")))]
pub mod transport;

// Tokio integration (feature-gated)
#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub mod runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::*;

    pub use crate::frame::{Frame, FrameKind, HandshakeReply, HandshakeTier};

    #[cfg(feature = "initiator")]
    pub use crate::initiator::{Initiator, InitiatorConfig, InitiatorConfigBuilder};

    #[cfg(feature = "responder")]
    pub use crate::responder::{Deactivation, Responder, ResponderConfig, ResponderConfigBuilder};

    #[cfg(feature = "loopback")]
    pub use crate::transport::LoopbackTransport;
}

// Re-export commonly used items at crate root
pub use crate::core::{
    DeferredReply, HandlerError, InitiatorHandler, PeerId, ProtocolError, ProtocolResult,
    ResponseHandler, Transport,
};
