//! tapwire - Initiator
//!
//! Reader side of the protocol. Blocks the calling thread on the transport
//! for the whole interaction with a peer.

#[allow(clippy::module_inception)]
mod initiator;
mod session;

pub use initiator::*;
pub use session::*;
