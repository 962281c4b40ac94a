//! tapwire - Responder
//!
//! Card-emulation side of the protocol. Answers each frame synchronously
//! from the platform's APDU callback.

#[allow(clippy::module_inception)]
mod responder;
mod session;

pub use responder::*;
pub use session::*;
