//! tapwire - Frame Layer
//!
//! Pure value types, no I/O:
//!
//! - **Frame codec**: [`Frame`] and [`FrameKind`], one-byte header + payload
//! - **Handshake**: [`HandshakeTier`] patterns and the [`HandshakeReply`] payload
//! - **Fragmentation**: [`split`] and [`Reassembler`]

mod fragment;
#[allow(clippy::module_inception)]
mod frame;
mod handshake;

pub use fragment::*;
pub use frame::*;
pub use handshake::*;
