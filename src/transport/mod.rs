//! tapwire - Transport adapters
//!
//! Real links (NFC IsoDep, HCE) live in platform code and implement
//! [`Transport`](crate::core::Transport) directly. This module ships the
//! in-process [`LoopbackTransport`].

mod loopback;

pub use loopback::*;
