//! Core traits, constants, identifiers and error types.

pub mod constants;
mod deferred;
mod error;
mod identity;
mod traits;

pub use deferred::*;
pub use error::*;
pub use identity::*;
pub use traits::*;
