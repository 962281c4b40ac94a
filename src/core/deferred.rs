//! Single-slot register for replies produced after the request returned.

use std::sync::Arc;

use parking_lot::Mutex;

use super::error::DeferredReplyError;

/// Handle an application uses to answer a request later.
///
/// The responder hands a clone to the application with every delivered
/// message. Setting it stores the payload until the initiator's next polling
/// response picks it up. At most one reply may be pending.
#[derive(Debug, Clone, Default)]
pub struct DeferredReply {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
}

impl DeferredReply {
    /// Create an empty register.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the reply payload for pickup by the next poll.
    pub fn set(&self, payload: Vec<u8>) -> Result<(), DeferredReplyError> {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Err(DeferredReplyError::AlreadyPending);
        }
        tracing::debug!(len = payload.len(), "deferred reply: stored");
        *slot = Some(payload);
        Ok(())
    }

    /// Check if a reply is waiting to be picked up.
    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Read and clear the slot.
    pub(crate) fn take(&self) -> Option<Vec<u8>> {
        self.slot.lock().take()
    }

    /// Drop any pending reply.
    pub(crate) fn clear(&self) {
        self.slot.lock().take();
    }
}
