//! Tokio integration.
//!
//! The engines block on the transport, so async callers run them on the
//! blocking pool. [`DeferredReply::set`](crate::core::DeferredReply::set)
//! never blocks and can be called from any task as is.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::core::{InitiatorHandler, ProtocolError, ProtocolResult, Transport};
use crate::initiator::Initiator;

/// Run [`Initiator::process_peer`] on tokio's blocking pool.
pub fn spawn_process_peer<H, T>(
    initiator: Arc<Initiator<H>>,
    mut transport: T,
) -> JoinHandle<ProtocolResult<()>>
where
    H: InitiatorHandler + 'static,
    T: Transport + Send + 'static,
{
    tokio::task::spawn_blocking(move || initiator.process_peer(&mut transport))
}

/// Await one interaction with a peer without blocking the executor.
pub async fn process_peer<H, T>(initiator: Arc<Initiator<H>>, transport: T) -> ProtocolResult<()>
where
    H: InitiatorHandler + 'static,
    T: Transport + Send + 'static,
{
    spawn_process_peer(initiator, transport)
        .await
        .map_err(|err| ProtocolError::LocalError(format!("initiator task failed: {err}")))?
}
