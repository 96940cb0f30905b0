//! The asynchronous execution channel behind the list command facade.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::Error,
    request::{CommandReply, CommandRequest},
};

/// Performs a single command dispatch.
///
/// The request is only borrowed for the duration of the call. Implementations send
/// the request, wait for the reply and decode it according to
/// [`CommandRequest::shape`]. Nil replies must decode to [`CommandReply::Absent`] or
/// to an empty sequence, never to an error. Retries, ordering between concurrent
/// requests, blocking timeouts and cancellation are all the executor's business.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Dispatch the request and wait for its reply.
    async fn execute(&self, request: &CommandRequest) -> Result<CommandReply, Error>;
}

#[async_trait]
impl<E> CommandExecutor for Arc<E>
where
    E: CommandExecutor + ?Sized,
{
    async fn execute(&self, request: &CommandRequest) -> Result<CommandReply, Error> {
        (**self).execute(request).await
    }
}
