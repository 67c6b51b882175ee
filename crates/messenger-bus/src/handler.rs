//! # Action Handlers
//!
//! The request/response side of the bus. A handler is anything that turns a
//! request payload into a response payload asynchronously; closures of the
//! form `|args: Payload| async move { ... }` qualify through the blanket
//! implementation below.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use messenger_types::Payload;

/// Handler registered for one action name.
///
/// Failures are domain errors owned by the handler; the bus passes them to
/// the caller without inspecting them. Cancellation of long work is the
/// handler's own concern.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Handle one call.
    async fn handle(&self, args: Payload) -> anyhow::Result<Payload>;
}

#[async_trait]
impl<F, Fut> ActionHandler for F
where
    F: Fn(Payload) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Payload>> + Send,
{
    async fn handle(&self, args: Payload) -> anyhow::Result<Payload> {
        (self)(args).await
    }
}

/// Shared, type-erased handler as stored in the registry.
pub type DynActionHandler = Arc<dyn ActionHandler>;
