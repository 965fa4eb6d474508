//! Handler traits for domain logic.
//!
//! Handlers are plain async functions or closures; the blanket
//! implementations below turn them into type-erased values the
//! [`Dispatcher`](crate::dispatcher::Dispatcher) can store.
//!
//! ```rust,ignore
//! async fn on_spot(envelope: Envelope) -> KtwinResult<()> {
//!     let spot: ParkingSpot = envelope.decode_payload()?;
//!     // ...
//!     Ok(())
//! }
//!
//! async fn on_update(command: Envelope, target: TwinInstanceRef) -> KtwinResult<()> {
//!     // ...
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use ktwin_core::{Envelope, KtwinResult, TwinInstanceRef};

// ============================================================================
// Event Handler
// ============================================================================

/// Handles an observation or derived event.
pub trait EventHandler: Send + Sync + 'static {
    /// Runs the handler.
    fn call(&self, envelope: Envelope) -> BoxFuture<'static, KtwinResult<()>>;
}

impl<F, Fut> EventHandler for F
where
    F: Fn(Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = KtwinResult<()>> + Send + 'static,
{
    fn call(&self, envelope: Envelope) -> BoxFuture<'static, KtwinResult<()>> {
        Box::pin((self)(envelope))
    }
}

/// A type-erased event handler.
pub type BoxedEventHandler = Arc<dyn EventHandler>;

// ============================================================================
// Command Handler
// ============================================================================

/// Handles a command addressed to a twin.
///
/// The second argument is the relationship through which the command was
/// routed.
pub trait CommandHandler: Send + Sync + 'static {
    /// Runs the handler.
    fn call(&self, command: Envelope, target: TwinInstanceRef)
    -> BoxFuture<'static, KtwinResult<()>>;
}

impl<F, Fut> CommandHandler for F
where
    F: Fn(Envelope, TwinInstanceRef) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = KtwinResult<()>> + Send + 'static,
{
    fn call(
        &self,
        command: Envelope,
        target: TwinInstanceRef,
    ) -> BoxFuture<'static, KtwinResult<()>> {
        Box::pin((self)(command, target))
    }
}

/// A type-erased command handler.
pub type BoxedCommandHandler = Arc<dyn CommandHandler>;
