//! Middleware trait and the `Next` continuation.
//!
//! A middleware receives the turn context and a `Next` value standing for
//! the rest of the chain. Awaiting `next.run(ctx)` runs everything after it;
//! dropping `next` short-circuits. `Next` is consumed by `run`, so the rest
//! of the chain can run at most once per turn.
//!
//! Same blanket-impl pattern as `BoxSessionStore`: `Middleware` uses RPITIT,
//! `MiddlewareDyn` is its object-safe twin stored in the dispatcher.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::context::TurnContext;
use super::error::MiddlewareError;

/// A step in the turn pipeline.
///
/// Work before `next.run(ctx).await` is pre-processing, work after it is
/// post-processing. Returning without calling `next` stops the chain.
pub trait Middleware: Send + Sync {
    /// Name used in logs and error attribution.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn handle(
        &self,
        ctx: &mut TurnContext,
        next: Next<'_>,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

type MiddlewareFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Object-safe version of [`Middleware`] with boxed futures.
pub trait MiddlewareDyn: Send + Sync {
    fn name(&self) -> &str;

    fn handle_boxed<'a>(&'a self, ctx: &'a mut TurnContext, next: Next<'a>)
        -> MiddlewareFuture<'a>;
}

impl<T: Middleware> MiddlewareDyn for T {
    fn name(&self) -> &str {
        Middleware::name(self)
    }

    fn handle_boxed<'a>(
        &'a self,
        ctx: &'a mut TurnContext,
        next: Next<'a>,
    ) -> MiddlewareFuture<'a> {
        Box::pin(self.handle(ctx, next))
    }
}

/// The rest of the chain after the current middleware.
pub struct Next<'a> {
    chain: &'a [Arc<dyn MiddlewareDyn>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn MiddlewareDyn>]) -> Self {
        Self { chain }
    }

    /// How many middlewares are still to run.
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    /// Run the remaining middlewares; resolves immediately if none are left.
    ///
    /// A failure keeps its attribution to the innermost middleware that
    /// raised it, even after passing through outer middlewares' `?`.
    ///
    /// `run` takes `self`, so a middleware cannot run the rest of the chain
    /// twice:
    ///
    /// ```compile_fail,E0382
    /// use parley_core::dispatch::{Middleware, Next, TurnContext};
    ///
    /// struct Twice;
    ///
    /// impl Middleware for Twice {
    ///     async fn handle(&self, ctx: &mut TurnContext, next: Next<'_>) -> anyhow::Result<()> {
    ///         next.run(ctx).await?;
    ///         next.run(ctx).await?;
    ///         Ok(())
    ///     }
    /// }
    /// ```
    pub async fn run(self, ctx: &mut TurnContext) -> Result<(), MiddlewareError> {
        let Some((current, rest)) = self.chain.split_first() else {
            return Ok(());
        };

        let name = current.name();
        tracing::trace!(middleware = %name, remaining = rest.len(), "entering middleware");

        current
            .handle_boxed(ctx, Next { chain: rest })
            .await
            .map_err(|err| match err.downcast::<MiddlewareError>() {
                Ok(inner) => inner,
                Err(source) => MiddlewareError {
                    middleware: name.to_string(),
                    source,
                },
            })
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.chain.len())
            .finish()
    }
}
