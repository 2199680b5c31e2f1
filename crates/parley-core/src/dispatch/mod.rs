//! Turn dispatch: the dispatcher, the per-turn context, and the middleware
//! continuation.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod middleware;

pub use context::TurnContext;
pub use dispatcher::{TurnDispatcher, TurnPhase};
pub use error::{DispatchError, MiddlewareError};
pub use middleware::{Middleware, Next};
