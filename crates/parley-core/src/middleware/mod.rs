//! Built-in middlewares.
//!
//! Register them on a [`TurnDispatcher`](crate::dispatch::TurnDispatcher) in
//! the order they should wrap each other. The usual order is
//! `TurnLogger`, `NotUnderstoodTracker`, `NluRelay`.

mod logger;
mod not_understood;
mod relay;

pub use logger::TurnLogger;
pub use not_understood::NotUnderstoodTracker;
pub use relay::NluRelay;
