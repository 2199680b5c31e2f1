//! Session persistence port and backends.
//!
//! `SessionStore` is the trait the infrastructure layer implements;
//! `BoxSessionStore` erases it for runtime backend selection and
//! `InMemorySessionStore` is the in-process backend.

pub mod box_store;
pub mod memory;
pub mod store;

pub use box_store::BoxSessionStore;
pub use memory::InMemorySessionStore;
pub use store::SessionStore;
