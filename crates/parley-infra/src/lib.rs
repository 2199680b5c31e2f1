//! Infrastructure adapters for Parley.
//!
//! SQLite session storage (sqlx), the HTTP NLU client (reqwest), and the
//! TOML configuration loader. Implements the ports defined in `parley-core`.

pub mod config;
pub mod nlu;
pub mod sqlite;
