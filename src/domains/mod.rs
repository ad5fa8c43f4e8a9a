//! Domains module containing business logic organized by bounded contexts.
//!
//! - `tools`: the utility tools exposed to clients
//! - `resources`: read-only descriptions of the server and its tools

pub mod resources;
pub mod tools;
