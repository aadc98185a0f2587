//! Test-only adapters that live inside the domain crate for convenience.
//!
//! These are intended purely for unit testing and local demos. The real
//! record store (SQLite) lives in a separate crate.

pub mod memory_repo;
