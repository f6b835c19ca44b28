//! Learning Path API Library Crate
//!
//! HTTP surface of the learning path tutor: configuration, the PostgreSQL
//! document store, handlers and routing. The binaries in `bin/` are thin
//! wrappers around this library.

pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
