//! # Coral Server
//!
//! Server assembly: dependency injection modules for the cache backends
//! and startup helpers. The binary entry point lives in `main.rs`.

pub mod di;
pub mod startup;
