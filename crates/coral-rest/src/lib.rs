//! # Coral REST
//!
//! HTTP layer using Axum: the session middleware and its supporting
//! request middleware stack, the session extractor, health endpoints,
//! and router assembly.

pub mod controllers;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod responses;
pub mod router;
pub mod state;

pub use router::*;
pub use state::*;
