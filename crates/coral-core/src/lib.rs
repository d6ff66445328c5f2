//! # Coral Core
//!
//! Core types, traits, and error definitions for Coral.
//! This crate provides the foundational abstractions used across all layers
//! of the application: the unified error type, result aliases, and the
//! collaborator interfaces (persistence, authentication) the caching and
//! session subsystem is written against.

pub mod error;
pub mod result;
pub mod traits;

pub use error::*;
pub use result::*;
pub use traits::*;

// Re-export shaku for dependency injection
pub use shaku::Interface;
