//! # Coral Session
//!
//! Server-side session persistence: opaque random tokens handed to the
//! browser as cookies, mapping to JSON session data held in a shared cache
//! backend. The HTTP middleware driving the request-time lifecycle lives in
//! `coral-rest`; this crate owns the token, the mutable per-request session
//! handle, and the store.

mod session;
mod store;
mod token;

pub use session::{Session, SessionData};
pub use store::SessionStore;
pub use token::SessionToken;
