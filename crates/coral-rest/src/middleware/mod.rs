//! Request middleware.

pub mod content_length;
pub mod logging;
pub mod request_id;
pub mod session;

pub use content_length::{content_length_middleware, ContentLengthState};
pub use logging::logging_middleware;
pub use request_id::{request_id_middleware, RequestId};
pub use session::{session_middleware, SessionLayerState};
