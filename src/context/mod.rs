//! Per-request state: the HTTP request/response pair, sessions with flash
//! attributes, and the [`Context`] facade with its thread-local stack.
mod request;
mod request_context;
mod response;
mod session;

pub use request::*;
pub use request_context::*;
pub use response::*;
pub use session::*;
