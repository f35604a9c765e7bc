//! Cross-cutting request middleware: request ids, sessions, rate limits.

pub mod rate_limit;
pub mod request_id;
pub mod session;
