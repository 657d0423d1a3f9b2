//! HTTP protocol layer module
//!
//! Provides the response writer abstraction, its tracking decorator and helpers
//! that write complete responses, decoupled from dispatch logic.

pub mod body;
pub mod response;
pub mod stats;
pub mod writer;

// Re-export commonly used types
pub use body::{BoxError, RequestBody};
pub use response::{error, not_found, payload_too_large, redirect, text};
pub use stats::ResponseStats;
pub use writer::{BufferedResponse, ResponseWriter};
