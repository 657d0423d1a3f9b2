//! Request handler module
//!
//! Routes requests to dispatch services and turns what they wrote into a hyper
//! response.

pub mod router;

// Re-export main entry point
pub use router::{handle_request, Router};
