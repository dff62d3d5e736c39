//! Socket.IO client core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by the client crate:
//! - Client configuration (timeouts, retry policies, logging settings)
//! - Global error types covering all error categories
//! - Structured logging with tracing
//! - Common constants

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;

// Re-export commonly used items at the crate root
pub use config::ClientConfig;
pub use error::{SioError, SioResult};
pub use logging::init_logging;
