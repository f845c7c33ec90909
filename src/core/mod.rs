// Public modules
pub mod cache;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod github;
pub mod repo;
pub mod source;
pub mod ssh;
pub mod validate;

// Internal modules - not part of public API
pub(crate) mod bundle;
pub(crate) mod paths;

// Public modules for CLI access
pub mod defaults;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
