//! docmill_base provides the foundational error handling and types used
//! across all docmill crates. This ensures consistency in error handling and
//! prevents circular dependencies between crates.

pub mod error;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{DocmillError, DocmillResult, ErrorKind, ResultExt};
