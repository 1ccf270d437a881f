//! CLI command implementations.

pub mod check;
pub mod completions;
pub mod query;
pub mod serve;

// Re-export command handlers
pub use check::check;
pub use completions::completions;
pub use query::query;
pub use serve::serve;
