pub mod validation;
pub mod formatting;
pub mod config;

// Re-exports
pub use validation::*;
pub use config::*;