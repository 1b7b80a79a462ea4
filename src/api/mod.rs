pub mod connection;
pub mod repositories;

pub use connection::{ApiClient, ApiError};
