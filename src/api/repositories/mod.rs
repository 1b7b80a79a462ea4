pub mod catalog_repository;
pub mod account_repository;
pub mod inventory_repository;
pub mod assistant_repository;

pub use catalog_repository::*;
pub use account_repository::*;
pub use inventory_repository::*;
pub use assistant_repository::*;
