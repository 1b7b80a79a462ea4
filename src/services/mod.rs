pub mod cart_service;
pub mod recommendation_service;
pub mod bundle_service;
pub mod catalog_service;
pub mod auth_service;
pub mod seller_service;
pub mod chat_service;

pub use cart_service::*;
pub use recommendation_service::*;
pub use bundle_service::*;
pub use catalog_service::*;
pub use auth_service::*;
pub use seller_service::*;
pub use chat_service::*;
