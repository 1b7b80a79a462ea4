pub mod product;
pub mod cart;
pub mod user;
pub mod chat;
