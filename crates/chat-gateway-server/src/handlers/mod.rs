pub mod cache;
pub mod chat;
pub mod health;
pub mod session;
