pub mod app;
pub mod config;
pub mod message;
pub mod session;
pub mod stream;
