pub mod background;
pub mod bot;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod gateway;
pub mod handlers;
pub mod server;
pub mod session;
pub mod store;
pub mod transport;
