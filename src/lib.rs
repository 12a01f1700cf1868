pub mod client;
pub mod domain;
pub mod handlers;
pub mod server;
pub mod state;
pub mod tick;
pub mod utils;
