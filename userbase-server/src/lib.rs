//! HTTP front end for userbase

pub mod config;
pub mod handlers;
pub mod server;

pub use config::{LogFormat, ServerConfig};
pub use server::UserbaseServer;
