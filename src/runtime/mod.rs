//! Host runtime: configuration, deployment metadata, and the HTTP server.

mod assignment;
mod config;
mod server;

pub use assignment::{AssignmentContext, ZIP_URL_SETTING};
pub use config::HostConfig;
pub use server::HostServer;
