//! Request handlers for client connections

pub mod client;

// Re-export the connection handler
pub use client::handle_client;
