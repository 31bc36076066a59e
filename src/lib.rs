//! Rusty Relay - A store-and-forward private messaging server
//!
//! This library provides the core functionality for routing private text
//! messages between named clients over persistent TCP connections, with
//! presence tracking and durable delivery to offline recipients.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod storage;

// Re-export main components
pub use config::*;
pub use constants::*;
