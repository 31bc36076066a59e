//! Core functionality for the relay server

pub mod codec;
pub mod connection;
pub mod dispatcher;
pub mod message;
pub mod server;
pub mod session;

// Re-export main components for convenience
pub use codec::LineCodec;
pub use connection::Connection;
pub use dispatcher::{ClientSession, Flow, RequestDispatcher, SessionState};
pub use message::{ClientRequest, ServerMessage, Status};
pub use server::Server;
pub use session::{
    broadcast_presence, create_session_registry, lock_sessions, SessionRegistry, Sessions,
};
