//! Connection supervisor
//!
//! Binds the listening socket, enforces the concurrent-connection bound,
//! and spawns one handler task per accepted connection. A failure inside
//! one connection's task never affects another's.

use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::core::dispatcher::RequestDispatcher;
use crate::core::session::create_session_registry;
use crate::error::{Result, RustyRelayError};
use crate::handlers::client::handle_client;
use crate::storage::Storage;

/// Accepts inbound connections and supervises their handler tasks
pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<RequestDispatcher>,
    config: ServerConfig,
    limiter: Arc<Semaphore>,
}

impl Server {
    /// Bind the listening socket and wire up the shared state
    pub async fn bind(config: ServerConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RustyRelayError::ConnectionError(format!("bind {}: {}", addr, e)))?;

        let sessions = create_session_registry();
        let dispatcher = Arc::new(RequestDispatcher::new(storage, sessions));
        let limiter = Arc::new(Semaphore::new(config.max_connections));

        Ok(Self {
            listener,
            dispatcher,
            config,
            limiter,
        })
    }

    /// The bound address, useful when the configured port was 0
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| RustyRelayError::ConnectionError(e.to_string()))
    }

    /// Run the accept loop until the process ends
    pub async fn run(self) -> Result<()> {
        info!(
            "Listening on {} (max {} connections)",
            self.local_addr()?,
            self.config.max_connections
        );

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            // Admission control: refuse connections past the bound instead
            // of queueing unbounded tasks
            let permit = match self.limiter.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Connection limit reached, refusing {}", peer);
                    drop(stream);
                    continue;
                }
            };

            let dispatcher = Arc::clone(&self.dispatcher);
            let buffer_size = self.config.buffer_size;
            let read_timeout = self.config.read_timeout;

            tokio::spawn(async move {
                handle_client(stream, peer, dispatcher, buffer_size, read_timeout).await;
                drop(permit);
            });
        }
    }
}
