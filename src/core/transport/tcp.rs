//! TCP transport.
//!
//! Each accepted connection gets its own MCP session with line-delimited
//! JSON-RPC; the server handler is cloned per connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rmcp::ServiceExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::{TransportError, TransportResult, config::TcpConfig};
use crate::core::McpServer;

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

pub struct TcpTransport {
    config: TcpConfig,
    active: Arc<AtomicUsize>,
}

impl TcpTransport {
    pub fn new(config: TcpConfig) -> Self {
        Self {
            config,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Number of sessions currently being served.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Accept connections forever.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        info!("{} listening on tcp://{}", server.name(), addr);

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Accept failed: {}", e);
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };

            if let Err(e) = stream.set_nodelay(true) {
                debug!("Could not set TCP_NODELAY for {}: {}", peer, e);
            }

            let active = self.active.clone();
            let sessions = active.fetch_add(1, Ordering::Relaxed) + 1;
            info!("Session opened for {} ({} active)", peer, sessions);

            let server = server.clone();
            tokio::spawn(async move {
                Self::serve_session(server, stream, peer).await;
                let remaining = active.fetch_sub(1, Ordering::Relaxed) - 1;
                info!("Session closed for {} ({} active)", peer, remaining);
            });
        }
    }

    async fn serve_session(server: McpServer, stream: TcpStream, peer: SocketAddr) {
        let service = match server.serve(stream).await {
            Ok(service) => service,
            Err(e) => {
                warn!("Handshake with {} failed: {}", peer, e);
                return;
            }
        };

        if let Err(e) = service.waiting().await {
            warn!("Session with {} ended with error: {:?}", peer, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_and_initial_count() {
        let transport = TcpTransport::new(TcpConfig {
            port: 4100,
            host: "0.0.0.0".into(),
        });
        assert_eq!(transport.address(), "0.0.0.0:4100");
        assert_eq!(transport.active_sessions(), 0);
    }
}
