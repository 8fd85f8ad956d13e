//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Chat server
//!
//! The ChatServer is the main entry point: it owns the TCP listener, the
//! session registry and the supervised background tasks (accept loop and
//! heartbeat monitor).

use crate::connection::spawn_connection;
use crate::{
    Broadcaster, CommandDispatcher, HeartbeatMonitor, Result, ServerConfig, ServerError,
    ServerMetrics, ServerSnapshot, SessionRegistry,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Chat broadcast server
///
/// # Example
///
/// ```no_run
/// use crosstalk_service::{ChatServer, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = ChatServer::new(ServerConfig::default()).await?;
///     server.start().await?;
///
///     tokio::signal::ctrl_c().await?;
///     server.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct ChatServer {
    /// Server configuration
    config: ServerConfig,
    /// Session registry shared by all components
    registry: Arc<SessionRegistry>,
    /// Broadcast engine
    broadcaster: Arc<Broadcaster>,
    /// Command dispatcher
    dispatcher: Arc<CommandDispatcher>,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// TCP listener (shared with the accept loop task)
    listener: Arc<tokio::sync::Mutex<TcpListener>>,
    /// Actual bind address
    bind_address: SocketAddr,
    /// Server start time
    started_at: Instant,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Shutdown notification for accept loop and heartbeat monitor
    shutdown_notify: Arc<Notify>,
    /// Accept loop task handle
    accept_handle: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
    /// Heartbeat monitor task handle
    heartbeat_handle: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl ChatServer {
    /// Create a new server with the given configuration
    ///
    /// This validates the configuration and binds the listening address but
    /// does not start accepting connections. Call `start()` for that.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind_address).await?;
        let actual_addr = listener.local_addr()?;

        let registry = Arc::new(SessionRegistry::new());
        let metrics = Arc::new(ServerMetrics::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone(), metrics.clone()));
        let dispatcher = Arc::new(CommandDispatcher::new(
            registry.clone(),
            broadcaster.clone(),
        ));

        tracing::info!("chat server bound to {}", actual_addr);

        Ok(Self {
            config,
            registry,
            broadcaster,
            dispatcher,
            metrics,
            listener: Arc::new(tokio::sync::Mutex::new(listener)),
            bind_address: actual_addr,
            started_at: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            accept_handle: Arc::new(tokio::sync::Mutex::new(None)),
            heartbeat_handle: Arc::new(tokio::sync::Mutex::new(None)),
        })
    }

    /// Start accepting connections and probing liveness
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyRunning);
        }

        tracing::info!("starting chat server on {}", self.bind_address);

        let accept = self.spawn_accept_loop();
        *self.accept_handle.lock().await = Some(accept);

        let heartbeat = HeartbeatMonitor::new(
            self.registry.clone(),
            self.broadcaster.clone(),
            self.metrics.clone(),
            &self.config,
            self.shutdown_notify.clone(),
        )
        .spawn();
        *self.heartbeat_handle.lock().await = Some(heartbeat);

        Ok(())
    }

    /// Spawn the accept loop task
    fn spawn_accept_loop(&self) -> JoinHandle<()> {
        let listener = self.listener.clone();
        let registry = self.registry.clone();
        let broadcaster = self.broadcaster.clone();
        let dispatcher = self.dispatcher.clone();
        let metrics = self.metrics.clone();
        let config = self.config.clone();
        let running = self.running.clone();
        let shutdown_notify = self.shutdown_notify.clone();

        tokio::spawn(async move {
            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let accept_result = tokio::select! {
                    result = async { listener.lock().await.accept().await } => result,
                    _ = shutdown_notify.notified() => break,
                };

                match accept_result {
                    Ok((socket, peer_addr)) => {
                        tracing::debug!("accepted connection from {}", peer_addr);

                        // Low latency matters more than throughput for chat.
                        if let Err(err) = socket.set_nodelay(true) {
                            tracing::warn!(%peer_addr, %err, "failed to disable nagle");
                        }

                        if registry.len() >= config.max_sessions {
                            tracing::warn!(
                                "session limit reached ({}), rejecting connection from {}",
                                config.max_sessions,
                                peer_addr
                            );
                            metrics.connection_error();
                            drop(socket);
                            continue;
                        }

                        let session = spawn_connection(
                            socket,
                            peer_addr,
                            registry.clone(),
                            broadcaster.clone(),
                            dispatcher.clone(),
                            metrics.clone(),
                            &config,
                        );
                        tracing::info!(
                            "session {} established from {}",
                            session.id(),
                            peer_addr
                        );
                    }
                    Err(err) => {
                        tracing::error!("failed to accept connection: {}", err);
                        metrics.connection_error();

                        // Back off on errors to avoid a tight loop
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                }
            }

            tracing::info!("accept loop terminated");
        })
    }

    /// Shutdown the server
    ///
    /// Stops accepting connections, stops the heartbeat monitor and closes
    /// every session's connection handle; each worker then runs its normal
    /// teardown.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ServerError::ServerNotRunning);
        }

        tracing::info!("shutting down chat server");

        self.shutdown_notify.notify_waiters();

        if let Some(handle) = self.accept_handle.lock().await.take() {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
        }
        if let Some(handle) = self.heartbeat_handle.lock().await.take() {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
        }

        for session in self.registry.snapshot() {
            session.close();
        }
        // Give workers time to run their teardown paths
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        tracing::info!("chat server shutdown complete");

        Ok(())
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the server's actual bind address
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Get the number of connected sessions
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            active_sessions: self.registry.len(),
            total_connections: self.metrics.total_connections(),
            bind_address: self.bind_address,
            uptime: self.started_at.elapsed(),
            started_at: self.started_at,
        }
    }

    /// Get the session registry
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    /// Get the broadcast engine
    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        self.broadcaster.clone()
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl std::fmt::Debug for ChatServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatServer")
            .field("bind_address", &self.bind_address)
            .field("running", &self.is_running())
            .field("session_count", &self.session_count())
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

// Implement Drop to ensure cleanup
impl Drop for ChatServer {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            tracing::warn!("ChatServer dropped while still running");
            self.running.store(false, Ordering::SeqCst);
            self.shutdown_notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig::new("127.0.0.1:0".parse().unwrap())
    }

    #[tokio::test]
    async fn test_server_lifecycle() {
        let server = ChatServer::new(test_config()).await.unwrap();
        assert!(!server.is_running());

        server.start().await.unwrap();
        assert!(server.is_running());

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        server.shutdown().await.unwrap();
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_server_double_start() {
        let server = ChatServer::new(test_config()).await.unwrap();
        server.start().await.unwrap();

        assert!(matches!(
            server.start().await,
            Err(ServerError::AlreadyRunning)
        ));

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_when_not_running() {
        let server = ChatServer::new(test_config()).await.unwrap();
        assert!(matches!(
            server.shutdown().await,
            Err(ServerError::ServerNotRunning)
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = test_config().with_idle_timeout(std::time::Duration::from_secs(1));
        assert!(matches!(
            ChatServer::new(config).await,
            Err(ServerError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_server_snapshot() {
        let server = ChatServer::new(test_config()).await.unwrap();
        let snapshot = server.snapshot();

        assert_eq!(snapshot.active_sessions, 0);
        assert_eq!(snapshot.total_connections, 0);
    }
}
