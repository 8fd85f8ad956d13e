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

//! Crosstalk chat server
//!
//! An async TCP broadcast chat server: clients hold a persistent connection,
//! exchange length-prefixed JSON packets, and the server fans chat and system
//! events out to every connected participant while tracking per-session
//! identity and liveness.
//!
//! # Architecture
//!
//! ```text
//! ChatServer (accept loop)          HeartbeatMonitor (probe + evict)
//!     ↓                                  ↓
//! ConnectionWorker ──────→ SessionRegistry ←────── Broadcaster
//!     ↓                                                ↑
//! CommandDispatcher ───────────────────────────────────┘
//! ```
//!
//! One worker task per connection plus one heartbeat task, all sharing the
//! [`SessionRegistry`]. Inbound packets flow framing → worker → dispatcher or
//! broadcaster; outbound frames flow through each session's writer task.
//! Closing a session's connection handle is the only cancellation primitive:
//! it unblocks that worker's read, which runs the single teardown path.
//!
//! # Example
//!
//! ```no_run
//! use crosstalk_service::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = ChatServer::new(ServerConfig::default()).await?;
//!     server.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod broadcast;
mod config;
mod connection;
mod dispatch;
mod error;
mod heartbeat;
mod metrics;
mod registry;
mod server;
mod session;
mod types;

pub use broadcast::{BroadcastResult, Broadcaster};
pub use config::{DEFAULT_PORT, MalformedPacketPolicy, ServerConfig};
pub use dispatch::CommandDispatcher;
pub use error::{Result, ServerError};
pub use heartbeat::HeartbeatMonitor;
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use registry::SessionRegistry;
pub use server::ChatServer;
pub use session::Session;
pub use types::{ServerSnapshot, SessionId, SessionState};
