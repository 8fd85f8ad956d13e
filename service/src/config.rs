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

//! Server configuration
//!
//! # Example
//!
//! ```
//! use crosstalk_service::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::default()
//!     .with_ping_interval(Duration::from_secs(10))
//!     .with_idle_timeout(Duration::from_secs(30));
//! ```

use crate::{Result, ServerError};
use std::net::SocketAddr;
use std::time::Duration;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 7777;

/// Policy for a well-framed payload that fails to parse as a packet.
///
/// The protocol leaves this to the implementation; both behaviors are
/// supported and the default is to keep the connection open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPacketPolicy {
    /// Drop the frame, log it, keep reading.
    #[default]
    Drop,
    /// Treat it as fatal and close the connection.
    Disconnect,
}

/// Chat server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_address: SocketAddr,

    /// How often the heartbeat monitor broadcasts a ping
    pub ping_interval: Duration,

    /// How long a session may go without a parsed inbound packet before the
    /// heartbeat monitor closes it. Must exceed `ping_interval`.
    pub idle_timeout: Duration,

    /// Maximum number of concurrent sessions; connections above the limit
    /// are dropped at accept time
    pub max_sessions: usize,

    /// Per-session outbound frame queue depth; broadcast delivery to a
    /// session whose queue is full is discarded
    pub outbound_buffer_size: usize,

    /// What to do with a payload that does not parse as a packet
    pub malformed_packet_policy: MalformedPacketPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            ping_interval: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30),
            max_sessions: 1024,
            outbound_buffer_size: 64,
            malformed_packet_policy: MalformedPacketPolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Create a configuration listening on the given address
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Set the heartbeat ping interval
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set the liveness timeout
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum number of concurrent sessions
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the per-session outbound queue depth
    pub fn with_outbound_buffer_size(mut self, size: usize) -> Self {
        self.outbound_buffer_size = size;
        self
    }

    /// Set the malformed packet policy
    pub fn with_malformed_packet_policy(mut self, policy: MalformedPacketPolicy) -> Self {
        self.malformed_packet_policy = policy;
        self
    }

    /// Validate the configuration.
    ///
    /// The liveness timeout must exceed the ping interval, otherwise a
    /// session could be evicted before it had a chance to answer a single
    /// probe.
    pub fn validate(&self) -> Result<()> {
        if self.idle_timeout <= self.ping_interval {
            return Err(ServerError::InvalidConfig(format!(
                "idle_timeout ({:?}) must exceed ping_interval ({:?})",
                self.idle_timeout, self.ping_interval
            )));
        }
        if self.outbound_buffer_size == 0 {
            return Err(ServerError::InvalidConfig(
                "outbound_buffer_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address.port(), DEFAULT_PORT);
        assert_eq!(config.ping_interval, Duration::from_secs(10));
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert_eq!(
            config.malformed_packet_policy,
            MalformedPacketPolicy::Drop
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_timeout_must_exceed_interval() {
        let config = ServerConfig::default()
            .with_ping_interval(Duration::from_secs(30))
            .with_idle_timeout(Duration::from_secs(30));
        assert!(config.validate().is_err());

        let config = ServerConfig::default()
            .with_ping_interval(Duration::from_secs(10))
            .with_idle_timeout(Duration::from_secs(11));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let config = ServerConfig::default().with_outbound_buffer_size(0);
        assert!(config.validate().is_err());
    }
}
