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

//! Liveness monitor
//!
//! A single long-lived task, independent of any connection: every ping
//! interval it broadcasts a probe, then closes the connection handle of any
//! session that has been silent past the timeout. It never touches the
//! registry directly. Closing the handle unblocks the owning worker's read,
//! which runs the one and only teardown path, so an evicted session gets
//! exactly one "left" broadcast.

use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::metrics::ServerMetrics;
use crate::registry::SessionRegistry;
use crosstalk_codec::Packet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Periodic liveness probe and eviction loop
pub struct HeartbeatMonitor {
    registry: Arc<SessionRegistry>,
    broadcaster: Arc<Broadcaster>,
    metrics: Arc<ServerMetrics>,
    ping_interval: Duration,
    idle_timeout: Duration,
    shutdown: Arc<Notify>,
}

impl HeartbeatMonitor {
    /// Create a monitor over the given registry
    pub fn new(
        registry: Arc<SessionRegistry>,
        broadcaster: Arc<Broadcaster>,
        metrics: Arc<ServerMetrics>,
        config: &ServerConfig,
        shutdown: Arc<Notify>,
    ) -> Self {
        Self {
            registry,
            broadcaster,
            metrics,
            ping_interval: config.ping_interval,
            idle_timeout: config.idle_timeout,
            shutdown,
        }
    }

    /// Spawn the monitor loop as a supervised task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; consume it so probes start
        // one full interval after startup.
        ticker.tick().await;

        info!(
            interval = ?self.ping_interval,
            timeout = ?self.idle_timeout,
            "heartbeat monitor started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep(),
                _ = self.shutdown.notified() => break,
            }
        }

        info!("heartbeat monitor terminated");
    }

    /// Probe all sessions, then evict the ones past the timeout.
    fn sweep(&self) {
        let result = self.broadcaster.broadcast(&Packet::ping());
        debug!(
            total = result.total,
            delivered = result.delivered,
            "liveness probe sent"
        );

        for session in self.registry.snapshot() {
            let idle = session.idle_for();
            if idle > self.idle_timeout {
                info!(
                    session = %session.id(),
                    username = %session.username(),
                    ?idle,
                    "evicting unresponsive session"
                );
                self.metrics.session_evicted();
                session.close();
            }
        }
    }
}
