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

//! Broadcast fan-out
//!
//! Encodes a packet once, then queues the resulting frame on every session in
//! a registry snapshot. A failure to reach one recipient is discarded: it
//! never aborts delivery to the rest and never removes the session. Removal
//! is exclusively the read loop's job, so a send-side and a receive-side
//! teardown cannot race over the same session.

use crate::metrics::ServerMetrics;
use crate::registry::SessionRegistry;
use crosstalk_codec::{Packet, encode_frame};
use std::sync::Arc;
use tracing::{debug, error};

/// Result of a broadcast operation
#[derive(Debug, Clone, Copy, Default)]
pub struct BroadcastResult {
    /// Total number of sessions attempted
    pub total: usize,
    /// Number of frames queued for delivery
    pub delivered: usize,
    /// Number of recipients whose frame was discarded
    pub failed: usize,
}

impl BroadcastResult {
    /// Check if every recipient accepted the frame
    pub fn all_delivered(&self) -> bool {
        self.failed == 0
    }
}

/// Fans packets out to every connected session
pub struct Broadcaster {
    registry: Arc<SessionRegistry>,
    metrics: Arc<ServerMetrics>,
}

impl Broadcaster {
    /// Create a broadcaster over the given registry
    pub fn new(registry: Arc<SessionRegistry>, metrics: Arc<ServerMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Broadcast a packet to every session currently in the registry.
    ///
    /// Fire-and-forget: delivery is not confirmed and the returned statistics
    /// are informational. The packet is encoded exactly once; recipients
    /// share the frame bytes.
    pub fn broadcast(&self, packet: &Packet) -> BroadcastResult {
        let frame = match encode_frame(packet) {
            Ok(frame) => frame,
            Err(err) => {
                error!(%err, "failed to encode broadcast packet");
                return BroadcastResult::default();
            }
        };

        let mut result = BroadcastResult::default();
        self.metrics.packet_broadcast();

        for session in self.registry.snapshot() {
            result.total += 1;
            if session.send_frame(frame.clone()) {
                result.delivered += 1;
            } else {
                result.failed += 1;
                self.metrics.delivery_failed();
                debug!(session = %session.id(), "broadcast recipient unreachable, skipping");
            }
        }

        result
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("sessions", &self.registry.len())
            .finish()
    }
}
