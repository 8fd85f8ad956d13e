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

//! One connected participant
//!
//! A [`Session`] is the registry's view of a connection: identity, liveness
//! bookkeeping, an outbound frame queue draining into the socket writer, and
//! the cancellation token that acts as the connection handle. Cancelling the
//! token is the sole teardown signal; it unblocks the owning connection
//! worker's read, which then runs the single removal path.

use crate::types::{SessionId, SessionState};
use bytes::Bytes;
use crosstalk_codec::{Packet, encode_frame};
use std::net::SocketAddr;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// One connected participant
pub struct Session {
    /// Session ID, assigned once and never reused
    id: SessionId,
    /// Peer address
    peer_addr: SocketAddr,
    /// Display name, defaults to `Guest{id}`
    username: RwLock<String>,
    /// When the connection was accepted
    connected_at: Instant,
    /// Last successfully parsed inbound packet
    last_seen: RwLock<Instant>,
    /// Lifecycle state
    state: AtomicU8,
    /// Outbound frame queue, drained by the connection's writer task
    outbound: mpsc::Sender<Bytes>,
    /// Connection handle; cancelling is the sole teardown signal
    cancel: CancellationToken,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        peer_addr: SocketAddr,
        outbound: mpsc::Sender<Bytes>,
        cancel: CancellationToken,
    ) -> Self {
        let now = Instant::now();
        Self {
            id,
            peer_addr,
            username: RwLock::new(format!("Guest{}", id.as_u64())),
            connected_at: now,
            last_seen: RwLock::new(now),
            state: AtomicU8::new(SessionState::Connected.as_u8()),
            outbound,
            cancel,
        }
    }

    /// Get the session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get the current display name
    pub fn username(&self) -> String {
        self.username
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the display name, returning the previous one
    pub fn set_username(&self, username: &str) -> String {
        let mut guard = self
            .username
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut guard, username.to_string())
    }

    /// When the connection was accepted
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Record inbound traffic for liveness accounting
    pub fn touch(&self) {
        let mut guard = self
            .last_seen
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Instant::now();
    }

    /// How long since the last successfully parsed inbound packet
    pub fn idle_for(&self) -> Duration {
        self.last_seen
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .elapsed()
    }

    /// Get the current lifecycle state
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Queue a single packet for this session only.
    ///
    /// Best effort: a full or closed outbound queue drops the packet. The
    /// session itself is never torn down from the send side.
    pub fn send(&self, packet: &Packet) -> bool {
        match encode_frame(packet) {
            Ok(frame) => self.send_frame(frame),
            Err(err) => {
                error!(session = %self.id, %err, "failed to encode packet");
                false
            }
        }
    }

    /// Queue an already-encoded frame.
    pub(crate) fn send_frame(&self, frame: Bytes) -> bool {
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(err) => {
                debug!(session = %self.id, %err, "outbound queue rejected frame");
                false
            }
        }
    }

    /// Close the connection handle. Idempotent; the owning connection worker
    /// observes the cancellation and runs teardown.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Check if the connection handle has been closed
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until the connection handle is closed
    pub(crate) async fn closed(&self) {
        self.cancel.cancelled().await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("username", &self.username())
            .field("peer_addr", &self.peer_addr)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstalk_codec::{Inbound, PacketCodec};
    use tokio_util::codec::Decoder;

    fn test_session(id: u64, buffer: usize) -> (Session, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(buffer);
        let session = Session::new(
            SessionId::new(id),
            "127.0.0.1:0".parse().unwrap(),
            tx,
            CancellationToken::new(),
        );
        (session, rx)
    }

    fn decode(frame: Bytes) -> Packet {
        let mut buffer = bytes::BytesMut::from(&frame[..]);
        match PacketCodec::new().decode(&mut buffer).unwrap() {
            Some(Inbound::Packet(packet)) => packet,
            other => panic!("expected packet, got {:?}", other),
        }
    }

    #[test]
    fn test_default_username() {
        let (session, _rx) = test_session(7, 4);
        assert_eq!(session.username(), "Guest7");
    }

    #[test]
    fn test_set_username_returns_previous() {
        let (session, _rx) = test_session(1, 4);
        let old = session.set_username("Alice");
        assert_eq!(old, "Guest1");
        assert_eq!(session.username(), "Alice");
    }

    #[test]
    fn test_send_encodes_packet() {
        let (session, mut rx) = test_session(1, 4);
        assert!(session.send(&Packet::system("hello")));
        let packet = decode(rx.try_recv().unwrap());
        assert_eq!(packet, Packet::system("hello"));
    }

    #[test]
    fn test_send_to_full_queue_is_discarded() {
        let (session, _rx) = test_session(1, 1);
        assert!(session.send(&Packet::ping()));
        assert!(!session.send(&Packet::ping()));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (session, _rx) = test_session(1, 4);
        assert!(!session.is_closed());
        session.close();
        session.close();
        assert!(session.is_closed());
    }

    #[test]
    fn test_touch_resets_idle() {
        let (session, _rx) = test_session(1, 4);
        std::thread::sleep(Duration::from_millis(20));
        assert!(session.idle_for() >= Duration::from_millis(20));
        session.touch();
        assert!(session.idle_for() < Duration::from_millis(20));
    }
}
