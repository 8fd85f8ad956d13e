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

//! Concurrent session directory
//!
//! The registry is the only shared mutable state in the server. It is handed
//! to every component as an `Arc` rather than living in a process-wide
//! global. Invariant: a session is present exactly while its connection
//! worker is running; only the worker's teardown path removes it.

use crate::session::Session;
use crate::types::SessionId;
use bytes::Bytes;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Thread-safe directory of connected sessions
pub struct SessionRegistry {
    /// Active sessions (lock-free concurrent map)
    sessions: DashMap<SessionId, Arc<Session>>,
    /// Next session ID (monotonically increasing, never reused)
    next_id: AtomicU64,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_session_id(&self) -> SessionId {
        SessionId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Allocate a session for a freshly accepted connection.
    ///
    /// Atomically assigns the next ID, constructs the session with its
    /// default username and inserts it.
    pub fn allocate(
        &self,
        peer_addr: SocketAddr,
        outbound: mpsc::Sender<Bytes>,
        cancel: CancellationToken,
    ) -> Arc<Session> {
        let id = self.next_session_id();
        let session = Arc::new(Session::new(id, peer_addr, outbound, cancel));
        self.sessions.insert(id, session.clone());
        session
    }

    /// Remove a session. Idempotent; removing an absent ID is a no-op.
    pub fn remove(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.remove(&id).map(|(_, session)| session)
    }

    /// Look up a session by ID
    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// Point-in-time view of all sessions.
    ///
    /// Callers iterate the returned vector instead of the map itself so no
    /// registry lock is held across I/O.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Current usernames, in snapshot iteration order
    pub fn usernames(&self) -> Vec<String> {
        self.sessions
            .iter()
            .map(|entry| entry.value().username())
            .collect()
    }

    /// Number of connected sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if no session is connected
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocate(registry: &SessionRegistry) -> Arc<Session> {
        let (tx, _rx) = mpsc::channel(4);
        registry.allocate("127.0.0.1:0".parse().unwrap(), tx, CancellationToken::new())
    }

    #[test]
    fn test_ids_strictly_increase() {
        let registry = SessionRegistry::new();
        let a = allocate(&registry);
        let b = allocate(&registry);
        let c = allocate(&registry);

        assert!(a.id() < b.id());
        assert!(b.id() < c.id());
        assert_eq!(a.id().as_u64(), 1);
    }

    #[test]
    fn test_ids_never_reused_after_remove() {
        let registry = SessionRegistry::new();
        let a = allocate(&registry);
        registry.remove(a.id());

        let b = allocate(&registry);
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = SessionRegistry::new();
        let a = allocate(&registry);

        assert!(registry.remove(a.id()).is_some());
        assert!(registry.remove(a.id()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lookup_and_snapshot() {
        let registry = SessionRegistry::new();
        let a = allocate(&registry);
        let b = allocate(&registry);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(a.id()).map(|s| s.id()), Some(a.id()));

        let mut ids: Vec<_> = registry.snapshot().iter().map(|s| s.id()).collect();
        ids.sort();
        assert_eq!(ids, vec![a.id(), b.id()]);
    }

    #[test]
    fn test_usernames_reflect_renames() {
        let registry = SessionRegistry::new();
        let a = allocate(&registry);
        allocate(&registry);

        a.set_username("Alice");
        let mut names = registry.usernames();
        names.sort();
        assert_eq!(names, vec!["Alice".to_string(), "Guest2".to_string()]);
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let registry = Arc::new(SessionRegistry::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                let mut ids = vec![];
                for _ in 0..100 {
                    ids.push(allocate(&registry).id().as_u64());
                }
                ids
            }));
        }

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        all.sort();
        let before = all.len();
        all.dedup();

        assert_eq!(before, 800);
        assert_eq!(all.len(), 800);
        assert_eq!(registry.len(), 800);
    }
}
