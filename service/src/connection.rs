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

//! Connection worker
//!
//! One worker per accepted connection. The worker owns the read half of the
//! socket and drives the session lifecycle `Connected → Active → Closed`; a
//! companion writer task owns the write half and drains the session's
//! outbound queue. Whatever ends the read loop (clean disconnect, fatal
//! protocol error, or the connection handle being closed by the heartbeat
//! monitor or a `/quit`), the worker runs the one teardown path: remove from
//! the registry, close the handle, broadcast the departure.

use crate::broadcast::Broadcaster;
use crate::config::{MalformedPacketPolicy, ServerConfig};
use crate::dispatch::CommandDispatcher;
use crate::metrics::ServerMetrics;
use crate::registry::SessionRegistry;
use crate::session::Session;
use crate::types::{SessionId, SessionState};
use bytes::Bytes;
use crosstalk_codec::{Inbound, Packet, PacketCodec, PacketKind};
use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Allocate a session for an accepted socket and spawn its worker and writer
/// tasks. Returns the new session.
pub(crate) fn spawn_connection(
    socket: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    broadcaster: Arc<Broadcaster>,
    dispatcher: Arc<CommandDispatcher>,
    metrics: Arc<ServerMetrics>,
    config: &ServerConfig,
) -> Arc<Session> {
    let (read_half, write_half) = socket.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_buffer_size);
    let cancel = CancellationToken::new();

    let session = registry.allocate(peer_addr, outbound_tx, cancel.clone());
    metrics.connection_opened();

    tokio::spawn(write_loop(
        write_half,
        outbound_rx,
        cancel,
        session.id(),
    ));

    let worker = ConnectionWorker {
        session: session.clone(),
        registry,
        broadcaster,
        dispatcher,
        metrics,
        reader: FramedRead::new(read_half, PacketCodec::new()),
        malformed_policy: config.malformed_packet_policy,
    };
    tokio::spawn(worker.run());

    session
}

/// Drains the session's outbound queue into the socket write half.
///
/// A write failure cancels the session token so the read side observes the
/// closure and runs the normal teardown; the writer itself never touches the
/// registry.
async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Bytes>,
    cancel: CancellationToken,
    id: SessionId,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(err) = write_half.write_all(&frame).await {
                        debug!(session = %id, %err, "write failed, closing connection handle");
                        cancel.cancel();
                        break;
                    }
                }
                None => break,
            },
        }
    }
    let _ = write_half.shutdown().await;
}

/// Drives one connection's read loop and lifecycle
struct ConnectionWorker {
    session: Arc<Session>,
    registry: Arc<SessionRegistry>,
    broadcaster: Arc<Broadcaster>,
    dispatcher: Arc<CommandDispatcher>,
    metrics: Arc<ServerMetrics>,
    reader: FramedRead<OwnedReadHalf, PacketCodec>,
    malformed_policy: MalformedPacketPolicy,
}

impl ConnectionWorker {
    async fn run(mut self) {
        let started = Instant::now();

        self.session.send(&Packet::system(format!(
            "Welcome, {}! Type /help for commands.",
            self.session.username()
        )));
        self.session.set_state(SessionState::Active);
        info!(
            session = %self.session.id(),
            peer = %self.session.peer_addr(),
            "session active"
        );

        loop {
            tokio::select! {
                _ = self.session.closed() => {
                    debug!(session = %self.session.id(), "connection handle closed");
                    break;
                }
                frame = self.reader.next() => match frame {
                    Some(Ok(Inbound::Packet(packet))) => {
                        self.session.touch();
                        self.metrics.packet_received();
                        self.handle_packet(packet);
                    }
                    Some(Ok(Inbound::Malformed { reason })) => {
                        self.metrics.protocol_error();
                        match self.malformed_policy {
                            MalformedPacketPolicy::Drop => {
                                debug!(
                                    session = %self.session.id(),
                                    %reason,
                                    "dropping malformed packet"
                                );
                            }
                            MalformedPacketPolicy::Disconnect => {
                                warn!(
                                    session = %self.session.id(),
                                    %reason,
                                    "closing session on malformed packet"
                                );
                                break;
                            }
                        }
                    }
                    Some(Err(err)) => {
                        self.metrics.protocol_error();
                        warn!(session = %self.session.id(), %err, "protocol error, closing session");
                        break;
                    }
                    None => {
                        debug!(session = %self.session.id(), "peer disconnected");
                        break;
                    }
                },
            }
        }

        self.teardown(started);
    }

    fn handle_packet(&self, packet: Packet) {
        match packet.kind {
            PacketKind::Chat => {
                let text = packet.text.as_deref().unwrap_or("").trim();
                if text.is_empty() {
                    return;
                }
                // Sender identity is server-authoritative; any client-supplied
                // `from` is discarded here.
                self.broadcaster
                    .broadcast(&Packet::chat_from(self.session.username(), text));
            }
            PacketKind::Command => {
                let name = packet.name.as_deref().unwrap_or("");
                let args = packet.args.as_deref().unwrap_or("");
                self.dispatcher.dispatch(&self.session, name, args);
            }
            PacketKind::Pong => {
                // Liveness credit was already applied by the touch above.
            }
            PacketKind::Ping => {
                self.session.send(&Packet::pong());
            }
            PacketKind::System | PacketKind::Unknown => {
                self.session.send(&Packet::system(format!(
                    "Unknown packet type: {}",
                    packet.kind
                )));
            }
        }
    }

    /// The single teardown path for a session, run exactly once per worker.
    fn teardown(&self, started: Instant) {
        self.session.set_state(SessionState::Closed);
        let username = self.session.username();

        self.registry.remove(self.session.id());
        // Stops the writer task and shuts the socket down; tolerated if the
        // handle was already closed.
        self.session.close();
        self.metrics.connection_closed(started.elapsed());

        info!(session = %self.session.id(), %username, "session closed");
        self.broadcaster
            .broadcast(&Packet::system(format!("{username} left the chat")));
    }
}

impl std::fmt::Debug for ConnectionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionWorker")
            .field("session", &self.session.id())
            .field("state", &self.session.state())
            .finish()
    }
}
