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

//! Crosstalk terminal client
//!
//! Connects to a crosstalk server, renders incoming packets to stdout and
//! turns stdin lines into chat or command packets. Lines starting with `/`
//! are commands; everything else is chat. The client answers server pings
//! with pongs automatically.

use clap::Parser;
use crosstalk_codec::{Inbound, Packet, PacketCodec, PacketKind};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "crosstalk-client", about = "Crosstalk chat client")]
struct Args {
    /// Server address to connect to
    #[arg(long, default_value = "127.0.0.1:7777")]
    addr: SocketAddr,

    /// Display name to claim after connecting
    #[arg(long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let stream = TcpStream::connect(args.addr).await?;
    stream.set_nodelay(true)?;
    println!("Connected to {}", args.addr);

    let framed = Framed::new(stream, PacketCodec::new());
    let (mut sink, mut packets) = framed.split();

    // All outbound packets funnel through one writer task so the stdin loop
    // and the auto-pong never contend for the sink.
    let (outbound, mut outbound_rx) = mpsc::channel::<Packet>(64);
    let writer = tokio::spawn(async move {
        while let Some(packet) = outbound_rx.recv().await {
            if let Err(err) = sink.send(packet).await {
                warn!(%err, "send failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    let pong_tx = outbound.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(frame) = packets.next().await {
            match frame {
                Ok(Inbound::Packet(packet)) => {
                    if packet.kind == PacketKind::Ping {
                        if pong_tx.send(Packet::pong()).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    if let Some(line) = render(&packet) {
                        println!("{line}");
                    }
                }
                Ok(Inbound::Malformed { reason }) => {
                    debug!(%reason, "ignoring malformed packet from server");
                }
                Err(err) => {
                    warn!(%err, "connection error");
                    break;
                }
            }
        }
        println!("Disconnected from server");
    });

    if let Some(name) = args.name {
        outbound.send(Packet::command("name", name)).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = &mut reader => break,
            line = lines.next_line() => match line? {
                Some(line) => {
                    let quitting = line.trim() == "/quit";
                    if let Some(packet) = parse_line(&line) {
                        if outbound.send(packet).await.is_err() {
                            break;
                        }
                    }
                    if quitting {
                        // The server closes the connection; wait for the
                        // reader to observe it.
                        let _ = reader.await;
                        break;
                    }
                }
                None => break,
            },
        }
    }

    drop(outbound);
    let _ = writer.await;
    Ok(())
}

/// Turn one stdin line into a packet. Blank lines produce nothing.
fn parse_line(line: &str) -> Option<Packet> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(rest) = line.strip_prefix('/') {
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };
        if name.is_empty() {
            return None;
        }
        return Some(Packet::command(name, args));
    }
    Some(Packet::chat(line))
}

/// Render a packet for the terminal. Returns `None` for kinds with no
/// user-facing representation.
fn render(packet: &Packet) -> Option<String> {
    let text = packet.text.as_deref().unwrap_or("");
    match packet.kind {
        PacketKind::Chat => {
            let from = packet.from.as_deref().unwrap_or("?");
            Some(format!("[{from}] {text}"))
        }
        PacketKind::System => Some(format!("* {text}")),
        _ => None,
    }
}
