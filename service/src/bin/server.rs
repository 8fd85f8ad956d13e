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

//! Crosstalk server binary

use clap::Parser;
use crosstalk_service::{ChatServer, MalformedPacketPolicy, Result, ServerConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "crosstalk-server", about = "Crosstalk chat broadcast server")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:7777")]
    bind: SocketAddr,

    /// Seconds between liveness probes
    #[arg(long, default_value_t = 10)]
    ping_interval: u64,

    /// Seconds of silence before a session is evicted
    #[arg(long, default_value_t = 30)]
    idle_timeout: u64,

    /// Maximum number of concurrent sessions
    #[arg(long, default_value_t = 1024)]
    max_sessions: usize,

    /// Close a connection on a malformed packet instead of dropping the packet
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let policy = if args.strict {
        MalformedPacketPolicy::Disconnect
    } else {
        MalformedPacketPolicy::Drop
    };
    let config = ServerConfig::new(args.bind)
        .with_ping_interval(Duration::from_secs(args.ping_interval))
        .with_idle_timeout(Duration::from_secs(args.idle_timeout))
        .with_max_sessions(args.max_sessions)
        .with_malformed_packet_policy(policy);

    let server = ChatServer::new(config).await?;
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    server.shutdown().await?;

    Ok(())
}
