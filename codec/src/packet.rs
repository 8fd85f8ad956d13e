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

//! The typed packet model shared by server and client.

use serde::{Deserialize, Serialize};

/// Display name the server signs its own packets with.
pub const SERVER_NAME: &str = "SERVER";

/// Discriminator for the closed set of packet kinds.
///
/// Encoded as the lowercase `type` field of the JSON payload. A `type` string
/// outside the known set decodes to [`PacketKind::Unknown`] rather than
/// failing the whole payload, so the server can answer with an informational
/// reply instead of dropping the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketKind {
    /// Client to server free-form text; rebroadcast by the server with an
    /// authoritative sender.
    Chat,
    /// Server to client informational/status text.
    System,
    /// Client to server slash command, carries `name` and `args`.
    Command,
    /// Liveness probe.
    Ping,
    /// Liveness probe response.
    Pong,
    /// Any `type` value this build does not recognize.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for PacketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::System => write!(f, "system"),
            Self::Command => write!(f, "command"),
            Self::Ping => write!(f, "ping"),
            Self::Pong => write!(f, "pong"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The sole unit of communication between server and client.
///
/// Packets are immutable once constructed; fields not relevant to a given
/// kind are `None` and omitted from the JSON encoding. For `chat` and
/// `system` packets broadcast by the server, `from` is always
/// server-authoritative; a client-supplied `from` is never trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    /// Packet kind, encoded as the `type` field.
    #[serde(rename = "type")]
    pub kind: PacketKind,
    /// Originating display name, server-assigned for broadcast packets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Free-form message body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Command name, `command` packets only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Command argument string, `command` packets only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
}

impl Packet {
    fn bare(kind: PacketKind) -> Self {
        Self {
            kind,
            from: None,
            text: None,
            name: None,
            args: None,
        }
    }

    /// A client-side chat packet. The server ignores any `from` here.
    pub fn chat(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::bare(PacketKind::Chat)
        }
    }

    /// A server-side chat packet with an authoritative sender.
    pub fn chat_from(from: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            text: Some(text.into()),
            ..Self::bare(PacketKind::Chat)
        }
    }

    /// A server-authored informational packet.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            from: Some(SERVER_NAME.to_string()),
            text: Some(text.into()),
            ..Self::bare(PacketKind::System)
        }
    }

    /// A client-side command packet.
    pub fn command(name: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            args: Some(args.into()),
            ..Self::bare(PacketKind::Command)
        }
    }

    /// A server-authored liveness probe.
    pub fn ping() -> Self {
        Self {
            from: Some(SERVER_NAME.to_string()),
            ..Self::bare(PacketKind::Ping)
        }
    }

    /// A liveness probe response.
    pub fn pong() -> Self {
        Self::bare(PacketKind::Pong)
    }
}
