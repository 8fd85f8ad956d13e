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

//! Command dispatch
//!
//! Interprets a `command` packet against the invoking session and the
//! registry. Dispatch is synchronous with respect to the issuing connection:
//! it completes before the worker reads that connection's next packet. No
//! command has side effects beyond the ones implemented here and none are
//! retried.

use crate::broadcast::Broadcaster;
use crate::registry::SessionRegistry;
use crate::session::Session;
use crosstalk_codec::Packet;
use std::sync::Arc;
use tracing::info;

/// Static reply for `/help`.
const HELP_TEXT: &str = "Available commands: /name <newname>, /who, /help, /quit";

/// Interprets commands against a session and the registry
pub struct CommandDispatcher {
    registry: Arc<SessionRegistry>,
    broadcaster: Arc<Broadcaster>,
}

impl CommandDispatcher {
    /// Create a dispatcher over the given registry
    pub fn new(registry: Arc<SessionRegistry>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    /// Dispatch one command for the invoking session.
    ///
    /// Command names are case-insensitive. Unknown names get a caller-only
    /// informational reply, never an error.
    pub fn dispatch(&self, session: &Session, name: &str, args: &str) {
        match name.to_ascii_lowercase().as_str() {
            "name" => self.change_name(session, args),
            "who" => {
                session.send(&Packet::system(self.registry.usernames().join(", ")));
            }
            "help" => {
                session.send(&Packet::system(HELP_TEXT));
            }
            "quit" => {
                info!(session = %session.id(), "session requested quit");
                // The worker's teardown path broadcasts the departure.
                session.close();
            }
            other => {
                session.send(&Packet::system(format!("Unknown command: /{other}")));
            }
        }
    }

    fn change_name(&self, session: &Session, args: &str) {
        let new_name = args.trim();
        if new_name.is_empty() {
            session.send(&Packet::system("Usage: /name <newname>"));
            return;
        }

        let old_name = session.set_username(new_name);
        info!(session = %session.id(), from = %old_name, to = %new_name, "username changed");
        self.broadcaster
            .broadcast(&Packet::system(format!("{old_name} is now known as {new_name}")));
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("sessions", &self.registry.len())
            .finish()
    }
}
