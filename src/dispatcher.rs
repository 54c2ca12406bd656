//! Command dispatcher
//!
//! Applies one parsed inbound line against the registry. Every outcome,
//! success or failure, ends up as lines queued on some session's mailbox.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::command::{self, Command};
use crate::error::ChatError;
use crate::registry::Registry;
use crate::session::Session;

/// Routes commands from sessions to the registry and recipients
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Handle one inbound line from `sender`
    pub fn dispatch(&self, sender: &Arc<Session>, line: &str) {
        debug!("{} -> {:?}", sender.name(), line);

        let result = Command::parse(line).and_then(|cmd| self.apply(sender, cmd));

        if let Err(e) = result {
            warn!("Command from {} rejected: {:?}", sender.name(), e);
            reply(sender, e.to_string());
        }
    }

    fn apply(&self, sender: &Arc<Session>, cmd: Command) -> Result<(), ChatError> {
        match cmd {
            Command::Who => {
                for user in self.registry.snapshot() {
                    reply(sender, command::who_line(&user));
                }
            }
            Command::Rename(name) => {
                self.registry.rename(sender, &name)?;
                reply(sender, command::renamed_line(&name));
            }
            Command::DirectMessage { recipient, content } => {
                let target = self
                    .registry
                    .lookup(&recipient)
                    .ok_or_else(|| ChatError::RecipientNotFound(recipient.clone()))?;
                if content.is_empty() {
                    return Err(ChatError::EmptyContent);
                }
                if target
                    .send(command::direct_line(&sender.name(), &content))
                    .is_err()
                {
                    debug!("{} is tearing down, direct message dropped", recipient);
                }
            }
            Command::Broadcast(text) => {
                let line = command::broadcast_line(sender.address(), &sender.name(), &text);
                self.registry.broadcast(sender, &line);
            }
        }
        Ok(())
    }
}

/// Replies go to the sender only; a closing sender just misses them
fn reply(session: &Session, line: String) {
    if session.send(line).is_err() {
        debug!("{} is tearing down, reply dropped", session.name());
    }
}
