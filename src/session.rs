//! Session struct definition
//!
//! Represents one connected user: identity, display name and outbound mailbox.

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::MailboxClosed;
use crate::mailbox::Mailbox;
use crate::types::SessionId;

/// Connected user
///
/// Shared as `Arc<Session>` between its connection handler, the registry and
/// any dispatcher currently routing a message to it.
#[derive(Debug)]
pub struct Session {
    /// Unique identifier for this session
    id: SessionId,
    /// Peer address, fixed for the session's lifetime
    address: String,
    /// Display name, unique among online sessions
    name: RwLock<String>,
    /// Server → peer line queue
    mailbox: Mailbox,
    /// Stops the delivery task
    shutdown: CancellationToken,
}

impl Session {
    /// Create a session whose initial name is its peer address
    pub fn new(address: impl Into<String>, mailbox: Mailbox) -> Self {
        let address = address.into();
        Self {
            id: SessionId::new(),
            name: RwLock::new(address.clone()),
            address,
            mailbox,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Current display name
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Only the registry renames sessions, while holding its lock
    pub(crate) fn set_name(&self, name: String) {
        *self.name.write() = name;
    }

    /// Queue a line for this session
    ///
    /// Returns an error if the delivery task is gone (session tearing down).
    pub fn send(&self, line: impl Into<String>) -> Result<(), MailboxClosed> {
        self.mailbox.push(line)
    }

    /// Token observed by the delivery task and the connection handler
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop the delivery task without waiting for the queue to drain
    pub fn close(&self) {
        self.shutdown.cancel();
    }
}
