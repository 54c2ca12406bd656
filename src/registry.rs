//! Online session registry
//!
//! The single shared name → session directory. Every read and write of the
//! map happens inside one `parking_lot::Mutex`, held only for the span of a
//! check-then-act sequence (membership check + insert/remove, or enumerate +
//! enqueue). Enqueueing never waits on the network, and the lock is never
//! held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::command::{offline_notice, online_notice};
use crate::error::ChatError;
use crate::session::Session;
use crate::types::SessionId;

/// One row of a "who" answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineUser {
    pub name: String,
    pub address: String,
}

/// Name → session directory with serialized access
///
/// At most one session is registered per name at any instant.
#[derive(Debug, Default)]
pub struct Registry {
    online: Mutex<HashMap<String, Arc<Session>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a session online under its current name and announce it
    ///
    /// Fails with `NameInUse` if the name is taken; the map is left unchanged.
    pub fn register(&self, session: &Arc<Session>) -> Result<(), ChatError> {
        let mut online = self.online.lock();
        let name = session.name();

        if online.contains_key(&name) {
            return Err(ChatError::NameInUse(name));
        }

        online.insert(name.clone(), Arc::clone(session));
        fan_out(&online, session.id(), &online_notice(&name));

        info!(session = %session.id(), "{} is online ({} total)", name, online.len());
        Ok(())
    }

    /// Take a session offline and announce it
    ///
    /// Idempotent: only removes the entry if it still belongs to this exact
    /// session. Returns whether anything was removed, so the offline notice
    /// goes out at most once per session.
    pub fn unregister(&self, session: &Session) -> bool {
        let mut online = self.online.lock();
        let name = session.name();

        let owned = online
            .get(&name)
            .is_some_and(|entry| entry.id() == session.id());
        if !owned {
            debug!("{} already offline", name);
            return false;
        }

        online.remove(&name);
        fan_out(&online, session.id(), &offline_notice(&name));

        info!(session = %session.id(), "{} is offline ({} total)", name, online.len());
        true
    }

    /// Move a session to a new name
    ///
    /// Fails with `NameInUse` if any session (including this one) already
    /// holds `new_name`; nothing changes in that case.
    pub fn rename(&self, session: &Arc<Session>, new_name: &str) -> Result<(), ChatError> {
        let mut online = self.online.lock();

        if online.contains_key(new_name) {
            return Err(ChatError::NameInUse(new_name.to_string()));
        }

        let old_name = session.name();
        let was_online = online
            .get(&old_name)
            .is_some_and(|entry| entry.id() == session.id());

        if was_online {
            online.remove(&old_name);
        }
        session.set_name(new_name.to_string());
        if was_online {
            online.insert(new_name.to_string(), Arc::clone(session));
        }

        info!(session = %session.id(), "{} renamed to {}", old_name, new_name);
        Ok(())
    }

    /// Consistent view of everyone online, sorted by name
    pub fn snapshot(&self) -> Vec<OnlineUser> {
        let online = self.online.lock();

        let mut users: Vec<OnlineUser> = online
            .iter()
            .map(|(name, session)| OnlineUser {
                name: name.clone(),
                address: session.address().to_string(),
            })
            .collect();
        drop(online);

        users.sort_by(|a, b| a.name.cmp(&b.name));
        users
    }

    /// Queue `text` for every online session except `sender`
    ///
    /// Returns how many mailboxes accepted the line.
    pub fn broadcast(&self, sender: &Session, text: &str) -> usize {
        let online = self.online.lock();
        fan_out(&online, sender.id(), text)
    }

    /// Find the session registered under `name`
    pub fn lookup(&self, name: &str) -> Option<Arc<Session>> {
        self.online.lock().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.online.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.online.lock().is_empty()
    }
}

/// Enqueue onto every mailbox but `skip`'s. Caller holds the lock.
fn fan_out(online: &HashMap<String, Arc<Session>>, skip: SessionId, text: &str) -> usize {
    online
        .values()
        .filter(|session| session.id() != skip)
        .filter(|session| session.send(text).is_ok())
        .count()
}
