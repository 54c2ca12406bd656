//! Error types for the chat server
//!
//! Defines connection-level errors, per-command errors and mailbox errors.
//! Uses thiserror for ergonomic error definitions.
//!
//! The `Display` text of a [`ChatError`] is exactly the reply line sent back
//! to the session that issued the failing command.

use thiserror::Error;
use tokio_util::codec::{AnyDelimiterCodecError, LinesCodecError};

/// Connection-level errors
///
/// Any of these ends the affected connection only. Other sessions and the
/// registry are never touched by them.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal for this connection)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Inbound framing error, e.g. a line over the length limit
    #[error("Framing error: {0}")]
    Framing(#[from] AnyDelimiterCodecError),

    /// Outbound line encoding error (client side)
    #[error("Line codec error: {0}")]
    LineCodec(#[from] LinesCodecError),

    /// The session could not be put online
    #[error("Registration failed: {0}")]
    Registration(#[source] ChatError),
}

/// Which command was malformed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// `rename|<name>` with a missing or empty name
    Rename,
    /// `to|<name>|<content>` with missing fields or an empty recipient
    DirectMessage,
}

/// Per-command errors
///
/// Recovered locally: the requester gets the error text as a reply and
/// nothing else changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Target name is already registered
    #[error("name already in use")]
    NameInUse(String),

    /// Directed message to a name nobody holds
    #[error("user does not exist")]
    RecipientNotFound(String),

    /// Required fields missing
    #[error("{}", malformed_text(.0))]
    MalformedCommand(MalformedKind),

    /// Directed message without content
    #[error("no message content")]
    EmptyContent,
}

fn malformed_text(kind: &MalformedKind) -> &'static str {
    match kind {
        MalformedKind::Rename => "invalid rename format, use \"rename|name\"",
        MalformedKind::DirectMessage => "invalid message format, use \"to|name|message\"",
    }
}

/// Mailbox send error
///
/// The delivery side of the mailbox is gone, so the session is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Mailbox closed")]
pub struct MailboxClosed;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_texts() {
        assert_eq!(
            ChatError::NameInUse("bob".into()).to_string(),
            "name already in use"
        );
        assert_eq!(
            ChatError::RecipientNotFound("carol".into()).to_string(),
            "user does not exist"
        );
        assert_eq!(ChatError::EmptyContent.to_string(), "no message content");
    }

    #[test]
    fn test_malformed_texts() {
        assert_eq!(
            ChatError::MalformedCommand(MalformedKind::DirectMessage).to_string(),
            "invalid message format, use \"to|name|message\""
        );
        assert_eq!(
            ChatError::MalformedCommand(MalformedKind::Rename).to_string(),
            "invalid rename format, use \"rename|name\""
        );
    }
}
