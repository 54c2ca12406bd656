//! Line protocol definitions
//!
//! Inbound: one command per `\n`-terminated line, parsed into [`Command`].
//! Outbound: the fixed text formats every peer sees.
//!
//! | Line | Command |
//! |------|---------|
//! | `who` | [`Command::Who`] |
//! | `rename\|<name>` | [`Command::Rename`] |
//! | `to\|<name>\|<content>` | [`Command::DirectMessage`] |
//! | anything else | [`Command::Broadcast`] |

use crate::error::{ChatError, MalformedKind};
use crate::registry::OnlineUser;

const WHO: &str = "who";
const RENAME_PREFIX: &str = "rename|";
const DIRECT_PREFIX: &str = "to|";
const SEPARATOR: char = '|';

/// Sent to a session dropped for inactivity
pub const IDLE_KICK: &str = "you have been disconnected for inactivity";

/// Client → server command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List online users
    Who,
    /// Change own display name
    Rename(String),
    /// Send to a single named user
    ///
    /// `content` may be empty; that is reported after the recipient lookup.
    DirectMessage { recipient: String, content: String },
    /// Send to everyone else
    Broadcast(String),
}

impl Command {
    /// Parse one inbound line (terminator already stripped)
    pub fn parse(line: &str) -> Result<Self, ChatError> {
        if line == WHO {
            return Ok(Self::Who);
        }

        if line.starts_with(RENAME_PREFIX) {
            let name = line.split(SEPARATOR).nth(1).unwrap_or_default();
            if name.is_empty() {
                return Err(ChatError::MalformedCommand(MalformedKind::Rename));
            }
            return Ok(Self::Rename(name.to_string()));
        }

        if line.starts_with(DIRECT_PREFIX) {
            let mut fields = line.splitn(3, SEPARATOR).skip(1);
            let (Some(recipient), Some(content)) = (fields.next(), fields.next()) else {
                return Err(ChatError::MalformedCommand(MalformedKind::DirectMessage));
            };
            if recipient.is_empty() {
                return Err(ChatError::MalformedCommand(MalformedKind::DirectMessage));
            }
            return Ok(Self::DirectMessage {
                recipient: recipient.to_string(),
                content: content.to_string(),
            });
        }

        Ok(Self::Broadcast(line.to_string()))
    }

    /// Render the wire form of this command (without terminator)
    pub fn to_line(&self) -> String {
        match self {
            Self::Who => WHO.to_string(),
            Self::Rename(name) => format!("{}{}", RENAME_PREFIX, name),
            Self::DirectMessage { recipient, content } => {
                format!("{}{}{}{}", DIRECT_PREFIX, recipient, SEPARATOR, content)
            }
            Self::Broadcast(text) => text.clone(),
        }
    }
}

pub fn online_notice(name: &str) -> String {
    format!("{} has come online", name)
}

pub fn offline_notice(name: &str) -> String {
    format!("{} has gone offline", name)
}

/// `[<address>]<name>: <text>`
pub fn broadcast_line(address: &str, name: &str, text: &str) -> String {
    format!("[{}]{}: {}", address, name, text)
}

/// One row of a "who" reply
pub fn who_line(user: &OnlineUser) -> String {
    format!("[{}]{}: online...", user.address, user.name)
}

pub fn direct_line(sender: &str, content: &str) -> String {
    format!("{} says to you: {}", sender, content)
}

pub fn renamed_line(name: &str) -> String {
    format!("you have renamed yourself to: {}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed_dm() -> ChatError {
        ChatError::MalformedCommand(MalformedKind::DirectMessage)
    }

    #[test]
    fn test_parse_who() {
        assert_eq!(Command::parse("who"), Ok(Command::Who));
        // Only the exact word is a query
        assert_eq!(
            Command::parse("who "),
            Ok(Command::Broadcast("who ".to_string()))
        );
    }

    #[test]
    fn test_parse_rename() {
        assert_eq!(
            Command::parse("rename|alice"),
            Ok(Command::Rename("alice".to_string()))
        );
        assert_eq!(
            Command::parse("rename|alice|extra"),
            Ok(Command::Rename("alice".to_string()))
        );
    }

    #[test]
    fn test_parse_rename_empty_name() {
        let expected = Err(ChatError::MalformedCommand(MalformedKind::Rename));
        assert_eq!(Command::parse("rename|"), expected);
        assert_eq!(Command::parse("rename||x"), expected);
    }

    #[test]
    fn test_parse_direct_message() {
        assert_eq!(
            Command::parse("to|bob|hi"),
            Ok(Command::DirectMessage {
                recipient: "bob".to_string(),
                content: "hi".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_direct_message_keeps_separators_in_content() {
        assert_eq!(
            Command::parse("to|bob|a|b|c"),
            Ok(Command::DirectMessage {
                recipient: "bob".to_string(),
                content: "a|b|c".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_direct_message_missing_fields() {
        assert_eq!(Command::parse("to|"), Err(malformed_dm()));
        assert_eq!(Command::parse("to|bob"), Err(malformed_dm()));
        assert_eq!(Command::parse("to||hi"), Err(malformed_dm()));
    }

    #[test]
    fn test_parse_direct_message_empty_content_is_not_a_parse_error() {
        assert_eq!(
            Command::parse("to|bob|"),
            Ok(Command::DirectMessage {
                recipient: "bob".to_string(),
                content: String::new(),
            })
        );
    }

    #[test]
    fn test_parse_broadcast() {
        assert_eq!(
            Command::parse("hello"),
            Ok(Command::Broadcast("hello".to_string()))
        );
        assert_eq!(Command::parse(""), Ok(Command::Broadcast(String::new())));
        assert_eq!(
            Command::parse("to bob"),
            Ok(Command::Broadcast("to bob".to_string()))
        );
    }

    #[test]
    fn test_to_line() {
        assert_eq!(Command::Who.to_line(), "who");
        assert_eq!(Command::Rename("alice".into()).to_line(), "rename|alice");
        assert_eq!(
            Command::DirectMessage {
                recipient: "bob".into(),
                content: "hi".into()
            }
            .to_line(),
            "to|bob|hi"
        );
    }

    #[test]
    fn test_output_formats() {
        assert_eq!(online_notice("alice"), "alice has come online");
        assert_eq!(offline_notice("alice"), "alice has gone offline");
        assert_eq!(
            broadcast_line("10.0.0.1:1", "alice", "hello"),
            "[10.0.0.1:1]alice: hello"
        );
        assert_eq!(
            who_line(&OnlineUser {
                name: "bob".into(),
                address: "10.0.0.2:2".into()
            }),
            "[10.0.0.2:2]bob: online..."
        );
        assert_eq!(direct_line("alice", "hi"), "alice says to you: hi");
    }
}
