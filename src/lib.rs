//! Line-oriented Multi-user Chat Server Library
//!
//! A small TCP chat service: clients connect, get a display name (initially
//! their peer address) and exchange newline-terminated text lines, either
//! broadcast to everyone online or sent to one named user.
//!
//! # Protocol
//! - `who` - list online users
//! - `rename|<name>` - change display name
//! - `to|<name>|<message>` - direct message
//! - anything else - broadcast to everyone else
//!
//! # Architecture
//! - `Registry` is the only shared mutable state: a name → session map
//!   behind one lock, exposing only invariant-preserving operations
//! - Each `Session` owns an unbounded mailbox drained by its own delivery
//!   task, so enqueueing never waits on a peer's socket
//! - `Dispatcher` parses a line into a `Command` and applies it
//! - `handle_connection` owns each session's lifecycle and tears it down
//!   exactly once
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use line_chat::{serve, Dispatcher, Registry, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Arc::new(ServerConfig::default());
//!     let listener = TcpListener::bind(config.addr()).await.unwrap();
//!     let dispatcher = Dispatcher::new(Arc::new(Registry::new()));
//!
//!     serve(listener, dispatcher, config).await;
//! }
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod mailbox;
pub mod registry;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use client::{ChatClient, MenuChoice};
pub use command::Command;
pub use config::{ClientConfig, ServerConfig};
pub use dispatcher::Dispatcher;
pub use error::{AppError, ChatError, MailboxClosed, MalformedKind};
pub use handler::{handle_connection, serve};
pub use mailbox::{DeliveryOutcome, Mailbox, MailboxReceiver};
pub use registry::{OnlineUser, Registry};
pub use session::Session;
pub use types::SessionId;
