//! Interactive line-mode client
//!
//! Menu-driven front end that turns what the user types into protocol lines.
//! Generic over its input, prompt output and server connection so it can be
//! driven by scripted input in tests.

use futures_util::SinkExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio_util::codec::{FramedWrite, LinesCodec};

use crate::command::Command;
use crate::error::AppError;

/// Typed by the user to leave the current mode
pub const EXIT_WORD: &str = "exit";

const MENU: &str = "1. public chat\n2. private chat\n3. rename\n0. exit\n";
const BAD_CHOICE: &str = ">>>>> please enter a number in range\n";
const CHAT_PROMPT: &str = ">>>>> enter a message, exit to leave:\n";
const RECIPIENT_PROMPT: &str = ">>>>> enter a user name to chat with, exit to leave:\n";
const NAME_PROMPT: &str = ">>>>> enter your new name:\n";
const EMPTY_NAME: &str = ">>>>> the name must not be empty\n";

/// Top-level menu entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Exit,
    PublicChat,
    PrivateChat,
    Rename,
}

impl MenuChoice {
    /// Parse a menu number, `None` if out of range
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "0" => Some(Self::Exit),
            "1" => Some(Self::PublicChat),
            "2" => Some(Self::PrivateChat),
            "3" => Some(Self::Rename),
            _ => None,
        }
    }
}

/// Menu loop state
pub struct ChatClient<I, O, S> {
    input: Lines<I>,
    output: O,
    server: FramedWrite<S, LinesCodec>,
}

impl<I, O, S> ChatClient<I, O, S>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
    S: AsyncWrite + Unpin,
{
    pub fn new(input: I, output: O, server: S) -> Self {
        Self {
            input: input.lines(),
            output,
            server: FramedWrite::new(server, LinesCodec::new()),
        }
    }

    /// Run until the user picks exit or input ends
    pub async fn run(&mut self) -> Result<(), AppError> {
        while let Some(choice) = self.menu().await? {
            match choice {
                MenuChoice::Exit => break,
                MenuChoice::PublicChat => self.public_chat().await?,
                MenuChoice::PrivateChat => self.private_chat().await?,
                MenuChoice::Rename => self.rename().await?,
            }
        }
        Ok(())
    }

    /// Show the menu until a valid choice is made; `None` on end of input
    async fn menu(&mut self) -> Result<Option<MenuChoice>, AppError> {
        loop {
            self.print(MENU).await?;
            let Some(input) = self.input.next_line().await? else {
                return Ok(None);
            };
            match MenuChoice::parse(&input) {
                Some(choice) => return Ok(Some(choice)),
                None => self.print(BAD_CHOICE).await?,
            }
        }
    }

    async fn public_chat(&mut self) -> Result<(), AppError> {
        while let Some(text) = self.prompt(CHAT_PROMPT).await? {
            if !text.is_empty() {
                self.send(Command::Broadcast(text)).await?;
            }
        }
        Ok(())
    }

    async fn private_chat(&mut self) -> Result<(), AppError> {
        loop {
            self.send(Command::Who).await?;
            let Some(recipient) = self.prompt(RECIPIENT_PROMPT).await? else {
                return Ok(());
            };
            if recipient.is_empty() {
                continue;
            }

            while let Some(content) = self.prompt(CHAT_PROMPT).await? {
                if !content.is_empty() {
                    self.send(Command::DirectMessage {
                        recipient: recipient.clone(),
                        content,
                    })
                    .await?;
                }
            }
        }
    }

    async fn rename(&mut self) -> Result<(), AppError> {
        self.print(NAME_PROMPT).await?;
        let Some(name) = self.input.next_line().await? else {
            return Ok(());
        };
        let name = name.trim();
        if name.is_empty() {
            return self.print(EMPTY_NAME).await;
        }
        self.send(Command::Rename(name.to_string())).await
    }

    /// Print `text` and read one line; `None` on `exit` or end of input
    async fn prompt(&mut self, text: &str) -> Result<Option<String>, AppError> {
        self.print(text).await?;
        let line = self.input.next_line().await?;
        Ok(line.filter(|line| line.trim() != EXIT_WORD))
    }

    async fn print(&mut self, text: &str) -> Result<(), AppError> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }

    async fn send(&mut self, cmd: Command) -> Result<(), AppError> {
        self.server.send(cmd.to_line()).await?;
        Ok(())
    }
}
