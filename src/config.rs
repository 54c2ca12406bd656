//! Command line configuration for the server and the client

use std::time::Duration;

use clap::Parser;

/// Default bind / connect IP
pub const DEFAULT_IP: &str = "127.0.0.1";

/// Default TCP port
pub const DEFAULT_PORT: u16 = 8888;

/// Server flags
#[derive(Debug, Clone, Parser)]
#[command(name = "line_chat", version, about = "Line-oriented multi-user chat server")]
pub struct ServerConfig {
    /// IP address to listen on
    #[arg(long, default_value = DEFAULT_IP)]
    pub ip: String,

    /// TCP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Longest accepted inbound line in bytes
    #[arg(long, default_value_t = 4096)]
    pub max_line_length: usize,

    /// Seconds without input before a session is dropped (0 disables)
    #[arg(long, default_value_t = 300)]
    pub idle_timeout: u64,

    /// Debug logging when RUST_LOG is not set
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout > 0).then(|| Duration::from_secs(self.idle_timeout))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: DEFAULT_IP.to_string(),
            port: DEFAULT_PORT,
            max_line_length: 4096,
            idle_timeout: 300,
            verbose: false,
        }
    }
}

/// Client flags
#[derive(Debug, Clone, Parser)]
#[command(name = "line_chat_client", version, about = "Interactive line chat client")]
pub struct ClientConfig {
    /// Server IP address
    #[arg(long, default_value = DEFAULT_IP)]
    pub ip: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl ClientConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}
