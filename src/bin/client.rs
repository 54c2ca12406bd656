//! Line Chat Client - Entry Point
//!
//! Connects to the server, prints everything it sends to stdout and runs the
//! interactive menu on stdin.

use clap::Parser;
use tokio::io::{self, BufReader};
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

use line_chat::{ChatClient, ClientConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout belongs to the chat, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("line_chat=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::parse();
    let stream = match TcpStream::connect(config.addr()).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!(">>>>> failed to connect to {}: {}", config.addr(), e);
            return Err(e.into());
        }
    };
    let (mut reader, writer) = stream.into_split();

    // Server lines go straight to the terminal
    let responses = tokio::spawn(async move { io::copy(&mut reader, &mut io::stdout()).await });

    println!(">>>>> connected to {}", config.addr());

    let mut client = ChatClient::new(BufReader::new(io::stdin()), io::stdout(), writer);
    tokio::select! {
        result = client.run() => result?,
        _ = responses => println!(">>>>> server closed the connection"),
    }

    Ok(())
}
