//! TCP connection handler
//!
//! Handles individual client connections: session setup, line reading,
//! dispatch, and the single teardown path that takes a session offline.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tracing::{debug, error, info, warn};

use crate::command::IDLE_KICK;
use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::AppError;
use crate::mailbox;
use crate::session::Session;

/// How long teardown waits for queued lines to reach the peer
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Inbound `\n`-delimited chunks, still raw bytes
type LineReader<R> = FramedRead<R, AnyDelimiterCodec>;

/// Frame on `\n` only. Bytes are decoded per line afterwards, so input that
/// is not UTF-8 never fails the connection.
fn line_reader<R: AsyncRead>(reader: R, max_line_length: usize) -> LineReader<R> {
    FramedRead::new(
        reader,
        AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), max_line_length),
    )
}

/// Accept connections forever, one handler task per connection
///
/// A failed accept only affects that one attempt.
pub async fn serve(listener: TcpListener, dispatcher: Dispatcher, config: Arc<ServerConfig>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let dispatcher = dispatcher.clone();
                let config = Arc::clone(&config);

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, dispatcher, config).await {
                        warn!("Connection {} ended with error: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Run one connection from accept to teardown
///
/// Creates the session (named after the peer address), starts its delivery
/// task, puts it online, then feeds inbound lines to the dispatcher in
/// order. Whatever ends the read loop, the session is taken offline exactly
/// once here before its connection is released.
pub async fn handle_connection(
    stream: TcpStream,
    dispatcher: Dispatcher,
    config: Arc<ServerConfig>,
) -> Result<(), AppError> {
    let peer_addr = stream.peer_addr()?.to_string();
    let (reader, writer) = stream.into_split();

    let (mailbox, mailbox_rx) = mailbox::channel();
    let session = Arc::new(Session::new(peer_addr.clone(), mailbox));
    let shutdown = session.shutdown_token();
    let mut delivery = tokio::spawn(mailbox_rx.deliver(writer, shutdown.clone()));

    if let Err(e) = dispatcher.registry().register(&session) {
        error!("Could not register {}: {}", peer_addr, e);
        session.close();
        let _ = delivery.await;
        return Err(AppError::Registration(e));
    }
    debug!("Session {} started for {}", session.id(), peer_addr);

    let lines = line_reader(reader, config.max_line_length);
    let result = read_loop(&dispatcher, &session, lines, config.idle_timeout()).await;

    // Offline first, then let the delivery task drain and drop the socket.
    let session_id = session.id();
    dispatcher.registry().unregister(&session);
    drop(session);

    match timeout(DRAIN_GRACE, &mut delivery).await {
        Ok(Ok(outcome)) => debug!("Delivery for {} finished: {:?}", peer_addr, outcome),
        Ok(Err(e)) => error!("Delivery task for {} panicked: {}", peer_addr, e),
        Err(_) => {
            warn!("Delivery for {} did not drain in time, closing", peer_addr);
            shutdown.cancel();
            let _ = delivery.await;
        }
    }

    info!("Connection {} closed (session {})", peer_addr, session_id);
    result
}

/// What the read side produced next
enum Inbound {
    Line(String),
    Closed,
    Idle,
}

async fn read_loop<R>(
    dispatcher: &Dispatcher,
    session: &Arc<Session>,
    mut lines: LineReader<R>,
    idle: Option<Duration>,
) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
{
    let shutdown = session.shutdown_token();

    loop {
        let inbound = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Session {} shut down, ending read loop", session.name());
                return Ok(());
            }
            inbound = next_inbound(&mut lines, idle) => inbound?,
        };

        match inbound {
            Inbound::Line(line) => dispatcher.dispatch(session, &line),
            Inbound::Closed => {
                debug!("{} closed the connection", session.name());
                return Ok(());
            }
            Inbound::Idle => {
                info!("{} idle for too long, disconnecting", session.name());
                if session.send(IDLE_KICK).is_err() {
                    debug!("{} is tearing down, kick notice dropped", session.name());
                }
                return Ok(());
            }
        }
    }
}

/// Next line with its `\n` / `\r\n` stripped; invalid UTF-8 becomes U+FFFD
async fn next_inbound<R>(
    lines: &mut LineReader<R>,
    idle: Option<Duration>,
) -> Result<Inbound, AppError>
where
    R: AsyncRead + Unpin,
{
    let next = match idle {
        Some(limit) => match timeout(limit, lines.next()).await {
            Ok(next) => next,
            Err(_) => return Ok(Inbound::Idle),
        },
        None => lines.next().await,
    };

    match next {
        Some(Ok(chunk)) => {
            let line = String::from_utf8_lossy(&chunk);
            Ok(Inbound::Line(line.trim_end_matches('\r').to_string()))
        }
        Some(Err(e)) => Err(e.into()),
        None => Ok(Inbound::Closed),
    }
}
