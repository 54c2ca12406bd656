//! Per-session outbound mailbox
//!
//! An unbounded FIFO of text lines with a single consumer: the session's
//! delivery task. Producers (broadcasts, direct messages, replies) enqueue
//! without ever waiting on the network, so a slow peer only slows down its
//! own delivery task.

use futures_util::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::MailboxClosed;

/// Create a new mailbox (sender, receiver) pair
pub fn channel() -> (Mailbox, MailboxReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Mailbox { tx }, MailboxReceiver { rx })
}

/// Producer half of a mailbox
#[derive(Debug, Clone)]
pub struct Mailbox {
    tx: mpsc::UnboundedSender<String>,
}

impl Mailbox {
    /// Enqueue one line. Never blocks.
    ///
    /// Fails only when the receiver has been dropped.
    pub fn push(&self, line: impl Into<String>) -> Result<(), MailboxClosed> {
        self.tx.send(line.into()).map_err(|_| MailboxClosed)
    }
}

/// How a delivery task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every sender was dropped and the queue was drained
    Closed,
    /// The shutdown token was cancelled
    Shutdown,
    /// Writing to the peer failed
    Failed,
}

/// Consumer half of a mailbox
#[derive(Debug)]
pub struct MailboxReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

impl MailboxReceiver {
    /// Wait for the next queued line
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Take the next queued line without waiting
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Drain the mailbox into `writer`, one `\n`-terminated line per entry
    ///
    /// Runs until the shutdown token fires, all senders are gone, or a write
    /// fails. A write failure cancels `shutdown` so the connection owner
    /// notices and tears the session down.
    pub async fn deliver<W>(mut self, writer: W, shutdown: CancellationToken) -> DeliveryOutcome
    where
        W: AsyncWrite + Unpin,
    {
        let mut sink = FramedWrite::new(writer, LinesCodec::new());

        let outcome = loop {
            let line = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break DeliveryOutcome::Shutdown,
                line = self.rx.recv() => line,
            };

            let Some(line) = line else {
                break DeliveryOutcome::Closed;
            };

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break DeliveryOutcome::Shutdown,
                result = sink.send(line) => {
                    if let Err(e) = result {
                        warn!("Delivery write failed: {}", e);
                        shutdown.cancel();
                        break DeliveryOutcome::Failed;
                    }
                }
            }
        };

        debug!("Delivery task ended: {:?}", outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::thread;
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, BufReader};

    use super::*;

    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 500;

    /// Lines look like `<producer> <seq>`; each producer's seqs must rise
    fn assert_per_producer_order(lines: &[String]) {
        let mut last: HashMap<&str, usize> = HashMap::new();
        for line in lines {
            let (producer, seq) = line.split_once(' ').unwrap();
            let seq: usize = seq.parse().unwrap();
            if let Some(prev) = last.insert(producer, seq) {
                assert!(seq > prev, "{} went from {} to {}", producer, prev, seq);
            }
        }
        assert_eq!(last.len(), PRODUCERS);
        assert_eq!(lines.len(), PRODUCERS * PER_PRODUCER);
    }

    #[tokio::test]
    async fn test_push_and_recv_in_order() {
        let (mailbox, mut rx) = channel();
        mailbox.push("first").unwrap();
        mailbox.push(String::from("second")).unwrap();

        assert_eq!(rx.recv().await.as_deref(), Some("first"));
        assert_eq!(rx.recv().await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_push_after_receiver_dropped() {
        let (mailbox, rx) = channel();
        drop(rx);

        assert_eq!(mailbox.push("lost"), Err(MailboxClosed));
    }

    #[tokio::test]
    async fn test_deliver_writes_lines_fifo() {
        let (mailbox, rx) = channel();
        let (client, server) = tokio::io::duplex(1024);
        let shutdown = CancellationToken::new();

        for i in 0..5 {
            mailbox.push(format!("line {}", i)).unwrap();
        }
        drop(mailbox);

        let outcome = rx.deliver(server, shutdown).await;
        assert_eq!(outcome, DeliveryOutcome::Closed);

        let mut lines = BufReader::new(client).lines();
        for i in 0..5 {
            assert_eq!(lines.next_line().await.unwrap(), Some(format!("line {}", i)));
        }
    }

    #[tokio::test]
    async fn test_deliver_stops_on_shutdown() {
        let (_mailbox, rx) = channel();
        let (_client, server) = tokio::io::duplex(64);
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(rx.deliver(server, shutdown.clone()));
        shutdown.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::Shutdown);
    }

    #[tokio::test]
    async fn test_deliver_failure_cancels_token() {
        let (mailbox, rx) = channel();
        let (client, server) = tokio::io::duplex(64);
        let shutdown = CancellationToken::new();
        drop(client);

        mailbox.push("nobody is listening").unwrap();
        let outcome = rx.deliver(server, shutdown.clone()).await;

        assert_eq!(outcome, DeliveryOutcome::Failed);
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_shutdown_unblocks_stuck_write() {
        let (mailbox, rx) = channel();
        // Tiny buffer that nobody reads: the second write blocks forever.
        let (_client, server) = tokio::io::duplex(8);
        let shutdown = CancellationToken::new();

        mailbox.push("a line longer than the buffer").unwrap();
        mailbox.push("another one").unwrap();

        let task = tokio::spawn(rx.deliver(server, shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());

        shutdown.cancel();
        let outcome = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::Shutdown);
    }

    #[test]
    fn test_concurrent_producers_keep_their_order() {
        let (mailbox, mut rx) = channel();

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let mailbox = mailbox.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        mailbox.push(format!("{} {}", p, i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut lines = Vec::new();
        while let Some(line) = rx.try_recv() {
            lines.push(line);
        }
        assert_per_producer_order(&lines);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_deliver_keeps_order_with_concurrent_producers() {
        let (mailbox, rx) = channel();
        let (client, server) = tokio::io::duplex(1024);
        let shutdown = CancellationToken::new();

        let delivery = tokio::spawn(rx.deliver(server, shutdown));
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let mailbox = mailbox.clone();
                tokio::spawn(async move {
                    for i in 0..PER_PRODUCER {
                        mailbox.push(format!("{} {}", p, i)).unwrap();
                        if i % 50 == 0 {
                            tokio::task::yield_now().await;
                        }
                    }
                })
            })
            .collect();
        drop(mailbox);

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(client).lines();
            let mut received = Vec::new();
            while let Some(line) = lines.next_line().await.unwrap() {
                received.push(line);
            }
            received
        });

        for producer in producers {
            producer.await.unwrap();
        }
        assert_eq!(delivery.await.unwrap(), DeliveryOutcome::Closed);

        let received = reader.await.unwrap();
        assert_per_producer_order(&received);
    }
}
