//! Background subscriber behind the pub/sub tools.
//!
//! One task owns the dedicated pub/sub connection. Tool calls send it
//! subscribe/unsubscribe commands over a channel and read the messages it
//! buffered in the shared [`Inbox`]. The task is started on first use and
//! restarted if its connection drops.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use futures::StreamExt;
use redis::aio::PubSub;
use redis::{Client, ErrorKind, Msg, RedisError, RedisResult};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, Mutex};

/// Messages kept per server before the oldest are dropped.
pub const INBOX_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceivedMessage {
    pub channel: String,
    pub payload: String,
}

/// Bounded FIFO of received messages.
#[derive(Debug)]
pub struct Inbox {
    messages: VecDeque<ReceivedMessage>,
    capacity: usize,
    dropped: u64,
}

impl Inbox {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, message: ReceivedMessage) {
        if self.messages.len() >= self.capacity {
            self.messages.pop_front();
            self.dropped += 1;
        }
        self.messages.push_back(message);
    }

    /// Removes up to `max` messages in arrival order, optionally only from one
    /// channel. Messages of other channels stay queued.
    pub fn drain(&mut self, channel: Option<&str>, max: usize) -> Vec<ReceivedMessage> {
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(self.messages.len());
        while let Some(message) = self.messages.pop_front() {
            if taken.len() < max && channel.map_or(true, |c| c == message.channel) {
                taken.push(message);
            } else {
                kept.push_back(message);
            }
        }
        self.messages = kept;
        taken
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages discarded because the inbox was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

enum Command {
    Subscribe {
        channel: String,
        reply: oneshot::Sender<RedisResult<()>>,
    },
    Unsubscribe {
        channel: String,
        reply: oneshot::Sender<RedisResult<()>>,
    },
}

enum Event {
    Message(Option<Msg>),
    Command(Option<Command>),
}

#[derive(Clone)]
pub struct Subscriber {
    client: Client,
    commands: Arc<Mutex<Option<mpsc::Sender<Command>>>>,
    channels: Arc<Mutex<BTreeSet<String>>>,
    inbox: Arc<Mutex<Inbox>>,
}

impl Subscriber {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            commands: Arc::new(Mutex::new(None)),
            channels: Arc::new(Mutex::new(BTreeSet::new())),
            inbox: Arc::new(Mutex::new(Inbox::with_capacity(INBOX_CAPACITY))),
        }
    }

    pub async fn subscribe(&self, channel: &str) -> RedisResult<()> {
        let sender = self.sender().await?;
        let (reply, done) = oneshot::channel();
        sender
            .send(Command::Subscribe {
                channel: channel.to_string(),
                reply,
            })
            .await
            .map_err(|_| stopped())?;
        done.await.map_err(|_| stopped())??;

        self.channels.lock().await.insert(channel.to_string());
        tracing::info!(channel, "Subscribed to channel");
        Ok(())
    }

    /// Unsubscribing from a channel that is not subscribed is a no-op.
    pub async fn unsubscribe(&self, channel: &str) -> RedisResult<()> {
        if !self.channels.lock().await.contains(channel) {
            return Ok(());
        }

        let sender = self.sender().await?;
        let (reply, done) = oneshot::channel();
        sender
            .send(Command::Unsubscribe {
                channel: channel.to_string(),
                reply,
            })
            .await
            .map_err(|_| stopped())?;
        done.await.map_err(|_| stopped())??;

        self.channels.lock().await.remove(channel);
        tracing::info!(channel, "Unsubscribed from channel");
        Ok(())
    }

    pub async fn channels(&self) -> Vec<String> {
        self.channels.lock().await.iter().cloned().collect()
    }

    pub async fn drain(&self, channel: Option<&str>, max: usize) -> Vec<ReceivedMessage> {
        self.inbox.lock().await.drain(channel, max)
    }

    /// Number of buffered messages and the number dropped so far.
    pub async fn backlog(&self) -> (usize, u64) {
        let inbox = self.inbox.lock().await;
        (inbox.len(), inbox.dropped())
    }

    async fn sender(&self) -> RedisResult<mpsc::Sender<Command>> {
        let mut guard = self.commands.lock().await;
        if let Some(sender) = guard.as_ref().filter(|s| !s.is_closed()) {
            return Ok(sender.clone());
        }

        let pubsub = self.client.get_async_pubsub().await?;
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(run(pubsub, rx, Arc::clone(&self.inbox)));

        // A fresh connection carries none of the previous subscriptions.
        self.channels.lock().await.clear();
        *guard = Some(tx.clone());
        tracing::debug!("Started pub/sub subscriber");
        Ok(tx)
    }
}

fn stopped() -> RedisError {
    RedisError::from((ErrorKind::IoError, "pub/sub subscriber stopped"))
}

async fn run(mut pubsub: PubSub, mut commands: mpsc::Receiver<Command>, inbox: Arc<Mutex<Inbox>>) {
    loop {
        let event = {
            let mut messages = std::pin::pin!(pubsub.on_message());
            tokio::select! {
                msg = messages.next() => Event::Message(msg),
                cmd = commands.recv() => Event::Command(cmd),
            }
        };

        match event {
            Event::Message(Some(msg)) => {
                let payload = msg
                    .get_payload::<String>()
                    .unwrap_or_else(|_| String::from_utf8_lossy(msg.get_payload_bytes()).into_owned());
                inbox.lock().await.push(ReceivedMessage {
                    channel: msg.get_channel_name().to_string(),
                    payload,
                });
            }
            Event::Message(None) => {
                tracing::warn!("Pub/sub connection closed, subscriber stopping");
                break;
            }
            Event::Command(Some(Command::Subscribe { channel, reply })) => {
                let _ = reply.send(pubsub.subscribe(&channel).await);
            }
            Event::Command(Some(Command::Unsubscribe { channel, reply })) => {
                let _ = reply.send(pubsub.unsubscribe(&channel).await);
            }
            Event::Command(None) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(channel: &str, payload: &str) -> ReceivedMessage {
        ReceivedMessage {
            channel: channel.to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn drops_oldest_when_full() {
        let mut inbox = Inbox::with_capacity(2);
        inbox.push(message("a", "1"));
        inbox.push(message("a", "2"));
        inbox.push(message("a", "3"));
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox.dropped(), 1);
        assert_eq!(inbox.drain(None, 10), vec![message("a", "2"), message("a", "3")]);
        assert!(inbox.is_empty());
    }

    #[test]
    fn drains_one_channel_and_keeps_the_rest() {
        let mut inbox = Inbox::with_capacity(10);
        inbox.push(message("news", "n1"));
        inbox.push(message("alerts", "a1"));
        inbox.push(message("news", "n2"));
        inbox.push(message("news", "n3"));

        assert_eq!(
            inbox.drain(Some("news"), 2),
            vec![message("news", "n1"), message("news", "n2")]
        );
        assert_eq!(
            inbox.drain(None, 10),
            vec![message("alerts", "a1"), message("news", "n3")]
        );
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let mut inbox = Inbox::with_capacity(0);
        inbox.push(message("c", "1"));
        inbox.push(message("c", "2"));
        assert_eq!(inbox.drain(None, 5), vec![message("c", "2")]);
    }
}
