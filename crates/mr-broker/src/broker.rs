//! Broker primitives: queue enqueue/pop/remove, channel publish/subscribe,
//! and the keyspace naming shared by every layer above this one. Built on
//! the `redis` crate's async API.

use mr_proto::Command;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("broker connection error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("malformed command payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// A connected handle to the shared broker, scoped to one key prefix.
///
/// Cloning is cheap: `ConnectionManager` is itself a cheap-to-clone handle
/// that transparently reconnects on transient failure, so every operation
/// below clones it rather than taking `&mut self`.
#[derive(Clone)]
pub struct Broker {
    client: redis::Client,
    conn: ConnectionManager,
    prefix: String,
}

impl Broker {
    /// Connect to `redis_url` and scope every key under `prefix` (default
    /// `modelrunner`).
    pub async fn connect(redis_url: &str, prefix: impl Into<String>) -> Result<Self, BrokerError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Broker { client, conn, prefix: prefix.into() })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }

    pub(crate) fn hash_key(&self, hash_name: &str) -> String {
        format!("{}:{}", self.prefix, hash_name)
    }

    fn queue_key(&self, queue: &str) -> String {
        format!("{}:queues:{}", self.prefix, queue)
    }

    fn channel_key(&self, channel: &str) -> String {
        format!("{}:channels:{}", self.prefix, channel)
    }

    /// Append `command` to the tail of `queue`.
    pub async fn enqueue(&self, queue: &str, command: &Command) -> Result<(), BrokerError> {
        let payload = serde_json::to_string(command)?;
        let mut conn = self.conn();
        conn.rpush(self.queue_key(queue), payload).await?;
        Ok(())
    }

    /// Block for up to `timeout` for the head of `queue`. A zero timeout
    /// blocks forever, matching Redis's own `BLPOP` semantics. `enqueue`
    /// pushes to the tail (`RPUSH`), so popping the head (`BLPOP`) keeps
    /// the queue FIFO.
    pub async fn pop(&self, queue: &str, timeout: Duration) -> Result<Option<Command>, BrokerError> {
        let mut conn = self.conn();
        let key = self.queue_key(queue);
        let result: Option<(String, String)> = conn.blpop(key, timeout.as_secs_f64()).await?;
        match result {
            None => Ok(None),
            Some((_key, raw)) => Ok(Some(serde_json::from_str(&raw)?)),
        }
    }

    /// Remove every item in `queue` whose decoded form equals `command`.
    /// Comparison is by logical equality after re-decoding, not by raw
    /// bytes, so callers don't have to worry about serialized field order.
    pub async fn remove(&self, queue: &str, command: &Command) -> Result<usize, BrokerError> {
        let mut conn = self.conn();
        let key = self.queue_key(queue);
        let raw_items: Vec<String> = conn.lrange(&key, 0, -1).await?;

        let mut matching_raw = HashSet::new();
        for raw in &raw_items {
            if matching_raw.contains(raw) {
                continue;
            }
            if let Ok(decoded) = serde_json::from_str::<Command>(raw) {
                if &decoded == command {
                    matching_raw.insert(raw.clone());
                }
            }
        }

        let mut removed = 0i64;
        for raw in matching_raw {
            removed += conn.lrem(&key, 0, raw).await?;
        }
        Ok(removed as usize)
    }

    /// Fire-and-forget broadcast on `channel`.
    pub async fn publish(&self, channel: &str, command: &Command) -> Result<(), BrokerError> {
        let payload = serde_json::to_string(command)?;
        let mut conn = self.conn();
        conn.publish(self.channel_key(channel), payload).await?;
        Ok(())
    }

    /// Subscribe to `channels` and return a handle that yields decoded
    /// commands for every `message`-type publish, silently skipping
    /// subscribe/unsubscribe confirmations (the `redis` crate's pubsub
    /// stream never surfaces those as messages in the first place).
    pub async fn subscribe(&self, channels: &[String]) -> Result<Subscription, BrokerError> {
        let conn = self.client.get_async_connection().await?;
        let mut pubsub = conn.into_pubsub();
        for channel in channels {
            pubsub.subscribe(self.channel_key(channel)).await?;
        }
        Ok(Subscription { pubsub })
    }
}

/// A live subscription to one or more channels. Drop to unsubscribe.
pub struct Subscription {
    pubsub: redis::aio::PubSub,
}

impl Subscription {
    /// Wait for the next message across all subscribed channels. Returns
    /// `Ok(None)` only if the underlying connection closes.
    pub async fn next(&mut self) -> Result<Option<Command>, BrokerError> {
        use futures::StreamExt;
        let mut stream = self.pubsub.on_message();
        match stream.next().await {
            None => Ok(None),
            Some(msg) => {
                let payload: String = msg.get_payload()?;
                Ok(Some(serde_json::from_str(&payload)?))
            }
        }
    }
}
