//! `Store<T>`: a generic entity-hash abstraction over a serialization
//! capability. `T: Entity` supplies `hash_name()` and per-instance
//! `key()`; `Store<T>` supplies the dict-like mapping operations over the
//! underlying Redis hash: get, set, delete, keys, len, items, values.

use crate::broker::{Broker, BrokerError};
use mr_proto::Entity;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::marker::PhantomData;

#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("no entity found for key {0:?}")]
    NotFound(String),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// A hash of `T::key() -> JSON(T)`, scoped to one `Broker` prefix and
/// `T::hash_name()`.
pub struct Store<T: Entity> {
    conn: redis::aio::ConnectionManager,
    hash_key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Store<T> {
    pub fn new(broker: &Broker) -> Self {
        Store {
            conn: broker.conn(),
            hash_key: broker.hash_key(T::hash_name()),
            _marker: PhantomData,
        }
    }

    /// Fails with [`EntityError::NotFound`] rather than silently returning
    /// a default — callers decide whether a miss is expected.
    pub async fn get(&self, key: &str) -> Result<T, EntityError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .hget(&self.hash_key, key)
            .await
            .map_err(BrokerError::from)?;
        match raw {
            Some(raw) => Ok(serde_json::from_str(&raw).map_err(BrokerError::from)?),
            None => Err(EntityError::NotFound(key.to_string())),
        }
    }

    /// Full-record replacement under `value.key()` — there is no
    /// field-level merge.
    pub async fn set(&self, value: &T) -> Result<(), EntityError> {
        let raw = serde_json::to_string(value).map_err(BrokerError::from)?;
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(&self.hash_key, value.key(), raw)
            .await
            .map_err(BrokerError::from)?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), EntityError> {
        let mut conn = self.conn.clone();
        conn.hdel::<_, _, ()>(&self.hash_key, key)
            .await
            .map_err(BrokerError::from)?;
        Ok(())
    }

    pub async fn keys(&self) -> Result<Vec<String>, EntityError> {
        let mut conn = self.conn.clone();
        Ok(conn.hkeys(&self.hash_key).await.map_err(BrokerError::from)?)
    }

    pub async fn len(&self) -> Result<usize, EntityError> {
        let mut conn = self.conn.clone();
        let len: usize = conn.hlen(&self.hash_key).await.map_err(BrokerError::from)?;
        Ok(len)
    }

    pub async fn is_empty(&self) -> Result<bool, EntityError> {
        Ok(self.len().await? == 0)
    }

    pub async fn items(&self) -> Result<Vec<(String, T)>, EntityError> {
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn
            .hgetall(&self.hash_key)
            .await
            .map_err(BrokerError::from)?;
        let mut out = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            out.push((key, serde_json::from_str(&value).map_err(BrokerError::from)?));
        }
        Ok(out)
    }

    pub async fn values(&self) -> Result<Vec<T>, EntityError> {
        Ok(self.items().await?.into_iter().map(|(_, v)| v).collect())
    }
}

#[cfg(test)]
mod tests {
    // `Store` needs a live broker connection to exercise; its contract
    // (not-found errors, full replacement, len/keys/items agreement) is
    // covered in mr-primary/mr-worker integration tests that spin up a
    // Redis test container, and by the round-trip property tests in
    // mr-proto for the JSON layer this module sits on top of.
}
