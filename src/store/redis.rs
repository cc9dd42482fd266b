//! Redis-backed [`Store`] implementation.

use super::{Store, StoreError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

// KEYS[1] = hash, ARGV[1] = order field, ARGV[2] = order, ARGV[3..] = field/value pairs
const HSET_IF_NEWER: &str = r"
local current = redis.call('HGET', KEYS[1], ARGV[1])
if current and tonumber(current) and tonumber(current) > tonumber(ARGV[2]) then
  return 0
end
redis.call('HSET', KEYS[1], unpack(ARGV))
return 1
";

/// A [`Store`] shared across processes through Redis.
///
/// Uses a [`ConnectionManager`], which reconnects transparently and is
/// cheap to clone per command.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    hset_if_newer: redis::Script,
}

impl RedisStore {
    /// Connects to the Redis server at `url` (e.g. `redis://127.0.0.1/`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Redis`] if the URL is invalid or the initial
    /// connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        tracing::info!("Connected to Redis");
        Ok(Self::new(manager))
    }

    /// Wraps an existing connection manager.
    #[must_use]
    pub fn new(manager: ConnectionManager) -> Self {
        Self {
            manager,
            hset_if_newer: redis::Script::new(HSET_IF_NEWER),
        }
    }
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl.filter(|ttl| !ttl.is_zero()) {
            cmd.arg("PX").arg(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut conn = self.manager.clone();
        let hash: HashMap<String, String> =
            redis::cmd("HGETALL").arg(key).query_async(&mut conn).await?;
        Ok(hash)
    }

    async fn hset_if_newer(
        &self,
        key: &str,
        order_field: &str,
        order: i64,
        fields: &[(&str, String)],
    ) -> Result<bool, StoreError> {
        let mut conn = self.manager.clone();
        let mut invocation = self.hset_if_newer.key(key);
        invocation.arg(order_field).arg(order);
        for (field, value) in fields {
            invocation.arg(*field).arg(value);
        }
        let written: i64 = invocation.invoke_async(&mut conn).await?;
        Ok(written == 1)
    }
}
