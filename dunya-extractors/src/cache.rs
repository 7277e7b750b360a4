//! Cache backends for extractor modules
//!
//! Two variants behind [`CacheBackend`]:
//! - [`RedisCache`] - shared store reachable by host (feature `redis`)
//! - [`LocalCache`] - instance-owned map, for single-process runs
//!
//! Backends store raw bytes; key derivation and value encoding live in
//! [`crate::module::ModuleBase`].

use crate::error::Result;
use crate::settings::{Settings, REDIS_HOST};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Key/value store used by a module instance
pub trait CacheBackend: Send {
    /// Fetch the value stored under `key`, `None` on a miss
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, expiring after `ttl` when supported
    fn set(&mut self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Whether values are visible to other instances and processes
    fn is_shared(&self) -> bool;

    /// Backend name for diagnostics
    fn kind(&self) -> &'static str;
}

/// Process-local cache owned by a single module instance
///
/// Expiry is ignored.
#[derive(Debug, Default)]
pub struct LocalCache {
    entries: HashMap<String, Vec<u8>>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheBackend for LocalCache {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8], _ttl: Option<Duration>) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn is_shared(&self) -> bool {
        false
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}

/// Redis-backed cache
///
/// The client is created eagerly but connects on first use, so a module
/// can be constructed while the server is unreachable.
#[cfg(feature = "redis")]
pub struct RedisCache {
    client: redis::Client,
    connection: Option<redis::Connection>,
}

#[cfg(feature = "redis")]
impl RedisCache {
    /// Create a client for `host`
    ///
    /// Accepts `"localhost"`, `"cache:6379"`, bare IPv6 addresses (`"::1"`),
    /// bracketed ones with a port (`"[::1]:6379"`) or a full `redis://` URL.
    pub fn open(host: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url(host).as_str())?;
        Ok(Self {
            client,
            connection: None,
        })
    }

    fn connection(&mut self) -> Result<&mut redis::Connection> {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => {
                debug!("Opening Redis connection");
                self.client.get_connection()?
            }
        };
        Ok(self.connection.insert(connection))
    }

    fn drop_on_error<T>(&mut self, result: redis::RedisResult<T>) -> Result<T> {
        result.map_err(|e| {
            // Reconnect on the next call
            self.connection = None;
            e.into()
        })
    }
}

#[cfg(feature = "redis")]
impl CacheBackend for RedisCache {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        let result = redis::cmd("GET").arg(key).query(self.connection()?);
        self.drop_on_error(result)
    }

    fn set(&mut self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let seconds = ttl.filter(|t| !t.is_zero()).map(expiry_seconds);
        let result = match seconds {
            Some(seconds) => redis::cmd("SETEX")
                .arg(key)
                .arg(seconds)
                .arg(value)
                .query::<()>(self.connection()?),
            None => redis::cmd("SET")
                .arg(key)
                .arg(value)
                .query::<()>(self.connection()?),
        };
        self.drop_on_error(result)
    }

    fn is_shared(&self) -> bool {
        true
    }

    fn kind(&self) -> &'static str {
        "redis"
    }
}

/// Connection URL for a host setting
#[cfg(feature = "redis")]
fn redis_url(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else if host.parse::<std::net::Ipv6Addr>().is_ok() {
        format!("redis://[{}]/", host)
    } else {
        format!("redis://{}/", host)
    }
}

/// Whole seconds for `SETEX`, rounding sub-second expiries up
fn expiry_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Pick the backend for a freshly constructed module
///
/// Redis when `redis_host` is set and Redis support is compiled in,
/// otherwise a new [`LocalCache`]. Never fails.
pub fn select_backend(settings: &Settings) -> Box<dyn CacheBackend> {
    if !settings.contains(REDIS_HOST) {
        return Box::new(LocalCache::new());
    }

    let host = match settings.get_str(REDIS_HOST) {
        Ok(host) if !host.trim().is_empty() => host.trim(),
        _ => {
            warn!("Ignoring blank or non-string redis_host setting");
            return Box::new(LocalCache::new());
        }
    };

    open_remote(host)
}

#[cfg(feature = "redis")]
fn open_remote(host: &str) -> Box<dyn CacheBackend> {
    match RedisCache::open(host) {
        Ok(cache) => {
            debug!(redis_host = host, "Using Redis cache backend");
            Box::new(cache)
        }
        Err(e) => {
            warn!(redis_host = host, error = %e, "Invalid Redis host, using local cache");
            Box::new(LocalCache::new())
        }
    }
}

#[cfg(not(feature = "redis"))]
fn open_remote(host: &str) -> Box<dyn CacheBackend> {
    warn!(
        redis_host = host,
        "Redis support not compiled in, using local cache"
    );
    Box::new(LocalCache::new())
}
