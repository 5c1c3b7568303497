//! Key-value cache in front of the author store.
//!
//! The cache holds JSON documents under string keys, each with its own expiry.
//! It is a disposable view of the database: callers treat every error from it
//! as a miss.

mod memory;
mod redis_cache;

pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Key of the cached listing of every author.
pub const AUTHORS_KEY: &str = "authors";

pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Key of a single cached author.
pub fn author_key(id: i64) -> String {
    format!("author:{id}")
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend is unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removes every key in `keys`. Missing keys are not an error.
    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError>;
}
