use crate::redis_client::RedisClient;

pub mod tickets;

pub use tickets::{CatalogKey, CatalogLookup, FillToken};

/// Read-through cache for the public catalog. Without Redis every lookup
/// misses and writes are dropped.
#[derive(Clone)]
pub struct CacheService {
    redis: Option<RedisClient>,
    ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, ttl_seconds: u64) -> Self {
        Self {
            redis: Some(redis),
            ttl_seconds,
        }
    }

    pub fn disabled() -> Self {
        Self {
            redis: None,
            ttl_seconds: 0,
        }
    }
}
