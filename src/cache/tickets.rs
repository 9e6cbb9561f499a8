use crate::cache::CacheService;
use redis::AsyncCommands;
use tracing::{debug, warn};

/// Bumped on every invalidation. A refill only lands if the generation it
/// started under is still current, so a listing read before a write cannot be
/// cached after that write's invalidation.
const GENERATION_KEY: &str = "catalog:generation";

const FILL_IF_CURRENT: &str = r#"
if (redis.call('GET', KEYS[2]) or '0') == ARGV[2] then
    redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[3])
    return 1
end
return 0
"#;

/// Cached public listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKey {
    AllTickets,
    Advertised,
}

impl CatalogKey {
    pub const ALL: [CatalogKey; 2] = [CatalogKey::AllTickets, CatalogKey::Advertised];

    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKey::AllTickets => "catalog:all-tickets",
            CatalogKey::Advertised => "catalog:tickets-advertise",
        }
    }
}

/// Generation observed on a miss; `None` when there is nothing to refill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillToken(Option<String>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLookup {
    Hit(String),
    Miss(FillToken),
}

impl CacheService {
    /// Cached JSON for `key`. Redis faults count as a miss that will not be
    /// refilled.
    pub async fn get_catalog(&self, key: CatalogKey) -> CatalogLookup {
        let Some(redis) = &self.redis else {
            return CatalogLookup::Miss(FillToken(None));
        };
        let mut conn = redis.conn.clone();
        let read: redis::RedisResult<(Option<String>, Option<String>)> = redis::pipe()
            .get(key.as_str())
            .get(GENERATION_KEY)
            .query_async(&mut conn)
            .await;
        match read {
            Ok((Some(json), _)) => CatalogLookup::Hit(json),
            Ok((None, generation)) => {
                CatalogLookup::Miss(FillToken(Some(generation.unwrap_or_else(|| "0".to_string()))))
            }
            Err(e) => {
                warn!("catalog cache read failed for {}: {:?}", key.as_str(), e);
                CatalogLookup::Miss(FillToken(None))
            }
        }
    }

    pub async fn put_catalog(&self, key: CatalogKey, json: &str, token: FillToken) {
        let (Some(redis), FillToken(Some(generation))) = (&self.redis, token) else {
            return;
        };
        let mut conn = redis.conn.clone();
        let written: redis::RedisResult<i64> = redis::Script::new(FILL_IF_CURRENT)
            .key(key.as_str())
            .key(GENERATION_KEY)
            .arg(json)
            .arg(generation)
            .arg(self.ttl_seconds)
            .invoke_async(&mut conn)
            .await;
        match written {
            Ok(0) => debug!("catalog refill for {} skipped, invalidated meanwhile", key.as_str()),
            Ok(_) => {}
            Err(e) => warn!("catalog cache write failed for {}: {:?}", key.as_str(), e),
        }
    }

    /// Drops every cached listing and bumps the generation. Called after any
    /// write that can change what the public catalog shows.
    pub async fn invalidate_catalog(&self) {
        let Some(redis) = &self.redis else { return };
        let mut conn = redis.conn.clone();
        let keys: Vec<&str> = CatalogKey::ALL.iter().map(CatalogKey::as_str).collect();
        let result: redis::RedisResult<(i64, i64)> = redis::pipe()
            .atomic()
            .del(keys)
            .incr(GENERATION_KEY, 1)
            .query_async(&mut conn)
            .await;
        match result {
            Ok((removed, generation)) => {
                debug!("catalog cache invalidated ({} keys, generation {})", removed, generation)
            }
            Err(e) => warn!("catalog cache invalidation failed: {:?}", e),
        }
    }
}
