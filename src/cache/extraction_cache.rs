use serde_json::Value;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// How long a cached extraction stays valid. Re-renders of the same image
/// within this window never repeat the paid API call.
const CACHE_TTL: Duration = Duration::from_secs(3600);

struct CacheEntry {
    result: Value,
    stored_at: Instant,
}

static CACHE: std::sync::OnceLock<Arc<RwLock<HashMap<u64, CacheEntry>>>> = std::sync::OnceLock::new();

fn cache() -> &'static Arc<RwLock<HashMap<u64, CacheEntry>>> {
    CACHE.get_or_init(|| Arc::new(RwLock::new(HashMap::new())))
}

/// Cache key: image bytes plus the expected-items hint, since the hint
/// changes the prompt and therefore the result.
pub fn extraction_key(image_bytes: &[u8], expected_items: u32) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    image_bytes.hash(&mut hasher);
    expected_items.hash(&mut hasher);
    hasher.finish()
}

pub fn get_cached_extraction(key: u64) -> Option<Value> {
    {
        let guard = cache().read().ok()?;
        if let Some(entry) = guard.get(&key) {
            if entry.stored_at.elapsed() < CACHE_TTL {
                return Some(entry.result.clone());
            }
        } else {
            return None;
        }
    }
    // Entry exists but expired: drop it.
    if let Ok(mut guard) = cache().write() {
        guard.remove(&key);
    }
    None
}

pub fn set_cached_extraction(key: u64, result: Value) {
    if let Ok(mut guard) = cache().write() {
        guard.insert(
            key,
            CacheEntry {
                result,
                stored_at: Instant::now(),
            },
        );
    }
}

#[allow(dead_code)]
pub fn clear_all_cache() {
    if let Ok(mut guard) = cache().write() {
        guard.clear();
    }
}
