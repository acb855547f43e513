use std::num::NonZeroUsize;

use lru::LruCache;

/// Recently answered "who placed this pixel" lookups, keyed by world and
/// position. Only successful answers are cached.
pub struct PixelInfoCache {
    cache: LruCache<(Option<u32>, u32), String>,
}

impl PixelInfoCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, world_id: Option<u32>, position: u32) -> Option<String> {
        self.cache.get(&(world_id, position)).cloned()
    }

    pub fn put(&mut self, world_id: Option<u32>, position: u32, placed_by: String) {
        self.cache.put((world_id, position), placed_by);
    }

    /// Drop the entry for a pixel that was just repainted.
    pub fn invalidate(&mut self, world_id: Option<u32>, position: u32) {
        self.cache.pop(&(world_id, position));
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = PixelInfoCache::new(2);
        cache.put(None, 1, "alice".into());
        cache.put(None, 2, "bob".into());
        assert_eq!(cache.get(None, 1).as_deref(), Some("alice"));
        cache.put(Some(3), 1, "carol".into());
        assert_eq!(cache.get(None, 2), None);
        assert_eq!(cache.get(Some(3), 1).as_deref(), Some("carol"));
    }

    #[test]
    fn invalidate_and_zero_capacity() {
        let mut cache = PixelInfoCache::new(0);
        cache.put(None, 1, "alice".into());
        cache.invalidate(None, 1);
        assert!(cache.is_empty());
    }
}
