// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded memo of entity rasters.
//!
//! Rasters are keyed by entity id, snapshot generation and the exact region
//! rasterized. A new snapshot always has a new generation, so stale entries
//! are never returned; they simply age out under least-recently-used
//! eviction or are dropped eagerly by [`CacheModule::invalidate_entity`].

use core::fmt;
use core::num::NonZeroUsize;
use std::sync::Arc;

use image::RgbaImage;
use kurbo::Rect;
use lru::LruCache;

use crate::id::EntityId;
use crate::version::Generation;

/// Cache key for one entity raster.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The entity.
    pub entity: EntityId,
    /// Generation of the rasterized snapshot.
    pub generation: Generation,
    region: [u64; 4],
}

impl CacheKey {
    /// Creates a key for rasterizing `entity` at `generation` over `region`.
    #[must_use]
    pub fn new(entity: EntityId, generation: Generation, region: Rect) -> Self {
        Self {
            entity,
            generation,
            region: [
                region.x0.to_bits(),
                region.y0.to_bits(),
                region.x1.to_bits(),
                region.y1.to_bits(),
            ],
        }
    }
}

/// LRU cache of entity rasters.
pub struct CacheModule {
    /// `None` when caching is disabled.
    entries: Option<LruCache<CacheKey, Arc<RgbaImage>>>,
    hits: u64,
    misses: u64,
}

impl fmt::Debug for CacheModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheModule")
            .field("len", &self.len())
            .field("capacity", &self.entries.as_ref().map(LruCache::cap))
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish_non_exhaustive()
    }
}

impl CacheModule {
    /// Creates a cache holding at most `capacity` rasters. A capacity of zero
    /// disables caching.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the cached raster for `key`, producing and storing it with
    /// `rasterize` on a miss.
    pub fn get_or_rasterize(
        &mut self,
        key: CacheKey,
        rasterize: impl FnOnce() -> RgbaImage,
    ) -> Arc<RgbaImage> {
        if let Some(image) = self.entries.as_mut().and_then(|entries| entries.get(&key)) {
            self.hits += 1;
            return Arc::clone(image);
        }

        self.misses += 1;
        let image = Arc::new(rasterize());
        if let Some(entries) = &mut self.entries {
            entries.put(key, Arc::clone(&image));
        }
        image
    }

    /// Whether a raster for `key` is cached. Does not count as a use.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .as_ref()
            .is_some_and(|entries| entries.contains(key))
    }

    /// Drops every raster of `entity`.
    pub fn invalidate_entity(&mut self, entity: &EntityId) {
        let Some(entries) = &mut self.entries else {
            return;
        };
        let stale: Vec<CacheKey> = entries
            .iter()
            .filter(|(key, _)| key.entity == *entity)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        if !stale.is_empty() {
            log::trace!("cache: dropped {} rasters of {entity}", stale.len());
        }
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        if let Some(entries) = &mut self.entries {
            entries.clear();
        }
    }

    /// Number of cached rasters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lookups served from the cache.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that had to rasterize.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses
    }
}
