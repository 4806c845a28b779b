use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use serde::Serialize;

use polyedit_core::Polygon;

use crate::batch::{RenderBatch, RenderContext};
use crate::config::BatchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCacheStats {
    /// Exact key matches.
    pub hits: u64,
    /// Reuse of the anchor batches for a nearby view.
    pub approximate_hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Identity of a polygon set: ids, vertex counts and the caller's revision.
pub fn scene_fingerprint(polygons: &[Polygon], revision: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    revision.hash(&mut hasher);
    polygons.len().hash(&mut hasher);
    for polygon in polygons {
        polygon.id.hash(&mut hasher);
        polygon.points.len().hash(&mut hasher);
    }
    hasher.finish()
}

struct CacheEntry {
    fingerprint: u64,
    /// The context the batches were built for.
    context: RenderContext,
    batches: Arc<Vec<RenderBatch>>,
}

fn quantize(value: f64, step: f64) -> i64 {
    if step > 0.0 {
        (value / step).round() as i64
    } else {
        value.to_bits() as i64
    }
}

fn within_tolerance(a: &RenderContext, b: &RenderContext, zoom_tol: f64, viewport_tol: f64) -> bool {
    let viewport_delta = [
        a.viewport.min.x - b.viewport.min.x,
        a.viewport.min.y - b.viewport.min.y,
        a.viewport.max.x - b.viewport.max.x,
        a.viewport.max.y - b.viewport.max.y,
    ]
    .iter()
    .fold(0.0_f64, |m, d| m.max(d.abs()));
    a.is_animating == b.is_animating
        && a.selected_polygon_id == b.selected_polygon_id
        && (a.zoom - b.zoom).abs() < zoom_tol
        && viewport_delta < viewport_tol
}

/// LRU map from quantized view state to built batches.
///
/// Besides exact lookups, the entry that was last built or matched serves as
/// an anchor: any context within tolerance of the anchor's own context reuses
/// its batches. Comparing against the anchor rather than the previous call
/// stops a slow pan from reusing stale batches forever.
pub struct BatchCache {
    entries: LruCache<u64, CacheEntry>,
    anchor: Option<u64>,
    zoom_tolerance: f64,
    viewport_tolerance: f64,
    stats: BatchCacheStats,
}

impl BatchCache {
    pub fn new(config: &BatchConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            anchor: None,
            zoom_tolerance: config.zoom_tolerance,
            viewport_tolerance: config.viewport_tolerance,
            stats: BatchCacheStats::default(),
        }
    }

    fn key(&self, fingerprint: u64, context: &RenderContext) -> u64 {
        let mut hasher = DefaultHasher::new();
        fingerprint.hash(&mut hasher);
        quantize(context.zoom, self.zoom_tolerance).hash(&mut hasher);
        for v in [
            context.viewport.min.x,
            context.viewport.min.y,
            context.viewport.max.x,
            context.viewport.max.y,
        ] {
            quantize(v, self.viewport_tolerance).hash(&mut hasher);
        }
        context.is_animating.hash(&mut hasher);
        context.selected_polygon_id.hash(&mut hasher);
        hasher.finish()
    }

    pub fn lookup(&mut self, fingerprint: u64, context: &RenderContext) -> Option<Arc<Vec<RenderBatch>>> {
        let key = self.key(fingerprint, context);

        if let Some(anchor) = self.anchor {
            if let Some(entry) = self.entries.get(&anchor) {
                if entry.fingerprint == fingerprint
                    && within_tolerance(&entry.context, context, self.zoom_tolerance, self.viewport_tolerance)
                {
                    if anchor == key {
                        self.stats.hits += 1;
                    } else {
                        self.stats.approximate_hits += 1;
                    }
                    return Some(Arc::clone(&entry.batches));
                }
            }
        }

        if let Some(entry) = self.entries.get(&key) {
            if entry.fingerprint == fingerprint
                && within_tolerance(&entry.context, context, self.zoom_tolerance, self.viewport_tolerance)
            {
                let batches = Arc::clone(&entry.batches);
                self.stats.hits += 1;
                self.anchor = Some(key);
                return Some(batches);
            }
        }

        self.stats.misses += 1;
        None
    }

    pub fn insert(&mut self, fingerprint: u64, context: &RenderContext, batches: Arc<Vec<RenderBatch>>) {
        let key = self.key(fingerprint, context);
        self.entries.put(
            key,
            CacheEntry {
                fingerprint,
                context: context.clone(),
                batches,
            },
        );
        self.anchor = Some(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.anchor = None;
    }

    pub fn stats(&self) -> BatchCacheStats {
        BatchCacheStats {
            entries: self.entries.len(),
            ..self.stats
        }
    }
}
