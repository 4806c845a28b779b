use std::sync::Arc;

use polyedit_core::Polygon;

use crate::batch::{build_batches, RenderBatch, RenderContext};
use crate::cache::{scene_fingerprint, BatchCache, BatchCacheStats};
use crate::config::BatchConfig;
use crate::strategy::BatchStrategy;

/// Turns a polygon set and view state into prioritized render batches.
///
/// Owned by whoever drives the frame loop; create one per canvas.
pub struct RenderBatchManager {
    config: BatchConfig,
    cache: BatchCache,
}

impl RenderBatchManager {
    pub fn new(config: BatchConfig) -> Self {
        let cache = BatchCache::new(&config);
        Self { config, cache }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Batches for `polygons` under `context`, from the cache when the view
    /// is close enough to one already built.
    pub fn create_batches(&mut self, polygons: &[Polygon], context: &RenderContext) -> Arc<Vec<RenderBatch>> {
        let fingerprint = scene_fingerprint(polygons, context.data_revision);
        if let Some(batches) = self.cache.lookup(fingerprint, context) {
            return batches;
        }

        let strategy = BatchStrategy::select(polygons.len(), context);
        log::debug!(
            "Batch cache miss: {} polygons at zoom {:.2}, {} strategy",
            polygons.len(),
            context.zoom,
            strategy.name
        );
        let batches = Arc::new(build_batches(polygons, context, &strategy));
        self.cache.insert(fingerprint, context, Arc::clone(&batches));
        batches
    }

    pub fn cache_stats(&self) -> BatchCacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for RenderBatchManager {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}
