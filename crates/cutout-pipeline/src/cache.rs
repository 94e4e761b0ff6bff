//! Single-entry cache of the most recent cleaned image.
//!
//! Re-running the geometry stages with new parameters must not repeat
//! segmentation. The cache holds the decoded buffer for one job so that
//! [`CleanedImageCache::reprocess`] only re-runs the local pipeline.

use crate::buffer::PixelBuffer;
use crate::types::{PipelineConfig, PipelineError, PolygonSet};

/// Holds the decoded cleaned image for one segmentation job.
#[derive(Debug, Default)]
pub struct CleanedImageCache {
    entry: Option<(String, PixelBuffer)>,
}

/// Errors from [`CleanedImageCache::reprocess`].
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No buffer is cached for the requested job.
    #[error("no cleaned image cached for job {0}")]
    Miss(String),

    /// The pipeline itself failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl CleanedImageCache {
    /// An empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self { entry: None }
    }

    /// Replace the cached entry.
    pub fn store(&mut self, job_id: impl Into<String>, buffer: PixelBuffer) {
        let job_id = job_id.into();
        tracing::debug!(job_id, "caching cleaned image");
        self.entry = Some((job_id, buffer));
    }

    /// The cached buffer, if it belongs to `job_id`.
    #[must_use]
    pub fn get(&self, job_id: &str) -> Option<&PixelBuffer> {
        self.entry
            .as_ref()
            .filter(|(id, _)| id == job_id)
            .map(|(_, buffer)| buffer)
    }

    /// Job id of the cached entry.
    #[must_use]
    pub fn job_id(&self) -> Option<&str> {
        self.entry.as_ref().map(|(id, _)| id.as_str())
    }

    /// Drop the cached entry.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Re-run the local pipeline on the cached buffer for `job_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Miss`] when the cache holds a different job
    /// or nothing at all, and [`CacheError::Pipeline`] when the pipeline
    /// rejects `config`.
    pub fn reprocess(&self, job_id: &str, config: &PipelineConfig) -> Result<PolygonSet, CacheError> {
        let buffer = self
            .get(job_id)
            .ok_or_else(|| CacheError::Miss(job_id.to_owned()))?;
        Ok(crate::process(buffer, config)?)
    }
}
