//! One photo's trip through segmentation and local reprocessing.
//!
//! [`Session`] owns both the [`SegmentationJob`] and the
//! [`CleanedImageCache`], so submitting a new image always drops the
//! previous image's buffer. Once the job completes, the caller fetches
//! and decodes the cleaned image, hands it to [`Session::complete`], and
//! can then [`reprocess`](Session::reprocess) as often as parameters
//! change.

use crate::buffer::PixelBuffer;
use crate::cache::{CacheError, CleanedImageCache};
use crate::segmentation::{
    JobState, PollPolicy, SegmentationError, SegmentationJob, Sleeper, StatusSource,
    wait_for_completion,
};
use crate::types::{PipelineConfig, PolygonSet};

/// Segmentation job plus the cleaned image it produced.
#[derive(Debug, Default)]
pub struct Session {
    job: SegmentationJob,
    cache: CleanedImageCache,
}

impl Session {
    /// An idle session.
    #[must_use]
    pub const fn new(policy: PollPolicy) -> Self {
        Self {
            job: SegmentationJob::new(policy),
            cache: CleanedImageCache::new(),
        }
    }

    /// The segmentation job.
    #[must_use]
    pub const fn job(&self) -> &SegmentationJob {
        &self.job
    }

    /// Submit a new image as `job_id`, discarding any cached buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentationError::InvalidTransition`] while a job is
    /// already in flight; the cache is left untouched in that case.
    pub fn submit(&mut self, job_id: impl Into<String>) -> Result<(), SegmentationError> {
        self.job.submit(job_id)?;
        self.cache.invalidate();
        Ok(())
    }

    /// Poll until the job finishes; returns the cleaned image location.
    ///
    /// # Errors
    ///
    /// See [`wait_for_completion`].
    pub fn wait<S, Z>(&mut self, source: &mut S, sleeper: &mut Z) -> Result<String, SegmentationError>
    where
        S: StatusSource + ?Sized,
        Z: Sleeper + ?Sized,
    {
        wait_for_completion(&mut self.job, source, sleeper)
    }

    /// Cache the decoded cleaned image for the completed job.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentationError::InvalidTransition`] unless the job
    /// has completed.
    pub fn complete(&mut self, buffer: PixelBuffer) -> Result<(), SegmentationError> {
        let JobState::Completed { job_id, .. } = self.job.state() else {
            return Err(SegmentationError::InvalidTransition {
                state: self.job.state().name(),
                event: "cache a cleaned image",
            });
        };
        self.cache.store(job_id.clone(), buffer);
        Ok(())
    }

    /// The cleaned image of the current job, once cached.
    #[must_use]
    pub fn cleaned(&self) -> Option<&PixelBuffer> {
        self.cache.get(self.job.job_id()?)
    }

    /// Re-run the local pipeline on the current job's cleaned image.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Miss`] before [`complete`](Self::complete)
    /// has cached a buffer for the current job, and
    /// [`CacheError::Pipeline`] when the pipeline rejects `config`.
    pub fn reprocess(&self, config: &PipelineConfig) -> Result<PolygonSet, CacheError> {
        let job_id = self.job.job_id().unwrap_or_default();
        self.cache.reprocess(job_id, config)
    }
}
