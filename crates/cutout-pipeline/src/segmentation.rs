//! State machine for the external background-removal job.
//!
//! The segmentation service is asynchronous: an image is submitted,
//! then a status endpoint is polled until the job completes, fails, or
//! the attempt budget runs out. This module owns the state and the
//! transition rules but performs no I/O. Callers feed it
//! [`PollResponse`]s, or hand [`wait_for_completion`] a
//! [`StatusSource`] and a [`Sleeper`] to drive the loop.
//!
//! ```text
//! Idle -> Submitted -> Polling -> Completed
//!                          |  \-> Failed
//!                          \----> TimedOut
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Status reported by the poll endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Still working.
    Processing,
    /// Finished; a cleaned image is available.
    Completed,
    /// Gave up.
    Failed,
}

/// Body of one poll-endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    /// Job status.
    pub status: JobStatus,
    /// Where to fetch the cleaned image, once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaned_image_url: Option<String>,
    /// Service error message, when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PollResponse {
    /// A still-processing response.
    #[must_use]
    pub const fn processing() -> Self {
        Self {
            status: JobStatus::Processing,
            cleaned_image_url: None,
            error: None,
        }
    }

    /// A completed response pointing at `url`.
    #[must_use]
    pub fn completed(url: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Completed,
            cleaned_image_url: Some(url.into()),
            error: None,
        }
    }

    /// A failed response carrying `message`.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            cleaned_image_url: None,
            error: Some(message.into()),
        }
    }
}

/// How often and how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before each poll.
    pub interval: Duration,
    /// Polls allowed before the job is declared timed out.
    pub max_attempts: u32,
}

impl PollPolicy {
    /// Default for [`interval`](Self::interval).
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);
    /// Default for [`max_attempts`](Self::max_attempts).
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Where a job currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Nothing submitted.
    Idle,
    /// Submitted, not yet polled.
    Submitted {
        /// Service job id.
        job_id: String,
    },
    /// Polled at least once and still processing.
    Polling {
        /// Service job id.
        job_id: String,
        /// Polls made so far.
        attempts: u32,
    },
    /// Cleaned image is ready.
    Completed {
        /// Service job id.
        job_id: String,
        /// Location of the cleaned image.
        cleaned_image_url: String,
    },
    /// The service reported failure.
    Failed {
        /// Service job id.
        job_id: String,
        /// Reason, as reported.
        message: String,
    },
    /// The attempt budget ran out.
    TimedOut {
        /// Service job id.
        job_id: String,
        /// Polls made.
        attempts: u32,
    },
}

impl JobState {
    /// Short name for logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitted { .. } => "submitted",
            Self::Polling { .. } => "polling",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::TimedOut { .. } => "timed-out",
        }
    }

    /// Whether no further polling will happen.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::TimedOut { .. }
        )
    }
}

/// Errors surfaced by a segmentation job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentationError {
    /// The service reported failure.
    #[error("segmentation job {job_id} failed: {message}")]
    Failed {
        /// Service job id.
        job_id: String,
        /// Reason.
        message: String,
    },

    /// The job did not finish within the attempt budget.
    #[error("segmentation job {job_id} timed out after {attempts} polls")]
    TimedOut {
        /// Service job id.
        job_id: String,
        /// Polls made.
        attempts: u32,
    },

    /// An event arrived in a state that cannot accept it.
    #[error("cannot {event} while {state}")]
    InvalidTransition {
        /// State name at the time.
        state: &'static str,
        /// What was attempted.
        event: &'static str,
    },
}

impl SegmentationError {
    /// Whether resubmitting the image may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::TimedOut { .. })
    }
}

/// One segmentation job and its polling budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationJob {
    state: JobState,
    policy: PollPolicy,
}

impl Default for SegmentationJob {
    fn default() -> Self {
        Self::new(PollPolicy::default())
    }
}

impl SegmentationJob {
    /// An idle job.
    #[must_use]
    pub const fn new(policy: PollPolicy) -> Self {
        Self {
            state: JobState::Idle,
            policy,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &JobState {
        &self.state
    }

    /// Polling policy.
    #[must_use]
    pub const fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Record that an image was submitted as `job_id`.
    ///
    /// Allowed from idle or any terminal state; a new image replaces
    /// whatever came before.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentationError::InvalidTransition`] while a job is
    /// already in flight.
    pub fn submit(&mut self, job_id: impl Into<String>) -> Result<(), SegmentationError> {
        if matches!(
            self.state,
            JobState::Submitted { .. } | JobState::Polling { .. }
        ) {
            return Err(self.invalid("submit"));
        }
        let job_id = job_id.into();
        tracing::debug!(%job_id, "segmentation job submitted");
        self.state = JobState::Submitted { job_id };
        Ok(())
    }

    /// Abandon the job and return to idle.
    pub fn reset(&mut self) {
        self.state = JobState::Idle;
    }

    /// The in-flight job id, if any.
    #[must_use]
    pub fn job_id(&self) -> Option<&str> {
        match &self.state {
            JobState::Idle => None,
            JobState::Submitted { job_id }
            | JobState::Polling { job_id, .. }
            | JobState::Completed { job_id, .. }
            | JobState::Failed { job_id, .. }
            | JobState::TimedOut { job_id, .. } => Some(job_id),
        }
    }

    /// Apply one poll result.
    ///
    /// A completed response without an image URL counts as a failure.
    /// A processing response that uses up the last attempt times out.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentationError::InvalidTransition`] unless the job
    /// is submitted or polling.
    pub fn record(&mut self, response: &PollResponse) -> Result<&JobState, SegmentationError> {
        let (job_id, attempts) = match &self.state {
            JobState::Submitted { job_id } => (job_id.clone(), 1),
            JobState::Polling { job_id, attempts } => (job_id.clone(), attempts + 1),
            _ => return Err(self.invalid("record a poll")),
        };

        self.state = match (response.status, &response.cleaned_image_url) {
            (JobStatus::Completed, Some(url)) => JobState::Completed {
                job_id,
                cleaned_image_url: url.clone(),
            },
            (JobStatus::Completed, None) => JobState::Failed {
                job_id,
                message: "completed without a cleaned image".to_owned(),
            },
            (JobStatus::Failed, _) => JobState::Failed {
                job_id,
                message: response
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_owned()),
            },
            (JobStatus::Processing, _) if attempts >= self.policy.max_attempts => {
                tracing::warn!(%job_id, attempts, "segmentation job timed out");
                JobState::TimedOut { job_id, attempts }
            }
            (JobStatus::Processing, _) => JobState::Polling { job_id, attempts },
        };
        Ok(&self.state)
    }

    /// Terminal result, or `None` while still in flight or idle.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<&str, SegmentationError>> {
        match &self.state {
            JobState::Completed {
                cleaned_image_url, ..
            } => Some(Ok(cleaned_image_url)),
            JobState::Failed { job_id, message } => Some(Err(SegmentationError::Failed {
                job_id: job_id.clone(),
                message: message.clone(),
            })),
            JobState::TimedOut { job_id, attempts } => Some(Err(SegmentationError::TimedOut {
                job_id: job_id.clone(),
                attempts: *attempts,
            })),
            _ => None,
        }
    }

    const fn invalid(&self, event: &'static str) -> SegmentationError {
        SegmentationError::InvalidTransition {
            state: self.state.name(),
            event,
        }
    }
}

/// Something that can report a job's status.
pub trait StatusSource {
    /// Fetch the current status of `job_id`. Transport failures should
    /// be reported as [`JobStatus::Failed`].
    fn poll(&mut self, job_id: &str) -> PollResponse;
}

/// Waits between polls. Injected so tests need not sleep.
pub trait Sleeper {
    /// Block for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Real-time sleeper backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Poll a submitted job until it reaches a terminal state.
///
/// Sleeps [`PollPolicy::interval`] before every poll. Returns the cleaned
/// image URL on success.
///
/// # Errors
///
/// Returns [`SegmentationError::Failed`] or
/// [`SegmentationError::TimedOut`] for a job that does not complete, and
/// [`SegmentationError::InvalidTransition`] if nothing is in flight.
pub fn wait_for_completion<S, Z>(
    job: &mut SegmentationJob,
    source: &mut S,
    sleeper: &mut Z,
) -> Result<String, SegmentationError>
where
    S: StatusSource + ?Sized,
    Z: Sleeper + ?Sized,
{
    loop {
        if let Some(outcome) = job.outcome() {
            return outcome.map(str::to_owned);
        }
        let job_id = match job.state() {
            JobState::Submitted { job_id } | JobState::Polling { job_id, .. } => job_id.clone(),
            _ => return Err(job.invalid("wait")),
        };
        sleeper.sleep(job.policy.interval);
        let response = source.poll(&job_id);
        job.record(&response)?;
    }
}
