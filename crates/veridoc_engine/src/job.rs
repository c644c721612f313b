//! Background-job status reporting.
//!
//! Loads may run inside a longer-running background job. While a
//! [`JobScope`] is installed on the current thread, orchestrator log
//! messages are collected on its [`JobStatus`] instead of going to the
//! general log.

use parking_lot::Mutex;
use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    static CURRENT_JOB: RefCell<Option<Arc<JobStatus>>> = const { RefCell::new(None) };
}

/// Progress and message sink of one background job.
#[derive(Debug, Default)]
pub struct JobStatus {
    info: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl JobStatus {
    /// Creates an empty status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an informational message.
    pub fn log_info(&self, message: impl Into<String>) {
        self.info.lock().push(message.into());
    }

    /// Records an error message.
    pub fn log_error(&self, message: impl Into<String>) {
        self.errors.lock().push(message.into());
    }

    /// Returns the recorded informational messages.
    #[must_use]
    pub fn info(&self) -> Vec<String> {
        self.info.lock().clone()
    }

    /// Returns the recorded error messages.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    /// Returns true if any error was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.lock().is_empty()
    }
}

/// Installs a job status on the current thread for its lifetime.
///
/// Scopes nest; the previous status is restored on drop, on every exit
/// path.
#[derive(Debug)]
pub struct JobScope {
    previous: Option<Arc<JobStatus>>,
}

impl JobScope {
    /// Enters a job scope.
    #[must_use]
    pub fn enter(status: Arc<JobStatus>) -> Self {
        let previous = CURRENT_JOB.with(|current| current.replace(Some(status)));
        Self { previous }
    }
}

impl Drop for JobScope {
    fn drop(&mut self) {
        CURRENT_JOB.with(|current| *current.borrow_mut() = self.previous.take());
    }
}

/// Returns the job status installed on the current thread, if any.
#[must_use]
pub fn current_job() -> Option<Arc<JobStatus>> {
    CURRENT_JOB.with(|current| current.borrow().clone())
}

/// Logs an informational message to the current job, else to the log.
pub fn log_info(message: &str) {
    match current_job() {
        Some(job) => job.log_info(message),
        None => tracing::info!("{message}"),
    }
}

/// Logs an error message to the current job, else to the log.
pub fn log_error(message: &str) {
    match current_job() {
        Some(job) => job.log_error(message),
        None => tracing::error!("{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_route_to_installed_job() {
        let status = Arc::new(JobStatus::new());
        {
            let _scope = JobScope::enter(Arc::clone(&status));
            log_info("loading");
            log_error("failed");
        }
        // Outside the scope messages go to the general log, not the job.
        log_info("after");

        assert_eq!(status.info(), vec!["loading".to_string()]);
        assert_eq!(status.errors(), vec!["failed".to_string()]);
        assert!(status.has_errors());
    }

    #[test]
    fn scopes_nest_and_restore() {
        let outer = Arc::new(JobStatus::new());
        let inner = Arc::new(JobStatus::new());

        let _outer_scope = JobScope::enter(Arc::clone(&outer));
        {
            let _inner_scope = JobScope::enter(Arc::clone(&inner));
            log_info("inner");
        }
        log_info("outer");

        assert_eq!(inner.info(), vec!["inner".to_string()]);
        assert_eq!(outer.info(), vec!["outer".to_string()]);
    }

    #[test]
    fn no_job_installed_by_default() {
        assert!(current_job().is_none());
    }
}
