//! Job executor — dispatches jobs to registered handlers.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing;

use indexhub_core::error::AppError;
use indexhub_entity::job::Job;

/// Trait for job handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Get the job type this handler processes
    fn job_type(&self) -> &str;

    /// Execute the job with the given payload
    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError>;
}

/// Error from job execution.
///
/// Every variant is a failure outcome that counts as an attempt.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// The payload did not match the job type's schema
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// No handler is registered for the job type
    #[error("No handler registered for job type '{0}'")]
    UnknownJobType(String),

    /// The handler reported an unsuccessful outcome
    #[error("Job failed: {0}")]
    Failed(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),

    /// The handler panicked
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

/// Deserialize a job's payload into the handler's payload type.
pub fn parse_payload<T: DeserializeOwned>(job: &Job) -> Result<T, JobExecutionError> {
    serde_json::from_value(job.payload.clone()).map_err(|e| {
        JobExecutionError::MalformedPayload(format!("job {} ({}): {e}", job.id, job.job_type))
    })
}

/// Dispatches jobs to the appropriate handler based on job_type
#[derive(Debug, Default)]
pub struct JobExecutor {
    /// Registered job handlers by type
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create a new job executor
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job handler
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        tracing::info!(job_type = %job_type, "Registered job handler");
        self.handlers.insert(job_type, handler);
    }

    /// Execute a job by dispatching to the correct handler.
    ///
    /// A handler panic is caught here and reported as
    /// [`JobExecutionError::Panicked`]; it never reaches the worker loop.
    pub async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let handler = self
            .handlers
            .get(&job.job_type)
            .ok_or_else(|| JobExecutionError::UnknownJobType(job.job_type.clone()))?;

        tracing::info!(
            job_id = job.id,
            job_type = %job.job_type,
            attempts = job.attempts,
            max_attempts = job.max_attempts,
            "Executing job"
        );

        match AssertUnwindSafe(handler.execute(job)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(JobExecutionError::Panicked(panic_message(panic.as_ref()))),
        }
    }

    /// Check if a handler is registered for a job type
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Get the list of registered job types
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use indexhub_entity::job::JobStatus;
    use serde_json::json;

    #[derive(Debug)]
    struct PanickingHandler;

    #[async_trait]
    impl JobHandler for PanickingHandler {
        fn job_type(&self) -> &str {
            "explodes"
        }

        async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
            panic!("boom");
        }
    }

    fn job(job_type: &str, payload: Value) -> Job {
        let now = Utc::now();
        Job {
            id: 1,
            job_type: job_type.to_string(),
            target_id: None,
            payload,
            status: JobStatus::Running,
            attempts: 1,
            max_attempts: 5,
            last_error: None,
            locked: true,
            locked_at: Some(now),
            runner_id: Some("test".to_string()),
            dedupe_key: format!("{job_type}:test"),
            run_after: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_unknown_type_is_a_failure() {
        let executor = JobExecutor::new();
        let err = executor.execute(&job("mystery", json!({}))).await.unwrap_err();
        assert!(matches!(err, JobExecutionError::UnknownJobType(t) if t == "mystery"));
    }

    #[tokio::test]
    async fn test_panic_is_caught() {
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(PanickingHandler));
        assert!(executor.has_handler("explodes"));

        let err = executor.execute(&job("explodes", json!({}))).await.unwrap_err();
        assert!(matches!(err, JobExecutionError::Panicked(msg) if msg == "boom"));
    }

    #[test]
    fn test_parse_payload_reports_malformed() {
        #[derive(Debug, serde::Deserialize)]
        struct Wants {
            #[allow(dead_code)]
            item_id: i64,
        }

        let err = parse_payload::<Wants>(&job("embed_content", json!({"item_id": "x"}))).unwrap_err();
        assert!(matches!(err, JobExecutionError::MalformedPayload(_)));
    }
}
