//! Scheduler/executor timeouts and retry policy (§5), loaded the same way
//! the teacher's `ScanConfig` is: a `Deserialize` struct with
//! `#[serde(default)]` leaves and an `effective_*` accessor per field.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SchedulerConfig {
    pub job_execution_timeout_seconds: Option<u64>,
    pub job_creation_timeout_seconds: Option<u64>,
    pub job_retries: Option<u32>,
    pub job_retry_deadline_seconds: Option<u64>,
}

impl SchedulerConfig {
    pub fn effective_job_execution_timeout_seconds(&self) -> u64 {
        self.job_execution_timeout_seconds.unwrap_or(3600)
    }

    pub fn effective_job_creation_timeout_seconds(&self) -> u64 {
        self.job_creation_timeout_seconds.unwrap_or(60)
    }

    pub fn effective_job_retries(&self) -> u32 {
        self.job_retries.unwrap_or(3)
    }

    pub fn effective_job_retry_deadline_seconds(&self) -> u64 {
        self.job_retry_deadline_seconds.unwrap_or(3600)
    }
}
