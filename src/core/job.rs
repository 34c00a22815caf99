use crate::constants::DEFAULT_EXPECTED_OUTPUT;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Stopped,
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// One production run as the backend reports it. `actual_output` is the
/// authoritative persisted unit count; the scheduler only ever raises it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionJob {
    pub id: JobId,
    pub product_code: String,
    pub status: JobStatus,
    /// Cycle start; all progress is derived from this and the wall clock.
    pub start_instant: chrono::DateTime<chrono::Utc>,
    pub expected_output: u32,
    pub actual_output: u32,
}

impl ProductionJob {
    pub fn new(
        id: JobId,
        product_code: impl Into<String>,
        start_instant: chrono::DateTime<chrono::Utc>,
        expected_output: u32,
    ) -> Self {
        Self {
            id,
            product_code: product_code.into(),
            status: JobStatus::Running,
            start_instant,
            expected_output,
            actual_output: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    /// Records sometimes arrive with a zero target; substitute the sentinel
    /// so the percent math stays total.
    pub fn effective_expected_output(&self) -> u32 {
        if self.expected_output == 0 {
            DEFAULT_EXPECTED_OUTPUT
        } else {
            self.expected_output
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_running_with_no_output() {
        let job = ProductionJob::new(7, "MTR-204", chrono::Utc::now(), 50);
        assert!(job.is_running());
        assert_eq!(job.actual_output, 0);
        assert_eq!(job.effective_expected_output(), 50);
    }

    #[test]
    fn zero_expected_output_falls_back_to_sentinel() {
        let job = ProductionJob::new(1, "GSK-110", chrono::Utc::now(), 0);
        assert_eq!(job.effective_expected_output(), DEFAULT_EXPECTED_OUTPUT);
    }

    #[test]
    fn status_serializes_lowercase() {
        let mut job = ProductionJob::new(3, "CAP-330", chrono::Utc::now(), 10);
        job.status = JobStatus::Stopped;
        let text = toml::to_string(&job).expect("serialize job");
        assert!(text.contains("status = \"stopped\""), "text=\n{}", text);

        let back: ProductionJob = toml::from_str(&text).expect("deserialize job");
        assert_eq!(back, job);
    }
}
