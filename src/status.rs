use std::fmt;

use url::Url;

use crate::xml::Element;

/// State of an asynchronous WPS job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Accepted,
    Started,
    Finished,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed)
    }

    /// Whether a job observed in `self` may next be observed in `next`.
    pub fn can_become(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Accepted, _) => true,
            (Started, Finished | Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Accepted => "ACCEPTED",
            JobStatus::Started => "STARTED",
            JobStatus::Finished => "FINISHED",
            JobStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// One observation of an asynchronous job.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub status: JobStatus,
    /// 0 when accepted, 100 when finished, `None` when failed.
    pub percent_completed: Option<u8>,
    /// Absolute status location, resolved against the service URL.
    pub status_url: Url,
    pub document: Element,
}

impl StatusSnapshot {
    /// Whether `other` differs in a way worth reporting to a status callback.
    pub fn changed_from(&self, other: &StatusSnapshot) -> bool {
        self.status != other.status || self.percent_completed != other.percent_completed
    }
}
