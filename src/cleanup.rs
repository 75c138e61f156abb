use std::fmt;

use tracing::debug;
use url::Url;

use crate::client::WpsClient;
use crate::error::{Error, Result};
use crate::templates;
use crate::util::job_id_from_status_url;

/// Releases the server-side resources of a finished asynchronous job.
///
/// Runs once after every asynchronous execution, whatever its outcome.
/// Errors are logged by the client and never reach the caller.
pub trait CleanupHandler: fmt::Debug + Send + Sync {
    fn cleanup(&self, client: &WpsClient, status_url: &Url) -> Result<()>;
}

/// Leaves jobs to expire on the server.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCleanup;

impl CleanupHandler for NoCleanup {
    fn cleanup(&self, _client: &WpsClient, _status_url: &Url) -> Result<()> {
        Ok(())
    }
}

/// Deletes the job with a synchronous `vires:remove_job` request keyed by
/// the job id found in the status URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveJob;

impl CleanupHandler for RemoveJob {
    fn cleanup(&self, client: &WpsClient, status_url: &Url) -> Result<()> {
        let job_id = job_id_from_status_url(status_url)
            .ok_or_else(|| Error::InvalidInput(format!("invalid status URL {}", status_url)))?;
        debug!("removing asynchronous job {}", job_id);
        client.execute_small(&templates::remove_job(job_id))?;
        Ok(())
    }
}
