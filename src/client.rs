use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{Span, debug, error, info, info_span, warn};
use url::Url;

use crate::auth::Credential;
use crate::cleanup::{CleanupHandler, RemoveJob};
use crate::codec::{error_from_response, extract_fault, extract_output_reference, parse_status};
use crate::config::load_config;
use crate::error::{Error, Result};
use crate::sink::Sink;
use crate::status::{JobStatus, StatusSnapshot};
use crate::templates;
use crate::xml::Element;

pub const DEFAULT_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
pub const DEFAULT_OUTPUT_NAME: &str = "output";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WPS endpoint, e.g. `https://vires.services/ows`.
    pub url: String,
    pub credential: Credential,
}

/// WPS 1.0 protocol client.
///
/// Credential headers are fixed at construction and sent with every request,
/// including status polls, output downloads and job cleanup.
#[derive(Debug, Clone)]
pub struct WpsClient {
    url: Url,

    timeout: Duration,
    poll_interval: Duration,
    poll_timeout: Option<Duration>,
    output_name: String,
    content_type: String,
    cleanup: Arc<dyn CleanupHandler>,
    span: Span,

    http: HttpClient,
}

impl WpsClient {
    /// Creates a client from explicit arguments, environment variables and
    /// the `~/.viresclient.ini` credentials file, in that order.
    pub fn from_env() -> anyhow::Result<Self> {
        let cfg = load_config(None, None, None)?;
        Ok(Self::from_config(&cfg)?)
    }

    pub fn from_config(cfg: &ClientConfig) -> Result<Self> {
        Self::new(&cfg.url, &cfg.credential)
    }

    pub fn new(url: &str, credential: &Credential) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| Error::InvalidInput(format!("invalid service URL {:?}: {}", url, e)))?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("wpsclient-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("wpsclient-rs")),
        );
        let auth = credential
            .headers()
            .map_err(|e| Error::InvalidInput(format!("credential is not a valid header: {}", e)))?;
        default_headers.extend(auth);

        let http = HttpClient::builder()
            .default_headers(default_headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .build()?;

        let span = info_span!("wps", url = %url);

        Ok(Self {
            url,
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            poll_timeout: None,
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            cleanup: Arc::new(RemoveJob),
            span,
            http,
        })
    }

    /// Timeout of the submit, status and cleanup exchanges. Output bodies are
    /// streamed without an overall limit; only connecting is bounded there.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Gives up on an asynchronous job that has not reached a terminal
    /// state within `limit`. `None` (the default) polls indefinitely.
    pub fn with_poll_timeout(mut self, limit: Option<Duration>) -> Self {
        self.poll_timeout = limit;
        self
    }

    pub fn with_output_name(mut self, output_name: impl Into<String>) -> Self {
        self.output_name = output_name.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_cleanup(mut self, cleanup: impl CleanupHandler + 'static) -> Self {
        self.cleanup = Arc::new(cleanup);
        self
    }

    /// Logging span entered around every operation of this client.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Sends a synchronous execute request and streams the raw response
    /// into `sink`. Returns the number of bytes written.
    pub fn execute_sync<W: Write>(&self, request: &[u8], sink: &mut Sink<'_, W>) -> Result<u64> {
        let _entered = self.span.enter();
        let mut resp = self.post(request, Deadline::Connect)?;
        let size = resp.content_length();
        Ok(sink.copy_from(&mut resp, size)?)
    }

    /// Submits an asynchronous execute request, polls it to completion and
    /// streams the output into `sink`.
    ///
    /// `on_status` sees the submission snapshot and then every poll that
    /// changed the status or the completion percentage. The job is removed
    /// through the cleanup handler on every exit path after submission.
    pub fn execute_async<W: Write>(
        &self,
        request: &[u8],
        sink: &mut Sink<'_, W>,
        mut on_status: Option<&mut dyn FnMut(&StatusSnapshot)>,
    ) -> Result<u64> {
        let _entered = self.span.enter();
        let started = Instant::now();

        debug!("submitting asynchronous job");
        let mut snapshot = self.submit(request)?;
        let _job = JobGuard {
            client: self,
            status_url: snapshot.status_url.clone(),
        };

        info!(
            "{} {} {:.3}s",
            snapshot.status,
            snapshot.status_url,
            started.elapsed().as_secs_f64()
        );
        if let Some(callback) = on_status.as_deref_mut() {
            callback(&snapshot);
        }

        while !snapshot.status.is_terminal() {
            if let Some(limit) = self.poll_timeout {
                if started.elapsed() >= limit {
                    return Err(Error::PollTimeout(limit));
                }
            }
            thread::sleep(self.poll_interval);

            let next = advance(&snapshot, self.poll_status(&snapshot.status_url)?)?;
            if next.status != snapshot.status {
                info!(
                    "{} {} {:.3}s",
                    next.status,
                    next.status_url,
                    started.elapsed().as_secs_f64()
                );
            }
            if next.percent_completed != snapshot.percent_completed {
                info!(
                    "{:.3}s elapsed: percent completed: {}",
                    started.elapsed().as_secs_f64(),
                    next.percent_completed.unwrap_or(0)
                );
            }

            let changed = next.changed_from(&snapshot);
            snapshot = next;
            if changed {
                if let Some(callback) = on_status.as_deref_mut() {
                    callback(&snapshot);
                }
            }
        }

        if snapshot.status == JobStatus::Failed {
            return Err(match extract_fault(&snapshot.document) {
                Some(fault) => Error::Protocol(fault),
                None => Error::malformed("job failed without reporting an OWS exception"),
            });
        }

        self.fetch_output(&snapshot.document, sink)
    }

    /// Lists the caller's asynchronous jobs.
    pub fn list_jobs(&self) -> Result<Value> {
        let _entered = self.span.enter();
        let body = self.execute_small(&templates::list_jobs())?;
        serde_json::from_slice(&body)
            .map_err(|e| Error::malformed(format!("job list is not valid JSON: {}", e)))
    }

    /// Synchronous execute request with a short response, read into memory
    /// within the request timeout.
    pub(crate) fn execute_small(&self, request: &[u8]) -> Result<Vec<u8>> {
        let resp = self.post(request, Deadline::Request)?;
        Ok(resp.bytes()?.to_vec())
    }

    fn submit(&self, request: &[u8]) -> Result<StatusSnapshot> {
        let resp = self.post(request, Deadline::Request)?;
        let body = resp.bytes()?;
        parse_status(&body, &self.url)
    }

    fn poll_status(&self, status_url: &Url) -> Result<StatusSnapshot> {
        debug!("polling asynchronous job status");
        let resp = self.get(status_url, Deadline::Request)?;
        let body = resp.bytes()?;
        parse_status(&body, &self.url)
    }

    fn fetch_output<W: Write>(&self, document: &Element, sink: &mut Sink<'_, W>) -> Result<u64> {
        debug!("retrieving asynchronous job output '{}'", self.output_name);
        let href = extract_output_reference(document, &self.output_name).ok_or_else(|| {
            Error::malformed(format!(
                "finished job has no output reference named '{}'",
                self.output_name
            ))
        })?;
        let output_url = self
            .url
            .join(href)
            .map_err(|e| Error::malformed(format!("invalid output reference {:?}: {}", href, e)))?;

        let mut resp = self.get(&output_url, Deadline::Connect)?;
        let size = resp.content_length();
        Ok(sink.copy_from(&mut resp, size)?)
    }

    fn remove_job(&self, status_url: &Url) {
        if let Err(e) = self.cleanup.cleanup(self, status_url) {
            warn!("cleanup of job {} failed: {}", status_url, e);
        }
    }

    fn post(&self, body: &[u8], deadline: Deadline) -> Result<Response> {
        let req = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, self.content_type.as_str())
            .body(body.to_vec());
        self.send("POST", self.url.as_str(), req, deadline)
    }

    fn get(&self, url: &Url, deadline: Deadline) -> Result<Response> {
        self.send("GET", url.as_str(), self.http.get(url.clone()), deadline)
    }

    fn send(
        &self,
        method: &str,
        url: &str,
        req: RequestBuilder,
        deadline: Deadline,
    ) -> Result<Response> {
        let req = match deadline {
            Deadline::Request => req.timeout(self.timeout),
            Deadline::Connect => req,
        };
        let started = Instant::now();
        let resp = req.send()?;
        let status = resp.status();
        let elapsed = started.elapsed().as_secs_f64();

        if status.is_success() {
            info!("{} {} {} {:.3}s", status.as_u16(), method, url, elapsed);
            return Ok(resp);
        }

        error!("{} {} {} {:.3}s", status.as_u16(), method, url, elapsed);
        let body = resp.bytes().unwrap_or_default();
        Err(error_from_response(status, url, &body))
    }
}

/// What the client timeout bounds for one request.
#[derive(Debug, Clone, Copy)]
enum Deadline {
    /// The whole exchange, body included.
    Request,
    /// Connecting only; the body may stream for as long as it takes.
    Connect,
}

/// Runs the cleanup handler when an asynchronous execution returns.
struct JobGuard<'a> {
    client: &'a WpsClient,
    status_url: Url,
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        self.client.remove_job(&self.status_url);
    }
}

/// Validates a polled snapshot against the previous one. Completion never
/// goes backwards for a running job.
fn advance(previous: &StatusSnapshot, mut next: StatusSnapshot) -> Result<StatusSnapshot> {
    if !previous.status.can_become(next.status) {
        return Err(Error::malformed(format!(
            "job status went from {} to {}",
            previous.status, next.status
        )));
    }
    if let (Some(before), Some(after)) = (previous.percent_completed, next.percent_completed) {
        if after < before {
            debug!("ignoring percent completed going back from {} to {}", before, after);
            next.percent_completed = Some(before);
        }
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: JobStatus, percent: Option<u8>) -> StatusSnapshot {
        let doc = br#"<r xmlns="urn:test"/>"#;
        StatusSnapshot {
            status,
            percent_completed: percent,
            status_url: Url::parse("https://x/wps/status.xml").unwrap(),
            document: Element::parse(doc).unwrap(),
        }
    }

    #[test]
    fn advance_keeps_percent_monotonic() {
        let prev = snapshot(JobStatus::Started, Some(40));
        let next = advance(&prev, snapshot(JobStatus::Started, Some(30))).unwrap();
        assert_eq!(next.percent_completed, Some(40));
        assert!(!next.changed_from(&prev));
    }

    #[test]
    fn advance_rejects_backward_status() {
        let prev = snapshot(JobStatus::Started, Some(10));
        let err = advance(&prev, snapshot(JobStatus::Accepted, Some(0))).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn client_rejects_bad_url() {
        assert!(matches!(
            WpsClient::new("not a url", &Credential::None),
            Err(Error::InvalidInput(_))
        ));
    }
}
