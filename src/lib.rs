//! A Rust client for OGC Web Processing Service (WPS 1.0) data extraction
//! services such as VirES.
//!
//! This crate implements the job flow of a WPS data request:
//! submit an execute request, poll the asynchronous job until it finishes,
//! stream the output to local storage, then remove the job on the server.
//! Long time ranges are split into a sequence of bounded requests.
//!
//! ## Quick start
//! - Configure the service URL and access token via environment variables
//!   (`VIRESCLIENT_URL`, `VIRESCLIENT_TOKEN`) or a `~/.viresclient.ini` file.
//! - Supply the execute request body for a time interval and call
//!   [`get_between`].
//!
//! ```no_run
//! use anyhow::Result;
//! use chrono::{TimeZone, Utc};
//! use wpsclient::{GetOptions, TimeInterval, WpsClient, get_between};
//!
//! fn main() -> Result<()> {
//!     let client = WpsClient::from_env()?;
//!     let body = |interval: &TimeInterval, _asynchronous: bool| -> Result<Vec<u8>> {
//!         Ok(format!(
//!             "<!-- execute request for {} .. {} -->",
//!             interval.start.to_rfc3339(),
//!             interval.end.to_rfc3339()
//!         )
//!         .into_bytes())
//!     };
//!     let chunks = get_between(
//!         &client,
//!         Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
//!         Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
//!         &body,
//!         std::path::Path::new("downloads"),
//!         &GetOptions::default(),
//!     )?;
//!     for chunk in chunks {
//!         println!("{} ({} bytes)", chunk.path.display(), chunk.size);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Failures are reported as [`Error`]; callers can branch on the kind, e.g.
//! ask for a new token only on [`Error::Authentication`].

#![forbid(unsafe_code)]

mod auth;
mod chunking;
mod cleanup;
mod client;
mod codec;
mod config;
mod error;
mod progress;
mod session;
mod sink;
mod status;
mod templates;
mod util;
mod xml;

pub use auth::Credential;
pub use chunking::{
    ChunkPlan, DEFAULT_SAMPLING_STEP, NRECORDS_LIMIT, TimeInterval, max_chunk_duration,
    parse_duration,
};
pub use cleanup::{CleanupHandler, NoCleanup, RemoveJob};
pub use client::{ClientConfig, DEFAULT_CONTENT_TYPE, DEFAULT_OUTPUT_NAME, WpsClient};
pub use codec::{error_from_response, extract_fault, extract_output_reference, parse_status};
pub use config::SiteConfig;
pub use error::{Error, OwsException, Result};
pub use session::{ChunkOutput, GetOptions, RequestBody, get_between};
pub use sink::{DEFAULT_BUFFER_SIZE, Sink, TransferProgress, copy};
pub use status::{JobStatus, StatusSnapshot};
pub use xml::Element;
