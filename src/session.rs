//! Time-range retrieval: chunk planning, sequential execution and storage
//! of each chunk's response.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::chunking::{ChunkPlan, DEFAULT_SAMPLING_STEP, NRECORDS_LIMIT, TimeInterval, parse_duration};
use crate::client::WpsClient;
use crate::error::{Error, Result};
use crate::progress::{ChunksBar, DownloadBar, ProcessingBar};
use crate::sink::{Sink, TransferProgress};
use crate::status::StatusSnapshot;

/// Produces the serialized execute request for one time interval.
pub trait RequestBody {
    fn render(&self, interval: &TimeInterval, asynchronous: bool) -> anyhow::Result<Vec<u8>>;
}

impl<F> RequestBody for F
where
    F: Fn(&TimeInterval, bool) -> anyhow::Result<Vec<u8>>,
{
    fn render(&self, interval: &TimeInterval, asynchronous: bool) -> anyhow::Result<Vec<u8>> {
        self(interval, asynchronous)
    }
}

#[derive(Debug, Clone)]
pub struct GetOptions {
    pub asynchronous: bool,
    /// ISO 8601 step between records, used to size chunks.
    pub sampling_step: Option<String>,
    pub nrecords_limit: u64,
    pub show_progress: bool,
    pub show_progress_chunks: bool,
    pub leave_intermediate_progress_bars: bool,
    pub file_prefix: String,
    pub extension: String,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            asynchronous: true,
            sampling_step: None,
            nrecords_limit: NRECORDS_LIMIT,
            show_progress: true,
            show_progress_chunks: true,
            leave_intermediate_progress_bars: true,
            file_prefix: "chunk".to_string(),
            extension: "cdf".to_string(),
        }
    }
}

impl GetOptions {
    pub fn with_asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    pub fn with_sampling_step(mut self, step: impl Into<String>) -> Self {
        self.sampling_step = Some(step.into());
        self
    }

    pub fn with_nrecords_limit(mut self, limit: u64) -> Self {
        self.nrecords_limit = limit;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self.show_progress_chunks = show;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

/// Downloaded response of one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutput {
    pub index: usize,
    pub interval: TimeInterval,
    pub path: PathBuf,
    pub size: u64,
}

/// Retrieves `[start, end)` into `out_dir`, one file per chunk.
///
/// Chunks run strictly one after another; the first failure stops the
/// sequence and removes the partially written file of the failing chunk.
pub fn get_between(
    client: &WpsClient,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    body: &dyn RequestBody,
    out_dir: &Path,
    options: &GetOptions,
) -> Result<Vec<ChunkOutput>> {
    let step = parse_duration(options.sampling_step.as_deref().unwrap_or(DEFAULT_SAMPLING_STEP))?;
    let plan = ChunkPlan::new(start, end, step, options.nrecords_limit)?;
    let nchunks = plan.len();

    fs::create_dir_all(out_dir)?;

    let chunks_bar = (nchunks > 1 && options.show_progress_chunks).then(|| ChunksBar::new(nchunks));
    let leave = nchunks == 1 || options.leave_intermediate_progress_bars;

    let mut outputs: Vec<ChunkOutput> = Vec::with_capacity(nchunks);
    let mut total_bytes = 0u64;

    for (index, interval) in plan.iter().enumerate() {
        if let Some(bar) = &chunks_bar {
            bar.update(index, total_bytes, false);
        }
        info!(
            "chunk {}/{}: {} - {}",
            index + 1,
            nchunks,
            interval.start.to_rfc3339(),
            interval.end.to_rfc3339()
        );

        let path = out_dir.join(format!(
            "{}_{:04}.{}",
            options.file_prefix, index, options.extension
        ));
        let message = format!("[{}/{}] ", index + 1, nchunks);

        match fetch_chunk(client, interval, body, &path, &message, leave, options) {
            Ok(size) => {
                total_bytes += size;
                outputs.push(ChunkOutput {
                    index,
                    interval: *interval,
                    path,
                    size,
                });
            }
            Err(e) => {
                if let Err(rm) = fs::remove_file(&path) {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!("failed to remove partial output {}: {}", path.display(), rm);
                    }
                }
                return Err(e);
            }
        }
    }

    if let Some(bar) = &chunks_bar {
        bar.update(nchunks - 1, total_bytes, true);
    }

    Ok(outputs)
}

fn fetch_chunk(
    client: &WpsClient,
    interval: &TimeInterval,
    body: &dyn RequestBody,
    path: &Path,
    message: &str,
    leave: bool,
    options: &GetOptions,
) -> Result<u64> {
    let request = body
        .render(interval, options.asynchronous)
        .map_err(Error::RequestBody)?;

    let file = File::create(path)?;
    let mut sink = Sink::new(BufWriter::new(file));
    if options.show_progress {
        let mut bar: Option<DownloadBar> = None;
        sink = sink.with_progress(move |p: TransferProgress| {
            if let Some(total) = p.total_bytes {
                bar.get_or_insert_with(|| DownloadBar::new(total, leave))
                    .update(p);
            }
        });
    }

    if !options.asynchronous {
        return client.execute_sync(&request, &mut sink);
    }

    if options.show_progress {
        let processing = ProcessingBar::new(message, leave);
        let mut on_status = |s: &StatusSnapshot| processing.update(s);
        client.execute_async(
            &request,
            &mut sink,
            Some(&mut on_status as &mut dyn FnMut(&StatusSnapshot)),
        )
    } else {
        client.execute_async(&request, &mut sink, None)
    }
}
