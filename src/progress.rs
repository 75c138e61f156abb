//! Terminal progress bars for job processing, downloads and chunk sequences.

use indicatif::{ProgressBar, ProgressStyle};

use crate::sink::TransferProgress;
use crate::status::StatusSnapshot;
use crate::util::megabytes;

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

/// Server-side processing, driven by job status snapshots.
pub struct ProcessingBar {
    pb: ProgressBar,
    leave: bool,
}

impl ProcessingBar {
    pub fn new(message: &str, leave: bool) -> Self {
        let pb = ProgressBar::new(100);
        pb.set_style(style(
            "Processing:  {percent:>3}%|{wide_bar}|  [ Elapsed: {elapsed}, Remaining: {eta} ] {msg}",
        ));
        pb.set_message(message.to_string());
        Self { pb, leave }
    }

    pub fn update(&self, snapshot: &StatusSnapshot) {
        if let Some(percent) = snapshot.percent_completed {
            self.pb.set_position(u64::from(percent));
        }
    }
}

impl Drop for ProcessingBar {
    fn drop(&mut self) {
        if self.leave {
            self.pb.abandon();
        } else {
            self.pb.finish_and_clear();
        }
    }
}

/// Download of one response body. Only meaningful when the size is known.
pub struct DownloadBar {
    pb: ProgressBar,
    leave: bool,
}

impl DownloadBar {
    pub fn new(size: u64, leave: bool) -> Self {
        let pb = ProgressBar::new(size);
        pb.set_style(style(&format!(
            "Downloading: {{percent:>3}}%|{{wide_bar}}|  [ Elapsed: {{elapsed}}, Remaining: {{eta}} ] ({}MB)",
            megabytes(size)
        )));
        Self { pb, leave }
    }

    pub fn update(&self, progress: TransferProgress) {
        self.pb.set_position(progress.bytes_copied);
    }
}

impl Drop for DownloadBar {
    fn drop(&mut self) {
        if self.leave {
            self.pb.abandon();
        } else {
            self.pb.finish_and_clear();
        }
    }
}

/// Position within a multi-chunk request and the volume fetched so far.
pub struct ChunksBar {
    pb: ProgressBar,
    nchunks: usize,
}

impl ChunksBar {
    pub fn new(nchunks: usize) -> Self {
        let pb = ProgressBar::new(nchunks as u64 + 1);
        pb.set_style(style(
            "{prefix}{wide_bar}|  [ Elapsed: {elapsed}, Remaining: {eta} ]  {msg}",
        ));
        Self { pb, nchunks }
    }

    /// Marks chunk `index` (zero based) as current.
    pub fn update(&self, index: usize, total_bytes: u64, finished: bool) {
        self.pb
            .set_prefix(format!("Processing chunks [{}/{}]", index + 1, self.nchunks));
        let size = megabytes(total_bytes);
        if finished {
            self.pb.set_message(format!("({} MB)", size));
        } else {
            self.pb.set_message(format!("(> {} MB)", size));
        }
        self.pb.inc(1);
    }
}

impl Drop for ChunksBar {
    fn drop(&mut self) {
        self.pb.abandon();
    }
}
