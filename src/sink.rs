use std::io::{self, Read, Write};

pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Cumulative state of one response transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub bytes_copied: u64,
    /// Size advertised by the server, if any.
    pub total_bytes: Option<u64>,
}

/// Failure of one side of a [`copy`].
#[derive(Debug)]
pub(crate) enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

impl From<CopyError> for io::Error {
    fn from(e: CopyError) -> Self {
        match e {
            CopyError::Read(e) | CopyError::Write(e) => e,
        }
    }
}

/// Copies `reader` into `writer` in `buffer_size` pieces, reporting the
/// running total after every write. Returns the number of bytes copied.
///
/// There is no resume: on error the writer holds whatever was written so far.
pub fn copy<R, W>(
    reader: &mut R,
    writer: &mut W,
    total_bytes: Option<u64>,
    buffer_size: usize,
    on_progress: Option<&mut dyn FnMut(TransferProgress)>,
) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    Ok(copy_sides(reader, writer, total_bytes, buffer_size, on_progress)?)
}

fn copy_sides<R, W>(
    reader: &mut R,
    writer: &mut W,
    total_bytes: Option<u64>,
    buffer_size: usize,
    mut on_progress: Option<&mut dyn FnMut(TransferProgress)>,
) -> Result<u64, CopyError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut copied: u64 = 0;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Read(e)),
        };
        writer.write_all(&buf[..n]).map_err(CopyError::Write)?;
        copied += n as u64;
        if let Some(callback) = on_progress.as_deref_mut() {
            callback(TransferProgress {
                bytes_copied: copied,
                total_bytes,
            });
        }
    }
    writer.flush().map_err(CopyError::Write)?;
    Ok(copied)
}

/// Destination of a WPS response body.
pub struct Sink<'a, W> {
    writer: W,
    buffer_size: usize,
    on_progress: Option<Box<dyn FnMut(TransferProgress) + 'a>>,
}

impl<'a, W: Write> Sink<'a, W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer_size: DEFAULT_BUFFER_SIZE,
            on_progress: None,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_progress(mut self, on_progress: impl FnMut(TransferProgress) + 'a) -> Self {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub(crate) fn copy_from<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
        total_bytes: Option<u64>,
    ) -> Result<u64, CopyError> {
        let on_progress = self
            .on_progress
            .as_mut()
            .map(|f| f.as_mut() as &mut dyn FnMut(TransferProgress));
        copy_sides(reader, &mut self.writer, total_bytes, self.buffer_size, on_progress)
    }
}
