use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::CountingWriter;

type Handle = CountingWriter<BufWriter<File>>;

/// Output file whose handle can be released between batches.
///
/// The first write after [`PartFile::release`] reopens the file in append
/// mode, so a table with many partitions keeps at most one handle open at a
/// time. Bytes are counted across every reopen.
pub(crate) struct PartFile {
    path: PathBuf,
    handle: Option<Handle>,
    bytes: u64,
}

impl PartFile {
    /// Create (or truncate) the file and keep its handle open.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            handle: Some(CountingWriter::new(BufWriter::new(file))),
            bytes: 0,
        })
    }

    fn handle(&mut self) -> io::Result<&mut Handle> {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => {
                let file = OpenOptions::new().append(true).open(&self.path)?;
                CountingWriter::new(BufWriter::new(file))
            }
        };
        Ok(self.handle.insert(handle))
    }

    /// Flush and close the handle, if one is open.
    pub fn release(&mut self) -> io::Result<()> {
        if let Some(mut handle) = self.handle.take() {
            handle.flush()?;
            self.bytes = self.bytes.saturating_add(handle.bytes_written());
        }
        Ok(())
    }

    /// Close the file and return the bytes written to it.
    pub fn finish(mut self) -> io::Result<u64> {
        self.release()?;
        Ok(self.bytes)
    }
}

impl Write for PartFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.handle()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.handle.as_mut() {
            Some(handle) => handle.flush(),
            None => Ok(()),
        }
    }
}
