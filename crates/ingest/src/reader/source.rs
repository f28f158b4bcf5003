//! Byte sources — positional reads over files or memory.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Read failed at offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("Short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead { offset: u64, expected: usize, actual: usize },
}

/// Random-access byte input.
///
/// `slice` must return exactly `len` bytes when `offset + len <= size()`;
/// anything else is a hard failure for the run.
pub trait ByteSource: Send + Sync {
    fn size(&self) -> u64;

    fn slice(&self, offset: u64, len: usize) -> Result<Bytes, SourceError>;

    /// Name used for provenance and dialect detection (file extension).
    fn name(&self) -> &str;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn slice(&self, offset: u64, len: usize) -> Result<Bytes, SourceError> {
        (**self).slice(offset, len)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// An in-memory buffer. Slices share the underlying allocation.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    data: Bytes,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self { name: name.into(), data: data.into() }
    }
}

impl ByteSource for MemorySource {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn slice(&self, offset: u64, len: usize) -> Result<Bytes, SourceError> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = start.saturating_add(len);
        if end > self.data.len() {
            return Err(SourceError::ShortRead {
                offset,
                expected: len,
                actual: self.data.len().saturating_sub(start),
            });
        }
        Ok(self.data.slice(start..end))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A file read window by window; never loaded whole.
#[derive(Debug)]
pub struct FileSource {
    name: String,
    size: u64,
    file: Mutex<File>,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let open_err = |source| SourceError::Open { path: path.to_path_buf(), source };

        let file = File::open(path).map_err(open_err)?;
        let size = file.metadata().map_err(open_err)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        tracing::debug!(file = %name, size, "opened file source");
        Ok(Self { name, size, file: Mutex::new(file) })
    }
}

impl ByteSource for FileSource {
    fn size(&self) -> u64 {
        self.size
    }

    fn slice(&self, offset: u64, len: usize) -> Result<Bytes, SourceError> {
        let io_err = |source| SourceError::Io { offset, source };

        // every read seeks first, so a poisoned handle is still usable
        let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        file.seek(SeekFrom::Start(offset)).map_err(io_err)?;

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match file.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(SourceError::ShortRead { offset, expected: len, actual: filled });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_err(e)),
            }
        }
        Ok(Bytes::from(buf))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
