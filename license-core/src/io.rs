//! Sources and sinks of license material.
//!
//! Every call to [`Source::input`] or [`Sink::output`] opens a fresh stream
//! that is meant to be used once. Dropping the stream closes it.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Cursor, Read, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Something that can provide an input stream, e.g. a license key file.
pub trait Source {
    fn input(&self) -> io::Result<Box<dyn Read + '_>>;
}

/// Something that can provide an output stream, e.g. a license store.
pub trait Sink {
    fn output(&self) -> io::Result<Box<dyn Write + '_>>;
}

impl<S: Source + ?Sized> Source for &S {
    fn input(&self) -> io::Result<Box<dyn Read + '_>> {
        (**self).input()
    }
}

impl<S: Sink + ?Sized> Sink for &S {
    fn output(&self) -> io::Result<Box<dyn Write + '_>> {
        (**self).output()
    }
}

/// A shared in-memory buffer.
///
/// Clones share the same buffer. Opening an output stream truncates it, so
/// the buffer always holds the bytes of the last completed or abandoned
/// write.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        Self::default()
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> MemoryStore {
        MemoryStore {
            buffer: Arc::new(Mutex::new(bytes.into())),
        }
    }

    /// A copy of the current contents.
    pub fn to_vec(&self) -> Vec<u8> {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }
}

impl Source for MemoryStore {
    fn input(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(Cursor::new(self.to_vec())))
    }
}

impl Sink for MemoryStore {
    fn output(&self) -> io::Result<Box<dyn Write + '_>> {
        lock(&self.buffer)?.clear();
        Ok(Box::new(MemoryOutput {
            buffer: self.buffer.clone(),
        }))
    }
}

struct MemoryOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.buffer)?.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn lock(buffer: &Mutex<Vec<u8>>) -> io::Result<std::sync::MutexGuard<'_, Vec<u8>>> {
    buffer
        .lock()
        .map_err(|_| io::Error::other("memory store lock poisoned"))
}

/// A file on the local file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStore {
    path: PathBuf,
}

impl PathStore {
    pub fn new(path: impl Into<PathBuf>) -> PathStore {
        PathStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn delete(&self) -> io::Result<()> {
        fs::remove_file(&self.path)
    }
}

impl Source for PathStore {
    fn input(&self) -> io::Result<Box<dyn Read + '_>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

impl Sink for PathStore {
    fn output(&self) -> io::Result<Box<dyn Write + '_>> {
        let file = File::create(&self.path)?;
        Ok(Box::new(BufWriter::new(file)))
    }
}
