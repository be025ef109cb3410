// In-memory storage
// (c) 2024 Ross Younger

use std::{
    io::{self, Cursor, Read, Write},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use super::{Disposition, Sink, Storage};

#[derive(Debug, Default)]
struct Shared {
    contents: Mutex<Option<Vec<u8>>>,
    commits: AtomicUsize,
    read_only: AtomicBool,
}

/// An artifact held in memory.
///
/// Clones share the same underlying buffer, so a caller can hand one clone to a
/// [`PairStorage`](super::PairStorage) and keep another to inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    shared: Arc<Shared>,
}

impl MemoryStorage {
    /// Creates an empty storage (reading it reports `NotFound`)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage pre-populated with some content
    #[must_use]
    pub fn with_contents(data: &[u8]) -> Self {
        let s = Self::new();
        s.set_contents(data);
        s
    }

    /// Replaces the content directly, bypassing the commit counter
    pub fn set_contents(&self, data: &[u8]) {
        *self.lock() = Some(data.to_vec());
    }

    /// Returns a copy of the current content, if any
    #[must_use]
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.lock().clone()
    }

    /// Removes the content
    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Number of successful commits since creation
    #[must_use]
    pub fn commits(&self) -> usize {
        self.shared.commits.load(Ordering::SeqCst)
    }

    /// When read-only, [`Storage::writer`] fails with `PermissionDenied`
    pub fn set_read_only(&self, read_only: bool) {
        self.shared.read_only.store(read_only, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Vec<u8>>> {
        self.shared
            .contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

struct MemorySink {
    buffer: Vec<u8>,
    target: Arc<Shared>,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for MemorySink {
    fn close(self: Box<Self>, disposition: Disposition) -> io::Result<()> {
        if disposition == Disposition::Commit {
            let MemorySink { buffer, target } = *self;
            *target
                .contents
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(buffer);
            let _ = target.commits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn reader(&self) -> io::Result<Box<dyn Read + Send>> {
        match self.contents() {
            Some(data) => Ok(Box::new(Cursor::new(data))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "memory storage is empty",
            )),
        }
    }

    fn writer(&self) -> io::Result<Box<dyn Sink>> {
        if self.shared.read_only.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "memory storage is read-only",
            ));
        }
        Ok(Box::new(MemorySink {
            buffer: Vec::new(),
            target: self.shared.clone(),
        }))
    }

    fn location(&self) -> String {
        format!("<memory {:p}>", Arc::as_ptr(&self.shared))
    }
}
