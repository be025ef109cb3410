//! Storage backends for certificate artifacts
// (c) 2024 Ross Younger
//!
//! A [`Storage`] holds exactly one artifact (a certificate or a private key).
//! A [`PairStorage`] groups the two storages which together make up a usable credential.
//!
//! Writes always go through [`write_to`], which guarantees that the sink is closed exactly once.

use std::{
    fmt::Debug,
    io::{self, Read, Write},
    path::PathBuf,
    sync::Arc,
};

mod file;
pub use file::{SafeFileStorage, DEFAULT_FILE_MODE};

mod memory;
pub use memory::MemoryStorage;

/// How a [`Sink`] should be finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Make the written data visible to readers, replacing any previous content
    Commit,
    /// Throw the written data away; the previous content (if any) remains
    Discard,
}

/// The write side of a [`Storage`].
///
/// Nothing written is visible to readers until the sink is closed with [`Disposition::Commit`].
pub trait Sink: Write + Send {
    /// Finishes with this sink.
    fn close(self: Box<Self>, disposition: Disposition) -> io::Result<()>;
}

/// Capability to read and atomically replace a single artifact
pub trait Storage: Debug + Send + Sync {
    /// Opens the artifact for reading.
    ///
    /// If the artifact does not exist, the error kind must be [`io::ErrorKind::NotFound`].
    fn reader(&self) -> io::Result<Box<dyn Read + Send>>;

    /// Opens a sink which will replace the artifact when committed.
    ///
    /// Callers should use [`write_to`] rather than calling this directly.
    fn writer(&self) -> io::Result<Box<dyn Sink>>;

    /// Human-readable description of where this storage lives (for messages)
    fn location(&self) -> String;
}

/// Opens a writer on `storage`, passes it to `cb`, then closes it.
///
/// The sink is closed exactly once:
/// * If `cb` fails, the sink is discarded and the callback's error returned.
///   Any error from closing is ignored.
/// * If `cb` succeeds, the sink is committed and any error from doing so is returned.
pub fn write_to<F>(storage: &dyn Storage, cb: F) -> io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let mut sink = storage.writer()?;
    match cb(&mut sink) {
        Ok(()) => sink.close(Disposition::Commit),
        Err(e) => {
            let _ = sink.close(Disposition::Discard);
            Err(e)
        }
    }
}

/// A certificate storage and a private key storage, treated as a unit
#[derive(Debug, Clone)]
pub struct PairStorage {
    /// Where the certificate lives
    pub cert: Arc<dyn Storage>,
    /// Where the private key lives
    pub key: Arc<dyn Storage>,
}

impl PairStorage {
    /// Standard constructor
    #[must_use]
    pub fn new(cert: Arc<dyn Storage>, key: Arc<dyn Storage>) -> Self {
        Self { cert, key }
    }

    /// Creates a pair of [`SafeFileStorage`]s, sharing a file mode
    #[must_use]
    pub fn files<C, K>(cert_path: C, key_path: K, mode: u32) -> Self
    where
        C: Into<PathBuf>,
        K: Into<PathBuf>,
    {
        Self::new(
            Arc::new(SafeFileStorage::new(cert_path, mode)),
            Arc::new(SafeFileStorage::new(key_path, mode)),
        )
    }

    /// Creates a pair from two [`MemoryStorage`]s.
    ///
    /// The storages are shared; the caller may keep clones to inspect them.
    #[must_use]
    pub fn memory(cert: &MemoryStorage, key: &MemoryStorage) -> Self {
        Self::new(Arc::new(cert.clone()), Arc::new(key.clone()))
    }
}

#[cfg(test)]
mod test {
    use std::{
        io::{self, Read, Write},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    use super::{write_to, Disposition, MemoryStorage, Sink, Storage};

    /// A storage whose sinks record how they were closed, and optionally fail to close
    #[derive(Debug, Default)]
    struct Recorder {
        commits: Arc<AtomicUsize>,
        discards: Arc<AtomicUsize>,
        fail_close: bool,
    }

    struct RecordingSink {
        commits: Arc<AtomicUsize>,
        discards: Arc<AtomicUsize>,
        fail_close: bool,
    }

    impl Write for RecordingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Sink for RecordingSink {
        fn close(self: Box<Self>, disposition: Disposition) -> io::Result<()> {
            let counter = match disposition {
                Disposition::Commit => &self.commits,
                Disposition::Discard => &self.discards,
            };
            let _ = counter.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(io::Error::other("close failed"))
            } else {
                Ok(())
            }
        }
    }

    impl Storage for Recorder {
        fn reader(&self) -> io::Result<Box<dyn Read + Send>> {
            Err(io::ErrorKind::NotFound.into())
        }
        fn writer(&self) -> io::Result<Box<dyn Sink>> {
            Ok(Box::new(RecordingSink {
                commits: self.commits.clone(),
                discards: self.discards.clone(),
                fail_close: self.fail_close,
            }))
        }
        fn location(&self) -> String {
            "recorder".into()
        }
    }

    impl Recorder {
        fn closes(&self) -> (usize, usize) {
            (
                self.commits.load(Ordering::SeqCst),
                self.discards.load(Ordering::SeqCst),
            )
        }
    }

    #[test]
    fn success_commits_once() {
        let r = Recorder::default();
        write_to(&r, |w| w.write_all(b"hello")).unwrap();
        assert_eq!(r.closes(), (1, 0));
    }

    #[test]
    fn callback_error_wins_over_close_error() {
        let r = Recorder {
            fail_close: true,
            ..Default::default()
        };
        let err = write_to(&r, |_| Err(io::Error::other("callback failed"))).unwrap_err();
        assert_eq!(err.to_string(), "callback failed");
        assert_eq!(r.closes(), (0, 1));
    }

    #[test]
    fn close_error_surfaces_on_success() {
        let r = Recorder {
            fail_close: true,
            ..Default::default()
        };
        let err = write_to(&r, |w| w.write_all(b"data")).unwrap_err();
        assert_eq!(err.to_string(), "close failed");
        assert_eq!(r.closes(), (1, 0));
    }

    #[test]
    fn failed_callback_leaves_previous_content() {
        let m = MemoryStorage::with_contents(b"previous");
        let _ = write_to(&m, |w| {
            w.write_all(b"partial")?;
            Err(io::Error::other("oops"))
        })
        .unwrap_err();
        assert_eq!(m.contents().unwrap(), b"previous");
        assert_eq!(m.commits(), 0);
    }
}
