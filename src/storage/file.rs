// File-backed storage with atomic replacement
// (c) 2024 Ross Younger

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::trace;

use super::{Disposition, Sink, Storage};

/// Default permissions for files we create, when none were configured
pub const DEFAULT_FILE_MODE: u32 = 0o600;

/// An artifact held in a file.
///
/// Writes go to a temporary file in the same directory, which is renamed over the target
/// on commit. Readers therefore see either the old file or the new one, never a partial write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeFileStorage {
    path: PathBuf,
    mode: u32,
}

impl SafeFileStorage {
    /// Constructor. A `mode` of 0 means [`DEFAULT_FILE_MODE`].
    #[must_use]
    pub fn new<P: Into<PathBuf>>(path: P, mode: u32) -> Self {
        let mode = if mode == 0 { DEFAULT_FILE_MODE } else { mode };
        Self {
            path: path.into(),
            mode,
        }
    }

    /// Path accessor
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode accessor
    #[must_use]
    pub fn mode(&self) -> u32 {
        self.mode
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}

struct SafeFileSink {
    file: BufWriter<NamedTempFile>,
    target: PathBuf,
}

impl Write for SafeFileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Sink for SafeFileSink {
    fn close(self: Box<Self>, disposition: Disposition) -> io::Result<()> {
        let SafeFileSink { file, target } = *self;
        let temp = file.into_inner().map_err(io::IntoInnerError::into_error)?;
        match disposition {
            Disposition::Commit => {
                temp.as_file().sync_all()?;
                let _ = temp.persist(&target)?;
                trace!("replaced {target:?}");
                Ok(())
            }
            Disposition::Discard => temp.close(),
        }
    }
}

#[cfg(unix)]
fn apply_mode(file: &File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(_file: &File, _mode: u32) -> io::Result<()> {
    Ok(())
}

impl Storage for SafeFileStorage {
    fn reader(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.path)?))
    }

    fn writer(&self) -> io::Result<Box<dyn Sink>> {
        let dir = self.directory();
        std::fs::create_dir_all(dir)?;
        let prefix = format!(
            ".{}.",
            self.path
                .file_name()
                .map_or_else(|| "tlsgen".into(), |n| n.to_string_lossy())
        );
        let temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(dir)?;
        apply_mode(temp.as_file(), self.mode)?;
        Ok(Box::new(SafeFileSink {
            file: BufWriter::new(temp),
            target: self.path.clone(),
        }))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, ErrorKind, Read as _};

    use super::{SafeFileStorage, DEFAULT_FILE_MODE};
    use crate::storage::{write_to, Storage as _};

    fn entries(dir: &std::path::Path) -> Vec<String> {
        let mut v: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        v.sort();
        v
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let s = SafeFileStorage::new(dir.path().join("nope.pem"), 0o644);
        assert_eq!(s.reader().err().unwrap().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let s = SafeFileStorage::new(dir.path().join("cert.pem"), 0o644);
        write_to(&s, |w| w.write_all(b"first")).unwrap();
        write_to(&s, |w| w.write_all(b"second")).unwrap();
        let mut buf = String::new();
        let _ = s.reader().unwrap().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "second");
        // no temporary files left behind
        assert_eq!(entries(dir.path()), vec!["cert.pem"]);
    }

    #[test]
    fn failed_write_leaves_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.pem");
        std::fs::write(&path, "original").unwrap();
        let s = SafeFileStorage::new(&path, 0o600);
        let _ = write_to(&s, |w| {
            w.write_all(b"half-written")?;
            Err(io::Error::other("interrupted"))
        })
        .unwrap_err();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
        assert_eq!(entries(dir.path()), vec!["key.pem"]);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/cert.pem");
        let s = SafeFileStorage::new(&path, 0o644);
        write_to(&s, |w| w.write_all(b"deep")).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "deep");
    }

    #[test]
    fn zero_mode_is_defaulted() {
        let s = SafeFileStorage::new("x.pem", 0);
        assert_eq!(s.mode(), DEFAULT_FILE_MODE);
    }

    #[cfg(unix)]
    #[test]
    fn mode_is_applied() {
        use std::os::unix::fs::PermissionsExt as _;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert.pem");
        let s = SafeFileStorage::new(&path, 0o640);
        write_to(&s, |w| w.write_all(b"x")).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }
}
