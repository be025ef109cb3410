//! Reading an existing certificate pair back from storage
// (c) 2024 Ross Younger

use std::{fmt::Debug, io::Read as _};

use tracing::trace;

use crate::{cert::Certificate, error::LoadError, storage::PairStorage, storage::Storage};

/// Something which can turn a [`PairStorage`] into a [`Certificate`]
pub trait Loader: Debug + Send + Sync {
    /// Loads and parses the pair.
    ///
    /// If either half of the pair is absent, this must return [`LoadError::NotFound`].
    fn load(&self, storage: &PairStorage) -> Result<Certificate, LoadError>;
}

/// The standard loader: one PEM certificate chain plus one PEM private key
#[derive(Debug, Clone, Copy, Default)]
pub struct PemLoader;

fn read_all(storage: &dyn Storage) -> Result<Vec<u8>, LoadError> {
    let location = storage.location();
    let map_io = |source: std::io::Error| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound {
                location: location.clone(),
            }
        } else {
            LoadError::Io {
                location: location.clone(),
                source,
            }
        }
    };
    let mut data = Vec::new();
    let _ = storage
        .reader()
        .map_err(map_io)?
        .read_to_end(&mut data)
        .map_err(map_io)?;
    trace!("read {} bytes from {location}", data.len());
    Ok(data)
}

impl Loader for PemLoader {
    fn load(&self, storage: &PairStorage) -> Result<Certificate, LoadError> {
        let cert = read_all(storage.cert.as_ref())?;
        let key = read_all(storage.key.as_ref())?;
        Certificate::from_pem(
            &cert,
            &key,
            &storage.cert.location(),
            &storage.key.location(),
        )
    }
}
