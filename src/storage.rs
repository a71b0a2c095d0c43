//! Upload and output directories
//!
//! Every filename that arrives from a request is checked with
//! [`validate_filename`] before it is joined onto a directory, so resolved
//! paths never leave the directory they belong to.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Nome de arquivo inválido: '{0}'")]
    InvalidFilename(String),

    #[error("Arquivo não encontrado: {0}")]
    NotFound(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io { path: path.to_path_buf(), source }
    }
}

/// Accept only a single, plain path component.
pub fn validate_filename(name: &str) -> Result<&str, StorageError> {
    let invalid = || StorageError::InvalidFilename(name.to_string());

    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return Err(invalid());
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(invalid()),
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// The two directories the service reads and writes.
#[derive(Debug, Clone)]
pub struct Storage {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl Storage {
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create both directories if they are missing.
    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        for dir in [&self.upload_dir, &self.output_dir] {
            fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        }
        Ok(())
    }

    pub fn upload_path(&self, filename: &str) -> Result<PathBuf, StorageError> {
        Ok(self.upload_dir.join(validate_filename(filename)?))
    }

    pub fn output_path(&self, filename: &str) -> Result<PathBuf, StorageError> {
        Ok(self.output_dir.join(validate_filename(filename)?))
    }

    /// Write an uploaded file verbatim, replacing any file of the same name.
    pub async fn save_upload(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let path = self.upload_path(filename)?;
        tokio::fs::write(&path, bytes).await
            .map_err(|e| StorageError::io(&path, e))?;
        Ok(path)
    }

    /// Newest `*.pdf` in the upload directory, by creation time.
    ///
    /// Falls back to modification time where the platform has no creation
    /// time. Equal timestamps go to the greater filename.
    pub fn latest_pdf(&self) -> Result<Option<PathBuf>, StorageError> {
        let entries = fs::read_dir(&self.upload_dir)
            .map_err(|e| StorageError::io(&self.upload_dir, e))?;

        let mut latest: Option<(SystemTime, PathBuf)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_pdf(&path) {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let Ok(stamp) = meta.created().or_else(|_| meta.modified()) else { continue };

            let newer = match &latest {
                None => true,
                Some((best, best_path)) => (stamp, &path) > (*best, best_path),
            };
            if newer {
                latest = Some((stamp, path));
            }
        }

        Ok(latest.map(|(_, path)| path))
    }

    /// A specific uploaded PDF, which must exist.
    pub fn find_pdf(&self, filename: &str) -> Result<PathBuf, StorageError> {
        let path = self.upload_path(filename)?;
        if !is_pdf(&path) || !path.is_file() {
            return Err(StorageError::NotFound(filename.to_string()));
        }
        Ok(path)
    }

    /// `<output_dir>/<source stem>.xlsx`
    pub fn workbook_path_for(&self, source: &Path) -> PathBuf {
        let stem = source.file_stem().unwrap_or(source.as_os_str());
        let mut name = stem.to_os_string();
        name.push(".xlsx");
        self.output_dir.join(name)
    }

    pub async fn read_output(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.output_path(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }
}
