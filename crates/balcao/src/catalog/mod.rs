//! Catalog documents offered to contacts.

mod dir;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub use dir::DirCatalogRepository;

/// Errors listing catalogs.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog directory does not exist.
    #[error("catalog directory not found: {}", path.display())]
    DirectoryMissing { path: PathBuf },

    /// The directory exists but could not be read.
    #[error("I/O error reading catalogs at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Source of catalog documents.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Filenames of available catalogs, sorted ascending.
    async fn list(&self) -> Result<Vec<String>, CatalogError>;

    /// Path the gateway reads to deliver a listed catalog.
    fn path_of(&self, name: &str) -> PathBuf;

    /// Directory backing this repository, for diagnostics.
    fn location(&self) -> &Path;
}
