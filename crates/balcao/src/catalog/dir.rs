use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{CatalogError, CatalogRepository};

/// Catalogs stored as files in one directory.
///
/// Only regular files whose extension matches (ignoring case) are listed.
/// The directory is read on every call so new files show up without a
/// restart.
#[derive(Debug, Clone)]
pub struct DirCatalogRepository {
    dir: PathBuf,
    extension: String,
}

impl DirCatalogRepository {
    pub fn new(dir: impl Into<PathBuf>, extension: impl AsRef<str>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension
                .as_ref()
                .trim_start_matches('.')
                .to_ascii_lowercase(),
        }
    }

    fn matches_extension(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}

#[async_trait]
impl CatalogRepository for DirCatalogRepository {
    async fn list(&self) -> Result<Vec<String>, CatalogError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::DirectoryMissing {
                    path: self.dir.clone(),
                });
            }
            Err(e) => return Err(CatalogError::io(&self.dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CatalogError::io(&self.dir, e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                debug!(path = %entry.path().display(), "Skipping non UTF-8 catalog name");
                continue;
            };
            if !self.matches_extension(&name) {
                continue;
            }
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| CatalogError::io(entry.path(), e))?
                .is_file();
            if is_file {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn location(&self) -> &Path {
        &self.dir
    }
}
