use crate::domain::ports::Storage;
use crate::utils::error::{Result, ScrapeError};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes output files on the local filesystem. Relative paths resolve
/// against `base_path`; absolute paths are used as given.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Storage for LocalStorage {
    /// Writes to `<name>.partial` next to the target and renames it into
    /// place, so readers never see a half-written file.
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<String> {
        let full_path = self.resolve(path);
        let written = full_path.display().to_string();
        let write_error = |source: std::io::Error| ScrapeError::Write {
            path: written.clone(),
            source,
        };

        if let Some(parent) = full_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let partial = partial_path(&full_path);
        if let Err(e) = fs::write(&partial, data).and_then(|_| fs::rename(&partial, &full_path)) {
            let _ = fs::remove_file(&partial);
            return Err(write_error(e));
        }

        tracing::debug!("Wrote {} bytes to {}", data.len(), written);
        Ok(written)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
