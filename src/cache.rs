use color_eyre::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Log written when neither the config nor the command line names one.
pub const LOG_FILE: &str = "finsight.log";

/// Registry of known cache files
const CACHE_FILES: &[&str] = &[LOG_FILE];

/// Manages cache directory and cache file operations
#[derive(Clone)]
pub struct CacheManager {
    pub(crate) cache_dir: PathBuf,
}

impl CacheManager {
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn new(app_name: &str) -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine cache directory"))?
            .join(app_name);

        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache_file(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(filename)
    }

    pub fn ensure_cache_dir(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Resolve the log file: `configured` if given, otherwise the default under the cache dir.
    /// Parent directories are created either way.
    pub fn log_path(&self, configured: Option<&Path>) -> Result<PathBuf> {
        let path = match configured {
            Some(p) => p.to_path_buf(),
            None => {
                self.ensure_cache_dir()?;
                self.cache_file(LOG_FILE)
            }
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    /// Clear all registered cache files
    pub fn clear_all(&self) -> Result<()> {
        for filename in CACHE_FILES {
            let file_path = self.cache_file(filename);
            if file_path.exists() {
                if let Err(e) = fs::remove_file(&file_path) {
                    tracing::warn!("Could not remove cache file {}: {}", filename, e);
                }
            }
        }

        Ok(())
    }
}
