use crate::data::Cache;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_CACHE_FOLDER: &str = ".folio";

/// Stores answer texts as files.
///
/// Layout: `{folder}/{namespace}/{key}.cache`, where the namespace is
/// hash(prompt instructions + model) and the key is a hex hash.
#[derive(Debug, Clone)]
pub struct FileCache {
    folder: String,
    namespace: String,
}

impl FileCache {
    /// Creates a new FileCache instance
    ///
    /// # Arguments
    /// * `folder` - Optional root folder path. If None, defaults to ".folio"
    /// * `namespace` - Subfolder grouping entries of one prompt and model
    pub fn new(folder: Option<String>, namespace: String) -> Self {
        Self {
            folder: folder.unwrap_or_else(|| DEFAULT_CACHE_FOLDER.to_string()),
            namespace,
        }
    }

    fn cache_dir(&self) -> PathBuf {
        PathBuf::from(&self.folder).join(&self.namespace)
    }

    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir().join(format!("{}.cache", key))
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.cache_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) {
        let dir = self.cache_dir();
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to create cache directory");
            return;
        }

        let path = self.cache_path(key);
        if let Err(e) = fs::write(&path, value) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write cache file");
        }
    }
}
