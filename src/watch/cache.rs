// src/watch/cache.rs

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// In-memory cache of file content hashes.
///
/// Used to drop `change` events for files whose content did not actually
/// change (touch, metadata-only writes, editors rewriting identical bytes).
#[derive(Debug, Default)]
pub struct FileCache {
    hashes: HashMap<PathBuf, String>,
}

impl FileCache {
    pub fn new() -> Self {
        Self {
            hashes: HashMap::new(),
        }
    }

    /// Force update the hash for a file.
    pub fn update(&mut self, path: &Path) -> Result<String> {
        debug!("updating cache for {:?}", path);
        let hash = compute_file_hash(path)?;
        self.hashes.insert(path.to_path_buf(), hash.clone());
        Ok(hash)
    }

    /// Forget a file (e.g. when it is no longer watched).
    pub fn invalidate(&mut self, path: &Path) {
        if self.hashes.remove(path).is_some() {
            debug!("invalidated cache for {:?}", path);
        }
    }

    /// Re-hash `path` and report whether its content differs from the last
    /// known hash. Unknown or unreadable files count as changed.
    pub fn has_changed(&mut self, path: &Path) -> bool {
        let previous = self.hashes.get(path).cloned();
        match self.update(path) {
            Ok(current) => previous.as_deref() != Some(current.as_str()),
            Err(err) => {
                debug!(error = %err, "could not hash {:?}; treating as changed", path);
                self.hashes.remove(path);
                true
            }
        }
    }
}
