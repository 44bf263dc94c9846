//! Content-addressed audio cache.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::VoiceError;

const HASH_CHARS: usize = 12;

/// MP3 files named `<CODENAME>_<hash>.mp3`, where the hash is the first
/// twelve hex digits of the text's SHA-256.
#[derive(Debug, Clone)]
pub struct VoiceCache {
    dir: PathBuf,
}

fn cache_err(path: &Path) -> impl FnOnce(std::io::Error) -> VoiceError + '_ {
    move |source| VoiceError::Cache {
        path: path.to_path_buf(),
        source,
    }
}

impl VoiceCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, codename: &str, text: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(text.as_bytes()));
        self.dir
            .join(format!("{codename}_{}.mp3", &digest[..HASH_CHARS]))
    }

    pub fn get(&self, codename: &str, text: &str) -> Result<Option<Vec<u8>>, VoiceError> {
        let path = self.path_for(codename, text);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(cache_err(&path)(e)),
        }
    }

    pub fn put(&self, codename: &str, text: &str, audio: &[u8]) -> Result<PathBuf, VoiceError> {
        std::fs::create_dir_all(&self.dir).map_err(cache_err(&self.dir))?;
        let path = self.path_for(codename, text);
        std::fs::write(&path, audio).map_err(cache_err(&path))?;
        Ok(path)
    }

    /// Delete every cached clip. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, VoiceError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(cache_err(&self.dir)(e)),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(cache_err(&self.dir))?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("mp3") {
                std::fs::remove_file(&path).map_err(cache_err(&path))?;
                removed += 1;
            }
        }
        tracing::info!(removed, "Voice cache cleared");
        Ok(removed)
    }
}
