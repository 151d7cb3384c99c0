use crate::core::json;
use crate::core::{ReplayError, Result};
use crate::storage::write_atomic;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Flat key/value store with one pretty-printed JSON file per key.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ReplayError::storage("failed to create record directory", e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads a value. An unreadable or undecodable file counts as a miss so
    /// the next successful lookup overwrites it.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ReplayError::storage(format!("failed to read record {key}"), e)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "ignoring undecodable record");
                Ok(None)
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut bytes = json::encode(value, true)
            .map_err(|e| ReplayError::storage(format!("failed to encode record {key}"), e))?;
        bytes.push(b'\n');

        write_atomic(self.path_for(key), bytes)
            .await
            .map_err(|e| ReplayError::storage(format!("failed to write record {key}"), e))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

fn file_stem(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}
