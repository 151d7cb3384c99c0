use crate::core::{ReplayError, Result};
use crate::storage::write_atomic;
use std::io;
use std::path::{Path, PathBuf};

/// Root directory of mirrored resource files.
///
/// A file's presence is the cache entry; there is no separate index.
#[derive(Debug, Clone)]
pub struct ResourceStore {
    root: PathBuf,
}

impl ResourceStore {
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| ReplayError::storage("failed to create resource directory", e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a derived relative path onto the mirror root.
    ///
    /// Empty and `.` segments are skipped; a `..` segment is refused.
    pub fn path_for(&self, relative: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        let mut depth = 0usize;
        for segment in relative.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(ReplayError::storage(
                        "refusing resource path",
                        format!("{relative} leaves the mirror root"),
                    ));
                }
                _ => {
                    path.push(segment);
                    depth += 1;
                }
            }
        }

        if depth == 0 {
            return Err(ReplayError::storage(
                "refusing resource path",
                format!("{relative:?} does not name a file"),
            ));
        }
        Ok(path)
    }

    pub async fn exists(&self, relative: &str) -> Result<bool> {
        let path = self.path_for(relative)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ReplayError::storage(format!("failed to stat resource {relative}"), e)),
        }
    }

    /// Writes a resource, creating parent directories as needed.
    pub async fn write(&self, relative: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(relative)?;
        write_atomic(path, bytes)
            .await
            .map_err(|e| ReplayError::storage(format!("failed to write resource {relative}"), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn write_then_exists() {
        let temp = tempdir().unwrap();
        let store = ResourceStore::open(temp.path().join("resources")).await.unwrap();

        assert!(!store.exists("ui/icons/a.png").await.unwrap());
        store.write("ui/icons/a.png", vec![1, 2, 3]).await.unwrap();
        assert!(store.exists("ui/icons/a.png").await.unwrap());

        let on_disk = std::fs::read(temp.path().join("resources/ui/icons/a.png")).unwrap();
        assert_eq!(on_disk, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn parent_traversal_is_refused() {
        let temp = tempdir().unwrap();
        let store = ResourceStore::open(temp.path()).await.unwrap();

        assert!(store.path_for("a/../../etc/passwd").is_err());
        assert!(store.path_for("").is_err());
        assert_eq!(
            store.path_for("/a//b/./c.png").unwrap(),
            temp.path().join("a").join("b").join("c.png")
        );
    }

    #[tokio::test]
    async fn triple_dot_is_an_ordinary_segment() {
        let temp = tempdir().unwrap();
        let store = ResourceStore::open(temp.path()).await.unwrap();
        let path = store.path_for(".../.../etc/passwd").unwrap();
        assert!(path.starts_with(temp.path()));
        assert_eq!(path, temp.path().join("...").join("...").join("etc").join("passwd"));
    }
}
