//! Durable storage for lookup results and mirrored resources.
//!
//! Both stores are write-once caches: nothing is ever expired or rewritten
//! in place, and every write goes through a temp file in the destination
//! directory followed by a rename, so readers never see a partial file.

pub mod records;
pub mod resources;

pub use records::RecordStore;
pub use resources::ResourceStore;

use std::io::{self, Write};
use std::path::PathBuf;

pub(crate) async fn write_atomic(path: PathBuf, bytes: Vec<u8>) -> io::Result<()> {
    tokio::task::spawn_blocking(move || {
        let parent = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
        std::fs::create_dir_all(parent)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|err| err.error)?;
        Ok(())
    })
    .await
    .map_err(io::Error::other)?
}
