use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// Writes `contents` to `path`, replacing any existing file.
///
/// The bytes go to a sibling `.part` file first, which is flushed, synced and
/// renamed over the target, so readers never observe a half-written file.
pub async fn write_replacing(path: &Path, contents: &[u8]) -> Result<()> {
    let staging = staging_path(path);

    if let Err(source) = write_synced(&staging, contents).await {
        let _ = fs::remove_file(&staging).await;
        return Err(Error::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    if let Err(source) = fs::rename(&staging, path).await {
        let _ = fs::remove_file(&staging).await;
        return Err(Error::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    trace!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

async fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_all().await
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("download"), ToOwned::to_owned);
    name.push(".part");
    path.with_file_name(name)
}
