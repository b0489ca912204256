// LogScope - platform/fs.rs
//
// Small async filesystem helpers used by the artifact store.

use std::io;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Read at most `max_bytes` from the start of a file.
///
/// Invalid UTF-8 (including a multi-byte sequence cut at the limit) is
/// replaced rather than rejected.
pub async fn read_prefix_lossy(path: &Path, max_bytes: usize) -> io::Result<String> {
    let file = tokio::fs::File::open(path).await?;
    let mut buf = Vec::with_capacity(max_bytes.min(64 * 1024));
    file.take(max_bytes as u64).read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Delete a file. Returns `Ok(false)` if it was already gone.
pub async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
