//! Owner-only file writes for credentials and session state.

use std::io;
use std::path::Path;

use tokio::io::AsyncWriteExt;

#[cfg(unix)]
const OWNER_READ_WRITE: u32 = 0o600;

/// Replaces the contents of `path`, restricting it to the owner on unix.
pub(crate) async fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(OWNER_READ_WRITE);

    let mut file = options.open(path).await?;

    // `mode` only applies when the file is created.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(OWNER_READ_WRITE))
            .await?;
    }

    file.write_all(contents).await?;
    file.flush().await
}
