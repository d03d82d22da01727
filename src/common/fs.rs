use std::{fs::{File, create_dir_all}, io::{Seek, Write}, path::{Path, PathBuf}};

use anyhow::{Context, Result, anyhow, bail};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

/// Create the directory if it doesn’t exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() { bail!("Path exists but is not a directory: {}", path.display()); }
    } else {
        create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Error unless the file already exists.
pub(crate) fn require_file_exists(path: &Path) -> Result<()> {
    if !path.exists() { bail!("File does not exist: {}", path.display()); }
    if !path.is_file() { bail!("Path exists but is not a file: {}", path.display()); }
    Ok(())
}

/// Hex-encoded SHA-256 of a byte slice.
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hex-encoded SHA-1 of a byte slice.
pub(crate) fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Write-then-rename wrapper, so a failed write never leaves a truncated file at `target`.
pub(crate) struct PendingWrite {
    target: PathBuf,
    tmp: Option<NamedTempFile>,
}

impl PendingWrite {
    /// Open a temporary file next to `target`, creating parent directories as needed.
    pub(crate) fn open(target: &Path) -> Result<Self> {
        let parent = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        ensure_dir_exists(parent)?;
        let tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("create temp file in {}", parent.display()))?;

        Ok(Self { target: target.to_path_buf(), tmp: Some(tmp) })
    }

    /// Move the temporary file into place, replacing any previous file at the target.
    pub(crate) fn finalize(mut self) -> Result<()> {
        let tmp = self.tmp.take().ok_or_else(|| anyhow!("write already finalized"))?;
        tmp.as_file().sync_all().ok(); // best-effort fsync file
        tmp.persist(&self.target)
            .with_context(|| format!("rename to {}", self.target.display()))?;
        if let Some(dir) = self.target.parent() {
            let _ = File::open(dir).and_then(|f| f.sync_all());
        }
        Ok(())
    }

    fn file(&mut self) -> std::io::Result<&mut NamedTempFile> {
        self.tmp.as_mut()
            .ok_or_else(|| std::io::Error::other("write already finalized"))
    }
}

impl Write for PendingWrite {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> { self.file()?.write(buf) }

    fn flush(&mut self) -> std::io::Result<()> { self.file()?.flush() }
}

impl Seek for PendingWrite {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        self.file()?.as_file_mut().seek(pos)
    }
}
