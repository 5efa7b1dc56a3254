//! Atomic file writes for downloaded packages
//!
//! Data is written to a temporary file next to the target and renamed over
//! it only once complete, so the final path never holds a partial package.
//! Dropping an unfinished [`AtomicFile`] removes the temporary file.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{ClientError, Result};

/// Permissions given to persisted files
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

pub struct AtomicFile {
    temp: NamedTempFile,
    target: PathBuf,
}

impl AtomicFile {
    /// Start writing `file_name` inside `dir`, creating the directory if needed
    pub fn create(dir: &Path, file_name: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let temp = tempfile::Builder::new()
            .prefix(&format!(".{}.", file_name))
            .suffix(".part")
            .tempfile_in(dir)?;

        Ok(Self {
            temp,
            target: dir.join(file_name),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Flush, sync and move the data into place
    pub fn persist(mut self) -> Result<PathBuf> {
        self.temp.flush()?;
        self.temp.as_file().sync_all()?;

        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| ClientError::Io(e.error))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&target, std::fs::Permissions::from_mode(FILE_MODE))?;
        }

        Ok(target)
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.temp.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.temp.flush()
    }
}
