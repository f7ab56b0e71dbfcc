use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};

/// A regular file inside the story folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Location on disk, used for reading.
    pub path: PathBuf,
    /// Path relative to the story root with `/` separators. Used as the
    /// multipart field name so the service can rebuild the tree.
    pub relative_path: String,
}

impl FileEntry {
    pub fn new(root: &Path, path: PathBuf) -> Self {
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let relative_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        Self {
            path,
            relative_path,
        }
    }

    pub fn basename(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    pub async fn read(&self) -> AppResult<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// List every regular file below `root`, depth first, in the order the
/// directory listings return them. Subdirectories are entered at the point
/// they are listed. Nothing is sorted.
pub fn discover_files(root: &Path) -> AppResult<Vec<FileEntry>> {
    if !root.is_dir() {
        return Err(AppError::not_a_directory(&root.to_string_lossy()));
    }

    let mut files = Vec::new();
    let mut stack = vec![fs::read_dir(root)?];

    while let Some(listing) = stack.last_mut() {
        match listing.next() {
            Some(entry) => {
                let path = entry?.path();
                if path.is_file() {
                    files.push(FileEntry::new(root, path));
                } else if path.is_dir() {
                    stack.push(fs::read_dir(&path)?);
                } else {
                    log::debug!("Skipping {}: not a regular file", path.display());
                }
            }
            None => {
                stack.pop();
            }
        }
    }

    log::debug!("Discovered {} files under {}", files.len(), root.display());
    Ok(files)
}
