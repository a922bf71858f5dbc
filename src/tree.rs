//! Directory structure rendering.

use crate::file::FileData;
use crate::filter::PathFilter;
use crate::scanner::Scanner;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const BRANCH: &str = "├──";
const LAST_BRANCH: &str = "└──";
const CONTINUATION: &str = "│   ";
const BLANK: &str = "    ";

/// Renders the project tree as indented lines.
///
/// Files come before subdirectories at each level, both sorted by name.
/// Files are filtered through [`PathFilter`]; directories are only pruned by
/// the excluded-name set, so a directory whose files are all filtered out
/// still appears.
#[derive(Debug)]
pub struct TreeRenderer<'a> {
    filter: &'a PathFilter,
}

impl<'a> TreeRenderer<'a> {
    /// Creates a renderer driven by `filter`.
    #[must_use]
    pub const fn new(filter: &'a PathFilter) -> Self {
        Self { filter }
    }

    /// Renders everything below the filter's project root.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        let lines = self.render_dir(self.filter.root(), "");
        debug!("Rendered directory tree with {} lines", lines.len());
        lines
    }

    /// Renders the tree and collects the included files in one call.
    #[must_use]
    pub fn render_with_files(&self) -> (String, Vec<FileData>) {
        let text = self.render().join("\n");
        let files = Scanner::new(self.filter).scan();
        (text, files)
    }

    fn render_dir(&self, dir: &Path, prefix: &str) -> Vec<String> {
        let (files, dirs) = match list_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let files: Vec<_> = files
            .into_iter()
            .filter(|f| self.filter.should_include(f))
            .collect();
        let dirs: Vec<_> = dirs
            .into_iter()
            .filter(|d| !self.filter.is_excluded_dir_name(&file_name(d)))
            .collect();

        let mut lines = Vec::new();

        for (idx, file) in files.iter().enumerate() {
            let connector = if idx + 1 == files.len() { LAST_BRANCH } else { BRANCH };
            lines.push(format!("{prefix}{connector} {}", file_name(file)));
        }

        for (idx, sub) in dirs.iter().enumerate() {
            let is_last = idx + 1 == dirs.len();
            let connector = if is_last { LAST_BRANCH } else { BRANCH };
            lines.push(format!("{prefix}{connector} {}/", file_name(sub)));

            let child_prefix = format!("{prefix}{}", if is_last { BLANK } else { CONTINUATION });
            lines.extend(self.render_dir(sub, &child_prefix));
        }

        lines
    }
}

/// Lists a directory's regular files and real subdirectories, each sorted by name.
///
/// Symlinks to files count as files; symlinked directories are skipped.
fn list_dir(dir: &Path) -> io::Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let entries = fs::read_dir(dir)?.map(|entry| entry.map(|e| e.path()));
    Ok(partition_entries(dir, entries))
}

/// Splits listed paths into files and directories; a failing entry is skipped.
fn partition_entries(
    dir: &Path,
    entries: impl IntoIterator<Item = io::Result<PathBuf>>,
) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut files = Vec::new();
    let mut dirs = Vec::new();

    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => dirs.push(path),
            Ok(_) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    files.sort_by_key(|p| p.file_name().map(ToOwned::to_owned));
    dirs.sort_by_key(|p| p.file_name().map(ToOwned::to_owned));
    (files, dirs)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
