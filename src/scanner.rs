use crate::file::{Encoding, FileData};
use crate::filter::PathFilter;
use std::path::Path;
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

/// Statistics collected during scanning.
#[derive(Debug, Default, Clone)]
pub(crate) struct ScanStats {
    /// Regular files visited
    pub total_files: usize,

    /// Files that passed the filter
    pub included_files: usize,

    /// Files rejected by the filter
    pub skipped_files: usize,

    /// Included files decoded as Latin-1
    pub latin1_files: usize,

    /// Included files replaced by a placeholder
    pub unreadable_files: usize,

    /// Walk errors (unreadable directories, broken entries)
    pub errors: usize,
}

/// Collects the flat, ordered list of included files.
pub(crate) struct Scanner<'a> {
    filter: &'a PathFilter,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner using `filter`.
    pub(crate) const fn new(filter: &'a PathFilter) -> Self {
        Self { filter }
    }

    /// Walks the whole project and reads every included file.
    ///
    /// Files are sorted by their `/`-separated relative path. Unreadable
    /// entries never abort the scan.
    pub(crate) fn scan(&self) -> Vec<FileData> {
        let root = self.filter.root();
        let mut stats = ScanStats::default();
        let mut files = Vec::new();

        debug!("Starting scan of {}", root.display());

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_pruned(entry));

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walk error: {}", e);
                    stats.errors += 1;
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            stats.total_files += 1;

            if !self.filter.should_include(path) {
                stats.skipped_files += 1;
                continue;
            }

            trace!("Processing file: {}", path.display());
            let data = FileData::read(path.to_path_buf(), relative_path(path, root));

            match data.encoding() {
                Some(Encoding::Latin1) => stats.latin1_files += 1,
                None => stats.unreadable_files += 1,
                Some(Encoding::Utf8) => {}
            }
            stats.included_files += 1;
            files.push(data);
        }

        // Sort for deterministic ordering
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        debug!(
            "Scan complete: {} total, {} included, {} skipped, {} latin-1, {} unreadable, {} errors",
            stats.total_files,
            stats.included_files,
            stats.skipped_files,
            stats.latin1_files,
            stats.unreadable_files,
            stats.errors
        );

        if stats.errors > 0 {
            warn!(
                "Encountered {} errors during scanning (non-fatal)",
                stats.errors
            );
        }

        files
    }

    /// Excluded directories are never descended into.
    fn is_pruned(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && self
                .filter
                .is_excluded_dir_name(&entry.file_name().to_string_lossy())
    }
}

/// Project-relative path with `/` separators.
pub(crate) fn relative_path(path: &Path, root: &Path) -> String {
    let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
