use crate::{
    error::{Error, Result},
    file::FileData,
};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, trace};

const RULE_WIDTH: usize = 80;
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Streams the concatenated document to its destination.
///
/// The destination is opened once and every section is appended in order.
pub(crate) struct Writer<W: Write> {
    out: W,
    path: PathBuf,
    files_written: usize,
}

impl Writer<BufWriter<File>> {
    /// Creates (or truncates) the output file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be created.
    pub(crate) fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        debug!("Opened output file {}", path.display());
        Ok(Self::new(BufWriter::new(file), path))
    }
}

impl<W: Write> Writer<W> {
    /// Wraps any writer; `path` is only used for error context.
    pub(crate) fn new(out: W, path: impl Into<PathBuf>) -> Self {
        Self {
            out,
            path: path.into(),
            files_written: 0,
        }
    }

    /// Writes the document header.
    pub(crate) fn write_header(&mut self, generated_at: &str, project_root: &Path) -> Result<()> {
        let header = format!(
            "# Project Source Code Concatenation\n\
             # Generated on: {generated_at}\n\
             # Project path: {}\n\n",
            project_root.display()
        );
        self.write_str(&header)
    }

    /// Writes the directory structure block followed by a rule.
    pub(crate) fn write_structure(&mut self, tree_lines: &[String]) -> Result<()> {
        let mut block = vec!["Directory Structure:".to_string(), String::new()];
        block.extend(tree_lines.iter().cloned());

        let text = format!("{}\n\n{}\n\n", block.join("\n"), rule());
        self.write_str(&text)
    }

    /// Appends one file section.
    pub(crate) fn write_file(&mut self, file: &FileData) -> Result<()> {
        let section = format!("\n\n# File: {}\n{}\n\n", file.relative_path, rule());
        self.write_str(&section)?;
        self.write_str(file.body())?;

        self.files_written += 1;
        trace!("Wrote section for {}", file.relative_path);
        Ok(())
    }

    /// Number of file sections written so far.
    pub(crate) const fn files_written(&self) -> usize {
        self.files_written
    }

    /// Flushes and returns the underlying writer.
    pub(crate) fn finish(mut self) -> Result<W> {
        self.out
            .flush()
            .map_err(|e| Error::io(&self.path, e))?;
        Ok(self.out)
    }

    fn write_str(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .map_err(|e| Error::io(&self.path, e))
    }
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}
