use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// Text encoding a file was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Valid UTF-8
    Utf8,
    /// Fallback: every byte maps to the code point of the same value
    Latin1,
}

/// File content after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Decoded text
    Text {
        /// The file's text
        text: String,
        /// Encoding that succeeded
        encoding: Encoding,
    },

    /// The file could not be read; the placeholder is written instead
    Unreadable {
        /// Inline error text
        placeholder: String,
    },
}

/// Represents an included file with its content.
#[derive(Debug, Clone)]
pub struct FileData {
    /// Absolute path to the file
    pub absolute_path: PathBuf,

    /// Relative path from the project root, `/`-separated
    pub relative_path: String,

    /// Decoded content or placeholder
    pub content: FileContent,
}

impl FileData {
    /// Reads `absolute_path`, recovering from read failures with a placeholder.
    #[must_use]
    pub fn read(absolute_path: PathBuf, relative_path: String) -> Self {
        let content = match read_text(&absolute_path) {
            Ok((text, encoding)) => FileContent::Text { text, encoding },
            Err(e) => {
                warn!("Failed to read {}: {}", absolute_path.display(), e);
                FileContent::Unreadable {
                    placeholder: placeholder(&absolute_path),
                }
            }
        };

        Self {
            absolute_path,
            relative_path,
            content,
        }
    }

    /// Text written to the output for this file.
    #[must_use]
    pub fn body(&self) -> &str {
        match &self.content {
            FileContent::Text { text, .. } => text,
            FileContent::Unreadable { placeholder } => placeholder,
        }
    }

    /// Returns true if the file was read successfully.
    #[must_use]
    pub const fn is_readable(&self) -> bool {
        matches!(self.content, FileContent::Text { .. })
    }

    /// Encoding used, if the file was readable.
    #[must_use]
    pub const fn encoding(&self) -> Option<Encoding> {
        match self.content {
            FileContent::Text { encoding, .. } => Some(encoding),
            FileContent::Unreadable { .. } => None,
        }
    }
}

/// Reads a file as UTF-8, falling back to Latin-1.
///
/// # Errors
///
/// Returns [`Error::Read`] if the bytes can't be read at all.
pub fn read_text(path: &Path) -> Result<(String, Encoding)> {
    let bytes = fs::read(path).map_err(|e| Error::read(path, e.to_string()))?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok((text, Encoding::Utf8)),
        Err(e) => {
            trace!("{} is not UTF-8, decoding as Latin-1", path.display());
            Ok((decode_latin1(e.as_bytes()), Encoding::Latin1))
        }
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn placeholder(path: &Path) -> String {
    format!("ERROR: Could not read file {}\n", path.display())
}
