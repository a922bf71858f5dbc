use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for codesmelt.
///
/// Only [`Error::Config`] and [`Error::Io`] ever abort a run. The other
/// variants are produced by recoverable steps and are logged by the caller.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// A source file could not be read under any supported encoding.
    #[error("Could not read file '{path}': {message}")]
    Read {
        /// Path to the unreadable file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// The project's ignore-rule file is malformed.
    #[error("Failed to parse ignore rules in '{path}': {message}")]
    IgnoreRules {
        /// Path to the rule file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Evaluating the ignore rules for a path failed.
    #[error("Ignore rule matching failed for '{path}': {message}")]
    Match {
        /// Path being evaluated
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// A summary backend was unavailable or returned an error.
    #[error("Summary provider '{provider}' failed: {message}")]
    Summary {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Invalid glob pattern in the exclusion configuration.
    #[error("Invalid ignore pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The invalid pattern
        pattern: String,
        /// Reason why it's invalid
        reason: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a read error.
    #[must_use]
    pub fn read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an ignore-rule parse error.
    #[must_use]
    pub fn ignore_rules(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IgnoreRules {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an ignore-rule evaluation error.
    #[must_use]
    pub fn matching(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Match {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a summary provider error.
    #[must_use]
    pub fn summary(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Summary {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if the run can continue after this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Read { .. } | Self::IgnoreRules { .. } | Self::Match { .. } | Self::Summary { .. }
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Summary {
            provider: "http".to_string(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test message");
        assert!(err.is_config());
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("test message"));
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io("/tmp/test.txt", io_err);
        assert!(err.is_io());
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("/tmp/test.txt"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::read("a.rs", "denied").is_recoverable());
        assert!(Error::ignore_rules(".gitignore", "bad glob").is_recoverable());
        assert!(Error::matching("a.rs", "outside root").is_recoverable());
        assert!(Error::summary("openai", "no key").is_recoverable());
        assert!(!Error::invalid_pattern("[", "unclosed").is_recoverable());
    }

    #[test]
    fn test_summary_error_message() {
        let err = Error::summary("xai", "HTTP 500");
        assert_eq!(err.to_string(), "Summary provider 'xai' failed: HTTP 500");
    }

    #[test]
    fn test_error_clone() {
        let err = Error::config("test");
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }
}
