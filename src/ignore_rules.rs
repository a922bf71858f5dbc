//! Gitignore-style rules loaded from the project root.
//!
//! The path filter only sees the [`IgnoreRules`] capability, so tests can
//! inject a closure instead of writing a `.gitignore` to disk.

use crate::error::{Error, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the per-project ignore-rule file.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Decides whether an absolute path is ignored by version-control rules.
pub trait IgnoreRules {
    /// Returns `Ok(true)` if `path` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Match`] if the rules can't be evaluated for `path`.
    fn is_ignored(&self, path: &Path) -> Result<bool>;
}

impl<F> IgnoreRules for F
where
    F: Fn(&Path) -> Result<bool>,
{
    fn is_ignored(&self, path: &Path) -> Result<bool> {
        self(path)
    }
}

/// Rules parsed from `<root>/.gitignore`.
pub struct GitignoreRules {
    root: PathBuf,
    matcher: Gitignore,
}

impl GitignoreRules {
    /// Loads the rule file under `root`, if any.
    ///
    /// A missing file yields `None`. A malformed file is logged and also
    /// yields `None`, so the run proceeds without gitignore filtering.
    #[must_use]
    pub fn load(root: &Path) -> Option<Self> {
        let path = root.join(IGNORE_FILE_NAME);
        if !path.is_file() {
            debug!("No {} found in {}", IGNORE_FILE_NAME, root.display());
            return None;
        }

        match Self::from_file(root, &path) {
            Ok(rules) => {
                debug!("Loaded {} ignore rules from {}", rules.len(), path.display());
                Some(rules)
            }
            Err(e) => {
                warn!("{e}; gitignore filtering disabled");
                None
            }
        }
    }

    /// Parses `path` as a gitignore file anchored at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IgnoreRules`] if the file can't be read or contains
    /// an invalid pattern.
    pub fn from_file(root: &Path, path: &Path) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        if let Some(err) = builder.add(path) {
            return Err(Error::ignore_rules(path, err.to_string()));
        }

        let matcher = builder
            .build()
            .map_err(|e| Error::ignore_rules(path, e.to_string()))?;

        Ok(Self {
            root: root.to_path_buf(),
            matcher,
        })
    }

    /// Number of rules in the file.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matcher.num_ignores() as usize + self.matcher.num_whitelists() as usize
    }

    /// Returns true if the file holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IgnoreRules for GitignoreRules {
    fn is_ignored(&self, path: &Path) -> Result<bool> {
        let relative = path.strip_prefix(&self.root).map_err(|_| {
            Error::matching(
                path,
                format!("path is not under {}", self.root.display()),
            )
        })?;

        if relative.as_os_str().is_empty() {
            return Ok(false);
        }

        Ok(self
            .matcher
            .matched_path_or_any_parents(relative, path.is_dir())
            .is_ignore())
    }
}

impl fmt::Debug for GitignoreRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitignoreRules")
            .field("root", &self.root)
            .field("rules", &self.len())
            .finish()
    }
}
