//! File inclusion decisions.
//!
//! Every candidate path passes through the same ordered checks: project
//! containment, excluded directory names, the extension allow-list, the
//! static ignore globs and finally the project's gitignore rules. The first
//! four fail closed; a gitignore evaluation error fails open.

use crate::config::{Config, ExclusionConfig};
use crate::error::{Error, Result};
use crate::ignore_rules::{GitignoreRules, IgnoreRules};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Outcome of evaluating a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The path belongs in the output.
    Include,
    /// The path is not inside the project root.
    OutsideRoot,
    /// A path component is an always-excluded directory name.
    ExcludedDir(String),
    /// Extension filtering is on and the extension isn't allowed.
    Extension,
    /// The relative path matched a static ignore glob.
    Pattern(String),
    /// The project's gitignore rules ignore the path.
    Gitignored,
    /// The path is the run's own output file.
    OutputFile,
}

impl Verdict {
    /// Returns true if the path should be included.
    #[must_use]
    pub const fn is_include(&self) -> bool {
        matches!(self, Self::Include)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Include => write!(f, "included"),
            Self::OutsideRoot => write!(f, "outside project path"),
            Self::ExcludedDir(name) => write!(f, "excluded directory '{name}'"),
            Self::Extension => write!(f, "non-source file"),
            Self::Pattern(pattern) => write!(f, "ignored pattern '{pattern}'"),
            Self::Gitignored => write!(f, "gitignored"),
            Self::OutputFile => write!(f, "output file"),
        }
    }
}

/// Decides which filesystem entries belong in the concatenated output.
pub struct PathFilter {
    root: PathBuf,
    exclusions: Arc<ExclusionConfig>,
    ignore_globs: GlobSet,
    ignore_patterns: Vec<String>,
    include_extensions: bool,
    rules: Option<Box<dyn IgnoreRules>>,
    output_file: Option<PathBuf>,
}

impl PathFilter {
    /// Creates a filter rooted at `root` with no gitignore rules.
    ///
    /// `root` should already be absolute; relative candidates never match it.
    ///
    /// # Errors
    ///
    /// Returns an error if an ignore pattern is not a valid glob.
    pub fn new(
        root: impl Into<PathBuf>,
        exclusions: Arc<ExclusionConfig>,
        include_extensions: bool,
    ) -> Result<Self> {
        let ignore_patterns = exclusions.ignore_patterns().to_vec();
        let ignore_globs = build_globset(&ignore_patterns)?;

        Ok(Self {
            root: root.into(),
            exclusions,
            ignore_globs,
            ignore_patterns,
            include_extensions,
            rules: None,
            output_file: None,
        })
    }

    /// Creates the filter for a run, loading `.gitignore` from the project root.
    ///
    /// # Errors
    ///
    /// Returns an error if an ignore pattern is not a valid glob.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut filter = Self::new(
            &config.project_root,
            Arc::clone(&config.exclusions),
            config.include_extensions,
        )?;

        if let Some(rules) = GitignoreRules::load(&config.project_root) {
            filter = filter.with_rules(rules);
        }

        Ok(filter)
    }

    /// Attaches gitignore-style rules.
    #[must_use]
    pub fn with_rules(mut self, rules: impl IgnoreRules + 'static) -> Self {
        self.rules = Some(Box::new(rules));
        self
    }

    /// Excludes one exact absolute path, used for the run's output file.
    #[must_use]
    pub fn skip_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Project root all decisions are relative to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true if `name` is an always-excluded directory name.
    #[must_use]
    pub fn is_excluded_dir_name(&self, name: &str) -> bool {
        self.exclusions.is_excluded_dir(name)
    }

    /// Returns true if `path` belongs in the output.
    #[must_use]
    pub fn should_include(&self, path: &Path) -> bool {
        let verdict = self.evaluate(path);
        if verdict.is_include() {
            trace!("Including file: {}", path.display());
        } else {
            debug!("Skipping {} ({})", path.display(), verdict);
        }
        verdict.is_include()
    }

    /// Runs every check on `path` and reports the first one that fails.
    #[must_use]
    pub fn evaluate(&self, path: &Path) -> Verdict {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return Verdict::OutsideRoot;
        };

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy()),
                Component::CurDir => {}
                _ => return Verdict::OutsideRoot,
            }
        }

        if self.output_file.as_deref() == Some(path) {
            return Verdict::OutputFile;
        }

        if let Some(part) = parts.iter().find(|p| self.exclusions.is_excluded_dir(p)) {
            return Verdict::ExcludedDir(part.to_string());
        }

        if self.include_extensions && !self.has_allowed_extension(path) {
            return Verdict::Extension;
        }

        let relative = parts.join("/");
        if let Some(&index) = self.ignore_globs.matches(&relative).first() {
            return Verdict::Pattern(self.ignore_patterns[index].clone());
        }

        if let Some(rules) = &self.rules {
            match rules.is_ignored(path) {
                Ok(true) => return Verdict::Gitignored,
                Ok(false) => {}
                Err(e) => warn!("{e}; including file"),
            }
        }

        Verdict::Include
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| self.exclusions.allows_extension(&ext.to_string_lossy()))
            .unwrap_or(false)
    }
}

impl fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathFilter")
            .field("root", &self.root)
            .field("include_extensions", &self.include_extensions)
            .field("ignore_patterns", &self.ignore_patterns)
            .field("has_rules", &self.rules.is_some())
            .field("output_file", &self.output_file)
            .finish()
    }
}

/// Compiles shell-style patterns: `*` crosses `/`, backslash is literal.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .backslash_escape(false)
            .build()
            .map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;
        builder.add(glob);
    }

    builder
        .build()
        .map_err(|e| Error::config(format!("Failed to build glob set: {e}")))
}
