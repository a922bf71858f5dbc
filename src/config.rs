use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_OUTPUT_FILE: &str = "concatenated_source.txt";

/// Directory names excluded wherever they appear in the tree.
static DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    ".pythonlibs",
    "venv",
    "node_modules",
    ".cache",
    ".local",
    ".upm",
    ".config",
    ".npm",
    ".nix-profile",
    "dist",
    "build",
    "target",
];

static DEFAULT_SOURCE_EXTENSIONS: &[&str] = &[
    // Web
    ".js", ".ts", ".jsx", ".tsx", ".vue", ".svelte", ".html", ".htm", ".css", ".scss", ".sass",
    ".less",
    // Python
    ".py", ".pyi", ".pyx",
    // JVM
    ".java", ".kt", ".groovy",
    // C family
    ".c", ".cpp", ".h", ".hpp", ".cc",
    // C#
    ".cs", ".cshtml", ".csx",
    // Ruby
    ".rb", ".erb",
    // PHP
    ".php", ".php5", ".phtml",
    ".go", ".rs", ".swift",
    // Shell
    ".sh", ".bash", ".zsh",
    // Config and data
    ".json", ".yaml", ".yml", ".toml", ".xml", ".conf", ".ini", ".env",
    // Documentation
    ".md", ".rst", ".txt",
];

static DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // Build outputs
    "build/*", "dist/*", "target/*", "bin/*", "*.pyc", "__pycache__/*", "*.class",
    // Dependencies
    "node_modules/*", "vendor/*", "venv/*",
    // IDE files
    ".idea/*", ".vscode/*", "*.swp",
    // Lock files
    "package-lock.json", "yarn.lock", "Pipfile.lock", "poetry.lock",
    // Large data files
    "*.csv", "*.json.gz", "*.sql",
    // Binary and media files
    "*.pdf", "*.jpg", "*.png", "*.gif", "*.mp3", "*.mp4", "*.mov", "*.bin", "*.exe", "*.dll",
    "*.so", "*.dylib",
];

static DEFAULT_EXCLUSIONS: Lazy<Arc<ExclusionConfig>> = Lazy::new(|| {
    Arc::new(ExclusionConfig::new(
        DEFAULT_EXCLUDED_DIRS.iter().copied(),
        DEFAULT_SOURCE_EXTENSIONS.iter().copied(),
        DEFAULT_IGNORE_PATTERNS.iter().copied(),
    ))
});

/// Static inclusion rules shared by every run.
///
/// Extensions are normalized to lower case with a leading dot, so both
/// `"RS"` and `".rs"` end up as `".rs"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionConfig {
    excluded_dirs: HashSet<String>,
    extensions: HashSet<String>,
    ignore_patterns: Vec<String>,
}

impl ExclusionConfig {
    /// Creates a new exclusion configuration.
    pub fn new<D, E, P>(excluded_dirs: D, extensions: E, ignore_patterns: P) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        E: IntoIterator,
        E::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            excluded_dirs: excluded_dirs.into_iter().map(Into::into).collect(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
            ignore_patterns: ignore_patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the process-wide default rules.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::clone(&DEFAULT_EXCLUSIONS)
    }

    /// Returns true if `name` is an always-excluded directory name.
    #[must_use]
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.excluded_dirs.contains(name)
    }

    /// Returns true if the extension (with or without dot, any case) is allowed.
    #[must_use]
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.extensions.contains(&normalize_extension(extension))
    }

    /// Glob patterns matched against project-relative paths.
    #[must_use]
    pub fn ignore_patterns(&self) -> &[String] {
        &self.ignore_patterns
    }

    /// Excluded directory names.
    #[must_use]
    pub const fn excluded_dirs(&self) -> &HashSet<String> {
        &self.excluded_dirs
    }

    /// Allowed extensions, lower case with leading dot.
    #[must_use]
    pub const fn extensions(&self) -> &HashSet<String> {
        &self.extensions
    }
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        (*Self::shared()).clone()
    }
}

fn normalize_extension(ext: &str) -> String {
    let lower = ext.to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

/// Configuration for a single concatenation run.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Canonical project root all relative paths are computed against
    pub project_root: PathBuf,

    /// Destination of the concatenated text
    pub output_file: PathBuf,

    /// Render the directory tree block
    pub include_structure: bool,

    /// Apply the extension allow-list
    pub include_extensions: bool,

    /// Ask a summary backend for documentation after writing
    pub generate_summary: bool,

    /// Model identifier overriding the backend default
    pub summary_model: Option<String>,

    /// Static exclusion rules
    pub exclusions: Arc<ExclusionConfig>,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use codesmelt::Config;
    ///
    /// let config = Config::builder()
    ///     .project_root("./my-project")
    ///     .output_file("melted.txt")
    ///     .include_structure(false)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the project root doesn't exist or isn't a directory.
    pub fn validate(&self) -> Result<()> {
        validate_root(&self.project_root)
    }

    /// Path the summary is written to: the output path with its extension
    /// replaced by `summary.md`.
    #[must_use]
    pub fn summary_path(&self) -> PathBuf {
        self.output_file.with_extension("summary.md")
    }
}

fn validate_root(root: &Path) -> Result<()> {
    if !root.exists() {
        return Err(Error::config(format!(
            "Project path {} does not exist",
            root.display()
        )));
    }

    if !root.is_dir() {
        return Err(Error::config(format!(
            "Project path is not a directory: {}",
            root.display()
        )));
    }

    Ok(())
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    project_root: Option<PathBuf>,
    output_file: Option<PathBuf>,
    include_structure: Option<bool>,
    include_extensions: Option<bool>,
    generate_summary: bool,
    summary_model: Option<String>,
    exclusions: Option<Arc<ExclusionConfig>>,
}

impl ConfigBuilder {
    /// Sets the project directory to melt.
    #[must_use]
    pub fn project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_root = Some(path.into());
        self
    }

    /// Sets the output file path.
    #[must_use]
    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Enables or disables the directory structure block.
    #[must_use]
    pub fn include_structure(mut self, enabled: bool) -> Self {
        self.include_structure = Some(enabled);
        self
    }

    /// Enables or disables extension filtering.
    #[must_use]
    pub fn include_extensions(mut self, enabled: bool) -> Self {
        self.include_extensions = Some(enabled);
        self
    }

    /// Requests an AI documentation summary after writing.
    #[must_use]
    pub fn generate_summary(mut self, enabled: bool) -> Self {
        self.generate_summary = enabled;
        self
    }

    /// Overrides the summary model.
    ///
    /// Models whose name starts with `grok` are sent to xAI, everything else
    /// to OpenAI.
    #[must_use]
    pub fn summary_model(mut self, model: impl Into<String>) -> Self {
        self.summary_model = Some(model.into());
        self
    }

    /// Replaces the default exclusion rules.
    #[must_use]
    pub fn exclusions(mut self, exclusions: ExclusionConfig) -> Self {
        self.exclusions = Some(Arc::new(exclusions));
        self
    }

    /// Builds the configuration, resolving the project root to an absolute path.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the root can't be resolved.
    pub fn build(self) -> Result<Config> {
        let root = self.project_root.unwrap_or_else(|| PathBuf::from("."));
        validate_root(&root)?;
        let project_root = root.canonicalize().map_err(|e| Error::io(&root, e))?;

        let config = Config {
            project_root,
            output_file: self
                .output_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE)),
            include_structure: self.include_structure.unwrap_or(true),
            include_extensions: self.include_extensions.unwrap_or(true),
            generate_summary: self.generate_summary,
            summary_model: self.summary_model,
            exclusions: self.exclusions.unwrap_or_else(ExclusionConfig::shared),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder().project_root(temp.path()).build().unwrap();

        assert!(config.project_root.is_absolute());
        assert_eq!(config.output_file, PathBuf::from(DEFAULT_OUTPUT_FILE));
        assert!(config.include_structure);
        assert!(config.include_extensions);
        assert!(!config.generate_summary);
        assert!(config.summary_model.is_none());
    }

    #[test]
    fn test_missing_project_root() {
        let result = Config::builder()
            .project_root("/nonexistent/path/that/should/not/exist")
            .build();

        let err = result.unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_project_root_is_file() {
        use assert_fs::prelude::*;

        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("main.rs");
        file.write_str("fn main() {}").unwrap();

        let result = Config::builder().project_root(file.path()).build();
        assert!(result.unwrap_err().is_config());
    }

    #[test]
    fn test_summary_path() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .project_root(temp.path())
            .output_file("out/concatenated_source.txt")
            .build()
            .unwrap();

        assert_eq!(
            config.summary_path(),
            PathBuf::from("out/concatenated_source.summary.md")
        );
    }

    #[test]
    fn test_default_exclusions() {
        let exclusions = ExclusionConfig::shared();

        assert!(exclusions.is_excluded_dir(".git"));
        assert!(exclusions.is_excluded_dir("node_modules"));
        assert!(!exclusions.is_excluded_dir("src"));
        assert!(exclusions.allows_extension(".rs"));
        assert!(exclusions.allows_extension("RS"));
        assert!(!exclusions.allows_extension(".exe"));
        assert!(exclusions.ignore_patterns().iter().any(|p| p == "*.csv"));
    }

    #[test]
    fn test_extension_normalization() {
        let exclusions = ExclusionConfig::new(["out"], ["Go", ".MD"], ["*.log"]);

        assert!(exclusions.extensions().contains(".go"));
        assert!(exclusions.extensions().contains(".md"));
        assert!(exclusions.allows_extension(".GO"));
    }
}
