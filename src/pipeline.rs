use crate::{
    config::Config,
    error::{Error, Result},
    file::Encoding,
    filter::PathFilter,
    scanner::Scanner,
    summary::{ProviderChain, SummaryGenerator},
    tree::TreeRenderer,
    writer::{Writer, TIMESTAMP_FORMAT},
};
use serde::Serialize;
use std::{
    fs,
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{debug, info, instrument, warn};

/// Statistics collected during a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    /// Number of file sections written
    pub files_included: usize,

    /// Files replaced by a read-error placeholder
    pub unreadable_files: usize,

    /// Files decoded with the Latin-1 fallback
    pub latin1_files: usize,

    /// Lines in the rendered directory tree (0 when disabled)
    pub tree_lines: usize,

    /// Output file path
    pub output_file: PathBuf,

    /// Summary file path, if a summary was written
    pub summary_file: Option<PathBuf>,

    /// Total execution time
    pub duration: Duration,
}

/// Runs one concatenation: tree, file sections, optional summary.
pub struct Pipeline<S = ProviderChain> {
    config: Config,
    summary: S,
}

impl Pipeline {
    /// Creates a new pipeline using the real summary providers.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_summary_generator(config, ProviderChain::new())
    }
}

impl<S: SummaryGenerator> Pipeline<S> {
    /// Creates a pipeline with a custom summary generator.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn with_summary_generator(config: Config, summary: S) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, summary })
    }

    /// Executes the run and returns statistics.
    ///
    /// # Process
    ///
    /// 1. **Open**: creates the output file
    /// 2. **Tree**: renders the directory structure (unless disabled)
    /// 3. **Files**: walks the project and appends every included file
    /// 4. **Summary**: optionally asks a provider for documentation
    ///
    /// # Errors
    ///
    /// Returns an error if the project root is invalid or the output can't
    /// be written. Unreadable sources and summary failures are not errors.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use codesmelt::{Config, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .project_root("./my-project")
    ///     .build()?;
    ///
    /// let stats = Pipeline::new(config)?.run()?;
    /// println!("melted {} files", stats.files_included);
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(project = %self.config.project_root.display()))]
    pub fn run(self) -> Result<RunStats> {
        let generated_at = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.run_at(&generated_at)
    }

    fn run_at(&self, generated_at: &str) -> Result<RunStats> {
        let start_time = Instant::now();
        self.config.validate()?;

        let mut filter = PathFilter::from_config(&self.config)?;
        let output_file = &self.config.output_file;
        let mut writer = Writer::create(output_file)?;

        if let Ok(resolved) = output_file.canonicalize() {
            filter = filter.skip_path(resolved);
        }

        writer.write_header(generated_at, &self.config.project_root)?;

        let mut tree_lines = 0;
        if self.config.include_structure {
            let lines = TreeRenderer::new(&filter).render();
            tree_lines = lines.len();
            writer.write_structure(&lines)?;
        }

        let files = Scanner::new(&filter).scan();
        for file in &files {
            writer.write_file(file)?;
        }
        let files_included = writer.files_written();
        writer.finish()?;

        info!(
            "✓ Wrote {} file sections to {}",
            files_included,
            output_file.display()
        );

        let summary_file = if self.config.generate_summary && files_included > 0 {
            self.write_summary()?
        } else {
            None
        };

        let duration = start_time.elapsed();
        debug!("Run completed in {:.2}s", duration.as_secs_f64());

        let stats = RunStats {
            files_included,
            unreadable_files: files.iter().filter(|f| !f.is_readable()).count(),
            latin1_files: files
                .iter()
                .filter(|f| f.encoding() == Some(Encoding::Latin1))
                .count(),
            tree_lines,
            output_file: output_file.clone(),
            summary_file,
            duration,
        };

        match serde_json::to_string(&stats) {
            Ok(json) => debug!("Run stats: {json}"),
            Err(e) => warn!("Failed to serialize run stats: {e}"),
        }

        Ok(stats)
    }

    /// Feeds the finished output to the summary generator.
    fn write_summary(&self) -> Result<Option<PathBuf>> {
        info!("Generating AI documentation summary...");

        let content = match fs::read_to_string(&self.config.output_file) {
            Ok(content) => content,
            Err(e) => {
                warn!("{}; skipping summary", Error::io(&self.config.output_file, e));
                return Ok(None);
            }
        };

        let Some(summary) = self
            .summary
            .generate(&content, self.config.summary_model.as_deref())
        else {
            warn!(
                "Notice: Could not generate AI summary. \
                 This could be due to token limits or missing API keys."
            );
            return Ok(None);
        };

        let summary_path = self.config.summary_path();
        fs::write(&summary_path, summary).map_err(|e| Error::io(&summary_path, e))?;
        info!("Generated AI summary: {}", summary_path.display());

        Ok(Some(summary_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::cell::RefCell;
    use std::path::Path;

    const STAMP: &str = "2024-05-01 12:00:00";

    struct NoSummary;

    impl SummaryGenerator for NoSummary {
        fn generate(&self, _text: &str, _model: Option<&str>) -> Option<String> {
            None
        }
    }

    #[derive(Default)]
    struct RecordingSummary {
        seen: RefCell<Vec<(usize, Option<String>)>>,
    }

    impl SummaryGenerator for &RecordingSummary {
        fn generate(&self, text: &str, model: Option<&str>) -> Option<String> {
            self.seen
                .borrow_mut()
                .push((text.len(), model.map(ToString::to_string)));
            Some("# Summary\n".to_string())
        }
    }

    fn config(root: &Path, output: &Path) -> crate::config::ConfigBuilder {
        Config::builder().project_root(root).output_file(output)
    }

    fn run(config: Config) -> (RunStats, String) {
        let output = config.output_file.clone();
        let stats = Pipeline::with_summary_generator(config, NoSummary)
            .unwrap()
            .run_at(STAMP)
            .unwrap();
        (stats, fs::read_to_string(output).unwrap())
    }

    #[test]
    fn test_full_output_format() {
        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        project.child("src/main.rs").write_str("fn main() {}\n").unwrap();
        project.child("README.md").write_str("# Demo\n").unwrap();

        let cfg = config(project.path(), &out.path().join("melt.txt"))
            .build()
            .unwrap();
        let root = cfg.project_root.clone();
        let (stats, text) = run(cfg);

        let rule = "=".repeat(80);
        let expected = format!(
            "# Project Source Code Concatenation\n\
             # Generated on: {STAMP}\n\
             # Project path: {}\n\n\
             Directory Structure:\n\n\
             └── README.md\n\
             └── src/\n    \
             └── main.rs\n\n\
             {rule}\n\n\
             \n\n# File: README.md\n{rule}\n\n# Demo\n\
             \n\n# File: src/main.rs\n{rule}\n\nfn main() {{}}\n",
            root.display()
        );

        assert_eq!(text, expected);
        assert_eq!(stats.files_included, 2);
        assert_eq!(stats.tree_lines, 3);
        assert!(stats.summary_file.is_none());
    }

    #[test]
    fn test_excluded_directory_scenario() {
        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        project.child("src/main.go").write_str("package main").unwrap();
        project.child("build/out.o").write_str("object").unwrap();
        project.child("README.md").write_str("readme").unwrap();

        let (stats, text) = run(
            config(project.path(), &out.path().join("o.txt"))
                .build()
                .unwrap(),
        );

        assert_eq!(stats.files_included, 2);
        let readme = text.find("# File: README.md").unwrap();
        let main = text.find("# File: src/main.go").unwrap();
        assert!(readme < main);
        assert!(!text.contains("out.o"));
        assert!(!text.contains("build/"));
    }

    #[test]
    fn test_ignore_pattern_scenario() {
        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        project.child("data/report.csv").write_str("a,b\n1,2").unwrap();
        project.child("main.py").write_str("print(1)").unwrap();

        let (_, text) = run(
            config(project.path(), &out.path().join("o.txt"))
                .include_extensions(false)
                .build()
                .unwrap(),
        );

        assert!(!text.contains("report.csv"));
        assert!(!text.contains("a,b"));
        assert!(text.contains("# File: main.py"));
    }

    #[test]
    fn test_gitignore_scenario() {
        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        project.child(".gitignore").write_str("secrets.env\n").unwrap();
        project.child("secrets.env").write_str("TOKEN=hunter2").unwrap();
        project.child("app.env").write_str("PORT=8080").unwrap();

        let (stats, text) = run(
            config(project.path(), &out.path().join("o.txt"))
                .build()
                .unwrap(),
        );

        assert_eq!(stats.files_included, 1);
        assert!(text.contains("# File: app.env"));
        assert!(!text.contains("secrets.env"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn test_malformed_gitignore_is_not_fatal() {
        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        project
            .child(".gitignore")
            .write_str("{broken\nsecret.rs\n")
            .unwrap();
        project.child("lib.rs").write_str("pub fn f() {}").unwrap();
        project.child("secret.rs").write_str("const K: u8 = 1;").unwrap();

        let (_, text) = run(
            config(project.path(), &out.path().join("o.txt"))
                .build()
                .unwrap(),
        );

        assert!(text.contains("# File: lib.rs"));
        assert!(text.contains("# File: secret.rs"));
        assert!(text.contains("└── secret.rs"));
    }

    #[test]
    fn test_round_trip_single_file() {
        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        let content = "line one\n\tline two\r\nlast";
        project.child("pkg/data.txt").write_str(content).unwrap();

        let (_, text) = run(
            config(project.path(), &out.path().join("o.txt"))
                .include_structure(false)
                .build()
                .unwrap(),
        );

        let marker = format!("# File: pkg/data.txt\n{}\n\n{content}", "=".repeat(80));
        assert_eq!(text.matches("# File: pkg/data.txt\n").count(), 1);
        assert!(text.contains(&marker));
        assert!(!text.contains("Directory Structure:"));
    }

    #[test]
    fn test_output_is_reproducible() {
        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        project.child("a/b.rs").write_str("b").unwrap();
        project.child("a/c/d.toml").write_str("d = 1").unwrap();
        project.child("e.md").write_str("e").unwrap();

        let first = out.path().join("first.txt");
        let second = out.path().join("second.txt");
        let build = |output: &Path| config(project.path(), output).build().unwrap();

        Pipeline::with_summary_generator(build(&first), NoSummary)
            .unwrap()
            .run()
            .unwrap();
        Pipeline::with_summary_generator(build(&second), NoSummary)
            .unwrap()
            .run()
            .unwrap();

        let strip = |path: &Path| -> Vec<String> {
            fs::read_to_string(path)
                .unwrap()
                .lines()
                .filter(|l| !l.starts_with("# Generated on:"))
                .map(ToString::to_string)
                .collect()
        };
        assert_eq!(strip(&first), strip(&second));
    }

    #[test]
    fn test_output_inside_project_is_skipped() {
        let project = assert_fs::TempDir::new().unwrap();
        project.child("notes.txt").write_str("notes").unwrap();
        let output = project.path().join("concatenated_source.txt");

        let (stats, text) = run(config(project.path(), &output).build().unwrap());

        assert_eq!(stats.files_included, 1);
        assert!(!text.contains("concatenated_source.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_placeholder() {
        use std::os::unix::fs::PermissionsExt;

        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        let locked = project.child("locked.rs");
        locked.write_str("secret").unwrap();
        fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o000)).unwrap();

        if fs::read(locked.path()).is_ok() {
            // Permission bits don't apply (e.g. running as root).
            return;
        }

        let (stats, text) = run(
            config(project.path(), &out.path().join("o.txt"))
                .build()
                .unwrap(),
        );

        assert_eq!(stats.unreadable_files, 1);
        assert!(text.contains("ERROR: Could not read file"));
        fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_read_error_becomes_placeholder_section() {
        // Reading /proc/self/mem from offset 0 fails with EIO for any user.
        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        project.child("main.rs").write_str("fn main() {}").unwrap();
        project
            .child("mem.txt")
            .symlink_to_file("/proc/self/mem")
            .unwrap();

        let (stats, text) = run(
            config(project.path(), &out.path().join("o.txt"))
                .build()
                .unwrap(),
        );

        assert_eq!(stats.files_included, 2);
        assert_eq!(stats.unreadable_files, 1);
        assert!(text.contains("# File: mem.txt"));
        assert!(text.contains("ERROR: Could not read file"));
        assert!(text.contains("fn main() {}"));
    }

    #[test]
    fn test_run_stats_serialize() {
        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        project.child("a.rs").write_str("a").unwrap();

        let (stats, _) = run(
            config(project.path(), &out.path().join("o.txt"))
                .build()
                .unwrap(),
        );
        let value = serde_json::to_value(&stats).unwrap();

        assert_eq!(value["files_included"], 1);
        assert_eq!(value["unreadable_files"], 0);
        assert!(value["summary_file"].is_null());
    }

    #[test]
    fn test_latin1_file_counted() {
        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        project.child("old.txt").write_binary(b"\xa9 1999").unwrap();

        let (stats, text) = run(
            config(project.path(), &out.path().join("o.txt"))
                .build()
                .unwrap(),
        );

        assert_eq!(stats.latin1_files, 1);
        assert!(text.contains("© 1999"));
    }

    #[test]
    fn test_missing_project_fails_before_output() {
        let parent = assert_fs::TempDir::new().unwrap();
        let project = parent.child("project");
        project.create_dir_all().unwrap();
        let output = parent.path().join("o.txt");

        let cfg = config(project.path(), &output).build().unwrap();
        fs::remove_dir(project.path()).unwrap();

        let err = Pipeline::with_summary_generator(cfg, NoSummary).err().unwrap();
        assert!(err.is_config());
        assert!(!output.exists());
    }

    #[test]
    fn test_unwritable_output_is_fatal() {
        let project = assert_fs::TempDir::new().unwrap();
        project.child("a.rs").write_str("").unwrap();
        let output = project.path().join("missing-dir").join("o.txt");

        let err = Pipeline::with_summary_generator(
            config(project.path(), &output).build().unwrap(),
            NoSummary,
        )
        .unwrap()
        .run()
        .unwrap_err();

        assert!(err.is_io());
    }

    #[test]
    fn test_summary_written_next_to_output() {
        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        project.child("lib.rs").write_str("pub fn f() {}").unwrap();
        let output = out.path().join("melt.txt");

        let recorder = RecordingSummary::default();
        let stats = Pipeline::with_summary_generator(
            config(project.path(), &output)
                .generate_summary(true)
                .summary_model("grok-2-1212")
                .build()
                .unwrap(),
            &recorder,
        )
        .unwrap()
        .run()
        .unwrap();

        let summary = out.path().join("melt.summary.md");
        assert_eq!(stats.summary_file.as_deref(), Some(summary.as_path()));
        assert_eq!(fs::read_to_string(&summary).unwrap(), "# Summary\n");

        let seen = recorder.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, fs::read_to_string(&output).unwrap().len());
        assert_eq!(seen[0].1.as_deref(), Some("grok-2-1212"));
    }

    #[test]
    fn test_summary_skipped_without_files() {
        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        project.child("image.webp").write_binary(&[1, 2, 3]).unwrap();

        let recorder = RecordingSummary::default();
        let stats = Pipeline::with_summary_generator(
            config(project.path(), &out.path().join("o.txt"))
                .generate_summary(true)
                .build()
                .unwrap(),
            &recorder,
        )
        .unwrap()
        .run()
        .unwrap();

        assert_eq!(stats.files_included, 0);
        assert!(stats.summary_file.is_none());
        assert!(recorder.seen.borrow().is_empty());
    }

    #[test]
    fn test_failed_summary_still_succeeds() {
        let project = assert_fs::TempDir::new().unwrap();
        let out = assert_fs::TempDir::new().unwrap();
        project.child("lib.rs").write_str("pub fn f() {}").unwrap();

        let (stats, _) = run(
            config(project.path(), &out.path().join("o.txt"))
                .generate_summary(true)
                .build()
                .unwrap(),
        );

        assert_eq!(stats.files_included, 1);
        assert!(stats.summary_file.is_none());
        assert!(!out.path().join("o.summary.md").exists());
    }
}
