//! # codesmelt
//!
//! Melts a project's source files into a single annotated text file.
//!
//! ## Features
//!
//! - Extension allow-list and shell-style ignore globs
//! - `.gitignore` support at the project root
//! - Directory structure header
//! - UTF-8 decoding with a Latin-1 fallback
//! - Optional AI documentation summary (OpenAI or xAI)
//!
//! ## Quick Start
//!
//! ```no_run
//! use codesmelt::{Config, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .project_root("./my-project")
//!     .output_file("concatenated_source.txt")
//!     .build()?;
//!
//! Pipeline::new(config)?.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **PathFilter**: decides per path whether it belongs in the output
//! 2. **TreeRenderer**: draws the directory structure
//! 3. **Scanner**: collects and reads the included files in order
//! 4. **Writer**: assembles the output document
//! 5. **SummaryGenerator**: optionally summarizes the result

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod error;
mod file;
mod filter;
mod ignore_rules;
mod pipeline;
mod scanner;
mod tree;
mod writer;

pub mod summary;

pub use config::{Config, ConfigBuilder, ExclusionConfig};
pub use error::{Error, Result};
pub use file::{Encoding, FileContent, FileData};
pub use filter::{PathFilter, Verdict};
pub use ignore_rules::{GitignoreRules, IgnoreRules, IGNORE_FILE_NAME};
pub use pipeline::{Pipeline, RunStats};
pub use summary::{ProviderChain, SummaryGenerator};
pub use tree::TreeRenderer;

/// Runs a complete concatenation with the given configuration.
///
/// # Errors
///
/// Returns an error if:
/// - The project root doesn't exist or isn't a directory
/// - The output file can't be created or written
///
/// # Examples
///
/// ```no_run
/// use codesmelt::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .project_root(".")
///     .build()?;
///
/// run(config)?;
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<RunStats> {
    Pipeline::new(config)?.run()
}
