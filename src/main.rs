use anyhow::Context;
use clap::Parser;
use codesmelt::{Config, Pipeline};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_OUTPUT: &str = "concatenated_source.txt";

#[derive(Parser, Debug)]
#[command(
    name = "codesmelt",
    version,
    about = "Melt down your project's source code into a single file",
    long_about = "Melt down your project's source code into a single file.\n\n\
    Walks the project directory, keeps source files that pass the extension \
    allow-list, the built-in ignore patterns and the project's .gitignore, and \
    writes them into one file preceded by a directory tree.\n\n\
    USAGE EXAMPLES:\n  \
      # Melt a project into concatenated_source.txt\n  \
      codesmelt ./my-project\n\n  \
      # Custom output, no tree, every file type\n  \
      codesmelt ./my-project melted.txt -n -e\n\n  \
      # Also generate an AI summary with a specific model\n  \
      codesmelt ./my-project -s -m grok-2-1212"
)]
struct Cli {
    /// Path to the project directory
    #[arg(value_name = "PROJECT_PATH")]
    project_path: PathBuf,

    /// Output file path (alternative to -o)
    #[arg(value_name = "OUTPUT_FILE")]
    output_file: Option<PathBuf>,

    /// Output file path (default: concatenated_source.txt)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Enable debug logging (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    /// Omit directory structure from output
    #[arg(short = 'n', long)]
    no_structure: bool,

    /// Disable file extension filtering
    #[arg(short = 'e', long)]
    no_extensions: bool,

    /// Generate AI documentation summary (requires OPENAI_API_KEY or XAI_API_KEY)
    #[arg(short, long)]
    summary: bool,

    /// Custom AI model, e.g. 'gpt-4' for OpenAI or 'grok-2-1212' for xAI
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.debug)?;

    let output = cli
        .output
        .or(cli.output_file)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let mut builder = Config::builder()
        .project_root(cli.project_path)
        .output_file(output)
        .include_structure(!cli.no_structure)
        .include_extensions(!cli.no_extensions)
        .generate_summary(cli.summary);

    if let Some(model) = cli.model {
        builder = builder.summary_model(model);
    }

    let config = builder.build().context("Failed to build configuration")?;

    let stats = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run()
        .context("Error during melting")?;

    println!(
        "Successfully melted {} files to {}",
        stats.files_included,
        stats.output_file.display()
    );

    Ok(())
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("codesmelt=info"),
        1 => EnvFilter::new("codesmelt=debug"),
        _ => EnvFilter::new("codesmelt=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();

    Ok(())
}
