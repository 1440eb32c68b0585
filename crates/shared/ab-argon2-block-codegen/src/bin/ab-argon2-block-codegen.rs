use ab_argon2_block_codegen::schedule::Schedule;
use ab_argon2_block_codegen::{Strategy, check_kernel, generate};
use anyhow::Context;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::{fs, io};
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Emit unrolled Argon2 block compression kernel as Rust source
#[derive(Debug, Parser)]
#[clap(about, version)]
struct Cli {
    /// How much of block compression to unroll
    #[arg(long, value_enum, default_value = "full")]
    strategy: Strategy,
    /// Write generated source into this file instead of stdout
    #[arg(long, conflicts_with = "check")]
    output: Option<PathBuf>,
    /// Exit with an error if this file differs from generated source, nothing is written
    #[arg(long)]
    check: Option<PathBuf>,
}

fn init_logger() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logger();
    let Cli {
        strategy,
        output,
        check,
    } = Cli::parse();

    if let Some(path) = check {
        if !check_kernel(&path, &Schedule::ARGON2, strategy)? {
            error!(path = %path.display(), ?strategy, "Regenerate kernel with `--output`");
            anyhow::bail!("`{}` is out of date", path.display());
        }

        return Ok(());
    }

    let code = generate(&Schedule::ARGON2, strategy)?;

    if let Some(path) = output {
        fs::write(&path, &code)
            .with_context(|| format!("Failed to write `{}`", path.display()))?;
        info!(path = %path.display(), ?strategy, bytes = code.len(), "Kernel written");
    } else {
        io::stdout()
            .lock()
            .write_all(code.as_bytes())
            .context("Failed to write kernel to stdout")?;
    }

    Ok(())
}
