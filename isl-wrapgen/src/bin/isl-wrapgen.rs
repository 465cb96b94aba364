//! CLI entry point for isl-wrapgen.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::info;

const DEFAULT_CONFIG: &str = "isl-wrapgen.toml";

/// isl-wrapgen — generate wrapper and exposer code from isl headers.
#[derive(Parser, Debug)]
#[command(name = "isl-wrapgen", version, about)]
struct Cli {
    /// Path to the isl-wrapgen.toml configuration file. Stock settings are
    /// used when omitted and no isl-wrapgen.toml exists.
    config: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extra header search directory; may be repeated.
    #[arg(short = 'I', long = "include")]
    include: Vec<PathBuf>,

    /// Also wrap the barvinok extension header.
    #[arg(long)]
    barvinok: bool,

    /// Target isl release; newer classes are not generated.
    #[arg(long)]
    isl_version: Option<u32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("isl_wrapgen=info")),
        )
        .init();

    let cli = Cli::parse();

    let (mut cfg, base_dir) = match &cli.config {
        Some(path) => (
            isl_wrapgen::config::load_config(path)?,
            path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
        ),
        None if Path::new(DEFAULT_CONFIG).is_file() => (
            isl_wrapgen::config::load_config(Path::new(DEFAULT_CONFIG))?,
            PathBuf::from("."),
        ),
        None => {
            info!("no {DEFAULT_CONFIG} found, using stock settings");
            (isl_wrapgen::config::Config::default(), PathBuf::from("."))
        }
    };

    // Relative -I paths are relative to the working directory, not the config.
    let includes = cli
        .include
        .into_iter()
        .map(std::path::absolute)
        .collect::<std::io::Result<Vec<_>>>()?;
    cfg.include_paths.extend(includes);
    cfg.include_barvinok |= cli.barvinok;
    if cli.isl_version.is_some() {
        cfg.isl_version = cli.isl_version;
    }

    isl_wrapgen::run_with_config(&cfg, &base_dir, cli.output.as_deref())?;
    Ok(())
}
