//! Configuration types for `isl-wrapgen.toml`.
//!
//! Every field is optional; an empty file reproduces the stock header list
//! and writes the generated `.inc` files next to the config.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::catalogue;

/// Root configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directories searched for headers, after the config file's own
    /// directory. Relative entries are taken relative to that directory.
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    /// Headers to parse, in order. The first header declaring a C name wins.
    #[serde(default = "default_headers")]
    pub headers: Vec<String>,
    /// Headers whose contents participate in every preprocessing cache key.
    #[serde(default = "default_macro_headers")]
    pub macro_headers: Vec<String>,
    /// Where preprocessed headers are cached. No caching when unset.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Also parse the barvinok extension header.
    #[serde(default)]
    pub include_barvinok: bool,
    /// Target isl release; classes added after it are not generated.
    #[serde(default)]
    pub isl_version: Option<u32>,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include_paths: Vec::new(),
            headers: default_headers(),
            macro_headers: default_macro_headers(),
            cache_dir: None,
            include_barvinok: false,
            isl_version: None,
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Header search path: `base_dir` first, then each include path.
    pub fn search_path(&self, base_dir: &Path) -> Vec<PathBuf> {
        std::iter::once(base_dir.to_path_buf())
            .chain(
                self.include_paths
                    .iter()
                    .map(|p| resolve_path(p, base_dir)),
            )
            .collect()
    }

    /// Headers to parse, with the extension header appended when enabled.
    pub fn header_list(&self) -> Vec<String> {
        let mut headers = self.headers.clone();
        if self.include_barvinok {
            headers.push(catalogue::BARVINOK_HEADER.to_string());
        }
        headers
    }
}

fn default_headers() -> Vec<String> {
    catalogue::HEADERS.iter().map(|h| h.to_string()).collect()
}

fn default_macro_headers() -> Vec<String> {
    catalogue::MACRO_HEADERS
        .iter()
        .map(|h| h.to_string())
        .collect()
}

/// Output settings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory receiving `gen-wrap-<part>.inc` and `gen-expose-<part>.inc`.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Resolve `path` against `base_dir` unless it is absolute.
pub fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Load and parse an `isl-wrapgen.toml` configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {}", path.display(), e))?;
    Ok(config)
}
