//! isl-wrapgen — annotated isl C headers → safe binding wrappers.
//!
//! Parses isl's ownership-annotated declarations (`__isl_take`,
//! `__isl_give`, `__isl_keep`, `__isl_null`) and emits, per output part,
//! a file of C++ wrapper functions (`gen-wrap-<part>.inc`) and a file of
//! statements registering them as methods of the host classes
//! (`gen-expose-<part>.inc`).
//!
//! # Quick start
//!
//! Generate from a config and write the `.inc` files:
//!
//! ```no_run
//! use std::path::Path;
//!
//! isl_wrapgen::run(Path::new("isl-wrapgen.toml"), None).unwrap();
//! ```
//!
//! Or generate in memory from a list of include directories:
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! let parts =
//!     isl_wrapgen::generate_wrapper(&[PathBuf::from("isl/include")], false, None).unwrap();
//! for part in &parts {
//!     println!("{}: {} bytes of wrappers", part.name, part.wrappers.len());
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

pub mod catalogue;
pub mod codegen;
pub mod config;
pub mod error;
pub mod lexer;
pub mod macros;
pub mod model;
pub mod parser;
pub mod preprocess;
pub mod registry;

use codegen::GenerationOutcome;
use codegen::exposer::{self, UpcastLedger};
use codegen::wrapper::generate_method;
use error::SkipReason;
use model::Method;
use preprocess::HeaderSource;
use registry::ClassRegistry;

const GENERATED_BANNER: &str = "// Generated by isl-wrapgen. Do not edit.\n";

/// Generated text for one output part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPart {
    pub name: String,
    pub wrappers: String,
    pub exposers: String,
}

impl GeneratedPart {
    pub fn wrap_file_name(&self) -> String {
        format!("gen-wrap-{}.inc", self.name)
    }

    pub fn expose_file_name(&self) -> String {
        format!("gen-expose-{}.inc", self.name)
    }
}

/// Methods a generation run produced no wrapper for, in generation order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SkipReport {
    /// Methods with an isl handle lacking an ownership annotation.
    pub undocumented: Vec<String>,
    /// Integer variants dropped in favour of their `isl_val` version.
    pub superseded: Vec<String>,
    /// Method and reason for every other signature the generator rejects.
    pub unsupported: Vec<(String, String)>,
}

impl SkipReport {
    pub fn is_empty(&self) -> bool {
        self.undocumented.is_empty() && self.superseded.is_empty() && self.unsupported.is_empty()
    }
}

/// State threaded through one generation run.
#[derive(Debug, Default)]
pub struct GenContext {
    pub ledger: UpcastLedger,
    pub report: SkipReport,
}

/// Run the full pipeline: load config, parse headers, generate, and write
/// the `.inc` files.
///
/// `output` optionally overrides the output directory from the config.
/// Returns the directory the files were written to.
pub fn run(config_path: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let cfg = config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    run_with_config(&cfg, base_dir, output)
}

/// [`run`] for an already-loaded [`config::Config`].
pub fn run_with_config(
    cfg: &config::Config,
    base_dir: &Path,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let parts = generate_from_config(cfg, base_dir)?;
    let output_dir = match output {
        Some(p) => p.to_path_buf(),
        None => config::resolve_path(&cfg.output.dir, base_dir),
    };
    write_parts(&parts, &output_dir)?;
    Ok(output_dir)
}

/// Parse a config file and return the generated parts without writing to
/// disk.
pub fn generate(config_path: &Path) -> Result<Vec<GeneratedPart>> {
    let cfg = config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    generate_from_config(&cfg, base_dir)
}

/// Generate from an already-loaded [`config::Config`].
///
/// `base_dir` is the directory relative to which include paths, the cache
/// directory and the output directory are resolved.
pub fn generate_from_config(cfg: &config::Config, base_dir: &Path) -> Result<Vec<GeneratedPart>> {
    generate_with_report(cfg, base_dir).map(|(parts, _)| parts)
}

/// [`generate_from_config`], also returning which methods were skipped and
/// why.
pub fn generate_with_report(
    cfg: &config::Config,
    base_dir: &Path,
) -> Result<(Vec<GeneratedPart>, SkipReport)> {
    let headers = cfg.header_list();
    info!(
        headers = headers.len(),
        isl_version = ?cfg.isl_version,
        barvinok = cfg.include_barvinok,
        "loaded configuration"
    );

    let source = HeaderSource::new(
        cfg.search_path(base_dir),
        cfg.cache_dir
            .as_ref()
            .map(|dir| config::resolve_path(dir, base_dir)),
    )
    .with_macro_headers(cfg.macro_headers.clone());

    let registry = read_headers(&source, &headers)?;
    generate_parts(&registry, cfg.isl_version)
}

/// Batch entry point: generate every part from the stock header list found
/// along `include_dirs` (after the current directory).
pub fn generate_wrapper(
    include_dirs: &[PathBuf],
    include_barvinok: bool,
    isl_version: Option<u32>,
) -> Result<Vec<GeneratedPart>> {
    let cfg = config::Config {
        include_paths: include_dirs.to_vec(),
        include_barvinok,
        isl_version,
        ..config::Config::default()
    };
    generate_from_config(&cfg, Path::new("."))
}

/// Read `headers` in order into a fresh registry.
pub fn read_headers(source: &HeaderSource, headers: &[String]) -> Result<ClassRegistry> {
    let mut registry = ClassRegistry::new();
    for header in headers {
        let text = source
            .preprocessed(header)
            .with_context(|| format!("preprocessing {header}"))?;
        registry
            .read_header_text(header, &text)
            .with_context(|| format!("parsing {header}"))?;
    }
    info!(
        classes = registry.class_names().count(),
        methods = registry.method_count(),
        "parsed headers"
    );
    Ok(registry)
}

/// Generate the wrapper and exposer text of every part.
pub fn generate_parts(
    registry: &ClassRegistry,
    isl_version: Option<u32>,
) -> Result<(Vec<GeneratedPart>, SkipReport)> {
    let mut ctx = GenContext::default();
    let mut parts = Vec::with_capacity(catalogue::PARTS.len());

    for (part, classes) in catalogue::PARTS {
        let mut wrappers = String::from(GENERATED_BANNER);
        let mut exposers = String::from(GENERATED_BANNER);

        for cls in classes.iter().copied() {
            if !catalogue::class_available(cls, isl_version) {
                debug!(class = cls, ?isl_version, "class not in this isl version");
                continue;
            }
            let methods = registry.methods(cls);
            for method in methods {
                wrap_method(method, methods, &mut ctx, &mut wrappers, &mut exposers)?;
            }
        }

        for &(general, specific) in catalogue::upcasts(part) {
            if !catalogue::class_available(general, isl_version)
                || !catalogue::class_available(specific, isl_version)
            {
                continue;
            }
            exposers.push_str(&exposer::write_upcasts(
                general,
                specific,
                registry,
                &mut ctx.ledger,
            ));
        }

        info!(part = %part, "generated part");
        parts.push(GeneratedPart {
            name: part.to_string(),
            wrappers,
            exposers,
        });
    }

    info!(wrapped = ctx.ledger.wrapped_count(), "generation finished");
    let report = ctx.report;
    if !report.undocumented.is_empty() {
        warn!(
            count = report.undocumented.len(),
            "SKIP ({} undocumented methods): {}",
            report.undocumented.len(),
            report.undocumented.join(", ")
        );
    }
    debug!(
        superseded = report.superseded.len(),
        unsupported = report.unsupported.len(),
        "skipped methods"
    );
    Ok((parts, report))
}

/// Integer variant superseded by an `isl_val` (or untyped) variant.
fn val_versions<'a>(method: &Method, class_methods: &'a [Method]) -> Vec<&'a Method> {
    if !method.is_integer_overload() {
        return Vec::new();
    }
    let stem = &method.name[..method.name.len() - 3];
    let val_name = format!("{stem}_val");
    class_methods
        .iter()
        .filter(|m| m.name == stem || m.name == val_name)
        .collect()
}

fn wrap_method(
    method: &Method,
    class_methods: &[Method],
    ctx: &mut GenContext,
    wrappers: &mut String,
    exposers: &mut String,
) -> Result<()> {
    let superseded_by = val_versions(method, class_methods);
    if !superseded_by.is_empty() {
        debug!(
            "SKIP (val version available): {method} -> {}",
            superseded_by
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        ctx.report.superseded.push(method.to_string());
        return Ok(());
    }

    let mut outcome = generate_method(method);
    if matches!(outcome, GenerationOutcome::RetryWithMutatorVetoed) {
        let mut vetoed = method.clone();
        vetoed.mutator_veto = true;
        debug!(%method, "regenerating without mutator semantics");
        outcome = generate_method(&vetoed);
    }

    match outcome {
        GenerationOutcome::Generated(wrapper) => {
            wrappers.push('\n');
            wrappers.push_str(&wrapper.code);
            exposers.push_str(&exposer::write_exposer(method, &wrapper));
            ctx.ledger.record_wrapped(method);
        }
        GenerationOutcome::Skipped(SkipReason::Undocumented(name)) => {
            ctx.report.undocumented.push(name);
        }
        GenerationOutcome::Skipped(reason) => {
            debug!("SKIP ({reason}): {method}");
            ctx.report
                .unsupported
                .push((method.to_string(), reason.to_string()));
        }
        GenerationOutcome::RetryWithMutatorVetoed => {
            bail!("{method} requested a second mutator retry");
        }
    }
    Ok(())
}

/// Write each part's two files into `dir`, creating it if needed.
pub fn write_parts(parts: &[GeneratedPart], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output dir {}", dir.display()))?;
    let mut written = Vec::with_capacity(parts.len() * 2);
    for part in parts {
        for (file_name, text) in [
            (part.wrap_file_name(), &part.wrappers),
            (part.expose_file_name(), &part.exposers),
        ] {
            let path = dir.join(file_name);
            std::fs::write(&path, text)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), size = text.len(), "wrote");
            written.push(path);
        }
    }
    Ok(written)
}
