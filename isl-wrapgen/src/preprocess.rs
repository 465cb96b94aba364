//! Header lookup and the on-disk preprocessing cache.
//!
//! Preprocessing drops directives (ownership-macro redefinitions included)
//! and expands the declaration macros defined in the macro headers. The
//! result is cached under a key derived from the macro headers and the
//! header itself, so unchanged inputs always yield byte-identical text.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::catalogue;
use crate::macros::MacroTable;

/// Bumped whenever the normalization below changes, invalidating old
/// cache entries.
const CACHE_KEY_VERSION: &[u8] = b"v1-";

/// Finds headers along an include path and caches their preprocessed form.
pub struct HeaderSource {
    include_dirs: Vec<PathBuf>,
    cache_dir: Option<PathBuf>,
    macro_headers: Vec<String>,
}

impl HeaderSource {
    pub fn new(include_dirs: Vec<PathBuf>, cache_dir: Option<PathBuf>) -> Self {
        Self {
            include_dirs,
            cache_dir,
            macro_headers: catalogue::MACRO_HEADERS
                .iter()
                .map(|h| h.to_string())
                .collect(),
        }
    }

    /// Override the macro headers that participate in the cache key.
    pub fn with_macro_headers(mut self, macro_headers: Vec<String>) -> Self {
        self.macro_headers = macro_headers;
        self
    }

    /// Locate `name` in the first include directory that has it.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.include_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Raw contents of a header.
    pub fn contents(&self, name: &str) -> Result<String> {
        let Some(path) = self.resolve(name) else {
            bail!(
                "header '{name}' not found in include path [{}]",
                self.include_dirs
                    .iter()
                    .map(|d| d.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        };
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
    }

    /// Cache key: SHA-256 over the version tag, the macro headers that are
    /// present, and the header itself.
    pub fn cache_key(&self, name: &str) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(CACHE_KEY_VERSION);
        for macro_header in &self.macro_headers {
            // Older isl releases lack some macro headers.
            if self.resolve(macro_header).is_some() {
                hasher.update(self.contents(macro_header)?.as_bytes());
            }
        }
        hasher.update(self.contents(name)?.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Function-like macros of the macro headers that are present.
    pub fn macro_table(&self) -> Result<MacroTable> {
        let mut table = MacroTable::new();
        for macro_header in &self.macro_headers {
            if self.resolve(macro_header).is_some() {
                table.collect(&self.contents(macro_header)?);
            } else {
                debug!(header = %macro_header, "macro header not present");
            }
        }
        Ok(table)
    }

    fn expand(&self, name: &str) -> Result<String> {
        let macros = self.macro_table()?;
        Ok(macros.expand(&preprocess(&self.contents(name)?)))
    }

    /// Preprocessed header text, served from the cache when possible.
    pub fn preprocessed(&self, name: &str) -> Result<String> {
        let Some(cache_dir) = &self.cache_dir else {
            return self.expand(name);
        };

        let key = self.cache_key(name)?;
        let cached = cache_dir.join(&key);
        if let Ok(text) = std::fs::read_to_string(&cached) {
            debug!(header = name, key = %key, "preprocessing cache hit");
            return Ok(text);
        }

        info!(header = name, "preprocessing");
        let text = self.expand(name)?;
        std::fs::create_dir_all(cache_dir)
            .with_context(|| format!("creating cache dir {}", cache_dir.display()))?;
        write_atomically(&cached, &text)?;
        Ok(text)
    }
}

fn write_atomically(path: &Path, text: &str) -> Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, text).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("renaming to {}", path.display()))
}

/// Normalize header text: drop every preprocessor directive (including
/// redefinitions of the ownership macros, which must survive as plain
/// words) while keeping line structure intact.
pub fn preprocess(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_directive = false;
    for line in text.lines() {
        let starts_directive = line.trim_start().starts_with('#');
        if starts_directive || in_directive {
            in_directive = line.trim_end().ends_with('\\');
            out.push('\n');
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with(files: &[(&str, &str)]) -> (tempfile::TempDir, HeaderSource) {
        let dir = tempfile::tempdir().unwrap();
        for (name, text) in files {
            let path = dir.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, text).unwrap();
        }
        let cache = dir.path().join("preproc-headers");
        let src = HeaderSource::new(vec![dir.path().to_path_buf()], Some(cache));
        (dir, src)
    }

    #[test]
    fn directives_are_dropped() {
        let text = "#define __isl_give \\\n  something\nint isl_f(void);\n#endif\n";
        assert_eq!(preprocess(text), "\n\nint isl_f(void);\n\n");
    }

    #[test]
    fn missing_header_is_an_error() {
        let (_dir, src) = source_with(&[]);
        let err = src.contents("isl/nope.h").unwrap_err();
        assert!(err.to_string().contains("isl/nope.h"));
    }

    #[test]
    fn cache_is_keyed_by_content() {
        let (dir, src) = source_with(&[
            ("isl/list.h", "#define ISL_DECLARE_LIST(x)\n"),
            ("isl/a.h", "int isl_a_f(void);\n"),
        ]);
        let first = src.preprocessed("isl/a.h").unwrap();
        let key = src.cache_key("isl/a.h").unwrap();
        assert!(dir.path().join("preproc-headers").join(&key).is_file());
        assert_eq!(src.preprocessed("isl/a.h").unwrap(), first);

        std::fs::write(dir.path().join("isl/a.h"), "int isl_a_g(void);\n").unwrap();
        assert_ne!(src.cache_key("isl/a.h").unwrap(), key);
        assert!(src.preprocessed("isl/a.h").unwrap().contains("isl_a_g"));
    }

    #[test]
    fn list_macros_are_expanded_and_cached() {
        let (dir, src) = source_with(&[
            (
                "isl/list.h",
                "#define ISL_DECLARE_LIST_FN(EL) \\\n\
                 isl_size isl_##EL##_list_size(__isl_keep isl_##EL##_list *list);\n",
            ),
            ("isl/id.h", "#include <isl/list.h>\nISL_DECLARE_LIST_FN(id)\n"),
        ]);
        let text = src.preprocessed("isl/id.h").unwrap();
        assert_eq!(
            text,
            "\nisl_size isl_id_list_size(__isl_keep isl_id_list *list);\n"
        );

        let key = src.cache_key("isl/id.h").unwrap();
        assert_eq!(key.len(), 64);
        let cached = std::fs::read_to_string(dir.path().join("preproc-headers").join(key)).unwrap();
        assert_eq!(cached, text);
    }
}
