// src/module/loader.rs
//! Import-spec resolution.
//!
//! A spec string canonicalizes to exactly one absolute spec: builtin loader
//! names pass through, http(s) URLs get the GitHub shorthand rewrite, and
//! everything else resolves on the filesystem relative to the importing
//! chunk's source path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum LoadError {
    /// Canonicalization failed: the file is not there
    PathNotFound(String),
    /// The importing chunk's directory does not exist
    ParentDirMissing(String),
    InvalidUrl(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::PathNotFound(spec) => write!(f, "Import path does not exist: {}", spec),
            LoadError::ParentDirMissing(dir) => {
                write!(f, "importing chunk's directory not found: {}", dir)
            }
            LoadError::InvalidUrl(url) => write!(f, "invalid import url: {}", url),
        }
    }
}

impl std::error::Error for LoadError {}

/// A canonicalized import spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpec {
    pub abs_spec: String,
    pub builtin: bool,
}

/// Canonicalize `spec` as imported from the chunk at `importer_uri`.
/// `module_loaders` is the host-supplied set of builtin loader names; it is
/// only tested for membership.
pub fn resolve_spec(
    spec: &str,
    importer_uri: &str,
    module_loaders: &HashSet<String>,
) -> Result<ResolvedSpec, LoadError> {
    if module_loaders.contains(spec) {
        return Ok(ResolvedSpec {
            abs_spec: spec.to_string(),
            builtin: true,
        });
    }

    if spec.starts_with("http://") || spec.starts_with("https://") {
        return Ok(ResolvedSpec {
            abs_spec: rewrite_url(spec)?,
            builtin: false,
        });
    }

    let parent = Path::new(importer_uri)
        .parent()
        .unwrap_or_else(|| Path::new("."));
    if !parent.as_os_str().is_empty() && !parent.exists() {
        return Err(LoadError::ParentDirMissing(
            parent.to_string_lossy().into_owned(),
        ));
    }

    let joined: PathBuf = parent.join(spec);
    let canonical = joined
        .canonicalize()
        .map_err(|_| LoadError::PathNotFound(spec.to_string()))?;
    Ok(ResolvedSpec {
        abs_spec: canonical.to_string_lossy().into_owned(),
        builtin: false,
    })
}

/// `https://github.com/user/repo` is shorthand for the repo's module entry
/// point on the default branch; anything deeper passes through unchanged.
fn rewrite_url(spec: &str) -> Result<String, LoadError> {
    let (_scheme, rest) = spec
        .split_once("://")
        .ok_or_else(|| LoadError::InvalidUrl(spec.to_string()))?;
    let (host, path) = match rest.split_once('/') {
        Some((host, path)) => (host, path),
        None => (rest, ""),
    };
    if host.is_empty() {
        return Err(LoadError::InvalidUrl(spec.to_string()));
    }

    if host == "github.com" {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if let [user, repo] = segments.as_slice() {
            return Ok(format!(
                "https://raw.githubusercontent.com/{}/{}/master/mod.tern",
                user, repo
            ));
        }
    }

    Ok(spec.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_builtins() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn builtin_specs_pass_through() {
        let mut loaders = HashSet::new();
        loaders.insert("core".to_string());
        let resolved = resolve_spec("core", "main.tern", &loaders).unwrap();
        assert_eq!(resolved.abs_spec, "core");
        assert!(resolved.builtin);
    }

    #[test]
    fn github_two_segment_urls_rewrite_to_module_entry() {
        let resolved = resolve_spec("https://github.com/u/r", "main.tern", &no_builtins()).unwrap();
        assert_eq!(
            resolved.abs_spec,
            "https://raw.githubusercontent.com/u/r/master/mod.tern"
        );
        assert!(!resolved.builtin);
    }

    #[test]
    fn deeper_github_paths_pass_through() {
        let spec = "https://github.com/u/r/blob/master/lib.tern";
        let resolved = resolve_spec(spec, "main.tern", &no_builtins()).unwrap();
        assert_eq!(resolved.abs_spec, spec);
    }

    #[test]
    fn non_github_urls_pass_through() {
        let spec = "https://example.com/pkg/mod.tern";
        let resolved = resolve_spec(spec, "main.tern", &no_builtins()).unwrap();
        assert_eq!(resolved.abs_spec, spec);
    }

    #[test]
    fn missing_file_reports_path_not_found() {
        let dir = std::env::temp_dir();
        let importer = dir.join("importer.tern");
        let err = resolve_spec(
            "definitely_missing.tern",
            importer.to_str().unwrap(),
            &no_builtins(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::PathNotFound(_)));
        assert!(err.to_string().contains("Import path does not exist"));
    }

    #[test]
    fn relative_paths_canonicalize_against_the_importer() {
        let dir = std::env::temp_dir().join("tern_loader_test");
        std::fs::create_dir_all(&dir).unwrap();
        let dep = dir.join("dep.tern");
        std::fs::write(&dep, "").unwrap();
        let importer = dir.join("main.tern");

        let resolved =
            resolve_spec("dep.tern", importer.to_str().unwrap(), &no_builtins()).unwrap();
        assert_eq!(
            resolved.abs_spec,
            dep.canonicalize().unwrap().to_string_lossy().into_owned()
        );
    }
}
