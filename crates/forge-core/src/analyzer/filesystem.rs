//! Filesystem helpers for batch analysis: language detection, hashing and
//! the source tree walk.

use std::path::{Path, PathBuf};

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::MAX_SOURCE_BYTES;
use crate::errors::ForgeResult;
use crate::models::Language;

const LANGUAGE_BY_EXTENSION: &[(&str, Language)] = &[
    (".py", Language::Python),
    (".pyi", Language::Python),
    (".js", Language::JavaScript),
    (".jsx", Language::JavaScript),
    (".mjs", Language::JavaScript),
    (".cjs", Language::JavaScript),
    (".ts", Language::TypeScript),
    (".tsx", Language::TypeScript),
    (".java", Language::Java),
    (".go", Language::Go),
    (".rs", Language::Rust),
    (".cpp", Language::Cpp),
    (".cc", Language::Cpp),
    (".cxx", Language::Cpp),
    (".hpp", Language::Cpp),
    (".hh", Language::Cpp),
    (".h", Language::Cpp),
    (".cs", Language::CSharp),
];

const DEFAULT_SENSITIVE_EXCLUDE_PATTERNS: &[&str] = &[
    ".env",
    ".env.*",
    "*.pem",
    "*.key",
    "*.p12",
    "*secret*",
    "*secrets*",
    "*credential*",
    "id_rsa",
    "id_dsa",
];

const IMPLICIT_IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    "target",
    "dist",
    "build",
];

pub fn detect_language(path: &str) -> Option<Language> {
    let lower = path.to_lowercase();
    LANGUAGE_BY_EXTENSION
        .iter()
        .find(|(ext, _)| lower.ends_with(ext))
        .map(|(_, language)| *language)
}

/// Hex SHA-256 of a source text; the cache key for stored analyses.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn compute_file_hash(path: &Path) -> ForgeResult<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Source files under `root` with a recognised extension, in sorted order.
/// Honours `.gitignore`, skips vendored/build directories, oversized files,
/// and (when `exclude_sensitive`) credential-like file names.
pub fn iter_source_files(root: &Path, exclude_sensitive: bool) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .parents(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .require_git(false)
        .follow_links(false);

    let mut overrides = OverrideBuilder::new(root);
    for dir in IMPLICIT_IGNORED_DIRS {
        let _ = overrides.add(&format!("!**/{dir}/**"));
    }
    if exclude_sensitive {
        for pattern in DEFAULT_SENSITIVE_EXCLUDE_PATTERNS {
            let _ = overrides.add(&format!("!**/{pattern}"));
        }
    }
    if let Ok(built) = overrides.build() {
        builder.overrides(built);
    }

    let mut files: Vec<PathBuf> = builder
        .build()
        .flatten()
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter(|entry| detect_language(&entry.path().to_string_lossy()).is_some())
        .filter(|entry| {
            let small = entry
                .metadata()
                .map(|meta| meta.len() <= MAX_SOURCE_BYTES)
                .unwrap_or(false);
            if !small {
                debug!(path = %entry.path().display(), "skipping oversized source file");
            }
            small
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language_by_extension() {
        assert_eq!(detect_language("src/app.py"), Some(Language::Python));
        assert_eq!(detect_language("web/App.TSX"), Some(Language::TypeScript));
        assert_eq!(detect_language("lib/core.hpp"), Some(Language::Cpp));
        assert_eq!(detect_language("Program.cs"), Some(Language::CSharp));
        assert_eq!(detect_language("README.md"), None);
    }

    #[test]
    fn test_content_hash_is_stable_hex() {
        let a = content_hash("def f(): pass\n");
        assert_eq!(a.len(), 64);
        assert_eq!(a, content_hash("def f(): pass\n"));
        assert_ne!(a, content_hash("def g(): pass\n"));
    }

    #[test]
    fn test_file_hash_matches_content_hash() {
        let dir = tempfile::Builder::new().prefix("forge").tempdir().unwrap();
        let path = dir.path().join("m.py");
        std::fs::write(&path, "x = 1\n").unwrap();
        assert_eq!(compute_file_hash(&path).unwrap(), content_hash("x = 1\n"));
    }

    #[test]
    fn test_walk_skips_sensitive_and_vendored_files() {
        let dir = tempfile::Builder::new().prefix("forge").tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        std::fs::write(root.join("src/app.py"), "def f(): pass\n").unwrap();
        std::fs::write(root.join("src/util.go"), "package src\n").unwrap();
        std::fs::write(root.join("src/notes.txt"), "hello\n").unwrap();
        std::fs::write(root.join("src/secrets.py"), "TOKEN = 'x'\n").unwrap();
        std::fs::write(root.join("node_modules/lib/index.js"), "module.exports = 1\n").unwrap();

        let files: Vec<String> = iter_source_files(root, true)
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(files, vec!["src/app.py", "src/util.go"]);

        let with_sensitive = iter_source_files(root, false);
        assert_eq!(with_sensitive.len(), 3);
    }
}
