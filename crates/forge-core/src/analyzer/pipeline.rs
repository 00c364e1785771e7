//! Batch analysis with Rayon-based parallelism.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::analyzer::analyze;
use crate::analyzer::filesystem::{content_hash, detect_language, iter_source_files};
use crate::config::EngineConfig;
use crate::errors::ForgeResult;
use crate::models::{Ir, Language, SourceUnit};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileAnalysis {
    /// Path relative to the analyzed root, `/`-separated.
    pub path: String,
    pub language: Language,
    pub content_hash: String,
    pub outcome: Result<Ir, String>,
}

/// Analyze independent units on a bounded worker pool. Output order matches
/// input order; a pool that cannot be built degrades to sequential work.
pub fn analyze_batch(units: &[SourceUnit], workers: usize) -> Vec<ForgeResult<Ir>> {
    if units.is_empty() {
        return vec![];
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build();

    match pool {
        Ok(pool) => pool.install(|| units.par_iter().map(analyze).collect()),
        Err(err) => {
            warn!(error = %err, "worker pool unavailable, analyzing sequentially");
            units.iter().map(analyze).collect()
        }
    }
}

fn analyze_file(root: &Path, path: &Path) -> Option<FileAnalysis> {
    let display = path.to_string_lossy();
    let language = detect_language(&display)?;
    let relative = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            return Some(FileAnalysis {
                path: relative,
                language,
                content_hash: String::new(),
                outcome: Err(err.to_string()),
            })
        }
    };
    let unit = SourceUnit::new(text, language.as_str()).with_path(relative.clone());
    Some(FileAnalysis {
        path: relative,
        language,
        content_hash: content_hash(&unit.text),
        outcome: analyze(&unit).map_err(|err| err.to_string()),
    })
}

/// Walk `root` and analyze every recognised source file.
pub fn analyze_tree(root: &Path, config: &EngineConfig) -> Vec<FileAnalysis> {
    let started = Instant::now();
    let files = iter_source_files(root, config.exclude_sensitive);
    if files.is_empty() {
        return vec![];
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build();

    let results: Vec<FileAnalysis> = match pool {
        Ok(pool) => pool.install(|| {
            files
                .par_iter()
                .filter_map(|path| analyze_file(root, path))
                .collect()
        }),
        Err(_) => files
            .iter()
            .filter_map(|path| analyze_file(root, path))
            .collect(),
    };

    let failed = results.iter().filter(|r| r.outcome.is_err()).count();
    info!(
        files = results.len(),
        failed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "analyzed source tree"
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ForgeError;

    #[test]
    fn test_batch_preserves_order_and_isolates_failures() {
        let units = vec![
            SourceUnit::new("def a(x):\n    return x\n", "python"),
            SourceUnit::new("whatever", "cobol"),
            SourceUnit::new("func B(y int) int {\n\treturn y\n}\n", "go"),
        ];
        let results = analyze_batch(&units, 2);
        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().unwrap().callable("a").is_some());
        assert!(matches!(results[1], Err(ForgeError::UnsupportedLanguage(_))));
        assert!(results[2].as_ref().unwrap().callable("B").is_some());
    }

    #[test]
    fn test_batch_matches_single_analysis() {
        let unit = SourceUnit::new("def f(n):\n    if n > 2:\n        return n\n    return 0\n", "py");
        let batch = analyze_batch(std::slice::from_ref(&unit), 0);
        assert_eq!(batch[0].as_ref().unwrap(), &analyze(&unit).unwrap());
    }

    #[test]
    fn test_analyze_tree_reports_relative_paths() {
        let dir = tempfile::Builder::new().prefix("forge").tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("pkg")).unwrap();
        std::fs::write(root.join("pkg/calc.py"), "def add(a, b):\n    return a + b\n").unwrap();
        std::fs::write(root.join("Main.java"), "class Main {\n  int one() { return 1; }\n}\n")
            .unwrap();

        let results = analyze_tree(root, &EngineConfig::default());
        let mut paths: Vec<&str> = results.iter().map(|r| r.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["Main.java", "pkg/calc.py"]);
        let calc = results.iter().find(|r| r.path == "pkg/calc.py").unwrap();
        assert_eq!(calc.language, Language::Python);
        assert_eq!(calc.content_hash.len(), 64);
        assert!(calc.outcome.as_ref().unwrap().callable("add").is_some());
    }
}
