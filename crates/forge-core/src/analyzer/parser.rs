//! Tree-sitter parsing wrapper used by the native extraction strategy.

use serde::Serialize;

use crate::analyzer::grammar::{grammar_for, ts_language};
use crate::errors::{ForgeError, ForgeResult};
use crate::models::Language;

/// Parse `source` into a syntax tree. A tree containing error or missing
/// nodes is reported as `ForgeError::Parse` so the caller can degrade.
pub fn parse_source(source: &str, language: Language) -> ForgeResult<tree_sitter::Tree> {
    let ts_language = ts_language(language)
        .ok_or_else(|| ForgeError::Parse(format!("No tree-sitter grammar for: {language}")))?;

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&ts_language)
        .map_err(|e| ForgeError::Parse(format!("Failed to set language: {e}")))?;

    let tree = parser
        .parse(source.as_bytes(), None)
        .ok_or_else(|| ForgeError::Parse(format!("Failed to parse {language} source")))?;

    let root = tree.root_node();
    if root.has_error() {
        let line = first_error_line(root).unwrap_or(root.start_position().row) + 1;
        return Err(ForgeError::Parse(format!(
            "syntax error in {language} source near line {line}"
        )));
    }
    Ok(tree)
}

/// Zero-based row of the first error or missing node, in document order.
fn first_error_line(root: tree_sitter::Node<'_>) -> Option<usize> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node.start_position().row);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageCapability {
    pub language: Language,
    pub backend: &'static str,
    pub available: bool,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityReport {
    pub tree_sitter_version: &'static str,
    pub languages: Vec<LanguageCapability>,
}

/// Which languages get a full syntax tree and which fall back to patterns.
pub fn capability_report() -> CapabilityReport {
    let languages = Language::ALL
        .into_iter()
        .map(|language| {
            let native = grammar_for(language).is_some() && ts_language(language).is_some();
            LanguageCapability {
                language,
                backend: if native { "tree-sitter" } else { "pattern" },
                available: true,
                reason: if native { "ok" } else { "grammar_not_linked" },
            }
        })
        .collect();
    CapabilityReport {
        tree_sitter_version: "0.24",
        languages,
    }
}
