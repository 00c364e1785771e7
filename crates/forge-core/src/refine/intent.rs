//! Free-text feedback to a structured directive.
//!
//! Keyword matching only: the operation comes from verbs, the category and
//! target from the words around them. Anything that names no operation is
//! refused rather than guessed.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::Rejected;
use crate::models::{Directive, RefineOp, TestCategory, ALL_TARGETS};

/// Checked in order; the first group with a match wins, so "add docs"
/// documents and "add more values" broadens.
const OPERATION_KEYWORDS: &[(RefineOp, &[&str])] = &[
    (
        RefineOp::Document,
        &["document", "documentation", "docs", "docstring", "docstrings", "explain", "describe", "comment", "comments"],
    ),
    (
        RefineOp::Simplify,
        &["simplify", "simpler", "fewer", "reduce", "trim", "shorter", "dedupe", "deduplicate", "duplicates"],
    ),
    (
        RefineOp::Broaden,
        &["broaden", "broader", "wider", "widen", "diverse", "diversity", "unicode", "whitespace", "variety", "values"],
    ),
    (
        RefineOp::Add,
        &["add", "more", "additional", "extra", "another", "increase", "expand", "missing"],
    ),
];

const TARGET_MARKERS: &[&str] = &["for", "on", "of", "to", "in", "around"];

const ALL_WORDS: &[&str] = &["all", "every", "everything", "each", "suite", "whole"];

const FILLER_WORDS: &[&str] = &[
    "the", "a", "an", "this", "that", "function", "method", "class", "type", "test", "tests",
    "case", "cases", "my", "its",
];

static BACKTICK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([A-Za-z_][\w.:]*)`").unwrap());

static VALUES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:values?|inputs?)\s*[=:]\s*(.+)$").unwrap());

static CAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:cap|up to|at most)\s*[=:]?\s*(\d+)").unwrap());

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '!' | '?' | '(' | ')'))
        .map(|w| w.trim_matches(|c: char| matches!(c, '.' | ':' | '=' | '"' | '\'' | '`')))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn operation(lowered: &[String]) -> Option<RefineOp> {
    OPERATION_KEYWORDS
        .iter()
        .find(|(_, keywords)| lowered.iter().any(|w| keywords.contains(&w.as_str())))
        .map(|(op, _)| *op)
}

fn category(lowered: &[String]) -> Option<TestCategory> {
    lowered.iter().find_map(|word| {
        TestCategory::from_name(word)
            .or_else(|| word.strip_suffix('s').and_then(TestCategory::from_name))
            .or_else(|| match word.as_str() {
                "mocks" | "mocked" | "mocking" => Some(TestCategory::Mock),
                "failure" | "failures" | "exception" | "exceptions" => Some(TestCategory::Error),
                "boundaries" => Some(TestCategory::EdgeCase),
                _ => None,
            })
    })
}

fn target(text: &str, original: &[String]) -> String {
    if let Some(caps) = BACKTICK_RE.captures(text) {
        return caps[1].to_string();
    }
    for pair in original.windows(2) {
        let marker = pair[0].to_lowercase();
        if !TARGET_MARKERS.contains(&marker.as_str()) {
            continue;
        }
        let candidate = pair[1].as_str();
        let lowered = candidate.to_lowercase();
        if ALL_WORDS.contains(&lowered.as_str()) {
            return ALL_TARGETS.to_string();
        }
        let identifier = candidate
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | ':'));
        if identifier
            && !FILLER_WORDS.contains(&lowered.as_str())
            && TestCategory::from_name(&lowered).is_none()
        {
            return candidate.to_string();
        }
    }
    ALL_TARGETS.to_string()
}

impl Directive {
    /// Read a directive from conversational feedback such as
    /// "add more edge cases for `divide`" or "document everything".
    pub fn from_feedback(feedback: &str) -> Result<Directive, Rejected> {
        let text = feedback.trim();
        if text.is_empty() {
            return Err(Rejected::new("feedback is empty"));
        }
        let original = words(text);
        let lowered: Vec<String> = original.iter().map(|w| w.to_lowercase()).collect();
        let Some(operation) = operation(&lowered) else {
            return Err(Rejected::new(format!(
                "feedback names no refinement operation: `{text}`"
            )));
        };

        let mut directive = Directive::new(target(text, &original), operation);
        directive.category = category(&lowered);
        if let Some(caps) = CAP_RE.captures(text) {
            directive = directive.with_parameter("cap", &caps[1]);
        }
        if let Some(caps) = VALUES_RE.captures(text) {
            directive = directive.with_parameter("values", caps[1].trim());
            // Supplied values only widen the input space.
            if directive.operation == RefineOp::Add {
                directive.operation = RefineOp::Broaden;
            }
        }
        Ok(directive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_edge_cases_for_target() {
        let directive = Directive::from_feedback("Please add more edge cases for divide.").unwrap();
        assert_eq!(directive.operation, RefineOp::Add);
        assert_eq!(directive.target, "divide");
        assert_eq!(directive.category, Some(TestCategory::EdgeCase));
    }

    #[test]
    fn test_backticked_target_wins() {
        let directive = Directive::from_feedback("simplify the unit tests in `Stack.push`").unwrap();
        assert_eq!(directive.operation, RefineOp::Simplify);
        assert_eq!(directive.target, "Stack.push");
        assert_eq!(directive.category, Some(TestCategory::Unit));
    }

    #[test]
    fn test_document_everything() {
        let directive = Directive::from_feedback("Add docs to everything").unwrap();
        assert_eq!(directive.operation, RefineOp::Document);
        assert!(directive.targets_all());
        assert_eq!(directive.category, None);
    }

    #[test]
    fn test_values_and_cap_parameters() {
        let directive = Directive::from_feedback("try parse_age with cap 6, values: -1, 200, 0").unwrap();
        assert_eq!(directive.operation, RefineOp::Broaden);
        assert_eq!(directive.parameters.get("cap").map(String::as_str), Some("6"));
        assert_eq!(directive.parameters.get("values").map(String::as_str), Some("-1, 200, 0"));
    }

    #[test]
    fn test_feedback_without_operation_is_rejected() {
        assert!(Directive::from_feedback("looks good to me").is_err());
        assert!(Directive::from_feedback("   ").is_err());
    }
}
