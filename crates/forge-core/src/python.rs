//! Python bindings. Every value crosses the boundary as JSON so the Python
//! side can keep plain dicts.

use std::collections::BTreeMap;
use std::path::PathBuf;

use pyo3::prelude::*;
use serde::Serialize;

use crate::analyzer::parser::{self, LanguageCapability};
use crate::config::EngineConfig;
use crate::errors::ForgeResult;
use crate::models::{Directive, Ir, Language, SourceUnit, Suite, SynthesisOptions};
use crate::store::codec::{from_json, to_json};
use crate::synthesis::catalog::{self, CATALOG};

#[derive(Debug, Serialize)]
struct CapabilityReport {
    module_available: bool,
    tree_sitter_version: &'static str,
    languages: Vec<LanguageCapability>,
    frameworks: BTreeMap<Language, Vec<&'static str>>,
    default_frameworks: BTreeMap<Language, &'static str>,
    templates: usize,
}

fn capabilities() -> CapabilityReport {
    let parsers = parser::capability_report();
    CapabilityReport {
        module_available: true,
        tree_sitter_version: parsers.tree_sitter_version,
        languages: parsers.languages,
        frameworks: Language::ALL
            .into_iter()
            .map(|language| (language, CATALOG.frameworks(language)))
            .collect(),
        default_frameworks: Language::ALL
            .into_iter()
            .map(|language| (language, catalog::default_framework(language)))
            .collect(),
        templates: CATALOG.len(),
    }
}

fn options_or_env(options_json: Option<&str>) -> ForgeResult<SynthesisOptions> {
    match options_json {
        Some(json) => from_json(json),
        None => Ok(EngineConfig::from_env().synthesis_options()),
    }
}

/// Analyze one source text. Returns the IR as JSON.
#[pyfunction]
#[pyo3(name = "analyze", signature = (text, language, framework=None))]
pub fn py_analyze(text: &str, language: &str, framework: Option<&str>) -> PyResult<String> {
    let mut unit = SourceUnit::new(text, language);
    unit.framework = framework.map(str::to_string);
    let ir = crate::analyzer::analyze(&unit)?;
    Ok(to_json(&ir)?)
}

/// Analyze every supported file under `root` in parallel.
#[pyfunction]
#[pyo3(name = "analyze_tree")]
pub fn py_analyze_tree(py: Python<'_>, root: PathBuf) -> PyResult<String> {
    let config = EngineConfig::from_env();
    let results = py.allow_threads(|| crate::analyzer::pipeline::analyze_tree(&root, &config));
    Ok(to_json(&results)?)
}

/// Synthesize a suite from IR JSON. Options default to the `FORGE_*`
/// environment when omitted.
#[pyfunction]
#[pyo3(name = "generate_suite", signature = (ir_json, options_json=None))]
pub fn py_generate_suite(ir_json: &str, options_json: Option<&str>) -> PyResult<String> {
    let ir: Ir = from_json(ir_json)?;
    let options = options_or_env(options_json)?;
    let suite = crate::synthesis::generate_suite(&ir, &options);
    Ok(to_json(&suite)?)
}

/// Apply one directive. A rejected directive raises `ValueError`.
#[pyfunction]
#[pyo3(name = "refine_suite")]
pub fn py_refine_suite(suite_json: &str, directive_json: &str) -> PyResult<String> {
    let suite: Suite = from_json(suite_json)?;
    let directive: Directive = from_json(directive_json)?;
    let refined = crate::refine::refine_suite(&suite, &directive)?;
    Ok(to_json(&refined)?)
}

/// Replace placeholder assertions, keyed by case id.
#[pyfunction]
#[pyo3(name = "enrich_suite")]
pub fn py_enrich_suite(suite_json: &str, replacements: BTreeMap<String, String>) -> PyResult<String> {
    let suite: Suite = from_json(suite_json)?;
    Ok(to_json(&crate::refine::enrich(&suite, &replacements))?)
}

/// Read a directive from free-text feedback.
#[pyfunction]
pub fn feedback_directive(feedback: &str) -> PyResult<String> {
    let directive = Directive::from_feedback(feedback)?;
    Ok(to_json(&directive)?)
}

#[pyfunction]
pub fn capability_report() -> PyResult<String> {
    Ok(to_json(&capabilities())?)
}

pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("DEFAULT_MAX_EDGE_CASES", crate::config::DEFAULT_MAX_EDGE_CASES)?;
    m.add("MAX_EDGE_CASE_CAP", crate::config::MAX_EDGE_CASE_CAP)?;

    m.add_function(wrap_pyfunction!(py_analyze, m)?)?;
    m.add_function(wrap_pyfunction!(py_analyze_tree, m)?)?;
    m.add_function(wrap_pyfunction!(py_generate_suite, m)?)?;
    m.add_function(wrap_pyfunction!(py_refine_suite, m)?)?;
    m.add_function(wrap_pyfunction!(py_enrich_suite, m)?)?;
    m.add_function(wrap_pyfunction!(feedback_directive, m)?)?;
    m.add_function(wrap_pyfunction!(capability_report, m)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_list_every_language() {
        let report = capabilities();
        assert_eq!(report.languages.len(), Language::ALL.len());
        assert_eq!(report.frameworks[&Language::Python], vec!["pytest", "unittest"]);
        assert_eq!(report.default_frameworks[&Language::Go], "testing");
        assert_eq!(report.templates, CATALOG.len());
    }

    #[test]
    fn test_partial_options_json_uses_defaults() {
        let options = options_or_env(Some(r#"{"include_mocks": false}"#)).unwrap();
        assert!(!options.include_mocks);
        assert_eq!(options.max_edge_cases_per_entity, 3);
    }
}
