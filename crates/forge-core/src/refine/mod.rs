//! Refinement loop: Suite + Directive → Suite, or a rejection.
//!
//! A refinement never mutates the suite it is given. Every accepted
//! directive produces a new suite whose revision is one higher; a rejected
//! directive leaves the caller holding the unchanged original.

pub mod enrich;
pub mod intent;
pub mod session;

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::{clamp_edge_cases, MAX_EDGE_CASE_CAP, MAX_EXTRA_VALUES, REFINE_CAP_INCREMENT};
use crate::coverage;
use crate::errors::Rejected;
use crate::models::{
    CoverageGap, Directive, DocLevel, RefineOp, Suite, SynthesisOptions, TestCase, TestCategory,
};
use crate::synthesis::{self, IdCounters, Scope};

pub use enrich::enrich;
pub use session::{RefinementSession, SessionState};

const CAP_PARAM: &str = "cap";
const VALUES_PARAM: &str = "values";

/// Qualified names a directive applies to.
fn resolve_targets(suite: &Suite, directive: &Directive) -> Result<BTreeSet<String>, Rejected> {
    if directive.targets_all() {
        let mut targets: BTreeSet<String> = suite
            .ir
            .callables
            .iter()
            .map(|c| c.qualified_name())
            .collect();
        targets.extend(
            suite
                .ir
                .types
                .iter()
                .filter(|t| t.members.len() >= 2)
                .map(|t| t.name.clone()),
        );
        return Ok(targets);
    }
    let target = directive.target.trim();
    let resolved = suite.ir.resolve_target(target);
    if resolved.is_empty() {
        return Err(Rejected::new(format!("unknown target `{target}`")));
    }
    Ok(resolved.into_iter().collect())
}

fn check_parameters(directive: &Directive, allowed: &[&str]) -> Result<(), Rejected> {
    match directive
        .parameters
        .keys()
        .find(|key| !allowed.contains(&key.as_str()))
    {
        Some(key) => Err(Rejected::new(format!(
            "parameter `{key}` is not accepted by {}",
            directive.operation.as_str()
        ))),
        None => Ok(()),
    }
}

/// Edge-case cap for a widening directive: `cap=` when given, else the
/// suite's cap plus the increment. Always within the guard bounds.
fn widened_cap(suite: &Suite, directive: &Directive) -> Result<usize, Rejected> {
    match directive.parameters.get(CAP_PARAM) {
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| Rejected::new(format!("cap must be an integer, got `{raw}`")))?;
            Ok(clamp_edge_cases(value))
        }
        None => Ok((suite.options.max_edge_cases_per_entity + REFINE_CAP_INCREMENT)
            .min(MAX_EDGE_CASE_CAP)),
    }
}

fn extra_values(directive: &Directive) -> Result<Vec<String>, Rejected> {
    let Some(raw) = directive.parameters.get(VALUES_PARAM) else {
        return Ok(Vec::new());
    };
    let values: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if values.is_empty() {
        return Err(Rejected::new("values must list at least one literal"));
    }
    if values.len() > MAX_EXTRA_VALUES {
        return Err(Rejected::new(format!(
            "values accepts at most {MAX_EXTRA_VALUES} literals, got {}",
            values.len()
        )));
    }
    Ok(values)
}

fn in_scope(case: &TestCase, targets: &BTreeSet<String>, category: Option<TestCategory>) -> bool {
    targets.contains(&case.target) && category.map_or(true, |c| c == case.category)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Regenerate the targets with widened options and merge the new cases in.
/// Existing cases keep their ids; exact duplicates are dropped.
fn widen(
    suite: &Suite,
    directive: &Directive,
    targets: BTreeSet<String>,
    options: SynthesisOptions,
) -> (IndexMap<String, TestCase>, Vec<CoverageGap>) {
    let scope = Scope {
        targets: Some(targets.clone()),
        category: directive.category,
    };
    let generated = synthesis::generate(&suite.ir, &suite.risk, &options, &suite.framework, &scope);

    let mut cases = suite.cases.clone();
    let mut counters = IdCounters::seeded(cases.values());
    let mut added = 0usize;
    for draft in generated.drafts {
        if cases.values().any(|case| draft.duplicates(case)) {
            continue;
        }
        let case = draft.into_case(&mut counters);
        cases.insert(case.id.clone(), case);
        added += 1;
    }

    let mut gaps: Vec<CoverageGap> = suite
        .gaps
        .iter()
        .filter(|gap| {
            !(targets.contains(&gap.target)
                && directive.category.map_or(true, |c| c == gap.category))
        })
        .cloned()
        .collect();
    gaps.extend(generated.gaps);
    debug!(operation = directive.operation.as_str(), added, "merged regenerated cases");
    (cases, gaps)
}

fn add(suite: &Suite, directive: &Directive, targets: BTreeSet<String>) -> Result<(IndexMap<String, TestCase>, Vec<CoverageGap>), Rejected> {
    check_parameters(directive, &[CAP_PARAM])?;
    let options = SynthesisOptions {
        max_edge_cases_per_entity: widened_cap(suite, directive)?,
        negative_domain: true,
        ..suite.options.clone()
    };
    Ok(widen(suite, directive, targets, options))
}

fn broaden(suite: &Suite, directive: &Directive, targets: BTreeSet<String>) -> Result<(IndexMap<String, TestCase>, Vec<CoverageGap>), Rejected> {
    check_parameters(directive, &[CAP_PARAM, VALUES_PARAM])?;
    let options = SynthesisOptions {
        max_edge_cases_per_entity: widened_cap(suite, directive)?,
        boundary_diversity: true,
        extra_values: extra_values(directive)?,
        ..suite.options.clone()
    };
    Ok(widen(suite, directive, targets, options))
}

fn rerender(suite: &Suite, case: &TestCase, doc: DocLevel) -> Result<TestCase, Rejected> {
    let plan = crate::models::CasePlan {
        doc,
        ..case.plan.clone()
    };
    synthesis::rerender(suite.ir.language, &suite.framework, case, plan)
        .map_err(|err| Rejected::new(format!("case `{}` cannot be re-rendered: {err}", case.id)))
}

fn require_cases(suite: &Suite, directive: &Directive, targets: &BTreeSet<String>) -> Result<(), Rejected> {
    if suite
        .cases
        .values()
        .any(|case| in_scope(case, targets, directive.category))
    {
        return Ok(());
    }
    let what = match directive.category {
        Some(category) => format!("no {category} cases"),
        None => "no cases".to_string(),
    };
    Err(Rejected::new(format!("{what} for target `{}`", directive.target.trim())))
}

/// Keep the first case per (target, category) by numeric id order and strip its
/// documentation. Cases outside the directive keep their position.
fn simplify(suite: &Suite, directive: &Directive, targets: &BTreeSet<String>) -> Result<IndexMap<String, TestCase>, Rejected> {
    check_parameters(directive, &[])?;
    require_cases(suite, directive, targets)?;

    let mut keep: IndexMap<(String, TestCategory), &str> = IndexMap::new();
    for case in suite.cases.values() {
        if !in_scope(case, targets, directive.category) {
            continue;
        }
        let slot = keep
            .entry((case.target.clone(), case.category))
            .or_insert(case.id.as_str());
        if synthesis::id_order(&case.id) < synthesis::id_order(*slot) {
            *slot = case.id.as_str();
        }
    }

    let mut cases = IndexMap::new();
    for (id, case) in &suite.cases {
        if !in_scope(case, targets, directive.category) {
            cases.insert(id.clone(), case.clone());
            continue;
        }
        if keep.get(&(case.target.clone(), case.category)) == Some(&id.as_str()) {
            cases.insert(id.clone(), rerender(suite, case, DocLevel::None)?);
        }
    }
    Ok(cases)
}

fn document(suite: &Suite, directive: &Directive, targets: &BTreeSet<String>) -> Result<IndexMap<String, TestCase>, Rejected> {
    check_parameters(directive, &[])?;
    require_cases(suite, directive, targets)?;
    let mut cases = IndexMap::new();
    for (id, case) in &suite.cases {
        let case = if in_scope(case, targets, directive.category) {
            rerender(suite, case, DocLevel::Enriched)?
        } else {
            case.clone()
        };
        cases.insert(id.clone(), case);
    }
    Ok(cases)
}

/// Apply one directive. Returns a new suite at the next revision, with
/// coverage recomputed, or the reason the directive was refused.
pub fn refine_suite(suite: &Suite, directive: &Directive) -> Result<Suite, Rejected> {
    let targets = resolve_targets(suite, directive)?;
    let (cases, gaps) = match directive.operation {
        RefineOp::Add => add(suite, directive, targets)?,
        RefineOp::Broaden => broaden(suite, directive, targets)?,
        RefineOp::Simplify => (simplify(suite, directive, &targets)?, suite.gaps.clone()),
        RefineOp::Document => (document(suite, directive, &targets)?, suite.gaps.clone()),
    };

    let coverage = coverage::estimate_cases(&suite.ir, cases.values());
    let refined = Suite {
        revision: suite.revision + 1,
        framework: suite.framework.clone(),
        options: suite.options.clone(),
        ir: Arc::clone(&suite.ir),
        risk: suite.risk.clone(),
        cases,
        coverage,
        gaps,
    };
    info!(
        target = %directive.target,
        operation = directive.operation.as_str(),
        revision = refined.revision,
        cases = refined.cases.len(),
        coverage = refined.coverage.percentage,
        "refined suite"
    );
    Ok(refined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::models::{GapReason, SourceUnit};
    use crate::synthesis::generate_suite;

    const SOURCE: &str = "\
def divide(a: int, b: int):
    if b == 0:
        raise ValueError(\"b must not be zero\")
    return a / b

def label(name: str, count: int) -> str:
    if count > 100:
        return \"many\"
    if name == \"\":
        return \"anonymous\"
    if count < 0:
        return \"invalid\"
    if count == 1:
        return name
    return name + \"s\"
";

    fn suite() -> Suite {
        let ir = analyze(&SourceUnit::new(SOURCE, "python")).unwrap();
        generate_suite(&ir, &SynthesisOptions::default())
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let suite = suite();
        let err = refine_suite(&suite, &Directive::new("missing", RefineOp::Add)).unwrap_err();
        assert_eq!(err.reason, "unknown target `missing`");
    }

    #[test]
    fn test_bad_parameters_are_rejected() {
        let suite = suite();
        let bad_cap = Directive::new("divide", RefineOp::Add).with_parameter("cap", "lots");
        assert!(refine_suite(&suite, &bad_cap).is_err());

        let empty_values = Directive::new("divide", RefineOp::Broaden).with_parameter("values", " , ");
        assert!(refine_suite(&suite, &empty_values).is_err());

        let unknown = Directive::new("divide", RefineOp::Simplify).with_parameter("cap", "2");
        assert!(refine_suite(&suite, &unknown).is_err());
    }

    #[test]
    fn test_simplify_collapses_duplicate_unit_cases() {
        let mut suite = suite();
        let unit = suite.cases["divide::unit::01"].clone();
        for n in 2..=4 {
            let copy = TestCase {
                id: format!("divide::unit::{n:02}"),
                ..unit.clone()
            };
            suite.cases.insert(copy.id.clone(), copy);
        }
        assert_eq!(suite.count("divide", TestCategory::Unit), 4);

        let directive = Directive::new("divide", RefineOp::Simplify);
        let simplified = refine_suite(&suite, &directive).unwrap();
        assert_eq!(simplified.count("divide", TestCategory::Unit), 1);
        assert!(simplified.cases.contains_key("divide::unit::01"));
        assert_eq!(simplified.revision, suite.revision + 1);
        assert!(simplified.cases_for("divide").all(|c| !c.source.contains('#')));
        // Other targets are untouched.
        assert_eq!(simplified.cases["label::unit::01"], suite.cases["label::unit::01"]);
        // The input suite is not modified.
        assert_eq!(suite.count("divide", TestCategory::Unit), 4);
    }

    #[test]
    fn test_simplify_orders_ids_numerically() {
        let mut suite = suite();
        let unit = suite.cases.shift_remove("divide::unit::01").unwrap();
        for id in ["divide::unit::100", "divide::unit::99"] {
            let copy = TestCase {
                id: id.to_string(),
                ..unit.clone()
            };
            suite.cases.insert(copy.id.clone(), copy);
        }
        let simplified = refine_suite(&suite, &Directive::new("divide", RefineOp::Simplify)).unwrap();
        assert_eq!(simplified.count("divide", TestCategory::Unit), 1);
        assert!(simplified.cases.contains_key("divide::unit::99"));
        assert!(!simplified.cases.contains_key("divide::unit::100"));
    }

    #[test]
    fn test_add_widens_cap_and_never_lowers_coverage() {
        let suite = suite();
        assert_eq!(suite.count("label", TestCategory::EdgeCase), 3);
        assert!(suite.gaps.iter().any(|g| g.target == "label"
            && matches!(g.reason, GapReason::EdgeCaseCap { cap: 3, .. })));

        let added = refine_suite(&suite, &Directive::new("label", RefineOp::Add)).unwrap();
        assert!(added.count("label", TestCategory::EdgeCase) > 3);
        assert!(added.coverage.percentage >= suite.coverage.percentage);
        assert!(!added.gaps.iter().any(|g| g.target == "label"));
        for id in suite.cases.keys() {
            assert!(added.cases.contains_key(id));
        }
        assert!(added.cases.contains_key("label::edge_case::04"));
        // Options describe the original request, not the widened pass.
        assert_eq!(added.options, suite.options);
    }

    #[test]
    fn test_add_skips_exact_duplicates() {
        let suite = suite();
        let directive = Directive::new("divide", RefineOp::Add).with_category(TestCategory::Unit);
        let added = refine_suite(&suite, &directive).unwrap();
        assert_eq!(added.count("divide", TestCategory::Unit), 1);
        assert_eq!(added.revision, 2);
    }

    #[test]
    fn test_broaden_uses_supplied_values() {
        let suite = suite();
        let directive = Directive::new("divide", RefineOp::Broaden)
            .with_category(TestCategory::EdgeCase)
            .with_parameter("values", "42, -7");
        let broadened = refine_suite(&suite, &directive).unwrap();
        let sources: Vec<&str> = broadened
            .cases_for("divide")
            .filter(|c| c.category == TestCategory::EdgeCase)
            .map(|c| c.source.as_str())
            .collect();
        assert!(sources.iter().any(|s| s.contains("divide(42, 1)")), "{sources:?}");
        assert!(sources.len() > suite.count("divide", TestCategory::EdgeCase));
    }

    #[test]
    fn test_document_is_idempotent() {
        let suite = suite();
        let directive = Directive::new("divide", RefineOp::Document);
        let once = refine_suite(&suite, &directive).unwrap();
        let twice = refine_suite(&once, &directive).unwrap();
        assert_eq!(once.cases.len(), suite.cases.len());
        let case = &once.cases["divide::unit::01"];
        assert!(case.source.contains("# Signature: divide(a: int, b: int)"));
        assert_eq!(case.revision, 2);
        for (id, case) in &once.cases {
            assert_eq!(twice.cases[id].source, case.source);
            assert_eq!(twice.cases[id].revision, case.revision);
        }
        assert_eq!(twice.revision, 3);
    }

    #[test]
    fn test_wildcard_and_missing_cases() {
        let suite = suite();
        let all = refine_suite(&suite, &Directive::new("*", RefineOp::Document)).unwrap();
        assert!(all
            .cases
            .values()
            .all(|c| c.source.contains("Cyclomatic complexity")));

        let directive = Directive::new("divide", RefineOp::Simplify).with_category(TestCategory::Mock);
        let err = refine_suite(&suite, &directive).unwrap_err();
        assert_eq!(err.reason, "no mock cases for target `divide`");
    }
}
