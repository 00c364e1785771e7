//! Risk & quality scoring over an IR.
//!
//! Each security or performance finding requires two facts to co-occur in
//! the same callable (an input-fed index with no bounds check, a nullable
//! parameter dereferenced with no null check, ...). A lone token never
//! produces one. Quality findings and suggestions are advisory and leave the
//! scores untouched.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::{
    HIGH_COMPLEXITY_PENALTY, HIGH_COMPLEXITY_THRESHOLD, LONG_FUNCTION_LINES,
    MAX_LISTED_LONG_LINES, MODERATE_COMPLEXITY_PENALTY, MODERATE_COMPLEXITY_THRESHOLD,
    PERFORMANCE_PENALTY, SECURITY_PENALTY,
};
use crate::models::{
    CallableEntity, ComplexityLevel, Confidence, FindingKind, Ir, Language, PerformancePattern,
    QualityIssue, RiskFinding, RiskProfile, SecurityPattern,
};

static SNAKE_CASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^_*[a-z][a-z0-9_]*$").unwrap());

static LOWER_CAMEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[_$]*[a-z][A-Za-z0-9]*$").unwrap());

static MIXED_CAPS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[_$]*[A-Za-z][A-Za-z0-9]*$").unwrap());

static PASCAL_CASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").unwrap());

/// Whether a callable name follows its language's convention. C++ has no
/// single convention and always passes.
pub fn follows_naming(language: Language, name: &str) -> bool {
    match language {
        Language::Python | Language::Rust => SNAKE_CASE_RE.is_match(name),
        Language::Java => LOWER_CAMEL_RE.is_match(name),
        Language::JavaScript | Language::TypeScript | Language::Go => MIXED_CAPS_RE.is_match(name),
        Language::CSharp => PASCAL_CASE_RE.is_match(name),
        Language::Cpp => true,
    }
}

fn security_patterns(callable: &CallableEntity) -> Vec<SecurityPattern> {
    let signals = &callable.signals;
    let mut found = Vec::new();
    if signals.tainted_sinks.iter().any(|sink| sink != "eval") {
        found.push(SecurityPattern::CommandInjection);
    }
    if signals.tainted_sinks.iter().any(|sink| sink == "eval") {
        found.push(SecurityPattern::UnsafeEval);
    }
    if !signals.markup_sinks.is_empty() {
        found.push(SecurityPattern::Xss);
    }
    if !signals.weak_random.is_empty() {
        found.push(SecurityPattern::WeakRandom);
    }
    if signals
        .indexed_parameters
        .iter()
        .any(|p| !signals.bounds_checked.contains(p))
    {
        found.push(SecurityPattern::UncheckedIndex);
    }
    if signals
        .dereferenced_parameters
        .iter()
        .any(|p| !signals.null_checked.contains(p))
    {
        found.push(SecurityPattern::NullDereference);
    }
    if !signals.secret_literals.is_empty() {
        found.push(SecurityPattern::HardcodedSecret);
    }
    found
}

fn performance_patterns(callable: &CallableEntity) -> Vec<PerformancePattern> {
    let signals = &callable.signals;
    let mut found = Vec::new();
    if signals.max_loop_depth >= 2 && !signals.early_exit_in_loop {
        found.push(PerformancePattern::NestedLoops);
    }
    if callable.has_recursion && !signals.memoized {
        found.push(PerformancePattern::UnmemoizedRecursion);
    }
    if !signals.loop_allocations.is_empty() {
        found.push(PerformancePattern::LoopAllocation);
    }
    if !signals.loop_concatenations.is_empty() {
        found.push(PerformancePattern::InefficientString);
    }
    found
}

fn quality_issues(callable: &CallableEntity, language: Language) -> Vec<QualityIssue> {
    let signals = &callable.signals;
    let mut found = Vec::new();
    if signals.statement_lines > LONG_FUNCTION_LINES {
        found.push(QualityIssue::LongFunction);
    }
    if !signals.complex_conditions.is_empty() {
        found.push(QualityIssue::ComplexCondition);
    }
    if !follows_naming(language, &callable.name) {
        found.push(QualityIssue::NamingConvention);
    }
    found
}

/// Improvement hints: magic numbers, long lines, then undocumented
/// callables in declaration order.
fn suggestions(ir: &Ir) -> Vec<String> {
    let mut hints = Vec::new();
    if ir.metrics.magic_numbers > 0 {
        hints.push(format!(
            "Replace {} magic number(s) with named constants",
            ir.metrics.magic_numbers
        ));
    }
    if !ir.metrics.long_lines.is_empty() {
        let listed: Vec<String> = ir
            .metrics
            .long_lines
            .iter()
            .take(MAX_LISTED_LONG_LINES)
            .map(usize::to_string)
            .collect();
        hints.push(format!("Break long lines at lines: {}", listed.join(", ")));
    }
    for callable in &ir.callables {
        if !callable.signals.documented {
            hints.push(format!("Add documentation to `{}`", callable.qualified_name()));
        }
    }
    hints
}

fn complexity_level(complexity: u32) -> Option<ComplexityLevel> {
    if complexity > HIGH_COMPLEXITY_THRESHOLD {
        Some(ComplexityLevel::High)
    } else if complexity > MODERATE_COMPLEXITY_THRESHOLD {
        Some(ComplexityLevel::Moderate)
    } else {
        None
    }
}

fn penalized(penalty: u32) -> u32 {
    100u32.saturating_sub(penalty)
}

/// Classic maintainability index over the whole unit:
/// `100 - 2 * cyclomatic - 0.1 * lines`, floored at zero.
pub fn maintainability_index(ir: &Ir) -> u32 {
    let decisions: usize = ir.callables.iter().map(|c| c.decision_points.len()).sum();
    let cyclomatic = 1.0 + decisions as f64;
    let lines = ir.metrics.lines_of_code as f64;
    (100.0 - cyclomatic * 2.0 - lines * 0.1).max(0.0) as u32
}

/// Score an IR. Deterministic: findings follow callable order, then
/// security, performance, complexity and quality within a callable; unused
/// imports come last.
pub fn score(ir: &Ir) -> RiskProfile {
    let mut security_flags: BTreeMap<SecurityPattern, usize> = BTreeMap::new();
    let mut performance_flags: BTreeMap<PerformancePattern, usize> = BTreeMap::new();
    let mut findings: Vec<RiskFinding> = Vec::new();
    let mut complexity_penalty = 0u32;

    for callable in &ir.callables {
        let target = callable.qualified_name();
        let mut push = |kind: FindingKind| {
            findings.push(RiskFinding {
                target: target.clone(),
                kind,
                confidence: callable.confidence,
            })
        };

        for pattern in security_patterns(callable) {
            *security_flags.entry(pattern).or_default() += 1;
            push(FindingKind::Security(pattern));
        }
        for pattern in performance_patterns(callable) {
            *performance_flags.entry(pattern).or_default() += 1;
            push(FindingKind::Performance(pattern));
        }
        if let Some(level) = complexity_level(callable.complexity) {
            complexity_penalty += match level {
                ComplexityLevel::High => HIGH_COMPLEXITY_PENALTY,
                ComplexityLevel::Moderate => MODERATE_COMPLEXITY_PENALTY,
            };
            push(FindingKind::Complexity(level));
        }
        for issue in quality_issues(callable, ir.language) {
            push(FindingKind::Quality(issue));
        }
    }
    for name in &ir.metrics.unused_imports {
        findings.push(RiskFinding {
            target: name.clone(),
            kind: FindingKind::Quality(QualityIssue::UnusedImport),
            confidence: Confidence::Heuristic,
        });
    }

    let security_count: usize = security_flags.values().sum();
    let performance_count: usize = performance_flags.values().sum();
    let profile = RiskProfile {
        complexity_score: penalized(complexity_penalty),
        security_score: penalized(SECURITY_PENALTY.saturating_mul(security_count as u32)),
        performance_score: penalized(PERFORMANCE_PENALTY.saturating_mul(performance_count as u32)),
        maintainability_index: maintainability_index(ir),
        security_flags,
        performance_flags,
        findings,
        suggestions: suggestions(ir),
        heuristic_entities: ir.heuristic_count(),
    };
    debug!(
        findings = profile.findings.len(),
        security = profile.security_score,
        performance = profile.performance_score,
        complexity = profile.complexity_score,
        "scored IR"
    );
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::models::{
        BodySignals, Confidence, DecisionKind, DecisionPoint, Language, SourceUnit, UnitMetrics,
    };

    fn callable(name: &str, signals: BodySignals) -> CallableEntity {
        CallableEntity {
            name: name.to_string(),
            owner: None,
            is_static: false,
            parameters: vec![],
            return_type: None,
            complexity: 1,
            decision_points: vec![],
            raises: false,
            has_loop: false,
            has_recursion: false,
            has_external_call: false,
            external_calls: vec![],
            signals,
            confidence: Confidence::Structural,
            line: 1,
        }
    }

    fn ir_of(callables: Vec<CallableEntity>) -> Ir {
        Ir {
            language: Language::Python,
            framework: None,
            strategy: "test".to_string(),
            degraded: false,
            callables,
            types: vec![],
            metrics: UnitMetrics::default(),
            diagnostics: vec![],
        }
    }

    fn with_decisions(mut c: CallableEntity, n: usize) -> CallableEntity {
        c.decision_points = (0..n)
            .map(|i| DecisionPoint {
                kind: DecisionKind::Branch,
                comparison: None,
                line: i + 2,
            })
            .collect();
        c.complexity = n as u32 + 1;
        c
    }

    #[test]
    fn test_clean_ir_scores_perfect() {
        let profile = score(&ir_of(vec![callable("f", BodySignals::default())]));
        assert_eq!(profile.security_score, 100);
        assert_eq!(profile.performance_score, 100);
        assert_eq!(profile.complexity_score, 100);
        assert!(profile.findings.is_empty());
    }

    #[test]
    fn test_index_requires_missing_bounds_check() {
        let unchecked = BodySignals {
            indexed_parameters: vec!["i".into()],
            ..BodySignals::default()
        };
        let checked = BodySignals {
            indexed_parameters: vec!["i".into()],
            bounds_checked: vec!["i".into()],
            ..BodySignals::default()
        };
        let profile = score(&ir_of(vec![callable("a", unchecked), callable("b", checked)]));
        assert_eq!(profile.security_flags.get(&SecurityPattern::UncheckedIndex), Some(&1));
        assert_eq!(profile.security_score, 75);
        assert_eq!(profile.findings[0].target, "a");
    }

    #[test]
    fn test_nested_loops_need_no_early_exit() {
        let nested = BodySignals {
            max_loop_depth: 2,
            ..BodySignals::default()
        };
        let exits = BodySignals {
            max_loop_depth: 3,
            early_exit_in_loop: true,
            ..BodySignals::default()
        };
        let profile = score(&ir_of(vec![callable("a", nested), callable("b", exits)]));
        assert_eq!(profile.performance_flags.get(&PerformancePattern::NestedLoops), Some(&1));
        assert!(profile.has_performance_finding("a"));
        assert!(!profile.has_performance_finding("b"));
        assert_eq!(profile.performance_score, 80);
    }

    #[test]
    fn test_recursion_without_memo_is_flagged() {
        let mut fib = callable("fib", BodySignals::default());
        fib.has_recursion = true;
        let mut cached = callable(
            "cached",
            BodySignals {
                memoized: true,
                ..BodySignals::default()
            },
        );
        cached.has_recursion = true;
        let profile = score(&ir_of(vec![fib, cached]));
        assert_eq!(
            profile.performance_flags.get(&PerformancePattern::UnmemoizedRecursion),
            Some(&1)
        );
    }

    #[test]
    fn test_penalties_floor_at_zero() {
        let bad = BodySignals {
            tainted_sinks: vec!["os.system".into()],
            indexed_parameters: vec!["i".into()],
            dereferenced_parameters: vec!["node".into()],
            secret_literals: vec![3],
            ..BodySignals::default()
        };
        let profile = score(&ir_of(vec![callable("a", bad.clone()), callable("b", bad)]));
        assert_eq!(profile.security_score, 0);
        assert_eq!(profile.security_flags.len(), 4);
    }

    #[test]
    fn test_complexity_thresholds() {
        let profile = score(&ir_of(vec![
            // Complexity 5 sits on the moderate threshold, which is exclusive.
            with_decisions(callable("small", BodySignals::default()), 4),
            with_decisions(callable("moderate", BodySignals::default()), 6),
            with_decisions(callable("high", BodySignals::default()), 11),
        ]));
        assert_eq!(profile.complexity_score, 100 - 5 - 15);
        let kinds: Vec<&FindingKind> = profile.findings.iter().map(|f| &f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &FindingKind::Complexity(ComplexityLevel::Moderate),
                &FindingKind::Complexity(ComplexityLevel::High),
            ]
        );
    }

    #[test]
    fn test_maintainability_index() {
        let mut ir = ir_of(vec![with_decisions(callable("f", BodySignals::default()), 4)]);
        ir.metrics.lines_of_code = 50;
        // 100 - 2 * 5 - 5
        assert_eq!(maintainability_index(&ir), 85);
        ir.metrics.lines_of_code = 5000;
        assert_eq!(maintainability_index(&ir), 0);
    }

    #[test]
    fn test_heuristic_entities_counted() {
        let mut c = callable("f", BodySignals::default());
        c.confidence = Confidence::Heuristic;
        let profile = score(&ir_of(vec![c, callable("g", BodySignals::default())]));
        assert_eq!(profile.heuristic_entities, 1);
    }

    #[test]
    fn test_score_from_analyzed_source() {
        let src = "\
import os

def run(target):
    os.system(\"ping \" + target)
";
        let ir = analyze(&SourceUnit::new(src, "python")).unwrap();
        let profile = score(&ir);
        assert_eq!(
            profile.security_flags.get(&SecurityPattern::CommandInjection),
            Some(&1)
        );
        assert_eq!(profile, score(&ir));
    }

    #[test]
    fn test_eval_markup_and_random_patterns() {
        let risky = BodySignals {
            tainted_sinks: vec!["eval".into()],
            markup_sinks: vec![2],
            weak_random: vec![4],
            ..BodySignals::default()
        };
        let profile = score(&ir_of(vec![callable("render", risky)]));
        let flagged: Vec<SecurityPattern> = profile.security_flags.keys().copied().collect();
        assert_eq!(
            flagged,
            vec![SecurityPattern::Xss, SecurityPattern::UnsafeEval, SecurityPattern::WeakRandom]
        );
        assert_eq!(profile.security_score, 25);
    }

    #[test]
    fn test_loop_concatenation_is_inefficient_string() {
        let growing = BodySignals {
            loop_concatenations: vec![3],
            ..BodySignals::default()
        };
        let profile = score(&ir_of(vec![callable("join_all", growing)]));
        assert_eq!(
            profile.performance_flags.get(&PerformancePattern::InefficientString),
            Some(&1)
        );
        assert_eq!(profile.performance_score, 80);
    }

    #[test]
    fn test_quality_issues_carry_no_penalty() {
        let long = BodySignals {
            statement_lines: LONG_FUNCTION_LINES + 1,
            complex_conditions: vec![5],
            ..BodySignals::default()
        };
        let mut ir = ir_of(vec![callable("processAll", long)]);
        ir.metrics.unused_imports = vec!["sys".to_string()];
        let profile = score(&ir);
        let kinds: Vec<(&str, &FindingKind)> = profile
            .findings
            .iter()
            .map(|f| (f.target.as_str(), &f.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("processAll", &FindingKind::Quality(QualityIssue::LongFunction)),
                ("processAll", &FindingKind::Quality(QualityIssue::ComplexCondition)),
                ("processAll", &FindingKind::Quality(QualityIssue::NamingConvention)),
                ("sys", &FindingKind::Quality(QualityIssue::UnusedImport)),
            ]
        );
        assert_eq!(profile.findings[3].confidence, Confidence::Heuristic);
        assert_eq!(
            (profile.security_score, profile.performance_score, profile.complexity_score),
            (100, 100, 100)
        );
    }

    #[test]
    fn test_naming_conventions_per_language() {
        assert!(follows_naming(Language::Python, "load_config"));
        assert!(follows_naming(Language::Python, "__repr__"));
        assert!(!follows_naming(Language::Python, "loadConfig"));
        assert!(follows_naming(Language::Java, "loadConfig"));
        assert!(!follows_naming(Language::Java, "load_config"));
        assert!(follows_naming(Language::Go, "LoadConfig"));
        assert!(follows_naming(Language::CSharp, "LoadConfig"));
        assert!(!follows_naming(Language::CSharp, "loadConfig"));
        assert!(follows_naming(Language::Cpp, "Load_Config"));
    }

    #[test]
    fn test_suggestions_from_analyzed_source() {
        let src = format!(
            "\
import sys

def documented(x):
    \"\"\"Scale x.\"\"\"
    return x * 1000

def bare(y):
    return \"{}\"
",
            "y".repeat(90)
        );
        let ir = analyze(&SourceUnit::new(src, "python")).unwrap();
        let profile = score(&ir);
        assert_eq!(
            profile.suggestions,
            vec![
                "Replace 1 magic number(s) with named constants".to_string(),
                "Break long lines at lines: 8".to_string(),
                "Add documentation to `bare`".to_string(),
            ]
        );
        assert!(profile
            .findings
            .iter()
            .any(|f| f.target == "sys" && f.kind == FindingKind::Quality(QualityIssue::UnusedImport)));
    }
}
