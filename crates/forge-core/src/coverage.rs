//! Coverage estimation: which callables a suite targets, plain and
//! complexity-weighted.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::models::{CoverageReport, Ir, Suite, TestCase, TestCategory};

/// Median callable complexity; the lower middle for even counts.
fn median_complexity(ir: &Ir) -> u32 {
    let mut values: Vec<u32> = ir.callables.iter().map(|c| c.complexity).collect();
    if values.is_empty() {
        return 0;
    }
    values.sort_unstable();
    values[(values.len() - 1) / 2]
}

fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        0
    } else {
        (part * 100 / whole) as u32
    }
}

/// Estimate coverage for any sequence of cases.
pub fn estimate_cases<'a>(ir: &Ir, cases: impl IntoIterator<Item = &'a TestCase>) -> CoverageReport {
    let mut category_counts: BTreeMap<TestCategory, usize> = BTreeMap::new();
    let mut targeted: Vec<&str> = Vec::new();
    for case in cases {
        *category_counts.entry(case.category).or_default() += 1;
        targeted.push(case.target.as_str());
    }

    let median = median_complexity(ir);
    let mut entities: IndexMap<String, bool> = IndexMap::new();
    let (mut weighted_covered, mut weighted_total) = (0usize, 0usize);
    for callable in &ir.callables {
        let name = callable.qualified_name();
        let covered = targeted.contains(&name.as_str());
        let weight = if callable.complexity > median { 2 } else { 1 };
        weighted_total += weight;
        if covered {
            weighted_covered += weight;
        }
        entities.insert(name, covered);
    }

    let covered = entities.values().filter(|c| **c).count();
    let total = entities.len();
    CoverageReport {
        entities,
        covered,
        total,
        percentage: percent(covered, total),
        weighted_percentage: percent(weighted_covered, weighted_total),
        category_counts,
    }
}

pub fn estimate(ir: &Ir, suite: &Suite) -> CoverageReport {
    estimate_cases(ir, suite.cases.values())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::models::{CasePlan, DocLevel, SourceUnit};

    fn case(target: &str, category: TestCategory) -> TestCase {
        TestCase {
            id: format!("{target}::{category}::01"),
            revision: 1,
            category,
            target: target.to_string(),
            fixtures: vec![],
            source: String::new(),
            plan: CasePlan {
                test_name: format!("test_{target}"),
                summary: String::new(),
                details: vec![],
                doc: DocLevel::Standard,
                setup: vec![],
                steps: vec![],
                dependencies: vec![],
                assertion: None,
            },
        }
    }

    fn sample_ir() -> Ir {
        let src = "\
def simple(x):
    return x

def trivial():
    return 1

def branchy(a, b):
    if a > b:
        return a
    elif a < b:
        return b
    return 0
";
        analyze(&SourceUnit::new(src, "python")).unwrap()
    }

    #[test]
    fn test_empty_ir_is_zero_percent() {
        let ir = analyze(&SourceUnit::new("x = 1\n", "python")).unwrap();
        let report = estimate_cases(&ir, std::iter::empty());
        assert_eq!(report.total, 0);
        assert_eq!(report.percentage, 0);
        assert_eq!(report.weighted_percentage, 0);
    }

    #[test]
    fn test_percentage_rounds_down() {
        let ir = sample_ir();
        let cases = [case("simple", TestCategory::Unit)];
        let report = estimate_cases(&ir, &cases);
        assert_eq!(report.covered, 1);
        assert_eq!(report.total, 3);
        assert_eq!(report.percentage, 33);
        assert_eq!(report.entities.get("trivial"), Some(&false));
        assert_eq!(report.category_counts.get(&TestCategory::Unit), Some(&1));
    }

    #[test]
    fn test_weighted_penalizes_trivial_only_coverage() {
        let ir = sample_ir();
        // Complexities are 1, 1 and 3; only `branchy` is above the median.
        let trivial_only = [
            case("simple", TestCategory::Unit),
            case("trivial", TestCategory::Unit),
        ];
        let report = estimate_cases(&ir, &trivial_only);
        assert_eq!(report.percentage, 66);
        assert_eq!(report.weighted_percentage, 50);

        let complex_only = [case("branchy", TestCategory::EdgeCase)];
        let report = estimate_cases(&ir, &complex_only);
        assert_eq!(report.percentage, 33);
        assert_eq!(report.weighted_percentage, 50);
    }

    #[test]
    fn test_cases_for_unknown_targets_do_not_count() {
        let ir = sample_ir();
        let report = estimate_cases(&ir, &[case("Stack", TestCategory::Integration)]);
        assert_eq!(report.covered, 0);
        assert_eq!(report.category_counts.get(&TestCategory::Integration), Some(&1));
    }
}
