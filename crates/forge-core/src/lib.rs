//! Forge core library: code intelligence and test synthesis.
//!
//! Source text goes through the structural analyzer into a uniform IR, the
//! risk scorer turns the IR into a quality profile, and the synthesis engine
//! renders a categorized test suite from a template catalog. Suites are then
//! refined one structured directive at a time, each step producing a new
//! immutable revision. With the `python` feature the crate also builds as
//! the `_forge_core` extension module.

pub mod analyzer;
pub mod config;
pub mod coverage;
pub mod errors;
pub mod models;
pub mod refine;
pub mod risk;
pub mod store;
pub mod synthesis;

#[cfg(feature = "python")]
pub mod python;

pub use analyzer::analyze;
pub use errors::{ForgeError, ForgeResult, Rejected};
pub use refine::refine_suite;
pub use synthesis::generate_suite;

#[cfg(feature = "python")]
use pyo3::prelude::*;

// ---------------------------------------------------------------------------
// Top-level Python module: _forge_core
// ---------------------------------------------------------------------------

#[cfg(feature = "python")]
#[pymodule]
fn _forge_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    python::register(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Directive, RefineOp, SourceUnit, SynthesisOptions, TestCategory};

    #[test]
    fn test_divide_scenario() {
        let src = "\
def divide(a: float, b: float) -> float:
    if b == 0:
        raise ZeroDivisionError(\"b must not be zero\")
    return a / b
";
        let ir = analyze(&SourceUnit::new(src, "python")).unwrap();
        let suite = generate_suite(&ir, &SynthesisOptions::default());
        assert!(suite.count("divide", TestCategory::Unit) >= 1);
        assert!(suite.count("divide", TestCategory::Error) >= 1);
        let zero_edge = suite
            .cases_for("divide")
            .filter(|c| c.category == TestCategory::EdgeCase)
            .any(|c| c.source.contains("divide(1.5, 0.0)"));
        assert!(zero_edge);
    }

    #[test]
    fn test_stack_scenario_in_typescript() {
        let src = "\
export class Stack {
  private items: number[] = [];

  push(item: number): void {
    this.items.push(item);
  }

  pop(): number | undefined {
    return this.items.pop();
  }

  peek(): number | undefined {
    return this.items[this.items.length - 1];
  }
}
";
        let ir = analyze(&SourceUnit::new(src, "typescript")).unwrap();
        let suite = generate_suite(&ir, &SynthesisOptions::default());
        let integration: Vec<_> = suite
            .cases
            .values()
            .filter(|c| c.category == TestCategory::Integration)
            .collect();
        assert_eq!(integration.len(), 1);
        let source = &integration[0].source;
        assert!(source.starts_with("test(\"stack member sequence\", () => {"));
        assert!(source.contains("const subject = new Stack();"));
        assert!(source.contains("subject.push(1);"));
        assert!(source.contains("const result = subject.peek();"));
    }

    #[test]
    fn test_python_stack_has_no_performance_findings() {
        let src = "\
class Stack:
    def __init__(self):
        self.items = []

    def push(self, item):
        self.items.append(item)

    def pop(self):
        return self.items.pop()

    def peek(self):
        return self.items[-1]
";
        let ir = analyze(&SourceUnit::new(src, "python")).unwrap();
        assert!(ir.callables.iter().all(|c| !c.has_recursion));
        let suite = generate_suite(&ir, &SynthesisOptions::default());
        assert!(suite
            .cases
            .values()
            .all(|c| c.category != TestCategory::Performance));
        assert!(suite.risk.performance_flags.is_empty());
    }

    #[test]
    fn test_simplify_scenario() {
        let src = "def divide(a: int, b: int):\n    return a / b\n";
        let ir = analyze(&SourceUnit::new(src, "python")).unwrap();
        let mut suite = generate_suite(&ir, &SynthesisOptions::default());
        let unit = suite.cases["divide::unit::01"].clone();
        for n in 2..=4 {
            let id = format!("divide::unit::{n:02}");
            suite.cases.insert(id.clone(), models::TestCase { id, ..unit.clone() });
        }
        let simplified = refine_suite(&suite, &Directive::new("divide", RefineOp::Simplify)).unwrap();
        assert_eq!(simplified.count("divide", TestCategory::Unit), 1);
    }

    #[test]
    fn test_unknown_language_scenario() {
        let err = analyze(&SourceUnit::new("whatever", "unknown-lang")).unwrap_err();
        assert!(matches!(err, ForgeError::UnsupportedLanguage(ref tag) if tag == "unknown-lang"));
    }

    #[test]
    fn test_add_then_document_keeps_coverage() {
        let src = "\
def clamp(value: int, low: int, high: int) -> int:
    if value < low:
        return low
    if value > high:
        return high
    return value
";
        let ir = analyze(&SourceUnit::new(src, "python")).unwrap();
        let suite = generate_suite(&ir, &SynthesisOptions::default());
        let added = refine_suite(&suite, &Directive::new("*", RefineOp::Add)).unwrap();
        let documented = refine_suite(&added, &Directive::new("*", RefineOp::Document)).unwrap();
        assert!(added.coverage.percentage >= suite.coverage.percentage);
        assert_eq!(documented.cases.len(), added.cases.len());
        assert_eq!(documented.revision, 3);
    }
}
