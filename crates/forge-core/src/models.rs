//! Data model shared by the analyzer, scorer, synthesis engine, coverage
//! estimator and refinement loop.
//!
//! Every type here is plain data: it derives `Serialize`/`Deserialize` so the
//! persistence collaborator can round-trip it, and `PartialEq` so tests can
//! compare whole values structurally.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_EDGE_CASES;

// ---------------------------------------------------------------------------
// Languages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
    Go,
    Rust,
    Cpp,
    CSharp,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Java,
        Language::Go,
        Language::Rust,
        Language::Cpp,
        Language::CSharp,
    ];

    /// Resolve a declared language tag. Accepts the canonical names plus the
    /// common short forms (`py`, `ts`, `c++`, `c#`, ...).
    pub fn from_tag(tag: &str) -> Option<Language> {
        let normalized = tag.trim().to_lowercase();
        let language = match normalized.as_str() {
            "python" | "py" => Language::Python,
            "javascript" | "js" | "jsx" | "node" => Language::JavaScript,
            "typescript" | "ts" | "tsx" => Language::TypeScript,
            "java" => Language::Java,
            "go" | "golang" => Language::Go,
            "rust" | "rs" => Language::Rust,
            "cpp" | "c++" | "cc" | "cxx" => Language::Cpp,
            "csharp" | "c#" | "cs" => Language::CSharp,
            _ => return None,
        };
        Some(language)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
        }
    }

    /// Languages whose blocks are delimited by braces rather than indentation.
    pub fn uses_braces(&self) -> bool {
        !matches!(self, Language::Python)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Analyzer input / output
// ---------------------------------------------------------------------------

/// One unit of raw source handed to the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub text: String,
    /// Declared language tag, resolved by the analyzer.
    pub language: String,
    pub framework: Option<String>,
    pub path: Option<String>,
}

impl SourceUnit {
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
            framework: None,
            path: None,
        }
    }

    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.framework = Some(framework.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// How much an extracted entity can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Read from a full syntax tree.
    Structural,
    /// Approximated by line patterns.
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_hint: Option<String>,
    pub default: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_hint: Option<&str>) -> Self {
        Self {
            name: name.into(),
            type_hint: type_hint.map(str::to_string),
            default: None,
        }
    }

    /// Whether the declaration admits an absent value (`Optional[T]`,
    /// `T | None`, `T?`, pointers, a `None`/`null` default, ...).
    pub fn is_nullable(&self) -> bool {
        let hint_nullable = self.type_hint.as_deref().is_some_and(|hint| {
            let hint = hint.trim();
            hint.starts_with("Optional")
                || hint.starts_with("Option<")
                || hint.starts_with('*')
                || hint.ends_with('?')
                || hint.contains("None")
                || hint.contains("null")
                || hint.contains("undefined")
                || hint.contains("Nullable")
        });
        let default_nullable = matches!(
            self.default.as_deref().map(str::trim),
            Some("None" | "null" | "nil" | "undefined" | "nullptr")
        );
        hint_nullable || default_nullable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Branch,
    Loop,
    Case,
    Catch,
    Boolean,
    Conditional,
}

/// A comparison read from a condition, normalized so that a parameter (when
/// one takes part) is the subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Comparison {
    pub subject: String,
    pub operator: String,
    pub operand: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPoint {
    pub kind: DecisionKind,
    pub comparison: Option<Comparison>,
    pub line: usize,
}

/// Raw quality facts read from a callable body. The scorer combines them;
/// none of them is a finding on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodySignals {
    pub max_loop_depth: usize,
    pub early_exit_in_loop: bool,
    /// Command/query sinks fed with a string built from a parameter.
    pub tainted_sinks: Vec<String>,
    /// Parameters used to compute an index into a sequence.
    pub indexed_parameters: Vec<String>,
    /// Parameters compared against a bound or length somewhere in the body.
    pub bounds_checked: Vec<String>,
    /// Nullable parameters whose members are accessed.
    pub dereferenced_parameters: Vec<String>,
    pub null_checked: Vec<String>,
    pub memoized: bool,
    /// Lines allocating a large or sized literal inside a loop body.
    pub loop_allocations: Vec<usize>,
    /// Lines assigning a string literal to a credential-like name.
    pub secret_literals: Vec<usize>,
    /// Lines writing parameter-derived text into page markup.
    #[serde(default)]
    pub markup_sinks: Vec<usize>,
    /// Lines drawing a non-cryptographic random value into a credential.
    #[serde(default)]
    pub weak_random: Vec<usize>,
    /// Lines growing a string by concatenation inside a loop body.
    #[serde(default)]
    pub loop_concatenations: Vec<usize>,
    /// Lines whose boolean expression joins more than three operands.
    #[serde(default)]
    pub complex_conditions: Vec<usize>,
    /// Non-blank, non-comment body lines.
    #[serde(default)]
    pub statement_lines: usize,
    /// A docstring or doc comment accompanies the definition.
    #[serde(default)]
    pub documented: bool,
}

/// A function or method extracted into the IR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableEntity {
    pub name: String,
    pub owner: Option<String>,
    /// Static/associated members are called on the owner, not an instance.
    pub is_static: bool,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    /// Cyclomatic complexity: decision points plus one.
    pub complexity: u32,
    pub decision_points: Vec<DecisionPoint>,
    pub raises: bool,
    pub has_loop: bool,
    pub has_recursion: bool,
    pub has_external_call: bool,
    pub external_calls: Vec<String>,
    pub signals: BodySignals,
    pub confidence: Confidence,
    pub line: usize,
}

impl CallableEntity {
    pub fn qualified_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}.{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn comparisons(&self) -> impl Iterator<Item = &Comparison> {
        self.decision_points
            .iter()
            .filter_map(|point| point.comparison.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeEntity {
    pub name: String,
    /// Member callable names in declaration order; constructors excluded.
    pub members: Vec<String>,
    pub bases: Vec<String>,
    pub constructor: Vec<Parameter>,
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMetrics {
    pub lines_of_code: usize,
    pub max_nesting_depth: usize,
    /// Imported names never referenced in the rest of the unit.
    #[serde(default)]
    pub unused_imports: Vec<String>,
    /// 1-based lines longer than the line-length limit.
    #[serde(default)]
    pub long_lines: Vec<usize>,
    /// Numeric literals of three or more digits outside constant declarations.
    #[serde(default)]
    pub magic_numbers: usize,
}

/// Uniform structural summary of one source unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ir {
    pub language: Language,
    pub framework: Option<String>,
    /// Name of the extraction strategy that produced this IR.
    pub strategy: String,
    /// Set when the native parser failed and pattern extraction was used.
    pub degraded: bool,
    pub callables: Vec<CallableEntity>,
    pub types: Vec<TypeEntity>,
    pub metrics: UnitMetrics,
    pub diagnostics: Vec<String>,
}

impl Ir {
    pub fn callable(&self, qualified_name: &str) -> Option<&CallableEntity> {
        self.callables
            .iter()
            .find(|c| c.qualified_name() == qualified_name)
    }

    pub fn type_entity(&self, name: &str) -> Option<&TypeEntity> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Qualified names matching a refinement target: either an exact
    /// qualified name or a bare name shared by one or more callables.
    pub fn resolve_target(&self, target: &str) -> Vec<String> {
        if let Some(callable) = self.callable(target) {
            return vec![callable.qualified_name()];
        }
        let bare: Vec<String> = self
            .callables
            .iter()
            .filter(|c| c.name == target)
            .map(CallableEntity::qualified_name)
            .collect();
        if !bare.is_empty() {
            return bare;
        }
        match self.type_entity(target) {
            Some(entity) if entity.members.len() >= 2 => vec![entity.name.clone()],
            _ => Vec::new(),
        }
    }

    pub fn heuristic_count(&self) -> usize {
        self.callables
            .iter()
            .filter(|c| c.confidence == Confidence::Heuristic)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Risk profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPattern {
    CommandInjection,
    UncheckedIndex,
    NullDereference,
    HardcodedSecret,
    Xss,
    UnsafeEval,
    WeakRandom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformancePattern {
    NestedLoops,
    UnmemoizedRecursion,
    LoopAllocation,
    InefficientString,
}

/// Maintainability issues. Advisory only: they carry no score penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    UnusedImport,
    LongFunction,
    ComplexCondition,
    NamingConvention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", content = "pattern", rename_all = "snake_case")]
pub enum FindingKind {
    Security(SecurityPattern),
    Performance(PerformancePattern),
    Complexity(ComplexityLevel),
    Quality(QualityIssue),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFinding {
    pub target: String,
    pub kind: FindingKind,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub complexity_score: u32,
    pub security_score: u32,
    pub performance_score: u32,
    pub maintainability_index: u32,
    pub security_flags: BTreeMap<SecurityPattern, usize>,
    pub performance_flags: BTreeMap<PerformancePattern, usize>,
    pub findings: Vec<RiskFinding>,
    /// Improvement hints that are not tied to a risk class.
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Callables whose findings rest on pattern extraction only.
    pub heuristic_entities: usize,
}

impl RiskProfile {
    pub fn has_performance_finding(&self, target: &str) -> bool {
        self.findings
            .iter()
            .any(|f| f.target == target && matches!(f.kind, FindingKind::Performance(_)))
    }

    pub fn findings_for<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a RiskFinding> {
        self.findings.iter().filter(move |f| f.target == target)
    }
}

// ---------------------------------------------------------------------------
// Test cases and suites
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCategory {
    Unit,
    Integration,
    EdgeCase,
    Error,
    Mock,
    Performance,
}

impl TestCategory {
    pub const ALL: [TestCategory; 6] = [
        TestCategory::Unit,
        TestCategory::Integration,
        TestCategory::EdgeCase,
        TestCategory::Error,
        TestCategory::Mock,
        TestCategory::Performance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestCategory::Unit => "unit",
            TestCategory::Integration => "integration",
            TestCategory::EdgeCase => "edge_case",
            TestCategory::Error => "error",
            TestCategory::Mock => "mock",
            TestCategory::Performance => "performance",
        }
    }

    pub fn from_name(name: &str) -> Option<TestCategory> {
        let normalized = name.trim().to_lowercase().replace(['-', ' '], "_");
        TestCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .or(match normalized.as_str() {
                "edge" | "edges" | "boundary" => Some(TestCategory::EdgeCase),
                "perf" | "benchmark" => Some(TestCategory::Performance),
                _ => None,
            })
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocLevel {
    None,
    #[default]
    Standard,
    Enriched,
}

/// One rendered call inside a test body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub call: String,
    /// Whether the call yields a value that the placeholder assertion checks.
    pub binds_result: bool,
    /// Whether the failure pattern should check a returned error value
    /// instead of a thrown exception or panic.
    pub returns_error: bool,
    /// Declared return type of the call, which shapes its binding.
    pub return_type: Option<String>,
}

/// Everything needed to re-render a case from its template. Rendered source
/// is always derived from this, never edited by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasePlan {
    pub test_name: String,
    pub summary: String,
    /// Extra lines for enriched documentation.
    pub details: Vec<String>,
    pub doc: DocLevel,
    pub setup: Vec<String>,
    pub steps: Vec<Step>,
    /// `(fixture name, dependency)` pairs for mock cases.
    pub dependencies: Vec<(String, String)>,
    /// Assertion text supplied by an enrichment pass.
    pub assertion: Option<String>,
}

impl CasePlan {
    /// The structural content of the case: everything that ends up in the
    /// rendered text except documentation.
    pub fn content_key(&self) -> String {
        let steps: Vec<&str> = self.steps.iter().map(|s| s.call.as_str()).collect();
        let fixtures: Vec<String> = self
            .dependencies
            .iter()
            .map(|(name, dep)| format!("{name}={dep}"))
            .collect();
        format!(
            "{}|{}|{}|{}|{}",
            self.test_name,
            self.setup.join(";"),
            steps.join(";"),
            fixtures.join(";"),
            self.assertion.as_deref().unwrap_or("")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub revision: u32,
    pub category: TestCategory,
    /// Qualified name of the targeted callable or type.
    pub target: String,
    pub fixtures: Vec<String>,
    pub source: String,
    pub plan: CasePlan,
}

impl TestCase {
    pub fn is_duplicate_of(&self, other: &TestCase) -> bool {
        self.target == other.target
            && self.category == other.category
            && self.plan.content_key() == other.plan.content_key()
    }
}

/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisOptions {
    pub max_edge_cases_per_entity: usize,
    pub include_mocks: bool,
    pub include_performance: bool,
    /// Add negative and below-zero domain values to edge candidates.
    pub negative_domain: bool,
    /// Add unicode, whitespace and extreme values to edge candidates.
    pub boundary_diversity: bool,
    /// Literal values supplied by a refinement directive.
    pub extra_values: Vec<String>,
    pub doc_level: DocLevel,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            max_edge_cases_per_entity: DEFAULT_MAX_EDGE_CASES,
            include_mocks: true,
            include_performance: true,
            negative_domain: false,
            boundary_diversity: false,
            extra_values: Vec::new(),
            doc_level: DocLevel::Standard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GapReason {
    /// The catalog has no template for the category, even after fallback.
    NoTemplate { framework: String },
    /// More edge candidates existed than the per-entity cap allows.
    EdgeCaseCap { cap: usize, candidates: usize },
    /// The callable branches, but no condition names a parameter and no
    /// parameter has a domain to exercise.
    NoEdgeCandidates { decision_points: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageGap {
    pub target: String,
    pub category: TestCategory,
    pub reason: GapReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Qualified callable name to whether any case targets it.
    pub entities: IndexMap<String, bool>,
    pub covered: usize,
    pub total: usize,
    pub percentage: u32,
    /// Percentage with complex callables (above the median) counted twice.
    pub weighted_percentage: u32,
    pub category_counts: BTreeMap<TestCategory, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    pub revision: u32,
    /// Framework label the suite was requested for.
    pub framework: String,
    pub options: SynthesisOptions,
    pub ir: Arc<Ir>,
    pub risk: RiskProfile,
    pub cases: IndexMap<String, TestCase>,
    pub coverage: CoverageReport,
    pub gaps: Vec<CoverageGap>,
}

impl Suite {
    pub fn cases_for<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a TestCase> {
        self.cases.values().filter(move |case| case.target == target)
    }

    pub fn count(&self, target: &str, category: TestCategory) -> usize {
        self.cases_for(target)
            .filter(|case| case.category == category)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Refinement directives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineOp {
    Add,
    Broaden,
    Simplify,
    Document,
}

impl RefineOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefineOp::Add => "add",
            RefineOp::Broaden => "broaden",
            RefineOp::Simplify => "simplify",
            RefineOp::Document => "document",
        }
    }
}

pub const ALL_TARGETS: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// Entity name, or `*` for every entity.
    pub target: String,
    pub operation: RefineOp,
    #[serde(default)]
    pub category: Option<TestCategory>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Directive {
    pub fn new(target: impl Into<String>, operation: RefineOp) -> Self {
        Self {
            target: target.into(),
            operation,
            category: None,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_category(mut self, category: TestCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn targets_all(&self) -> bool {
        self.target.trim() == ALL_TARGETS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_tag_aliases() {
        assert_eq!(Language::from_tag("Python"), Some(Language::Python));
        assert_eq!(Language::from_tag(" ts "), Some(Language::TypeScript));
        assert_eq!(Language::from_tag("c++"), Some(Language::Cpp));
        assert_eq!(Language::from_tag("C#"), Some(Language::CSharp));
        assert_eq!(Language::from_tag("unknown-lang"), None);
    }

    #[test]
    fn test_parameter_nullable_forms() {
        assert!(Parameter::new("x", Some("Optional[int]")).is_nullable());
        assert!(Parameter::new("x", Some("string | null")).is_nullable());
        assert!(Parameter::new("x", Some("*Node")).is_nullable());
        assert!(Parameter::new("x", Some("int?")).is_nullable());
        assert!(!Parameter::new("x", Some("int")).is_nullable());

        let mut with_default = Parameter::new("x", None);
        with_default.default = Some("None".to_string());
        assert!(with_default.is_nullable());
    }

    #[test]
    fn test_category_from_name() {
        assert_eq!(TestCategory::from_name("edge-case"), Some(TestCategory::EdgeCase));
        assert_eq!(TestCategory::from_name("edge"), Some(TestCategory::EdgeCase));
        assert_eq!(TestCategory::from_name("perf"), Some(TestCategory::Performance));
        assert_eq!(TestCategory::from_name("Unit"), Some(TestCategory::Unit));
        assert_eq!(TestCategory::from_name("smoke"), None);
    }

    #[test]
    fn test_directive_targets_all() {
        assert!(Directive::new("*", RefineOp::Add).targets_all());
        assert!(!Directive::new("divide", RefineOp::Add).targets_all());
    }
}
