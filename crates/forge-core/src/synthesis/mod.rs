//! Test synthesis: IR + risk profile + options to a categorized suite.
//!
//! Every case is described by a [`CasePlan`] and rendered from a catalog
//! template; rendered source is always derived from the plan, so refinement
//! can re-render a case without touching anything else. Categories the
//! catalog cannot serve, and edge candidates beyond the per-entity cap, are
//! reported as coverage gaps.

pub mod catalog;
pub mod dialect;
pub mod values;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::{MAX_EDGE_CASE_CAP, MAX_EXTRA_VALUES, MAX_INTEGRATION_STEPS, MAX_MOCK_DEPENDENCIES};
use crate::coverage;
use crate::errors::ForgeResult;
use crate::models::{
    CallableEntity, CasePlan, Confidence, CoverageGap, DocLevel, FindingKind, GapReason, Ir, Language,
    RiskProfile, Step, Suite, SynthesisOptions, TestCase, TestCategory, TypeEntity,
};
use crate::risk;
use catalog::{fill, Slots};
use dialect::{pascal_case, Dialect};
use values::{slug, EdgeCandidate, Value};

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

pub fn case_id(target: &str, category: TestCategory, index: usize) -> String {
    format!("{target}::{category}::{index:02}")
}

fn id_index(id: &str) -> Option<usize> {
    id.rsplit("::").next()?.parse().ok()
}

/// Sort key for case ids: numeric index first, so `::99` precedes `::100`.
pub(crate) fn id_order(id: &str) -> (usize, &str) {
    (id_index(id).unwrap_or(usize::MAX), id)
}

/// Next free index per (target, category), seeded from existing ids.
#[derive(Debug, Default)]
pub(crate) struct IdCounters {
    next: BTreeMap<(String, TestCategory), usize>,
}

impl IdCounters {
    pub(crate) fn seeded<'a>(cases: impl IntoIterator<Item = &'a TestCase>) -> Self {
        let mut counters = Self::default();
        for case in cases {
            let index = id_index(&case.id).unwrap_or(0);
            let slot = counters
                .next
                .entry((case.target.clone(), case.category))
                .or_insert(1);
            *slot = (*slot).max(index + 1);
        }
        counters
    }

    pub(crate) fn assign(&mut self, target: &str, category: TestCategory) -> String {
        let slot = self
            .next
            .entry((target.to_string(), category))
            .or_insert(1);
        let id = case_id(target, category, *slot);
        *slot += 1;
        id
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

const PLACEHOLDER_NOTE: &str = "Placeholder assertion: the expected value cannot be derived statically.";

fn doc_lines(dialect: &Dialect, plan: &CasePlan, category: TestCategory) -> Vec<String> {
    let mut lines: Vec<String> = match plan.doc {
        DocLevel::None => return Vec::new(),
        DocLevel::Standard => vec![plan.summary.clone()],
        DocLevel::Enriched => std::iter::once(plan.summary.clone())
            .chain(plan.details.iter().cloned())
            .collect(),
    };
    let placeholder = plan.assertion.is_none()
        && !matches!(category, TestCategory::Error | TestCategory::Performance)
        && plan.steps.iter().any(|s| s.binds_result);
    if placeholder {
        lines.push(PLACEHOLDER_NOTE.to_string());
    }
    lines
        .iter()
        .filter(|line| !line.is_empty())
        .map(|line| dialect.comment(line))
        .collect()
}

fn step_lines(
    dialect: &Dialect,
    template: &catalog::Template,
    plan: &CasePlan,
    category: TestCategory,
) -> Vec<String> {
    let mut lines = Vec::new();
    if category == TestCategory::Error {
        for step in &plan.steps {
            let line = match (step.returns_error, template.error_check) {
                (true, Some(check)) => {
                    let binding = dialect.error_binding(step.return_type.as_deref());
                    fill(check, &[("binding", &binding), ("call", &step.call)])
                }
                _ => fill(template.failure, &[("call", &step.call)]),
            };
            lines.push(line);
        }
        return lines;
    }

    let bound = plan.steps.iter().filter(|s| s.binds_result).count();
    let mut index = 0;
    for step in &plan.steps {
        if !step.binds_result {
            lines.push(dialect.statement(&step.call));
            continue;
        }
        index += 1;
        let actual = if bound > 1 {
            format!("result{index}")
        } else {
            "result".to_string()
        };
        lines.push(dialect.bind(&actual, &step.call, step.return_type.as_deref()));
        match &plan.assertion {
            Some(text) if text.contains("{{actual}}") => {
                lines.push(fill(text, &[("actual", &actual)]));
            }
            Some(_) => {}
            None => {
                let expected = dialect.expected(&actual, step.return_type.as_deref());
                lines.push(fill(
                    template.assertion,
                    &[("actual", &actual), ("expected", &expected)],
                ));
            }
        }
    }
    // A replacement without `{{actual}}` is one closing assertion.
    if let Some(text) = &plan.assertion {
        if !text.contains("{{actual}}") {
            lines.push(text.clone());
        }
    }
    lines
}

/// Render one case from its plan. Fails with `NoTemplate` when neither the
/// framework nor the language default serves the category.
pub fn render_case(
    language: Language,
    framework: &str,
    category: TestCategory,
    target: &str,
    plan: &CasePlan,
) -> ForgeResult<String> {
    let template = catalog::resolve(language, Some(framework), category)?;
    let dialect = Dialect::new(language);
    let dependencies: Vec<String> = plan
        .dependencies
        .iter()
        .map(|(fixture, dependency)| {
            fill(
                template.fixture,
                &[
                    ("fixture", fixture),
                    ("dependency", dependency),
                    ("dependency_type", &pascal_case(dependency)),
                ],
            )
        })
        .collect();
    let call = plan
        .steps
        .first()
        .map(|s| s.call.clone())
        .unwrap_or_default();

    let slots = Slots::default()
        .inline("test_name", plan.test_name.clone())
        .inline("type_name", dialect.suite_name(target))
        .inline("target", target)
        .inline("call", call)
        .lines("doc", doc_lines(&dialect, plan, category))
        .lines("dependency", dependencies)
        .lines("setup", plan.setup.clone())
        .lines("steps", step_lines(&dialect, template, plan, category));
    Ok(template.render(&slots))
}

/// Re-render an existing case after its plan changed. The id and category
/// stay; the revision advances only when the text changes.
pub(crate) fn rerender(
    language: Language,
    framework: &str,
    case: &TestCase,
    plan: CasePlan,
) -> ForgeResult<TestCase> {
    let source = render_case(language, framework, case.category, &case.target, &plan)?;
    let revision = if source == case.source {
        case.revision
    } else {
        case.revision + 1
    };
    Ok(TestCase {
        revision,
        source,
        plan,
        ..case.clone()
    })
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// A generated case before it is given an id.
#[derive(Debug, Clone)]
pub(crate) struct Draft {
    pub target: String,
    pub category: TestCategory,
    pub fixtures: Vec<String>,
    pub source: String,
    pub plan: CasePlan,
}

impl Draft {
    pub(crate) fn into_case(self, counters: &mut IdCounters) -> TestCase {
        TestCase {
            id: counters.assign(&self.target, self.category),
            revision: 1,
            category: self.category,
            target: self.target,
            fixtures: self.fixtures,
            source: self.source,
            plan: self.plan,
        }
    }

    /// Same target, category and content, documentation aside.
    pub(crate) fn duplicates(&self, case: &TestCase) -> bool {
        self.target == case.target
            && self.category == case.category
            && self.plan.content_key() == case.plan.content_key()
    }
}

/// Restricts generation to some targets and one category.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    pub targets: Option<BTreeSet<String>>,
    pub category: Option<TestCategory>,
}

impl Scope {
    fn includes(&self, target: &str) -> bool {
        self.targets.as_ref().map_or(true, |t| t.contains(target))
    }

    fn allows(&self, category: TestCategory) -> bool {
        self.category.map_or(true, |c| c == category)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Generated {
    pub drafts: Vec<Draft>,
    pub gaps: Vec<CoverageGap>,
}

struct Generator<'a> {
    ir: &'a Ir,
    risk: &'a RiskProfile,
    options: &'a SynthesisOptions,
    framework: &'a str,
    dialect: Dialect,
    scope: &'a Scope,
    out: Generated,
}

fn target_words(target: &str) -> Vec<String> {
    target.split(['.', ':']).filter(|s| !s.is_empty()).map(slug).collect()
}

fn words(base: &[String], extra: &[&str]) -> Vec<String> {
    base.iter()
        .cloned()
        .chain(extra.iter().map(|w| w.to_string()))
        .collect()
}

impl<'a> Generator<'a> {
    fn gap(&mut self, target: &str, category: TestCategory, reason: GapReason) {
        let gap = CoverageGap {
            target: target.to_string(),
            category,
            reason,
        };
        if !self.out.gaps.contains(&gap) {
            self.out.gaps.push(gap);
        }
    }

    fn emit(&mut self, target: &str, category: TestCategory, plan: CasePlan, fixtures: Vec<String>) {
        match render_case(self.ir.language, self.framework, category, target, &plan) {
            Ok(source) => self.out.drafts.push(Draft {
                target: target.to_string(),
                category,
                fixtures,
                source,
                plan,
            }),
            Err(err) => {
                debug!(%target, %category, error = %err, "category skipped");
                self.gap(
                    target,
                    category,
                    GapReason::NoTemplate {
                        framework: self.framework.to_string(),
                    },
                );
            }
        }
    }

    fn plan(&self, test_words: Vec<String>, category: TestCategory, summary: String, details: Vec<String>) -> CasePlan {
        CasePlan {
            test_name: self.dialect.test_name(&test_words, category),
            summary,
            details,
            doc: self.options.doc_level,
            setup: Vec::new(),
            steps: Vec::new(),
            dependencies: Vec::new(),
            assertion: None,
        }
    }

    // -- inputs ------------------------------------------------------------

    fn signature(callable: &CallableEntity) -> String {
        let params: Vec<String> = callable
            .parameters
            .iter()
            .map(|p| match &p.type_hint {
                Some(hint) => format!("{}: {hint}", p.name),
                None => p.name.clone(),
            })
            .collect();
        let mut text = format!("{}({})", callable.qualified_name(), params.join(", "));
        if let Some(ret) = &callable.return_type {
            text.push_str(&format!(" -> {ret}"));
        }
        text
    }

    fn details(&self, callable: &CallableEntity) -> Vec<String> {
        let target = callable.qualified_name();
        let mut details = vec![
            format!("Signature: {}", Self::signature(callable)),
            format!("Cyclomatic complexity: {}", callable.complexity),
        ];
        let findings: Vec<String> = self
            .risk
            .findings_for(&target)
            .map(|f| match &f.kind {
                FindingKind::Security(p) => format!("{p:?}"),
                FindingKind::Performance(p) => format!("{p:?}"),
                FindingKind::Complexity(level) => format!("{level:?} complexity"),
                FindingKind::Quality(issue) => format!("{issue:?}"),
            })
            .collect();
        if !findings.is_empty() {
            details.push(format!("Risk findings: {}", findings.join(", ")));
        }
        if callable.confidence == Confidence::Heuristic {
            details.push("Signature extracted heuristically; verify parameter order.".to_string());
        }
        details
    }

    fn args(&self, callable: &CallableEntity, overrides: &[(String, Value)]) -> Vec<String> {
        callable
            .parameters
            .iter()
            .map(|param| {
                let value = overrides
                    .iter()
                    .find(|(name, _)| name == &param.name)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| values::typical(param));
                self.dialect.render(&value, param.type_hint.as_deref())
            })
            .collect()
    }

    fn step(&self, callable: &CallableEntity, overrides: &[(String, Value)]) -> Step {
        let return_type = callable.return_type.as_deref();
        Step {
            call: self.dialect.call(callable, &self.args(callable, overrides)),
            binds_result: self.dialect.binds_result(return_type),
            returns_error: self.dialect.returns_error(return_type),
            return_type: callable.return_type.clone(),
        }
    }

    fn instance_setup(&self, type_name: &str) -> String {
        let constructor = self
            .ir
            .type_entity(type_name)
            .map(|t| t.constructor.as_slice())
            .unwrap_or_default();
        let args: Vec<String> = constructor
            .iter()
            .map(|p| self.dialect.render(&values::typical(p), p.type_hint.as_deref()))
            .collect();
        self.dialect
            .instantiate(type_name, &args, !constructor.is_empty())
    }

    fn setup_for(&self, callable: &CallableEntity) -> Vec<String> {
        match &callable.owner {
            Some(owner) if !callable.is_static => vec![self.instance_setup(owner)],
            _ => Vec::new(),
        }
    }

    // -- categories --------------------------------------------------------

    fn unit(&mut self, callable: &CallableEntity) {
        let target = callable.qualified_name();
        let columns: Vec<(String, Vec<Value>)> = callable
            .parameters
            .iter()
            .map(|p| (p.name.clone(), values::representatives(values::semantic_type(p))))
            .collect();
        let rows = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(1).max(1);

        let mut steps: Vec<Step> = Vec::new();
        for row in 0..rows {
            let overrides: Vec<(String, Value)> = columns
                .iter()
                .map(|(name, column)| (name.clone(), column[row % column.len()].clone()))
                .collect();
            let step = self.step(callable, &overrides);
            if !steps.iter().any(|s| s.call == step.call) {
                steps.push(step);
            }
        }

        let summary = if callable.parameters.is_empty() {
            format!("Calls `{target}` and checks its result.")
        } else {
            format!("Calls `{target}` with representative inputs for each parameter type.")
        };
        let mut plan = self.plan(
            words(&target_words(&target), &["representative", "inputs"]),
            TestCategory::Unit,
            summary,
            self.details(callable),
        );
        plan.setup = self.setup_for(callable);
        plan.steps = steps;
        self.emit(&target, TestCategory::Unit, plan, Vec::new());
    }

    fn edge_candidates(&self, callable: &CallableEntity) -> Vec<EdgeCandidate> {
        let mut base: Vec<EdgeCandidate> = Vec::new();
        let push = |list: &mut Vec<EdgeCandidate>, candidate: EdgeCandidate| {
            let clash = list.iter().any(|c| {
                c.label == candidate.label
                    || (c.parameter == candidate.parameter
                        && c.inside == candidate.inside
                        && c.outside == candidate.outside
                        && c.pinned == candidate.pinned)
            });
            if !clash {
                list.push(candidate);
            }
        };

        for comparison in callable.comparisons() {
            if let Some(candidate) = values::comparison_candidate(callable, comparison) {
                push(&mut base, candidate);
            }
        }
        for param in &callable.parameters {
            for candidate in values::domain_candidates(param) {
                push(&mut base, candidate);
            }
        }

        // One boundary per decision point; domain extremes fill in for
        // conditions that name no parameter.
        base.truncate(callable.decision_points.len());

        let mut extras: Vec<EdgeCandidate> = Vec::new();
        for param in &callable.parameters {
            if self.options.negative_domain {
                extras.extend(values::negative_candidates(param));
            }
            if self.options.boundary_diversity {
                extras.extend(values::diverse_candidates(param));
            }
        }
        let supplied: Vec<String> = self
            .options
            .extra_values
            .iter()
            .take(MAX_EXTRA_VALUES)
            .cloned()
            .collect();
        extras.extend(values::extra_candidates(callable, &supplied));
        for candidate in extras {
            push(&mut base, candidate);
        }
        base
    }

    fn edge_cases(&mut self, callable: &CallableEntity) {
        let target = callable.qualified_name();
        let mut candidates = self.edge_candidates(callable);
        if candidates.is_empty() && !callable.decision_points.is_empty() {
            info!(%target, decision_points = callable.decision_points.len(), "no edge candidates");
            self.gap(
                &target,
                TestCategory::EdgeCase,
                GapReason::NoEdgeCandidates {
                    decision_points: callable.decision_points.len(),
                },
            );
            return;
        }
        let cap = self.options.max_edge_cases_per_entity.min(MAX_EDGE_CASE_CAP);
        if candidates.len() > cap {
            info!(%target, cap, candidates = candidates.len(), "edge cases truncated at cap");
            self.gap(
                &target,
                TestCategory::EdgeCase,
                GapReason::EdgeCaseCap {
                    cap,
                    candidates: candidates.len(),
                },
            );
            candidates.truncate(cap);
        }

        for candidate in candidates {
            let param_hint = callable
                .parameter(&candidate.parameter)
                .and_then(|p| p.type_hint.as_deref());
            let mut inside = vec![(candidate.parameter.clone(), candidate.inside.clone())];
            inside.extend(candidate.pinned.iter().cloned());
            let mut outside = vec![(candidate.parameter.clone(), candidate.outside.clone())];
            outside.extend(candidate.pinned.iter().cloned());

            let label_words: Vec<&str> = candidate.label.iter().map(String::as_str).collect();
            let boundary: Vec<&str> = label_words.iter().skip(1).copied().collect();
            let boundary = boundary.join(" ");
            let mut details = self.details(callable);
            details.push(format!(
                "Inside: {} = {}",
                candidate.parameter,
                self.dialect.render(&candidate.inside, param_hint)
            ));
            details.push(format!(
                "Outside: {} = {}",
                candidate.parameter,
                self.dialect.render(&candidate.outside, param_hint)
            ));
            let mut plan = self.plan(
                words(&target_words(&target), &label_words),
                TestCategory::EdgeCase,
                format!(
                    "Calls `{target}` with `{}` on each side of the {boundary} boundary.",
                    candidate.parameter
                ),
                details,
            );
            plan.setup = self.setup_for(callable);
            plan.steps = vec![self.step(callable, &inside), self.step(callable, &outside)];
            self.emit(&target, TestCategory::EdgeCase, plan, Vec::new());
        }
    }

    fn error_case(&mut self, callable: &CallableEntity) {
        if !callable.raises {
            return;
        }
        let target = callable.qualified_name();
        let (overrides, summary) = match values::failure_input(callable) {
            Some((param, value, pinned)) => {
                let hint = callable.parameter(&param).and_then(|p| p.type_hint.as_deref());
                let summary = format!(
                    "Asserts that `{target}` signals failure when `{param}` is `{}`.",
                    self.dialect.render(&value, hint)
                );
                let mut overrides = vec![(param, value)];
                overrides.extend(pinned);
                (overrides, summary)
            }
            None => (Vec::new(), format!("Asserts that `{target}` signals failure.")),
        };
        let mut plan = self.plan(
            words(&target_words(&target), &["signals", "failure"]),
            TestCategory::Error,
            summary,
            self.details(callable),
        );
        plan.setup = self.setup_for(callable);
        plan.steps = vec![self.step(callable, &overrides)];
        self.emit(&target, TestCategory::Error, plan, Vec::new());
    }

    fn mock_case(&mut self, callable: &CallableEntity) {
        if !self.options.include_mocks || !callable.has_external_call {
            return;
        }
        let target = callable.qualified_name();
        let dependencies: Vec<(String, String)> = callable
            .external_calls
            .iter()
            .take(MAX_MOCK_DEPENDENCIES)
            .map(|dep| (format!("mock_{}", slug(dep)), dep.clone()))
            .collect();
        let names: Vec<&str> = dependencies.iter().map(|(_, d)| d.as_str()).collect();
        let mut plan = self.plan(
            words(&target_words(&target), &["with", "mocked", "dependencies"]),
            TestCategory::Mock,
            format!(
                "Runs `{target}` with placeholders standing in for {}.",
                names.join(", ")
            ),
            self.details(callable),
        );
        plan.setup = self.setup_for(callable);
        plan.steps = vec![self.step(callable, &[])];
        let fixtures = dependencies.iter().map(|(f, _)| f.clone()).collect();
        plan.dependencies = dependencies;
        self.emit(&target, TestCategory::Mock, plan, fixtures);
    }

    fn performance_case(&mut self, callable: &CallableEntity) {
        let target = callable.qualified_name();
        if !self.options.include_performance || !self.risk.has_performance_finding(&target) {
            return;
        }
        let patterns: Vec<String> = self
            .risk
            .findings_for(&target)
            .filter_map(|f| match &f.kind {
                FindingKind::Performance(p) => Some(format!("{p:?}")),
                _ => None,
            })
            .collect();
        let mut plan = self.plan(
            words(&target_words(&target), &["performance"]),
            TestCategory::Performance,
            format!("Times `{target}`, flagged for {}.", patterns.join(", ")),
            self.details(callable),
        );
        plan.setup = self.setup_for(callable);
        let mut step = self.step(callable, &[]);
        step.binds_result = false;
        plan.steps = vec![step];
        self.emit(&target, TestCategory::Performance, plan, Vec::new());
    }

    fn integration_case(&mut self, entity: &TypeEntity) {
        if entity.members.len() < 2 {
            return;
        }
        let ir = self.ir;
        let members: Vec<&CallableEntity> = entity
            .members
            .iter()
            .filter_map(|m| ir.callable(&format!("{}.{m}", entity.name)))
            .take(MAX_INTEGRATION_STEPS)
            .collect();
        if members.len() < 2 {
            return;
        }

        let mut steps: Vec<Step> = members.iter().map(|m| self.step(m, &[])).collect();
        let last = steps.len() - 1;
        for step in &mut steps[..last] {
            step.binds_result = false;
        }
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        let mut plan = self.plan(
            vec![slug(&entity.name), "member".into(), "sequence".into()],
            TestCategory::Integration,
            format!(
                "Calls {} in sequence on one `{}` instance.",
                names.join(", "),
                entity.name
            ),
            vec![
                format!("Members exercised: {}", names.join(" -> ")),
                format!("Declared bases: {}", if entity.bases.is_empty() { "none".to_string() } else { entity.bases.join(", ") }),
            ],
        );
        if members.iter().any(|m| !m.is_static) {
            plan.setup = vec![self.instance_setup(&entity.name)];
        }
        plan.steps = steps;
        self.emit(&entity.name, TestCategory::Integration, plan, Vec::new());
    }

    fn run(mut self) -> Generated {
        let ir = self.ir;
        for callable in &ir.callables {
            if !self.scope.includes(&callable.qualified_name()) {
                continue;
            }
            if self.scope.allows(TestCategory::Unit) {
                self.unit(callable);
            }
            if self.scope.allows(TestCategory::EdgeCase) {
                self.edge_cases(callable);
            }
            if self.scope.allows(TestCategory::Error) {
                self.error_case(callable);
            }
            if self.scope.allows(TestCategory::Mock) {
                self.mock_case(callable);
            }
            if self.scope.allows(TestCategory::Performance) {
                self.performance_case(callable);
            }
        }
        if self.scope.allows(TestCategory::Integration) {
            for entity in &ir.types {
                if self.scope.includes(&entity.name) {
                    self.integration_case(entity);
                }
            }
        }
        self.out
    }
}

pub(crate) fn generate(
    ir: &Ir,
    risk: &RiskProfile,
    options: &SynthesisOptions,
    framework: &str,
    scope: &Scope,
) -> Generated {
    Generator {
        ir,
        risk,
        options,
        framework,
        dialect: Dialect::new(ir.language),
        scope,
        out: Generated::default(),
    }
    .run()
}

/// Synthesize a suite. Deterministic in its inputs: identical IR, profile
/// and options give identical cases and ids.
pub fn synthesize(ir: &Ir, risk: &RiskProfile, options: &SynthesisOptions) -> Suite {
    let framework = catalog::normalize_framework(ir.language, ir.framework.as_deref());
    let generated = generate(ir, risk, options, &framework, &Scope::default());

    let mut counters = IdCounters::default();
    let mut cases: IndexMap<String, TestCase> = IndexMap::new();
    for draft in generated.drafts {
        let case = draft.into_case(&mut counters);
        cases.insert(case.id.clone(), case);
    }
    let coverage = coverage::estimate_cases(ir, cases.values());
    info!(
        language = %ir.language,
        %framework,
        cases = cases.len(),
        gaps = generated.gaps.len(),
        coverage = coverage.percentage,
        "synthesized suite"
    );

    Suite {
        revision: 1,
        framework,
        options: options.clone(),
        ir: Arc::new(ir.clone()),
        risk: risk.clone(),
        cases,
        coverage,
        gaps: generated.gaps,
    }
}

/// Score the IR and synthesize a suite for it.
pub fn generate_suite(ir: &Ir, options: &SynthesisOptions) -> Suite {
    synthesize(ir, &risk::score(ir), options)
}
