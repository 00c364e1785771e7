//! Structural analyzer: raw source text to IR.
//!
//! Extraction is capability-polymorphic. Each language is served by a named
//! [`ExtractionStrategy`] held in a process-wide registry: a tree-sitter walk
//! where a grammar is linked in, ordered line patterns everywhere else. When
//! a tree cannot be built the analyzer degrades to the pattern strategy for
//! the same language and marks every callable as heuristic.

pub mod fallback;
pub mod filesystem;
pub mod grammar;
pub mod native;
pub mod parser;
pub mod pipeline;
pub mod quality;
pub mod signals;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

use tracing::{debug, warn};

use crate::errors::{ForgeError, ForgeResult};
use crate::models::{
    CallableEntity, Confidence, DecisionPoint, Ir, Language, Parameter, SourceUnit, TypeEntity,
    UnitMetrics,
};

// ---------------------------------------------------------------------------
// Strategy contract
// ---------------------------------------------------------------------------

/// A named way of turning one source unit into an IR.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn confidence(&self) -> Confidence;

    /// Extract an IR. `ForgeError::Parse` signals that the caller should
    /// degrade to pattern extraction.
    fn extract(&self, unit: &SourceUnit, language: Language) -> ForgeResult<Ir>;
}

struct StrategyRegistry {
    strategies: BTreeMap<Language, Box<dyn ExtractionStrategy>>,
}

impl StrategyRegistry {
    fn build() -> Self {
        let mut strategies: BTreeMap<Language, Box<dyn ExtractionStrategy>> = BTreeMap::new();
        for language in Language::ALL {
            if grammar::grammar_for(language).is_some() {
                strategies.insert(language, Box::new(native::TreeSitterStrategy));
            } else {
                strategies.insert(language, Box::new(fallback::PatternStrategy));
            }
        }
        Self { strategies }
    }
}

static REGISTRY: LazyLock<StrategyRegistry> = LazyLock::new(StrategyRegistry::build);

pub fn strategy_for(language: Language) -> Option<&'static dyn ExtractionStrategy> {
    REGISTRY.strategies.get(&language).map(|s| s.as_ref())
}

/// Analyze one source unit.
///
/// Fails only with `UnsupportedLanguage`. Parse failures are absorbed: the
/// result is built by the pattern strategy, flagged `degraded`, and carries
/// a diagnostic naming the failure.
pub fn analyze(unit: &SourceUnit) -> ForgeResult<Ir> {
    let language = Language::from_tag(&unit.language)
        .ok_or_else(|| ForgeError::UnsupportedLanguage(unit.language.trim().to_string()))?;
    let strategy = strategy_for(language)
        .ok_or_else(|| ForgeError::UnsupportedLanguage(language.to_string()))?;
    debug!(language = %language, strategy = strategy.name(), "analyzing source unit");

    match strategy.extract(unit, language) {
        Ok(ir) => Ok(ir),
        Err(ForgeError::Parse(reason)) => {
            warn!(language = %language, %reason, "native parse failed, using pattern fallback");
            let mut ir = fallback::PatternStrategy.extract(unit, language)?;
            ir.degraded = true;
            ir.strategy = format!("{}-fallback", ir.strategy);
            ir.diagnostics.insert(0, format!("parse error: {reason}"));
            Ok(ir)
        }
        Err(err) => Err(err),
    }
}

// ---------------------------------------------------------------------------
// Raw extraction shared by strategies
// ---------------------------------------------------------------------------

/// A call observed in a callable body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CallSite {
    pub name: String,
    /// Leftmost segment of the receiver chain (`os` in `os.path.join`).
    pub receiver: Option<String>,
    /// Whole receiver chain without its trailing separator (`self.items`
    /// in `self.items.pop()`), empty for bare calls.
    pub chain: String,
    /// Full dotted path as written, used to label external dependencies.
    pub path: String,
    /// Called on the result of another expression (`f(x).unwrap()`).
    pub derived: bool,
}

/// Line span of a loop body, with its nesting depth inside the callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LoopSpan {
    pub start: usize,
    pub end: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RawCallable {
    pub name: String,
    pub owner: Option<String>,
    pub is_static: bool,
    pub is_constructor: bool,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    /// Decorators or annotations preceding the definition.
    pub prelude: String,
    pub body: String,
    pub body_line: usize,
    pub line: usize,
    pub decisions: Vec<DecisionPoint>,
    pub loops: Vec<LoopSpan>,
    pub raises: bool,
    pub calls: Vec<CallSite>,
    /// Receiver variable bound by the definition itself (Go receivers).
    pub receiver_var: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RawType {
    pub name: String,
    pub bases: Vec<String>,
    /// Declared instance fields (Java, TypeScript and JavaScript classes).
    pub fields: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Extraction {
    pub callables: Vec<RawCallable>,
    pub types: Vec<RawType>,
}

/// Turn a raw extraction into an IR: drop duplicate definitions, fold
/// constructors into their types, derive flags and body signals.
pub(crate) fn assemble(
    unit: &SourceUnit,
    language: Language,
    strategy: &str,
    confidence: Confidence,
    extraction: Extraction,
) -> Ir {
    let mut diagnostics = Vec::new();
    let mut seen: HashSet<(Option<String>, String)> = HashSet::new();
    let mut constructors: BTreeMap<String, Vec<Parameter>> = BTreeMap::new();
    let mut kept: Vec<RawCallable> = Vec::new();

    for raw in extraction.callables {
        if raw.is_constructor {
            if let Some(owner) = &raw.owner {
                constructors
                    .entry(owner.clone())
                    .or_insert_with(|| raw.parameters.clone());
            }
            continue;
        }
        let key = (raw.owner.clone(), raw.name.clone());
        if !seen.insert(key) {
            diagnostics.push(format!(
                "duplicate definition of `{}` at line {} ignored",
                qualified(&raw.owner, &raw.name),
                raw.line
            ));
            continue;
        }
        kept.push(raw);
    }

    let mut local_definitions: BTreeSet<String> = kept.iter().map(|c| c.name.clone()).collect();
    local_definitions.extend(extraction.types.iter().map(|t| t.name.clone()));

    let mut fields: BTreeMap<&str, &[String]> = BTreeMap::new();
    for raw in &extraction.types {
        fields.entry(raw.name.as_str()).or_insert(raw.fields.as_slice());
    }

    let callables: Vec<CallableEntity> = kept
        .iter()
        .map(|raw| {
            let owner_fields = raw
                .owner
                .as_deref()
                .and_then(|owner| fields.get(owner).copied())
                .unwrap_or_default();
            let mut callable =
                build_callable(raw, language, confidence, &local_definitions, owner_fields);
            callable.signals.documented =
                quality::is_documented(&unit.text, language, raw.line, raw.body_line);
            callable
        })
        .collect();

    let mut types: Vec<TypeEntity> = Vec::new();
    let mut type_names: HashSet<String> = HashSet::new();
    for raw in &extraction.types {
        if !type_names.insert(raw.name.clone()) {
            diagnostics.push(format!(
                "duplicate type `{}` at line {} ignored",
                raw.name, raw.line
            ));
            continue;
        }
        types.push(TypeEntity {
            name: raw.name.clone(),
            members: Vec::new(),
            bases: raw.bases.clone(),
            constructor: constructors.get(&raw.name).cloned().unwrap_or_default(),
            line: raw.line,
        });
    }
    // Methods can be declared away from their type (Go receivers, C++
    // out-of-class definitions, Rust impl blocks).
    for callable in &callables {
        let Some(owner) = &callable.owner else {
            continue;
        };
        if !type_names.contains(owner) {
            type_names.insert(owner.clone());
            types.push(TypeEntity {
                name: owner.clone(),
                members: Vec::new(),
                bases: Vec::new(),
                constructor: constructors.get(owner).cloned().unwrap_or_default(),
                line: callable.line,
            });
        }
        if let Some(entity) = types.iter_mut().find(|t| &t.name == owner) {
            entity.members.push(callable.name.clone());
        }
    }

    let metrics = UnitMetrics {
        lines_of_code: signals::lines_of_code(&unit.text, language),
        max_nesting_depth: signals::nesting_depth(&unit.text, language),
        unused_imports: quality::unused_imports(&unit.text, language),
        long_lines: quality::long_lines(&unit.text),
        magic_numbers: quality::magic_numbers(&unit.text, language),
    };

    Ir {
        language,
        framework: unit
            .framework
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string),
        strategy: strategy.to_string(),
        degraded: false,
        callables,
        types,
        metrics,
        diagnostics,
    }
}

fn qualified(owner: &Option<String>, name: &str) -> String {
    match owner {
        Some(owner) => format!("{owner}.{name}"),
        None => name.to_string(),
    }
}

fn build_callable(
    raw: &RawCallable,
    language: Language,
    confidence: Confidence,
    local_definitions: &BTreeSet<String>,
    owner_fields: &[String],
) -> CallableEntity {
    let body_signals = signals::scan(&signals::BodyView {
        language,
        text: &raw.body,
        prelude: &raw.prelude,
        first_line: raw.body_line,
        parameters: &raw.parameters,
        loops: &raw.loops,
    });

    let mut locals = signals::local_names(&raw.body, language);
    locals.extend(raw.parameters.iter().map(|p| p.name.clone()));
    if let Some(receiver) = &raw.receiver_var {
        locals.insert(receiver.clone());
    }
    if let Some(owner) = &raw.owner {
        locals.insert(owner.clone());
    }
    locals.extend(owner_fields.iter().cloned());

    let has_recursion = raw.calls.iter().any(|call| calls_itself(raw, call, language));

    let mut external_calls: Vec<String> = Vec::new();
    for call in &raw.calls {
        if signals::is_external(call, language, &locals, local_definitions)
            && !external_calls.contains(&call.path)
        {
            external_calls.push(call.path.clone());
        }
    }

    let mut decision_points = raw.decisions.clone();
    decision_points.sort_by_key(|point| point.line);

    CallableEntity {
        name: raw.name.clone(),
        owner: raw.owner.clone(),
        is_static: raw.is_static,
        parameters: raw.parameters.clone(),
        return_type: raw.return_type.clone(),
        complexity: decision_points.len() as u32 + 1,
        decision_points,
        raises: raw.raises,
        has_loop: !raw.loops.is_empty(),
        has_recursion,
        has_external_call: !external_calls.is_empty(),
        external_calls,
        signals: body_signals,
        confidence,
        line: raw.line,
    }
}

/// A call re-enters its own callable only when nothing but the callable's
/// own instance or type sits in front of it. `self.items.pop()` inside
/// `pop` names a different method.
fn calls_itself(raw: &RawCallable, call: &CallSite, language: Language) -> bool {
    if call.name != raw.name || call.derived {
        return false;
    }
    if call.chain.is_empty() {
        // A bare name inside a Python method resolves to module scope.
        return !(language == Language::Python && raw.owner.is_some());
    }
    let chain = call.chain.as_str();
    matches!(chain, "self" | "this" | "Self" | "cls")
        || raw.receiver_var.as_deref() == Some(chain)
        || raw.owner.as_deref() == Some(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DecisionKind;

    fn callable<'a>(ir: &'a Ir, name: &str) -> &'a CallableEntity {
        ir.callables
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("no callable named {name}"))
    }

    #[test]
    fn test_unknown_language_is_unsupported() {
        let unit = SourceUnit::new("def f(): pass", "unknown-lang");
        match analyze(&unit) {
            Err(ForgeError::UnsupportedLanguage(tag)) => assert_eq!(tag, "unknown-lang"),
            other => panic!("expected UnsupportedLanguage, got {other:?}"),
        }
    }

    #[test]
    fn test_every_language_has_a_strategy() {
        for language in Language::ALL {
            assert!(strategy_for(language).is_some(), "{language} has no strategy");
        }
        assert_eq!(strategy_for(Language::Python).map(|s| s.name()), Some("tree-sitter"));
        assert_eq!(strategy_for(Language::Rust).map(|s| s.name()), Some("pattern"));
    }

    #[test]
    fn test_analyze_is_deterministic() {
        let src = "\
def divide(a: float, b: float) -> float:
    if b == 0:
        raise ValueError(\"b must not be zero\")
    return a / b
";
        let unit = SourceUnit::new(src, "python");
        let first = analyze(&unit).unwrap();
        let second = analyze(&unit).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_error_degrades_to_heuristic() {
        let src = "\
def broken(a, b:
    if a > b:
        return a
    return b
";
        let ir = analyze(&SourceUnit::new(src, "python")).unwrap();
        assert!(ir.degraded);
        assert!(ir.strategy.ends_with("-fallback"));
        assert!(ir.diagnostics[0].starts_with("parse error"));
        assert!(ir
            .callables
            .iter()
            .all(|c| c.confidence == Confidence::Heuristic));
    }

    #[test]
    fn test_assemble_keeps_first_duplicate_and_folds_constructor() {
        let raw = |name: &str, line: usize| RawCallable {
            name: name.to_string(),
            owner: Some("Box".to_string()),
            line,
            ..RawCallable::default()
        };
        let mut ctor = raw("__init__", 1);
        ctor.is_constructor = true;
        ctor.parameters = vec![Parameter::new("size", Some("int"))];
        let mut first = raw("open", 2);
        first.decisions.push(DecisionPoint {
            kind: DecisionKind::Branch,
            comparison: None,
            line: 3,
        });
        let extraction = Extraction {
            callables: vec![ctor, first, raw("open", 9), raw("close", 12)],
            types: vec![RawType {
                name: "Box".to_string(),
                bases: vec![],
                fields: vec![],
                line: 1,
            }],
        };
        let unit = SourceUnit::new("", "python");
        let ir = assemble(
            &unit,
            Language::Python,
            "test",
            Confidence::Structural,
            extraction,
        );

        assert_eq!(ir.callables.len(), 2);
        assert_eq!(ir.callables[0].line, 2);
        assert_eq!(ir.callables[0].complexity, 2);
        assert_eq!(ir.types[0].members, vec!["open", "close"]);
        assert_eq!(ir.types[0].constructor[0].name, "size");
        assert!(ir.diagnostics[0].contains("Box.open"));
    }

    #[test]
    fn test_python_container_methods_are_not_recursive() {
        let src = "\
class Stack:
    def __init__(self):
        self.items = []

    def push(self, item):
        self.items.append(item)

    def pop(self):
        return self.items.pop()

    def walk(self, node):
        if node is None:
            return 0
        return 1 + self.walk(node.next)
";
        let ir = analyze(&SourceUnit::new(src, "python")).unwrap();
        assert!(!callable(&ir, "pop").has_recursion);
        assert!(!callable(&ir, "push").has_recursion);
        assert!(callable(&ir, "walk").has_recursion);
    }

    #[test]
    fn test_javascript_member_chain_is_not_recursive() {
        let src = "\
class Stack {
  constructor() {
    this.items = [];
  }

  push(item) {
    this.items.push(item);
  }

  depth(node) {
    if (!node) {
      return 0;
    }
    return 1 + this.depth(node.next);
  }
}
";
        let ir = analyze(&SourceUnit::new(src, "javascript")).unwrap();
        assert!(!callable(&ir, "push").has_recursion);
        assert!(callable(&ir, "depth").has_recursion);
    }

    #[test]
    fn test_go_field_method_is_not_recursive() {
        let src = "\
package store

type Store struct {
\tf *File
}

func (s *Store) Close() error {
\treturn s.f.Close()
}

func (s *Store) Flush() error {
\treturn s.Flush()
}
";
        let ir = analyze(&SourceUnit::new(src, "go")).unwrap();
        assert!(!callable(&ir, "Close").has_recursion);
        assert!(callable(&ir, "Flush").has_recursion);
    }

    #[test]
    fn test_rust_delegating_len_is_not_recursive() {
        let src = "\
pub struct Stack {
    items: Vec<i32>,
}

impl Stack {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn depth(&self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        self.depth(n - 1) + 1
    }
}

pub fn count(v: &Vec<i32>) -> usize {
    v.len()
}
";
        let ir = analyze(&SourceUnit::new(src, "rust")).unwrap();
        assert!(!callable(&ir, "len").has_recursion);
        assert!(!callable(&ir, "count").has_recursion);
        assert!(callable(&ir, "depth").has_recursion);
    }

    #[test]
    fn test_recursion_requires_own_receiver() {
        let call = |chain: &str, derived: bool| CallSite {
            name: "len".to_string(),
            receiver: chain.split('.').next().filter(|s| !s.is_empty()).map(str::to_string),
            chain: chain.to_string(),
            path: format!("{chain}.len"),
            derived,
        };
        let raw = RawCallable {
            name: "len".to_string(),
            owner: Some("Queue".to_string()),
            receiver_var: Some("q".to_string()),
            ..RawCallable::default()
        };
        assert!(calls_itself(&raw, &call("q", false), Language::Go));
        assert!(calls_itself(&raw, &call("this", false), Language::Java));
        assert!(!calls_itself(&raw, &call("q.items", false), Language::Go));
        assert!(!calls_itself(&raw, &call("q", true), Language::Go));
        assert!(!calls_itself(&raw, &call("other", false), Language::Go));
    }
}
