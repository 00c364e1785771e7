//! Tree-sitter extraction: walk definitions at module and class scope, then
//! scan each callable body for decisions, loops, raises and calls.

use tree_sitter::Node;

use crate::analyzer::grammar::{grammar_for, Grammar, RELATIONAL_OPERATORS};
use crate::analyzer::parser::parse_source;
use crate::analyzer::signals::{call_site, normalize_comparison, split_bases};
use crate::analyzer::{
    assemble, CallSite, Extraction, ExtractionStrategy, LoopSpan, RawCallable, RawType,
};
use crate::errors::{ForgeError, ForgeResult};
use crate::models::{
    Comparison, Confidence, DecisionKind, DecisionPoint, Ir, Language, Parameter, SourceUnit,
};

pub struct TreeSitterStrategy;

impl ExtractionStrategy for TreeSitterStrategy {
    fn name(&self) -> &'static str {
        "tree-sitter"
    }

    fn confidence(&self) -> Confidence {
        Confidence::Structural
    }

    fn extract(&self, unit: &SourceUnit, language: Language) -> ForgeResult<Ir> {
        let grammar = grammar_for(language)
            .ok_or_else(|| ForgeError::Parse(format!("No tree-sitter grammar for: {language}")))?;
        let tree = parse_source(&unit.text, language)?;
        let mut walker = Walker {
            grammar,
            source: unit.text.as_bytes(),
            extraction: Extraction::default(),
        };
        walker.visit_scope(tree.root_node(), None);
        Ok(assemble(
            unit,
            language,
            self.name(),
            self.confidence(),
            walker.extraction,
        ))
    }
}

#[derive(Default)]
struct BodyScan {
    decisions: Vec<DecisionPoint>,
    loops: Vec<LoopSpan>,
    raises: bool,
    calls: Vec<CallSite>,
}

struct Walker<'a> {
    grammar: &'static Grammar,
    source: &'a [u8],
    extraction: Extraction,
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn all_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn strip_annotation(text: &str) -> String {
    text.trim().trim_start_matches(':').trim().to_string()
}

impl<'a> Walker<'a> {
    fn text(&self, node: Node<'_>) -> &'a str {
        let source: &'a [u8] = self.source;
        std::str::from_utf8(&source[node.start_byte()..node.end_byte()]).unwrap_or("")
    }

    fn field_text(&self, node: Node<'_>, field: &str) -> Option<&'a str> {
        node.child_by_field_name(field).map(|child| self.text(child))
    }

    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    fn visit_scope(&mut self, node: Node<'_>, owner: Option<&str>) {
        for child in named_children(node) {
            self.visit_item(child, owner, "");
        }
    }

    fn visit_item(&mut self, node: Node<'_>, owner: Option<&str>, prelude: &str) {
        let kind = node.kind();
        let grammar = self.grammar;
        if grammar.wrapper_kinds.contains(&kind) {
            let decorators: Vec<&str> = named_children(node)
                .into_iter()
                .filter(|child| child.kind() == "decorator")
                .map(|child| self.text(child))
                .collect();
            let inner = node
                .child_by_field_name("definition")
                .or_else(|| node.child_by_field_name("declaration"));
            if let Some(inner) = inner {
                self.visit_item(inner, owner, &decorators.join("\n"));
            }
        } else if grammar.class_kinds.contains(&kind) {
            self.visit_class(node);
        } else if grammar.function_kinds.contains(&kind) {
            if let Some(name) = self.field_text(node, "name") {
                self.add_function(name, node, node, owner, prelude);
            }
        } else if grammar.binding_kinds.contains(&kind) {
            for declarator in named_children(node) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                let name = self.field_text(declarator, "name");
                let value = declarator.child_by_field_name("value");
                if let (Some(name), Some(value)) = (name, value) {
                    if grammar.function_value_kinds.contains(&value.kind()) {
                        self.add_function(name, value, node, owner, prelude);
                    }
                }
            }
        } else if matches!(kind, "field_definition" | "public_field_definition") {
            let name = self
                .field_text(node, "property")
                .or_else(|| self.field_text(node, "name"));
            let value = node.child_by_field_name("value");
            if let (Some(name), Some(value)) = (name, value) {
                if grammar.function_value_kinds.contains(&value.kind()) {
                    self.add_function(name, value, node, owner, prelude);
                }
            }
        } else if kind == "enum_body_declarations" {
            self.visit_scope(node, owner);
        }
    }

    fn visit_class(&mut self, node: Node<'_>) {
        if self.grammar.language == Language::Go {
            for spec in named_children(node) {
                if spec.kind() != "type_spec" {
                    continue;
                }
                if let Some(name) = self.field_text(spec, "name") {
                    self.extraction.types.push(RawType {
                        name: name.to_string(),
                        bases: Vec::new(),
                        fields: Vec::new(),
                        line: line_of(spec),
                    });
                }
            }
            return;
        }

        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let mut bases = Vec::new();
        for field in ["superclasses", "superclass", "interfaces"] {
            if let Some(text) = self.field_text(node, field) {
                bases.extend(split_bases(text));
            }
        }
        for child in named_children(node) {
            if matches!(child.kind(), "class_heritage" | "extends_interfaces") {
                bases.extend(split_bases(self.text(child)));
            }
        }
        let body = node.child_by_field_name("body");
        self.extraction.types.push(RawType {
            name: name.to_string(),
            bases,
            fields: body.map(|body| self.declared_fields(body)).unwrap_or_default(),
            line: line_of(node),
        });
        if let Some(body) = body {
            self.visit_scope(body, Some(name));
        }
    }

    /// Instance fields a class body declares. Java and TypeScript methods
    /// reach them without a `this.` prefix.
    fn declared_fields(&self, body: Node<'_>) -> Vec<String> {
        let mut fields = Vec::new();
        for member in named_children(body) {
            match member.kind() {
                "field_declaration" => {
                    for declarator in named_children(member) {
                        if declarator.kind() != "variable_declarator" {
                            continue;
                        }
                        if let Some(name) = self.field_text(declarator, "name") {
                            fields.push(name.to_string());
                        }
                    }
                }
                "public_field_definition" | "field_definition" => {
                    if let Some(name) = self
                        .field_text(member, "name")
                        .or_else(|| self.field_text(member, "property"))
                    {
                        fields.push(name.to_string());
                    }
                }
                _ => {}
            }
        }
        fields
    }

    /// `definition` carries parameters and body; `anchor` is the statement
    /// that introduces the name (same node except for bound function values).
    fn add_function(
        &mut self,
        name: &str,
        definition: Node<'_>,
        anchor: Node<'_>,
        owner: Option<&str>,
        prelude: &str,
    ) {
        let Some(body) = definition.child_by_field_name("body") else {
            return;
        };
        let mut owner = owner.map(str::to_string);
        let mut receiver_var = None;
        if let Some(receiver) = definition.child_by_field_name("receiver") {
            if let Some(decl) = named_children(receiver)
                .into_iter()
                .find(|c| c.kind() == "parameter_declaration")
            {
                receiver_var = self.field_text(decl, "name").map(str::to_string);
                owner = self.field_text(decl, "type").map(|ty| {
                    let ty = ty.trim_start_matches('*');
                    ty.split('[').next().unwrap_or(ty).trim().to_string()
                });
            }
        }

        let mut prelude = prelude.to_string();
        let mut is_static = false;
        let mut declares_throws = false;
        for child in all_children(definition) {
            match child.kind() {
                "static" => is_static = true,
                "modifiers" => {
                    let text = self.text(child);
                    is_static |= text.split_whitespace().any(|word| word == "static");
                    if !prelude.is_empty() {
                        prelude.push('\n');
                    }
                    prelude.push_str(text);
                }
                "throws" => declares_throws = true,
                _ => {}
            }
        }
        if prelude.contains("@staticmethod") || prelude.contains("@classmethod") {
            is_static = true;
        }

        let is_constructor = definition.kind() == "constructor_declaration"
            || (owner.is_some() && matches!(name, "__init__" | "constructor"));

        let parameters = match definition.child_by_field_name("parameters") {
            Some(list) => self.parameters(list),
            None => definition
                .child_by_field_name("parameter")
                .map(|single| vec![Parameter::new(self.text(single), None)])
                .unwrap_or_default(),
        };

        let return_type = ["return_type", "result", "type"]
            .iter()
            .find_map(|field| self.field_text(definition, field))
            .map(strip_annotation)
            .filter(|ty| !ty.is_empty());

        let mut scan = BodyScan::default();
        self.scan_node(body, 0, &parameters, &mut scan);

        self.extraction.callables.push(RawCallable {
            name: name.to_string(),
            owner,
            is_static,
            is_constructor,
            parameters,
            return_type,
            prelude,
            body: self.text(body).to_string(),
            body_line: line_of(body),
            line: line_of(anchor),
            decisions: scan.decisions,
            loops: scan.loops,
            raises: scan.raises || declares_throws,
            calls: scan.calls,
            receiver_var,
        });
    }

    fn parameters(&self, list: Node<'_>) -> Vec<Parameter> {
        let mut out = Vec::new();
        for child in named_children(list) {
            match child.kind() {
                // Python
                "identifier" => out.push(Parameter::new(self.text(child), None)),
                "typed_parameter" => {
                    let name = named_children(child)
                        .into_iter()
                        .find(|c| c.kind() == "identifier")
                        .map(|c| self.text(c));
                    if let Some(name) = name {
                        out.push(Parameter::new(name, self.field_text(child, "type")));
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    if let Some(name) = self.field_text(child, "name") {
                        let mut param = Parameter::new(name, self.field_text(child, "type"));
                        param.default = self.field_text(child, "value").map(str::to_string);
                        out.push(param);
                    }
                }
                // Java
                "formal_parameter" => {
                    if let Some(name) = self.field_text(child, "name") {
                        out.push(Parameter::new(name, self.field_text(child, "type")));
                    }
                }
                // JavaScript
                "assignment_pattern" => {
                    if let Some(name) = self.field_text(child, "left") {
                        let mut param = Parameter::new(name, None);
                        param.default = self.field_text(child, "right").map(str::to_string);
                        out.push(param);
                    }
                }
                // TypeScript
                "required_parameter" | "optional_parameter" => {
                    let Some(name) = self.field_text(child, "pattern") else {
                        continue;
                    };
                    let hint = self.field_text(child, "type").map(strip_annotation);
                    let mut param = Parameter::new(name, hint.as_deref());
                    param.default = self.field_text(child, "value").map(str::to_string);
                    if child.kind() == "optional_parameter" && param.default.is_none() {
                        param.default = Some("undefined".to_string());
                    }
                    out.push(param);
                }
                // Go
                "parameter_declaration" | "variadic_parameter_declaration" => {
                    let hint = self.field_text(child, "type");
                    for name in named_children(child)
                        .into_iter()
                        .filter(|c| c.kind() == "identifier")
                    {
                        out.push(Parameter::new(self.text(name), hint));
                    }
                }
                _ => {}
            }
        }
        out.retain(|p| !matches!(p.name.as_str(), "self" | "cls"));
        out
    }

    // -----------------------------------------------------------------------
    // Bodies
    // -----------------------------------------------------------------------

    fn scan_node(&self, node: Node<'_>, depth: usize, parameters: &[Parameter], out: &mut BodyScan) {
        let kind = node.kind();
        let line = line_of(node);
        let mut child_depth = depth;

        if let Some(decision) = self.grammar.decision_kind(kind) {
            let is_default_label =
                kind == "switch_label" && self.text(node).trim_start().starts_with("default");
            if !is_default_label {
                let comparison = match decision {
                    DecisionKind::Branch | DecisionKind::Loop | DecisionKind::Conditional => {
                        self.condition_of(node)
                            .and_then(|cond| self.first_comparison(cond, parameters))
                    }
                    _ => None,
                };
                out.decisions.push(DecisionPoint {
                    kind: decision,
                    comparison,
                    line,
                });
            }
            if decision == DecisionKind::Loop {
                child_depth += 1;
                out.loops.push(LoopSpan {
                    start: line,
                    end: node.end_position().row + 1,
                    depth: child_depth,
                });
            }
        }

        if self.grammar.operator_kinds.contains(&kind) {
            let operator = self.field_text(node, "operator").unwrap_or("");
            if self.grammar.boolean_operators.contains(&operator) {
                let comparison = node
                    .child_by_field_name("right")
                    .and_then(|right| self.first_comparison(right, parameters));
                out.decisions.push(DecisionPoint {
                    kind: DecisionKind::Boolean,
                    comparison,
                    line,
                });
            }
        }

        if self.grammar.raise_kinds.contains(&kind) {
            out.raises = true;
        }

        if self.grammar.call_kinds.contains(&kind) {
            if let Some(site) = self.call_site(node) {
                if matches!(site.path.as_str(), "panic" | "errors.New" | "fmt.Errorf") {
                    out.raises = true;
                }
                out.calls.push(site);
            }
        }

        for child in named_children(node) {
            self.scan_node(child, child_depth, parameters, out);
        }
    }

    /// The expression a decision node tests, if it has one.
    fn condition_of<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        if let Some(condition) = node.child_by_field_name("condition") {
            return Some(condition);
        }
        for child in named_children(node) {
            match child.kind() {
                "for_clause" => return child.child_by_field_name("condition"),
                "binary_expression" => return Some(child),
                _ => {}
            }
        }
        match node.kind() {
            "conditional_expression" | "if_clause" => Some(node),
            _ => None,
        }
    }

    fn first_comparison(&self, node: Node<'_>, parameters: &[Parameter]) -> Option<Comparison> {
        let kind = node.kind();
        if kind == "comparison_operator" || self.grammar.operator_kinds.contains(&kind) {
            if let Some(comparison) = self.comparison_at(node, parameters) {
                return Some(comparison);
            }
        }
        named_children(node)
            .into_iter()
            .find_map(|child| self.first_comparison(child, parameters))
    }

    fn comparison_at(&self, node: Node<'_>, parameters: &[Parameter]) -> Option<Comparison> {
        let children = all_children(node);
        let mut operands = children.iter().filter(|c| c.is_named());
        let left = operands.next()?;
        let right = operands.next()?;
        let operator = children
            .iter()
            .filter(|c| {
                !c.is_named()
                    && c.start_byte() >= left.end_byte()
                    && c.end_byte() <= right.start_byte()
            })
            .map(|c| self.text(*c))
            .collect::<Vec<_>>()
            .join(" ");
        if !RELATIONAL_OPERATORS.contains(&operator.as_str()) {
            return None;
        }
        Some(normalize_comparison(
            self.text(*left),
            &operator,
            self.text(*right),
            parameters,
        ))
    }

    fn call_site(&self, node: Node<'_>) -> Option<CallSite> {
        // Java: `object.name(args)`
        if node.kind() == "method_invocation" {
            let name = self.field_text(node, "name")?;
            let chain = self
                .field_text(node, "object")
                .map(|object| format!("{object}."))
                .unwrap_or_default();
            return Some(call_site(&chain, name));
        }

        let callee = node.child_by_field_name("function")?;
        if callee.kind() == "identifier" {
            return Some(call_site("", self.text(callee)));
        }
        if self.grammar.member_kinds.contains(&callee.kind()) {
            let object = ["object", "operand"]
                .iter()
                .find_map(|field| self.field_text(callee, field))?;
            let name = ["attribute", "property", "field"]
                .iter()
                .find_map(|field| self.field_text(callee, field))?;
            let chain: String = object.split_whitespace().collect::<Vec<_>>().join("");
            return Some(call_site(&format!("{chain}."), name));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(src: &str, language: &str) -> Ir {
        let unit = SourceUnit::new(src, language);
        let language = Language::from_tag(language).unwrap();
        TreeSitterStrategy.extract(&unit, language).unwrap()
    }

    #[test]
    fn test_python_function_with_guard() {
        let ir = extract(
            "def divide(a: float, b: float) -> float:\n    if b == 0:\n        raise ValueError(\"zero\")\n    return a / b\n",
            "python",
        );
        let divide = ir.callable("divide").unwrap();
        assert_eq!(divide.parameters.len(), 2);
        assert_eq!(divide.parameters[1].type_hint.as_deref(), Some("float"));
        assert_eq!(divide.return_type.as_deref(), Some("float"));
        assert!(divide.raises);
        assert_eq!(divide.complexity, 2);
        let comparison = divide.decision_points[0].comparison.as_ref().unwrap();
        assert_eq!((comparison.subject.as_str(), comparison.operator.as_str()), ("b", "=="));
        assert_eq!(comparison.operand, "0");
        assert!(!divide.has_external_call);
        assert_eq!(divide.confidence, Confidence::Structural);
    }

    #[test]
    fn test_python_class_members_and_constructor() {
        let src = "\
class Account(Base):
    def __init__(self, owner: str, balance: int = 0):
        self.owner = owner
        self.balance = balance

    def deposit(self, amount: int) -> int:
        if amount <= 0 or amount > 10000:
            raise ValueError(\"bad amount\")
        self.balance += amount
        return self.balance

    @staticmethod
    def currency() -> str:
        return \"EUR\"
";
        let ir = extract(src, "python");
        let account = ir.type_entity("Account").unwrap();
        assert_eq!(account.bases, vec!["Base"]);
        assert_eq!(account.members, vec!["deposit", "currency"]);
        assert_eq!(account.constructor.len(), 2);
        assert_eq!(account.constructor[1].default.as_deref(), Some("0"));

        let deposit = ir.callable("Account.deposit").unwrap();
        assert_eq!(deposit.parameters.len(), 1);
        assert_eq!(deposit.complexity, 3);
        assert!(ir.callable("Account.currency").unwrap().is_static);
    }

    #[test]
    fn test_java_methods_calls_and_loops() {
        let src = "\
public class OrderService {
    public int total(int[] prices, int limit) throws IllegalStateException {
        int sum = 0;
        for (int i = 0; i < prices.length; i++) {
            if (prices[i] > limit && limit != 0) {
                break;
            }
            sum += prices[i];
        }
        repository.save(sum);
        return sum;
    }

    public static int twice(int x) {
        return helper(x) * 2;
    }
}
";
        let ir = extract(src, "java");
        let total = ir.callable("OrderService.total").unwrap();
        assert!(total.raises);
        assert!(total.has_loop);
        // for, if, &&
        assert_eq!(total.complexity, 4);
        assert_eq!(total.external_calls, vec!["repository.save"]);
        assert_eq!(total.signals.max_loop_depth, 1);

        let twice = ir.callable("OrderService.twice").unwrap();
        assert!(twice.is_static);
        assert!(!twice.has_external_call);
    }

    #[test]
    fn test_java_declared_fields_are_not_external() {
        let src = "\
public class Basket {
    private final List<Integer> items = new ArrayList<>();

    public void add(int x) {
        items.add(x);
    }

    public int total() {
        return gateway.price(items.size());
    }
}
";
        let ir = extract(src, "java");
        let add = ir.callable("Basket.add").unwrap();
        assert!(!add.has_external_call);
        assert!(!add.has_recursion);
        let total = ir.callable("Basket.total").unwrap();
        assert_eq!(total.external_calls, vec!["gateway.price"]);

        let suite = crate::synthesis::generate_suite(&ir, &crate::models::SynthesisOptions::default());
        assert_eq!(suite.count("Basket.add", crate::models::TestCategory::Mock), 0);
    }

    #[test]
    fn test_javascript_chained_call_is_attributed_to_head() {
        let ir = extract(
            "function load(url) {\n  return fetch(url).then(parse).catch(report);\n}\n",
            "javascript",
        );
        let load = ir.callable("load").unwrap();
        assert_eq!(load.external_calls, vec!["fetch"]);
    }

    #[test]
    fn test_typescript_bindings_and_optional_parameters() {
        let src = "\
export const clamp = (value: number, max?: number): number => {
  if (max !== undefined && value > max) {
    return max;
  }
  return value;
};

export class Cache {
  static create(size: number): Cache {
    return new Cache();
  }
}
";
        let ir = extract(src, "typescript");
        let clamp = ir.callable("clamp").unwrap();
        assert_eq!(clamp.parameters[0].type_hint.as_deref(), Some("number"));
        assert!(clamp.parameters[1].is_nullable());
        assert_eq!(clamp.return_type.as_deref(), Some("number"));
        assert!(ir.callable("Cache.create").unwrap().is_static);
    }

    #[test]
    fn test_javascript_recursion() {
        let ir = extract(
            "function fact(n) {\n  if (n <= 1) return 1;\n  return n * fact(n - 1);\n}\n",
            "javascript",
        );
        let fact = ir.callable("fact").unwrap();
        assert!(fact.has_recursion);
        assert!(!fact.signals.memoized);
    }

    #[test]
    fn test_go_receiver_methods() {
        let src = "\
package store

type Store struct {
\titems map[string]int
}

func (s *Store) Get(key string) int {
\tif key == \"\" {
\t\tpanic(\"empty key\")
\t}
\treturn s.items[key]
}
";
        let ir = extract(src, "go");
        let get = ir.callable("Store.Get").unwrap();
        assert_eq!(get.owner.as_deref(), Some("Store"));
        assert!(get.raises);
        assert!(!get.has_external_call);
        assert_eq!(ir.type_entity("Store").unwrap().members, vec!["Get"]);
    }
}
