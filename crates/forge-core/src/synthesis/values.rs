//! Input values for synthesized cases: semantic types read from parameter
//! declarations, representative rows, and boundary pairs derived from
//! comparisons.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{CallableEntity, Comparison, Parameter};

static LEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:len\((\w+)\)|(\w+)\.(?:length|size\(\)|len\(\)|Count|count\(\)|Length))$",
    )
    .unwrap()
});

/// A literal value, rendered per language by the dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    /// Kept as text so values stay comparable; always has a decimal point.
    Float(String),
    Str(String),
    Bool(bool),
    Null,
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
    /// A literal token taken verbatim from source or a directive.
    Raw(String),
    /// The zero value of the declared type.
    Zero,
    /// Some non-null instance of the declared type.
    Present,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    Integer,
    Float,
    Text,
    Boolean,
    Collection,
    Mapping,
    Opaque,
}

fn from_hint(hint: &str) -> Option<SemanticType> {
    let lower = hint.trim().to_lowercase();
    let base = lower
        .trim_start_matches("optional[")
        .trim_start_matches("option<")
        .trim_start_matches('*')
        .trim_start_matches('&')
        .trim_start_matches("mut ")
        .trim_start_matches("const ")
        .trim_end_matches([']', '>']);
    let semantic = if base.starts_with("[]")
        || base.starts_with("list")
        || base.starts_with("vec")
        || base.starts_with("sequence")
        || base.starts_with("iterable")
        || base.starts_with("set")
        || base.starts_with("tuple")
        || base.starts_with("array")
        || base.starts_with("std::vector")
        || base.starts_with("ienumerable")
        || base.ends_with("[]")
    {
        SemanticType::Collection
    } else if base.starts_with("dict")
        || base.starts_with("map")
        || base.starts_with("hashmap")
        || base.starts_with("btreemap")
        || base.starts_with("record<")
        || base.starts_with("std::map")
        || base.starts_with("std::unordered_map")
        || base.starts_with("dictionary")
        || base.starts_with("mapping")
    {
        SemanticType::Mapping
    } else if matches!(base, "bool" | "boolean") {
        SemanticType::Boolean
    } else if base.starts_with("float")
        || base.starts_with("double")
        || base.starts_with("decimal")
        || base == "f32"
        || base == "f64"
    {
        SemanticType::Float
    } else if (base.starts_with("int") && !base.starts_with("interface"))
        || base.starts_with("uint")
        || base.starts_with("long")
        || base.starts_with("short")
        || base.starts_with("size_t")
        || base == "number"
        || base == "bigint"
        || base == "byte"
        || base == "usize"
        || base == "isize"
        || (base.len() <= 4
            && (base.starts_with('i') || base.starts_with('u'))
            && base[1..].chars().all(|c| c.is_ascii_digit())
            && base.len() > 1)
    {
        SemanticType::Integer
    } else if base.starts_with("str")
        || base.starts_with("std::string")
        || base == "char"
        || base == "rune"
        || base.ends_with("str")
    {
        SemanticType::Text
    } else {
        return None;
    };
    Some(semantic)
}

fn from_default(default: &str) -> Option<SemanticType> {
    let text = default.trim();
    let semantic = if text.parse::<i64>().is_ok() {
        SemanticType::Integer
    } else if text.parse::<f64>().is_ok() {
        SemanticType::Float
    } else if text.starts_with(['"', '\'']) {
        SemanticType::Text
    } else if matches!(text, "True" | "False" | "true" | "false") {
        SemanticType::Boolean
    } else if text.starts_with('[') {
        SemanticType::Collection
    } else if text.starts_with('{') {
        SemanticType::Mapping
    } else {
        return None;
    };
    Some(semantic)
}

fn from_name(name: &str) -> SemanticType {
    let lower = name.to_lowercase();
    let is = |words: &[&str]| words.iter().any(|w| lower == *w);
    let ends = |suffixes: &[&str]| suffixes.iter().any(|s| lower.ends_with(s));
    if is(&["n", "i", "j", "k", "count", "index", "idx", "size", "length", "limit", "amount", "total", "age", "offset"])
        || ends(&["_count", "_index", "_size", "_id", "count", "num"])
        || lower.starts_with("num")
    {
        SemanticType::Integer
    } else if is(&["s", "name", "text", "path", "msg", "message", "key", "url", "word", "query", "label", "title"])
        || ends(&["_name", "_path", "_str", "_text", "name"])
    {
        SemanticType::Text
    } else if is(&["items", "values", "xs", "elements", "list", "nums", "numbers", "entries", "rows", "arr"])
        || ends(&["_list", "_items"])
    {
        SemanticType::Collection
    } else if is(&["flag", "enabled", "verbose", "strict"]) || lower.starts_with("is_") || lower.starts_with("has_") {
        SemanticType::Boolean
    } else if is(&["mapping", "options", "config", "params", "kwargs", "headers"]) || ends(&["_map", "_dict"]) {
        SemanticType::Mapping
    } else {
        SemanticType::Opaque
    }
}

/// Semantic type of a parameter: declared hint first, then the default
/// value, then conventional names.
pub fn semantic_type(param: &Parameter) -> SemanticType {
    param
        .type_hint
        .as_deref()
        .and_then(from_hint)
        .or_else(|| param.default.as_deref().and_then(from_default))
        .unwrap_or_else(|| {
            if param.type_hint.is_some() {
                SemanticType::Opaque
            } else {
                from_name(&param.name)
            }
        })
}

/// Representative rows per semantic type, typical value first.
pub fn representatives(semantic: SemanticType) -> Vec<Value> {
    match semantic {
        SemanticType::Integer => vec![Value::Int(1), Value::Int(0), Value::Int(-1)],
        SemanticType::Float => vec![
            Value::Float("1.5".into()),
            Value::Float("0.0".into()),
            Value::Float("-1.5".into()),
        ],
        SemanticType::Text => vec![
            Value::Str("hello".into()),
            Value::Str(String::new()),
            Value::Str("héllo wörld".into()),
        ],
        SemanticType::Collection => vec![
            Value::List(vec![Value::Int(1)]),
            Value::List(vec![]),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        ],
        SemanticType::Boolean => vec![Value::Bool(true), Value::Bool(false)],
        SemanticType::Mapping => vec![
            Value::Map(vec![("key".into(), Value::Int(1))]),
            Value::Map(vec![]),
        ],
        SemanticType::Opaque => vec![Value::Zero],
    }
}

pub fn typical(param: &Parameter) -> Value {
    representatives(semantic_type(param))
        .into_iter()
        .next()
        .unwrap_or(Value::Zero)
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Literal operand of a comparison, if it reads as one.
pub fn literal(token: &str) -> Option<Value> {
    let text = token.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::Int(n));
    }
    if text.contains('.') && text.parse::<f64>().is_ok() {
        return Some(Value::Raw(text.to_string()));
    }
    match text {
        "None" | "null" | "nil" | "undefined" | "nullptr" | "NULL" => return Some(Value::Null),
        "True" | "true" => return Some(Value::Bool(true)),
        "False" | "false" => return Some(Value::Bool(false)),
        _ => {}
    }
    let quoted = text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"'))
            || (text.starts_with('\'') && text.ends_with('\'')));
    if quoted {
        return Some(Value::Str(text[1..text.len() - 1].to_string()));
    }
    None
}

/// A boundary-adjacent pair of inputs for one parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeCandidate {
    pub parameter: String,
    /// Identifier-safe words describing the boundary.
    pub label: Vec<String>,
    /// The side that satisfies the condition, tried first.
    pub inside: Value,
    pub outside: Value,
    /// Other parameters pinned so the boundary is meaningful.
    pub pinned: Vec<(String, Value)>,
}

fn operator_word(operator: &str) -> &'static str {
    match operator {
        "==" => "eq",
        "!=" => "ne",
        "<" => "lt",
        "<=" => "le",
        ">" => "gt",
        ">=" => "ge",
        _ => "cmp",
    }
}

/// Lowercase identifier words for a token (`len(items)` → `len_items`).
pub fn slug(text: &str) -> String {
    let mut out = String::new();
    for ch in text.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if ch == '-' && out.is_empty() {
            out.push_str("neg_");
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "value".to_string()
    } else {
        trimmed.to_string()
    }
}

fn numeric_pair(operator: &str, pivot: i64) -> Option<(i64, i64)> {
    let pair = match operator {
        "==" => (pivot, pivot + 1),
        "!=" => (pivot + 1, pivot),
        "<" => (pivot - 1, pivot),
        "<=" => (pivot, pivot + 1),
        ">" => (pivot + 1, pivot),
        ">=" => (pivot, pivot - 1),
        _ => return None,
    };
    Some(pair)
}

fn float_pair(operator: &str, pivot: f64) -> Option<(String, String)> {
    let (inside, outside) = match operator {
        "==" | "<=" => (pivot, pivot + 1.0),
        "!=" | ">" => (pivot + 1.0, pivot),
        "<" => (pivot - 1.0, pivot),
        ">=" => (pivot, pivot - 1.0),
        _ => return None,
    };
    Some((format_float(inside), format_float(outside)))
}

fn zeros(length: i64) -> Option<Value> {
    (0..=16)
        .contains(&length)
        .then(|| Value::List((0..length).map(|_| Value::Int(0)).collect()))
}

fn length_subject(subject: &str) -> Option<&str> {
    let caps = LEN_RE.captures(subject.trim())?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

/// Boundary pair implied by one comparison, when it constrains a parameter.
pub fn comparison_candidate(callable: &CallableEntity, comparison: &Comparison) -> Option<EdgeCandidate> {
    let operator = comparison.operator.as_str();
    let operand = comparison.operand.trim();
    let label = |parameter: &str| {
        vec![
            slug(parameter),
            operator_word(operator).to_string(),
            slug(operand),
        ]
    };

    // `len(items) > 3` constrains the collection's length.
    if let Some(collection) = length_subject(&comparison.subject) {
        callable.parameter(collection)?;
        let pivot = operand.parse::<i64>().ok()?;
        let (inside, outside) = numeric_pair(operator, pivot)?;
        return Some(EdgeCandidate {
            parameter: collection.to_string(),
            label: vec![slug(collection), "len".into(), operator_word(operator).into(), slug(operand)],
            inside: zeros(inside)?,
            outside: zeros(outside)?,
            pinned: vec![],
        });
    }

    let param = callable.parameter(&comparison.subject)?;
    let semantic = semantic_type(param);

    // `i < len(items)` pins the collection and puts `i` around its length.
    if let Some(collection) = length_subject(operand) {
        callable.parameter(collection)?;
        let (inside, outside) = numeric_pair(operator, 3)?;
        return Some(EdgeCandidate {
            parameter: param.name.clone(),
            label: label(&param.name),
            inside: Value::Int(inside),
            outside: Value::Int(outside),
            pinned: vec![(collection.to_string(), representatives(SemanticType::Collection)[2].clone())],
        });
    }

    // Comparison against another parameter: pin it to its typical value.
    if let Some(other) = callable.parameter(operand) {
        let pinned = typical(other);
        let Value::Int(pivot) = pinned else {
            return None;
        };
        let (inside, outside) = numeric_pair(operator, pivot)?;
        return Some(EdgeCandidate {
            parameter: param.name.clone(),
            label: label(&param.name),
            inside: Value::Int(inside),
            outside: Value::Int(outside),
            pinned: vec![(other.name.clone(), pinned)],
        });
    }

    let (inside, outside) = match literal(operand)? {
        Value::Int(pivot) => {
            let (inside, outside) = numeric_pair(operator, pivot)?;
            if semantic == SemanticType::Float {
                (Value::Float(format_float(inside as f64)), Value::Float(format_float(outside as f64)))
            } else {
                (Value::Int(inside), Value::Int(outside))
            }
        }
        Value::Raw(number) => {
            let pivot = number.parse::<f64>().ok()?;
            let (inside, outside) = float_pair(operator, pivot)?;
            (Value::Float(inside), Value::Float(outside))
        }
        Value::Null => {
            let outside = match semantic {
                SemanticType::Opaque => Value::Present,
                other => representatives(other).remove(0),
            };
            (Value::Null, outside)
        }
        Value::Bool(flag) => (Value::Bool(flag), Value::Bool(!flag)),
        Value::Str(text) => {
            let other = if text.is_empty() { "x".to_string() } else { String::new() };
            (Value::Str(text), Value::Str(other))
        }
        _ => return None,
    };
    let (inside, outside) = if operator == "!=" && matches!(inside, Value::Null | Value::Str(_) | Value::Bool(_)) {
        (outside, inside)
    } else {
        (inside, outside)
    };
    Some(EdgeCandidate {
        parameter: param.name.clone(),
        label: label(&param.name),
        inside,
        outside,
        pinned: vec![],
    })
}

fn pair(param: &Parameter, label: &str, inside: Value, outside: Value) -> EdgeCandidate {
    EdgeCandidate {
        parameter: param.name.clone(),
        label: vec![slug(&param.name), label.to_string()],
        inside,
        outside,
        pinned: vec![],
    }
}

/// Domain extremes for a parameter, used once comparisons run out.
pub fn domain_candidates(param: &Parameter) -> Vec<EdgeCandidate> {
    match semantic_type(param) {
        SemanticType::Integer => vec![
            pair(param, "zero", Value::Int(0), Value::Int(1)),
            pair(param, "limits", Value::Int(i32::MAX as i64), Value::Int(i32::MIN as i64)),
        ],
        SemanticType::Float => vec![
            pair(param, "zero", Value::Float("0.0".into()), Value::Float("0.000001".into())),
            pair(param, "limits", Value::Float("1e308".into()), Value::Float("-1e308".into())),
        ],
        SemanticType::Text => vec![
            pair(param, "empty", Value::Str(String::new()), Value::Str("a".into())),
            pair(param, "long", Value::Str("a".repeat(256)), Value::Str("a".into())),
        ],
        SemanticType::Collection => vec![pair(
            param,
            "empty",
            Value::List(vec![]),
            Value::List(vec![Value::Int(1)]),
        )],
        SemanticType::Mapping => vec![pair(
            param,
            "empty",
            Value::Map(vec![]),
            Value::Map(vec![("key".into(), Value::Int(1))]),
        )],
        SemanticType::Boolean => vec![pair(param, "toggle", Value::Bool(true), Value::Bool(false))],
        SemanticType::Opaque if param.is_nullable() => {
            vec![pair(param, "absent", Value::Null, Value::Present)]
        }
        SemanticType::Opaque => vec![],
    }
}

/// Below-zero inputs for numeric parameters.
pub fn negative_candidates(param: &Parameter) -> Vec<EdgeCandidate> {
    match semantic_type(param) {
        SemanticType::Integer => vec![pair(param, "negative", Value::Int(-1), Value::Int(i32::MIN as i64))],
        SemanticType::Float => vec![pair(
            param,
            "negative",
            Value::Float("-0.5".into()),
            Value::Float("-1e308".into()),
        )],
        _ => vec![],
    }
}

/// Unicode, whitespace and extreme inputs.
pub fn diverse_candidates(param: &Parameter) -> Vec<EdgeCandidate> {
    match semantic_type(param) {
        SemanticType::Text => vec![
            pair(param, "unicode", Value::Str("héllo wörld 🚀".into()), Value::Str("hello".into())),
            pair(param, "whitespace", Value::Str("   ".into()), Value::Str("\t\n".into())),
        ],
        SemanticType::Integer => vec![pair(param, "extreme", Value::Int(1_000_000), Value::Int(-1_000_000))],
        SemanticType::Float => vec![pair(
            param,
            "extreme",
            Value::Float("1e-308".into()),
            Value::Float("-1e-308".into()),
        )],
        SemanticType::Collection => vec![pair(
            param,
            "duplicates",
            Value::List(vec![Value::Int(1), Value::Int(1)]),
            Value::List((0..100).map(Value::Int).collect()),
        )],
        _ => vec![],
    }
}

/// Directive-supplied literals, applied to the first parameter whose type
/// matches the literal (or the first parameter when none does).
pub fn extra_candidates(callable: &CallableEntity, values: &[String]) -> Vec<EdgeCandidate> {
    let Some(first) = callable.parameters.first() else {
        return vec![];
    };
    values
        .iter()
        .map(|raw| {
            let raw = raw.trim();
            let kind = from_default(raw);
            let param = callable
                .parameters
                .iter()
                .find(|p| Some(semantic_type(p)) == kind)
                .unwrap_or(first);
            let value = literal(raw)
                .map(|v| match v {
                    Value::Raw(_) => Value::Raw(raw.to_string()),
                    other => other,
                })
                .unwrap_or_else(|| Value::Raw(raw.to_string()));
            EdgeCandidate {
                parameter: param.name.clone(),
                label: vec![slug(&param.name), "value".into(), slug(raw)],
                inside: value,
                outside: typical(param),
                pinned: vec![],
            }
        })
        .collect()
}

/// The value most likely to trigger a failure path for `callable`: the
/// condition side of its first parameter comparison, else an absent or
/// empty input.
pub fn failure_input(callable: &CallableEntity) -> Option<(String, Value, Vec<(String, Value)>)> {
    if let Some(candidate) = callable
        .comparisons()
        .find_map(|comparison| comparison_candidate(callable, comparison))
    {
        return Some((candidate.parameter, candidate.inside, candidate.pinned));
    }
    let param = callable.parameters.first()?;
    let value = if param.is_nullable() {
        Value::Null
    } else {
        match semantic_type(param) {
            SemanticType::Integer => Value::Int(-1),
            SemanticType::Float => Value::Float("-1.0".into()),
            SemanticType::Text => Value::Str(String::new()),
            SemanticType::Collection => Value::List(vec![]),
            SemanticType::Mapping => Value::Map(vec![]),
            SemanticType::Boolean => Value::Bool(false),
            SemanticType::Opaque => Value::Null,
        }
    };
    Some((param.name.clone(), value, vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BodySignals, Confidence, DecisionKind, DecisionPoint};

    fn callable(params: Vec<Parameter>, comparisons: &[(&str, &str, &str)]) -> CallableEntity {
        CallableEntity {
            name: "f".into(),
            owner: None,
            is_static: false,
            parameters: params,
            return_type: None,
            complexity: comparisons.len() as u32 + 1,
            decision_points: comparisons
                .iter()
                .enumerate()
                .map(|(i, (s, o, r))| DecisionPoint {
                    kind: DecisionKind::Branch,
                    comparison: Some(Comparison {
                        subject: s.to_string(),
                        operator: o.to_string(),
                        operand: r.to_string(),
                    }),
                    line: i + 2,
                })
                .collect(),
            raises: false,
            has_loop: false,
            has_recursion: false,
            has_external_call: false,
            external_calls: vec![],
            signals: BodySignals::default(),
            confidence: Confidence::Structural,
            line: 1,
        }
    }

    #[test]
    fn test_semantic_type_sources() {
        assert_eq!(semantic_type(&Parameter::new("b", Some("number"))), SemanticType::Integer);
        assert_eq!(semantic_type(&Parameter::new("x", Some("f64"))), SemanticType::Float);
        assert_eq!(semantic_type(&Parameter::new("x", Some("List[int]"))), SemanticType::Collection);
        assert_eq!(semantic_type(&Parameter::new("x", Some("[]string"))), SemanticType::Collection);
        assert_eq!(semantic_type(&Parameter::new("x", Some("&str"))), SemanticType::Text);
        assert_eq!(semantic_type(&Parameter::new("x", Some("u32"))), SemanticType::Integer);
        assert_eq!(semantic_type(&Parameter::new("x", Some("Widget"))), SemanticType::Opaque);
        assert_eq!(semantic_type(&Parameter::new("user_name", None)), SemanticType::Text);
        assert_eq!(semantic_type(&Parameter::new("items", None)), SemanticType::Collection);

        let mut defaulted = Parameter::new("retries", None);
        defaulted.default = Some("3".into());
        assert_eq!(semantic_type(&defaulted), SemanticType::Integer);
    }

    #[test]
    fn test_representatives_cover_zero_positive_negative() {
        assert_eq!(
            representatives(SemanticType::Integer),
            vec![Value::Int(1), Value::Int(0), Value::Int(-1)]
        );
        assert_eq!(representatives(SemanticType::Text)[1], Value::Str(String::new()));
    }

    #[test]
    fn test_equality_comparison_puts_pivot_inside() {
        let f = callable(vec![Parameter::new("b", Some("int"))], &[("b", "==", "0")]);
        let candidate = comparison_candidate(&f, &f.decision_points[0].comparison.clone().unwrap()).unwrap();
        assert_eq!(candidate.inside, Value::Int(0));
        assert_eq!(candidate.outside, Value::Int(1));
        assert_eq!(candidate.label, vec!["b", "eq", "0"]);
    }

    #[test]
    fn test_relational_pairs_straddle_the_pivot() {
        assert_eq!(numeric_pair("<", 10), Some((9, 10)));
        assert_eq!(numeric_pair(">=", 0), Some((0, -1)));
        assert_eq!(numeric_pair(">", 5), Some((6, 5)));
    }

    #[test]
    fn test_length_operand_pins_collection() {
        let f = callable(
            vec![Parameter::new("items", Some("list")), Parameter::new("i", Some("int"))],
            &[("i", ">=", "len(items)")],
        );
        let candidate = comparison_candidate(&f, f.comparisons().next().unwrap()).unwrap();
        assert_eq!(candidate.parameter, "i");
        assert_eq!(candidate.inside, Value::Int(3));
        assert_eq!(candidate.outside, Value::Int(2));
        assert_eq!(candidate.pinned[0].0, "items");
        assert_eq!(candidate.label, vec!["i", "ge", "len_items"]);
    }

    #[test]
    fn test_null_comparison_pairs_absent_and_present() {
        let f = callable(vec![Parameter::new("node", Some("Optional[Node]"))], &[("node", "==", "None")]);
        let candidate = comparison_candidate(&f, f.comparisons().next().unwrap()).unwrap();
        assert_eq!(candidate.inside, Value::Null);
        assert_eq!(candidate.outside, Value::Present);
    }

    #[test]
    fn test_non_parameter_subject_is_skipped() {
        let f = callable(vec![Parameter::new("x", None)], &[("self.limit", ">", "3")]);
        assert!(comparison_candidate(&f, f.comparisons().next().unwrap()).is_none());
    }

    #[test]
    fn test_failure_input_prefers_comparisons() {
        let f = callable(vec![Parameter::new("a", None), Parameter::new("b", Some("int"))], &[("b", "==", "0")]);
        let (name, value, _) = failure_input(&f).unwrap();
        assert_eq!((name.as_str(), value), ("b", Value::Int(0)));

        let g = callable(vec![Parameter::new("path", Some("str"))], &[]);
        assert_eq!(failure_input(&g).unwrap().1, Value::Str(String::new()));
    }

    #[test]
    fn test_extra_candidates_match_parameter_type() {
        let f = callable(vec![Parameter::new("name", Some("str")), Parameter::new("n", Some("int"))], &[]);
        let extras = extra_candidates(&f, &["42".to_string(), "\"x\"".to_string()]);
        assert_eq!(extras[0].parameter, "n");
        assert_eq!(extras[0].inside, Value::Int(42));
        assert_eq!(extras[1].parameter, "name");
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("len(items)"), "len_items");
        assert_eq!(slug("-1"), "neg_1");
        assert_eq!(slug("\"fast\""), "fast");
        assert_eq!(slug("0.5"), "0_5");
        assert_eq!(slug("()"), "value");
    }
}
