//! Per-language surface syntax used when rendering cases: literals,
//! bindings, calls, instantiation and test names.

use crate::analyzer::fallback::split_top_level;
use crate::models::{CallableEntity, Language, TestCategory};
use crate::synthesis::values::Value;

/// Receiver variable used for instance calls.
pub const SUBJECT: &str = "subject";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub language: Language,
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// `mock_requests_get` → `MockRequestsGet`; digits stay attached.
pub fn pascal_case(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn is_void(return_type: &str) -> bool {
    matches!(
        return_type.trim(),
        "" | "void" | "None" | "NoReturn" | "()" | "undefined" | "never" | "Promise<void>"
    )
}

fn go_return_types(return_type: &str) -> Vec<String> {
    let inner = return_type
        .trim()
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(return_type.trim());
    split_top_level(inner)
        .into_iter()
        .map(|part| {
            // Named results: `n int` keeps only the type.
            let part = part.trim();
            match part.split_once(char::is_whitespace) {
                Some((_, ty)) if !part.starts_with("func") && !part.starts_with("map") => {
                    ty.trim().to_string()
                }
                _ => part.to_string(),
            }
        })
        .filter(|part| !part.is_empty())
        .collect()
}

impl Dialect {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    // -----------------------------------------------------------------------
    // Comments and statements
    // -----------------------------------------------------------------------

    pub fn comment(&self, text: &str) -> String {
        match self.language {
            Language::Python => format!("# {text}"),
            _ => format!("// {text}"),
        }
    }

    fn terminated(&self) -> bool {
        !matches!(self.language, Language::Python | Language::Go)
    }

    pub fn statement(&self, expr: &str) -> String {
        if self.terminated() {
            format!("{expr};")
        } else {
            expr.to_string()
        }
    }

    // -----------------------------------------------------------------------
    // Result shapes
    // -----------------------------------------------------------------------

    /// Whether a call with this declared return type yields a value worth
    /// asserting on. An undeclared type counts as a value in dynamically
    /// typed languages and as nothing where absence means no result.
    pub fn binds_result(&self, return_type: Option<&str>) -> bool {
        match (self.language, return_type) {
            (Language::Go, Some(ty)) => go_return_types(ty).iter().any(|t| t != "error"),
            (Language::Go | Language::Rust, None) => false,
            (_, Some(ty)) => !is_void(ty),
            (_, None) => true,
        }
    }

    pub fn returns_error(&self, return_type: Option<&str>) -> bool {
        let Some(ty) = return_type else {
            return false;
        };
        match self.language {
            Language::Go => go_return_types(ty).iter().any(|t| t == "error"),
            Language::Rust => {
                let ty = ty.trim();
                ty.starts_with("Result") || ty.contains("::Result")
            }
            _ => false,
        }
    }

    /// Left-hand side for Go multi-value calls: the first value takes
    /// `name`, the error takes `err`, the rest are discarded.
    fn go_names(&self, return_type: Option<&str>, name: &str) -> String {
        let types = return_type.map(go_return_types).unwrap_or_default();
        let mut named = false;
        let names: Vec<&str> = types
            .iter()
            .map(|ty| {
                if ty == "error" {
                    "err"
                } else if !named {
                    named = true;
                    name
                } else {
                    "_"
                }
            })
            .collect();
        names.join(", ")
    }

    /// Binding used by the error-check pattern: values discarded, error kept.
    pub fn error_binding(&self, return_type: Option<&str>) -> String {
        match self.language {
            Language::Go => self.go_names(return_type, "_"),
            _ => "err".to_string(),
        }
    }

    /// Bind a call's value to `name`. Calls that can return an error are
    /// unwrapped or checked first.
    pub fn bind(&self, name: &str, call: &str, return_type: Option<&str>) -> String {
        let fallible = self.returns_error(return_type);
        match self.language {
            Language::Python => format!("{name} = {call}"),
            Language::JavaScript | Language::TypeScript => format!("const {name} = {call};"),
            Language::Java | Language::CSharp => format!("var {name} = {call};"),
            Language::Go => {
                let lhs = self.go_names(return_type, name);
                if fallible {
                    format!("{lhs} := {call}\nif err != nil {{\n\tt.Fatal(err)\n}}")
                } else {
                    format!("{lhs} := {call}")
                }
            }
            Language::Rust if fallible => format!("let {name} = {call}.unwrap();"),
            Language::Rust => format!("let {name} = {call};"),
            Language::Cpp => format!("auto {name} = {call};"),
        }
    }

    /// Placeholder for the expected value of `actual`.
    pub fn expected(&self, actual: &str, return_type: Option<&str>) -> String {
        match self.language {
            Language::Python => "None".to_string(),
            Language::JavaScript | Language::TypeScript => "undefined".to_string(),
            Language::Java => "null".to_string(),
            Language::Go => {
                let first = return_type
                    .map(go_return_types)
                    .unwrap_or_default()
                    .into_iter()
                    .find(|t| t != "error");
                self.render(&Value::Zero, first.as_deref())
            }
            Language::Rust => "Default::default()".to_string(),
            Language::Cpp => format!("decltype({actual}){{}}"),
            Language::CSharp => "default".to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Calls and instances
    // -----------------------------------------------------------------------

    fn path_separator(&self) -> &'static str {
        match self.language {
            Language::Rust | Language::Cpp => "::",
            _ => ".",
        }
    }

    pub fn call(&self, callable: &CallableEntity, args: &[String]) -> String {
        let args = args.join(", ");
        match &callable.owner {
            None => format!("{}({args})", callable.name),
            Some(owner) if callable.is_static => {
                format!("{owner}{}{}({args})", self.path_separator(), callable.name)
            }
            Some(_) => format!("{SUBJECT}.{}({args})", callable.name),
        }
    }

    /// Setup line creating the shared receiver for instance calls.
    pub fn instantiate(&self, type_name: &str, args: &[String], has_constructor: bool) -> String {
        let joined = args.join(", ");
        match self.language {
            Language::Python => format!("{SUBJECT} = {type_name}({joined})"),
            Language::JavaScript | Language::TypeScript => {
                format!("const {SUBJECT} = new {type_name}({joined});")
            }
            Language::Java => format!("{type_name} {SUBJECT} = new {type_name}({joined});"),
            Language::Go => format!("{SUBJECT} := &{type_name}{{}}"),
            Language::Rust if has_constructor => {
                format!("let mut {SUBJECT} = {type_name}::new({joined});")
            }
            Language::Rust => format!("let mut {SUBJECT} = {type_name}::default();"),
            Language::Cpp if args.is_empty() => format!("{type_name} {SUBJECT};"),
            Language::Cpp => format!("{type_name} {SUBJECT}({joined});"),
            Language::CSharp => format!("var {SUBJECT} = new {type_name}({joined});"),
        }
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    /// Test identifier from identifier-safe words, in the language's
    /// naming convention.
    pub fn test_name(&self, words: &[String], category: TestCategory) -> String {
        let snake = words.join("_").to_lowercase();
        match self.language {
            Language::Python | Language::Rust => format!("test_{snake}"),
            Language::JavaScript | Language::TypeScript => snake.replace('_', " "),
            Language::Java => format!("test{}", pascal_case(&snake)),
            Language::Go if category == TestCategory::Performance => {
                format!("Benchmark{}", pascal_case(&snake))
            }
            Language::Go => format!("Test{}", pascal_case(&snake)),
            Language::Cpp | Language::CSharp => pascal_case(&snake),
        }
    }

    /// Grouping name for frameworks that take one (`TEST(StackTest, ...)`).
    pub fn suite_name(&self, target: &str) -> String {
        let base = target.split(['.', ':']).next().unwrap_or(target);
        format!("{}Test", pascal_case(base))
    }

    // -----------------------------------------------------------------------
    // Literals
    // -----------------------------------------------------------------------

    pub fn render(&self, value: &Value, hint: Option<&str>) -> String {
        let hint = hint.map(str::trim).filter(|h| !h.is_empty());
        match self.language {
            Language::Python => self.python(value),
            Language::JavaScript | Language::TypeScript => self.ecmascript(value),
            Language::Java => self.java(value, hint),
            Language::Go => self.go(value, hint),
            Language::Rust => self.rust(value, hint),
            Language::Cpp => self.cpp(value),
            Language::CSharp => self.csharp(value, hint),
        }
    }

    fn items(&self, values: &[Value], hint: Option<&str>) -> String {
        values
            .iter()
            .map(|v| self.render(v, hint))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn python(&self, value: &Value) -> String {
        match value {
            Value::Int(n) => n.to_string(),
            Value::Float(f) | Value::Raw(f) => f.clone(),
            Value::Str(s) => quote(s),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Null | Value::Zero => "None".to_string(),
            Value::Present => "object()".to_string(),
            Value::List(items) => format!("[{}]", self.items(items, None)),
            Value::Map(entries) => {
                let body: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", quote(k), self.python(v)))
                    .collect();
                format!("{{{}}}", body.join(", "))
            }
        }
    }

    fn ecmascript(&self, value: &Value) -> String {
        match value {
            Value::Int(n) => n.to_string(),
            Value::Float(f) | Value::Raw(f) => f.clone(),
            Value::Str(s) => quote(s),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Zero | Value::Present if self.language == Language::TypeScript => {
                "{} as any".to_string()
            }
            Value::Zero | Value::Present => "{}".to_string(),
            Value::List(items) => format!("[{}]", self.items(items, None)),
            Value::Map(entries) => {
                if entries.is_empty() {
                    return "{}".to_string();
                }
                let body: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", quote(k), self.ecmascript(v)))
                    .collect();
                format!("{{ {} }}", body.join(", "))
            }
        }
    }

    fn java(&self, value: &Value, hint: Option<&str>) -> String {
        let lower = hint.map(str::to_lowercase).unwrap_or_default();
        match value {
            Value::Int(n) if lower == "long" || i32::try_from(*n).is_err() => format!("{n}L"),
            Value::Int(n) if lower == "double" || lower == "float" => format!("{n}.0"),
            Value::Int(n) => n.to_string(),
            Value::Float(f) if lower == "float" => format!("{f}f"),
            Value::Float(f) | Value::Raw(f) => f.clone(),
            Value::Str(s) => quote(s),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Zero => match lower.as_str() {
                "int" | "long" | "short" | "byte" => "0".to_string(),
                "double" | "float" => "0.0".to_string(),
                "boolean" => "false".to_string(),
                "char" => "'\\0'".to_string(),
                _ => "null".to_string(),
            },
            Value::Present => match hint {
                Some(h) if !h.contains('<') => format!("new {h}()"),
                _ => "new Object()".to_string(),
            },
            Value::List(items) => match hint {
                Some(h) if h.ends_with("[]") => format!("new {h} {{{}}}", self.items(items, None)),
                _ => format!("List.of({})", self.items(items, None)),
            },
            Value::Map(entries) => {
                let body: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}, {}", quote(k), self.java(v, None)))
                    .collect();
                format!("Map.of({})", body.join(", "))
            }
        }
    }

    fn go_zero(hint: Option<&str>) -> String {
        let Some(h) = hint else {
            return "nil".to_string();
        };
        let numeric = [
            "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32",
            "uint64", "float32", "float64", "byte", "rune", "uintptr",
        ];
        if numeric.contains(&h) {
            "0".to_string()
        } else if h == "string" {
            "\"\"".to_string()
        } else if h == "bool" {
            "false".to_string()
        } else if h.starts_with('*')
            || h.starts_with("[]")
            || h.starts_with("map[")
            || h.starts_with("chan")
            || h.starts_with("func")
            || h.starts_with("interface")
            || h == "error"
            || h == "any"
        {
            "nil".to_string()
        } else {
            format!("{h}{{}}")
        }
    }

    fn go(&self, value: &Value, hint: Option<&str>) -> String {
        match value {
            Value::Int(n) => n.to_string(),
            Value::Float(f) | Value::Raw(f) => f.clone(),
            Value::Str(s) => quote(s),
            Value::Bool(b) => b.to_string(),
            Value::Null => "nil".to_string(),
            Value::Zero => Self::go_zero(hint),
            Value::Present => match hint {
                Some(h) if h.starts_with('*') => format!("&{}{{}}", &h[1..]),
                Some(h) if !h.starts_with("interface") && h != "any" => format!("{h}{{}}"),
                _ => "struct{}{}".to_string(),
            },
            Value::List(items) => {
                let ty = match hint {
                    Some(h) if h.starts_with("[]") => h.to_string(),
                    _ if items.iter().all(|v| matches!(v, Value::Int(_))) => "[]int".to_string(),
                    _ => "[]interface{}".to_string(),
                };
                let element = ty.strip_prefix("[]").map(str::to_string);
                format!("{ty}{{{}}}", self.items(items, element.as_deref()))
            }
            Value::Map(entries) => {
                let ty = match hint {
                    Some(h) if h.starts_with("map[") => h.to_string(),
                    _ => "map[string]interface{}".to_string(),
                };
                let body: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", quote(k), self.go(v, None)))
                    .collect();
                format!("{ty}{{{}}}", body.join(", "))
            }
        }
    }

    fn rust(&self, value: &Value, hint: Option<&str>) -> String {
        if let Some(inner) = hint
            .and_then(|h| h.strip_prefix("Option<"))
            .and_then(|h| h.strip_suffix('>'))
        {
            return match value {
                Value::Null => "None".to_string(),
                Value::Zero => "Default::default()".to_string(),
                other => format!("Some({})", self.rust(other, Some(inner))),
            };
        }
        let borrowed = hint.is_some_and(|h| h.starts_with('&'));
        match value {
            Value::Int(n) => n.to_string(),
            Value::Float(f) | Value::Raw(f) => f.clone(),
            Value::Str(s) if hint == Some("String") => format!("String::from({})", quote(s)),
            Value::Str(s) => quote(s),
            Value::Bool(b) => b.to_string(),
            Value::Null => "None".to_string(),
            Value::Zero => "Default::default()".to_string(),
            Value::Present => "Some(Default::default())".to_string(),
            Value::List(items) if borrowed => format!("&[{}]", self.items(items, None)),
            Value::List(items) => format!("vec![{}]", self.items(items, None)),
            Value::Map(entries) if entries.is_empty() => "HashMap::new()".to_string(),
            Value::Map(entries) => {
                let body: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("({}, {})", quote(k), self.rust(v, None)))
                    .collect();
                format!("HashMap::from([{}])", body.join(", "))
            }
        }
    }

    fn cpp(&self, value: &Value) -> String {
        match value {
            Value::Int(n) => n.to_string(),
            Value::Float(f) | Value::Raw(f) => f.clone(),
            Value::Str(s) => format!("std::string({})", quote(s)),
            Value::Bool(b) => b.to_string(),
            Value::Null => "nullptr".to_string(),
            Value::Zero | Value::Present => "{}".to_string(),
            Value::List(items) => format!("{{{}}}", self.items(items, None)),
            Value::Map(entries) => {
                let body: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{{{}, {}}}", quote(k), self.cpp(v)))
                    .collect();
                format!("{{{}}}", body.join(", "))
            }
        }
    }

    fn csharp(&self, value: &Value, hint: Option<&str>) -> String {
        let lower = hint.map(str::to_lowercase).unwrap_or_default();
        match value {
            Value::Int(n) if lower == "long" || i32::try_from(*n).is_err() => format!("{n}L"),
            Value::Int(n) => n.to_string(),
            Value::Float(f) if lower == "float" => format!("{f}f"),
            Value::Float(f) if lower == "decimal" => format!("{f}m"),
            Value::Float(f) | Value::Raw(f) => f.clone(),
            Value::Str(s) => quote(s),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Zero => "default".to_string(),
            Value::Present => match hint {
                Some(h) if !h.ends_with('?') => format!("new {h}()"),
                _ => "new object()".to_string(),
            },
            Value::List(items) => match hint {
                Some(h) if h.starts_with("List<") => {
                    format!("new {h} {{ {} }}", self.items(items, None))
                }
                _ if items.is_empty() => "Array.Empty<object>()".to_string(),
                _ => format!("new[] {{ {} }}", self.items(items, None)),
            },
            Value::Map(entries) => {
                let body: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("[{}] = {}", quote(k), self.csharp(v, None)))
                    .collect();
                format!("new Dictionary<string, object> {{ {} }}", body.join(", "))
            }
        }
    }
}
