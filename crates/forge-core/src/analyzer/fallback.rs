//! Pattern extraction: ordered line regexes, brace balancing and indentation
//! blocks. Serves languages without a linked grammar, and any language whose
//! source failed to parse.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::analyzer::signals::{
    call_sites, comparison_in, indent_width, split_bases, strip_line,
};
use crate::analyzer::{
    assemble, Extraction, ExtractionStrategy, LoopSpan, RawCallable, RawType,
};
use crate::errors::ForgeResult;
use crate::models::{
    Confidence, DecisionKind, DecisionPoint, Ir, Language, Parameter, SourceUnit,
};

pub struct PatternStrategy;

impl ExtractionStrategy for PatternStrategy {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn confidence(&self) -> Confidence {
        Confidence::Heuristic
    }

    fn extract(&self, unit: &SourceUnit, language: Language) -> ForgeResult<Ir> {
        let source = Source::new(&unit.text, language);
        let extraction = if language == Language::Python {
            source.python_extraction()
        } else {
            source.brace_extraction()
        };
        Ok(assemble(
            unit,
            language,
            self.name(),
            self.confidence(),
            extraction,
        ))
    }
}

// ---------------------------------------------------------------------------
// Compiled regex patterns
// ---------------------------------------------------------------------------

// -- Python --

static PY_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*class\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:\(([^)]*)\))?\s*:").unwrap()
});

static PY_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:async\s+)?def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap()
});

// -- Java / C# --

static JAVA_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|private|protected|static|abstract|final|sealed|non-sealed)\s+)*(?:class|interface|enum|record)\s+([A-Za-z_][A-Za-z0-9_]*)(?:<[^>]*>)?(?:\s*\([^)]*\))?([^{]*)",
    )
    .unwrap()
});

static CSHARP_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|private|protected|internal|static|abstract|sealed|partial|readonly)\s+)*(?:class|struct|interface|record)\s+([A-Za-z_][A-Za-z0-9_]*)(?:<[^>]*>)?\s*(?::\s*([^{]+))?",
    )
    .unwrap()
});

static JAVA_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:@[A-Za-z_][A-Za-z0-9_.]*(?:\([^)]*\))?\s+)*((?:(?:public|private|protected|internal|static|final|abstract|synchronized|native|default|override|virtual|async|sealed|new|extern|unsafe|partial)\s+)*)(?:<[^>]+>\s+)?([A-Za-z_][A-Za-z0-9_.]*(?:<[^()]*?>)?(?:\[\])*\??)\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:<[^>()]*>)?\s*\(",
    )
    .unwrap()
});

static CONSTRUCTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:public|private|protected|internal)\s+)?([A-Z][A-Za-z0-9_]*)\s*\(").unwrap()
});

// -- TypeScript / JavaScript --

static TS_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][A-Za-z0-9_$]*)(?:<[^>]*>)?([^{]*)",
    )
    .unwrap()
});

static TS_FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][A-Za-z0-9_$]*)\s*(?:<[^>]*>)?\s*\(",
    )
    .unwrap()
});

static TS_ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\s*\*?\s*[A-Za-z0-9_$]*\s*)?\(",
    )
    .unwrap()
});

static TS_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*((?:(?:public|private|protected|static|async|readonly|override|abstract|get|set)\s+)*)\*?([A-Za-z_$][A-Za-z0-9_$]*)\s*(?:<[^>]*>)?\s*\(",
    )
    .unwrap()
});

// -- Go --

static GO_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*type\s+([A-Za-z_][A-Za-z0-9_]*)(?:\[[^\]]*\])?\s+(struct|interface)\b").unwrap()
});

static GO_FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*func\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:\[[^\]]*\])?\s*\(").unwrap()
});

static GO_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*func\s*\(\s*(?:([A-Za-z_][A-Za-z0-9_]*)\s+)?\*?\s*([A-Za-z_][A-Za-z0-9_]*)(?:\[[^\]]*\])?\s*\)\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:\[[^\]]*\])?\s*\(",
    )
    .unwrap()
});

// -- Rust --

static RUST_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(struct|enum|trait|union)\s+([A-Za-z_][A-Za-z0-9_]*)")
        .unwrap()
});

static RUST_IMPL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:unsafe\s+)?impl(?:<[^>]*>)?\s+(?:([A-Za-z_][A-Za-z0-9_:]*)(?:<[^>]*>)?\s+for\s+)?([A-Za-z_][A-Za-z0-9_:]*)",
    )
    .unwrap()
});

static RUST_FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:<[^(]*>)?\s*\("#,
    )
    .unwrap()
});

// -- C++ --

static CPP_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:template\s*<[^>]*>\s*)?(?:class|struct)\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:final\s*)?(?::\s*([^{;]+))?\s*(?:\{|$)",
    )
    .unwrap()
});

static CPP_FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:template\s*<[^>]*>\s*)?((?:(?:static|inline|virtual|constexpr|explicit|friend|extern)\s+)*)(?:([A-Za-z_][A-Za-z0-9_:<>,*&\s]*?)[\s*&]+)?((?:[A-Za-z_][A-Za-z0-9_]*::)*)(~?[A-Za-z_][A-Za-z0-9_]*)\s*\(",
    )
    .unwrap()
});

// -- Body vocabulary --

static BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bif\b").unwrap());

static PY_BRANCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:if|elif)\b").unwrap());

static PY_CONDITIONAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bif\b.*\belse\b").unwrap());

static LOOP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:for|foreach|while|loop)\b").unwrap());

static PY_LOOP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:async\s+)?(?:for|while)\b").unwrap());

static CASE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bcase\b").unwrap());

static CATCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:catch|except)\b").unwrap());

static BOOL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&&|\|\|").unwrap());

static PY_BOOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:and|or)\b").unwrap());

static TERNARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?\s*[^?.:;\s][^?:;]*:").unwrap());

static RAISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:raise|throw)\b|\bpanic!?\s*\(|\bbail!\s*\(|\bErr\(|\berrors\.New\(|\bfmt\.Errorf\(",
    )
    .unwrap()
});

fn is_definition_keyword(name: &str) -> bool {
    matches!(
        name,
        "if" | "for"
            | "foreach"
            | "while"
            | "switch"
            | "catch"
            | "return"
            | "new"
            | "delete"
            | "throw"
            | "else"
            | "do"
            | "using"
            | "lock"
            | "sizeof"
            | "typeof"
            | "function"
            | "super"
            | "await"
            | "yield"
            | "case"
            | "class"
            | "struct"
            | "interface"
            | "enum"
            | "record"
    )
}

// ---------------------------------------------------------------------------
// Source view
// ---------------------------------------------------------------------------

/// Three views of every line: as written, without comments, and without
/// comments or string contents.
struct Source<'a> {
    language: Language,
    raw: Vec<&'a str>,
    keep: Vec<String>,
    code: Vec<String>,
}

struct Signature {
    params: String,
    /// Text after the closing parenthesis on the last signature line.
    tail: String,
    end_line: usize,
}

/// A brace block: the line holding `{`, its column in the code view, and
/// the line holding the matching `}`.
#[derive(Debug, Clone, Copy)]
struct Block {
    open_line: usize,
    open_col: usize,
    close_line: usize,
}

struct Scope {
    name: String,
    start: usize,
    end: usize,
}

struct Header {
    name: String,
    owner: Option<String>,
    receiver_var: Option<String>,
    modifiers: String,
    return_prefix: Option<String>,
    paren_col: usize,
}

#[derive(Default)]
struct BodyScan {
    decisions: Vec<DecisionPoint>,
    loops: Vec<LoopSpan>,
    raises: bool,
}

const MAX_SIGNATURE_LINES: usize = 20;

pub(crate) fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth = (depth - 1).max(0),
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

/// Split `decl = default` at the first bare `=`.
fn split_default(chunk: &str) -> (&str, Option<String>) {
    let bytes = chunk.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'=' {
            continue;
        }
        let prev = i.checked_sub(1).map(|j| bytes[j]);
        let next = bytes.get(i + 1).copied();
        if matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) || matches!(next, Some(b'=' | b'>')) {
            continue;
        }
        return (chunk[..i].trim(), Some(chunk[i + 1..].trim().to_string()));
    }
    (chunk.trim(), None)
}

/// Parameters of one signature, and whether it binds a receiver (`self`).
fn parse_parameters(text: &str, language: Language) -> (Vec<Parameter>, bool) {
    let mut params: Vec<Parameter> = Vec::new();
    let mut has_self = false;
    let mut pending: Vec<String> = Vec::new();

    for chunk in split_top_level(text) {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        let (decl, default) = split_default(chunk);
        match language {
            Language::Python => {
                if decl.starts_with('*') || decl == "/" {
                    continue;
                }
                let (name, hint) = match decl.split_once(':') {
                    Some((name, hint)) => (name.trim(), Some(hint.trim())),
                    None => (decl, None),
                };
                if matches!(name, "self" | "cls") {
                    has_self = true;
                    continue;
                }
                let mut param = Parameter::new(name, hint);
                param.default = default;
                params.push(param);
            }
            Language::JavaScript | Language::TypeScript => {
                if decl.starts_with("...") || decl.starts_with('{') || decl.starts_with('[') {
                    continue;
                }
                let (name, hint) = match decl.split_once(':') {
                    Some((name, hint)) => (name.trim(), Some(hint.trim())),
                    None => (decl, None),
                };
                let optional = name.ends_with('?');
                let mut param = Parameter::new(name.trim_end_matches('?'), hint);
                param.default = default.or_else(|| optional.then(|| "undefined".to_string()));
                params.push(param);
            }
            Language::Rust => {
                let (pattern, hint) = match decl.split_once(':') {
                    Some((pattern, hint)) => (pattern.trim(), Some(hint.trim())),
                    None => (decl, None),
                };
                let pattern = pattern.trim_start_matches("mut ").trim();
                if pattern.ends_with("self") {
                    has_self = true;
                    continue;
                }
                if pattern.starts_with('(') || pattern.contains('{') {
                    continue;
                }
                params.push(Parameter::new(pattern, hint));
            }
            Language::Go => {
                let tokens: Vec<&str> = decl.split_whitespace().collect();
                match tokens.as_slice() {
                    [] => {}
                    [name] => pending.push((*name).to_string()),
                    [name, rest @ ..] => {
                        let hint = rest.join(" ");
                        for earlier in pending.drain(..) {
                            params.push(Parameter::new(earlier, Some(&hint)));
                        }
                        params.push(Parameter::new(*name, Some(&hint)));
                    }
                }
            }
            Language::Java | Language::CSharp | Language::Cpp => {
                let tokens: Vec<&str> = decl
                    .split_whitespace()
                    .filter(|t| !t.starts_with('@') && *t != "final")
                    .collect();
                let Some((last, rest)) = tokens.split_last() else {
                    continue;
                };
                if rest.is_empty() && *last == "void" {
                    continue;
                }
                let name = last.trim_start_matches(['*', '&']);
                let mut hint = rest.join(" ");
                hint.push_str(&last[..last.len() - name.len()]);
                let name = name.trim_end_matches("[]");
                if name.is_empty() {
                    continue;
                }
                let mut param = Parameter::new(name, (!hint.is_empty()).then_some(hint.as_str()));
                param.default = default;
                params.push(param);
            }
        }
    }
    for name in pending {
        params.push(Parameter::new(name, None));
    }
    (params, has_self)
}

fn return_type(language: Language, header: &Header, tail: &str) -> Option<String> {
    let before_body = |text: &str| -> String {
        let end = text
            .find('{')
            .into_iter()
            .chain(text.find("=>"))
            .chain(text.find(" where "))
            .min()
            .unwrap_or(text.len());
        text[..end].trim().to_string()
    };
    let ty = match language {
        Language::Python => {
            let arrow = tail.trim().strip_prefix("->")?;
            arrow.rsplit_once(':').map_or(arrow, |(ty, _)| ty).trim().to_string()
        }
        Language::Rust => before_body(tail.trim().strip_prefix("->")?),
        Language::TypeScript | Language::JavaScript => {
            before_body(tail.trim().strip_prefix(':')?)
        }
        Language::Go => before_body(tail),
        Language::Java | Language::CSharp | Language::Cpp => header.return_prefix.clone()?,
    };
    (!ty.is_empty()).then_some(ty)
}

impl<'a> Source<'a> {
    fn new(text: &'a str, language: Language) -> Self {
        let raw: Vec<&str> = text.lines().collect();
        let keep = raw.iter().map(|l| strip_line(l, language, true)).collect();
        let code = raw.iter().map(|l| strip_line(l, language, false)).collect();
        Self {
            language,
            raw,
            keep,
            code,
        }
    }

    fn len(&self) -> usize {
        self.raw.len()
    }

    /// Attribute, annotation and decorator lines directly above `line`.
    fn prelude(&self, line: usize) -> String {
        let mut collected = Vec::new();
        let mut idx = line;
        while idx > 0 {
            idx -= 1;
            let trimmed = self.raw[idx].trim();
            let attribute = trimmed.starts_with('@')
                || trimmed.starts_with("#[")
                || (self.language == Language::CSharp && trimmed.starts_with('['));
            if !attribute {
                break;
            }
            collected.push(trimmed);
        }
        collected.reverse();
        collected.join("\n")
    }

    /// Balanced parameter list starting at the `(` at `paren_col` of `line`
    /// in the comment-free view.
    fn signature(&self, line: usize, paren_col: usize) -> Option<Signature> {
        let mut params = String::new();
        let mut depth = 0i32;
        let last = (line + MAX_SIGNATURE_LINES).min(self.len());
        for idx in line..last {
            let text = &self.keep[idx];
            let start = if idx == line { paren_col } else { 0 };
            for (offset, c) in text[start.min(text.len())..].char_indices() {
                match c {
                    '(' => {
                        depth += 1;
                        if depth == 1 {
                            continue;
                        }
                    }
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            let tail_start = start + offset + 1;
                            return Some(Signature {
                                params,
                                tail: text[tail_start.min(text.len())..].to_string(),
                                end_line: idx,
                            });
                        }
                    }
                    _ => {}
                }
                params.push(c);
            }
            // An unbalanced Python header still ends at its colon.
            if self.language == Language::Python && text.trim_end().ends_with(':') {
                let params = params.trim_end().trim_end_matches(':').to_string();
                return Some(Signature {
                    params,
                    tail: ":".to_string(),
                    end_line: idx,
                });
            }
            params.push(' ');
        }
        None
    }

    /// The brace block that follows `(line, col)`, unless a statement ends
    /// first.
    fn block_from(&self, line: usize, col: usize) -> Option<Block> {
        let mut parens = 0i32;
        let mut depth = 0i32;
        let mut open: Option<(usize, usize)> = None;
        let search_end = (line + MAX_SIGNATURE_LINES).min(self.len());
        for idx in line..self.len() {
            if open.is_none() && idx >= search_end {
                return None;
            }
            let text = &self.code[idx];
            let start = if idx == line { col.min(text.len()) } else { 0 };
            for (offset, c) in text[start..].char_indices() {
                match c {
                    '(' => parens += 1,
                    ')' => parens = (parens - 1).max(0),
                    ';' if open.is_none() && parens == 0 => return None,
                    '{' if parens == 0 || open.is_some() => {
                        if open.is_none() {
                            open = Some((idx, start + offset));
                        }
                        depth += 1;
                    }
                    '}' if open.is_some() => {
                        depth -= 1;
                        if depth == 0 {
                            let (open_line, open_col) = open?;
                            return Some(Block {
                                open_line,
                                open_col,
                                close_line: idx,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
        let (open_line, open_col) = open?;
        Some(Block {
            open_line,
            open_col,
            close_line: self.len().saturating_sub(1),
        })
    }

    /// Last line indented deeper than `indent` after `line`.
    fn indented_end(&self, line: usize, indent: usize) -> usize {
        let mut end = line;
        for idx in line + 1..self.len() {
            let trimmed = self.code[idx].trim();
            if trimmed.is_empty() {
                continue;
            }
            if indent_width(self.raw[idx]) <= indent {
                break;
            }
            end = idx;
        }
        end
    }

    // -----------------------------------------------------------------------
    // Python
    // -----------------------------------------------------------------------

    fn python_extraction(&self) -> Extraction {
        let mut out = Extraction::default();
        let mut classes: Vec<(String, usize, usize, usize)> = Vec::new();
        let mut skip_until: Option<usize> = None;

        for idx in 0..self.len() {
            if skip_until.is_some_and(|end| idx <= end) {
                continue;
            }
            let line = &self.keep[idx];
            let indent = indent_width(self.raw[idx]);
            if let Some(caps) = PY_CLASS_RE.captures(line) {
                let name = caps[1].to_string();
                let bases = caps.get(2).map(|b| split_bases(b.as_str())).unwrap_or_default();
                classes.push((name.clone(), indent, idx, self.indented_end(idx, indent)));
                out.types.push(RawType {
                    name,
                    bases,
                    fields: Vec::new(),
                    line: idx + 1,
                });
                continue;
            }
            let Some(caps) = PY_DEF_RE.captures(line) else {
                continue;
            };
            let name = caps[1].to_string();
            let paren_col = caps.get(0).map_or(0, |m| m.end() - 1);
            let Some(sig) = self.signature(idx, paren_col) else {
                continue;
            };
            let end = self.indented_end(sig.end_line, indent);
            let (body_start, body_end) = if end > sig.end_line {
                (sig.end_line + 1, end)
            } else {
                (sig.end_line, sig.end_line)
            };
            let owner = classes
                .iter()
                .rev()
                .find(|(_, class_indent, start, class_end)| {
                    idx > *start && idx <= *class_end && indent > *class_indent
                })
                .map(|(name, ..)| name.clone());

            let prelude = self.prelude(idx);
            let (parameters, _) = parse_parameters(&sig.params, Language::Python);
            let header = Header {
                name: name.clone(),
                owner: owner.clone(),
                receiver_var: None,
                modifiers: String::new(),
                return_prefix: None,
                paren_col,
            };
            let is_static = prelude.contains("@staticmethod") || prelude.contains("@classmethod");
            let body = self.raw[body_start..=body_end].join("\n");
            let body_code = self.code[body_start..=body_end].join("\n");
            let scan = self.scan_body(body_start, body_end, 0, &parameters);

            out.callables.push(RawCallable {
                is_constructor: owner.is_some() && name == "__init__",
                name,
                owner,
                is_static,
                return_type: return_type(Language::Python, &header, &sig.tail),
                parameters,
                prelude,
                body,
                body_line: body_start + 1,
                line: idx + 1,
                decisions: scan.decisions,
                loops: scan.loops,
                raises: scan.raises,
                calls: call_sites(&body_code, Language::Python),
                receiver_var: None,
            });
            skip_until = Some(body_end);
        }
        out
    }

    // -----------------------------------------------------------------------
    // Brace languages
    // -----------------------------------------------------------------------

    fn brace_extraction(&self) -> Extraction {
        let mut out = Extraction::default();
        let mut scopes: Vec<Scope> = Vec::new();
        let mut trait_impls: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for idx in 0..self.len() {
            let line = &self.keep[idx];
            let found: Option<(String, Vec<String>, bool)> = match self.language {
                Language::Java => JAVA_CLASS_RE
                    .captures(line)
                    .map(|c| (c[1].to_string(), split_bases(c.get(2).map_or("", |m| m.as_str())), true)),
                Language::CSharp => CSHARP_CLASS_RE
                    .captures(line)
                    .map(|c| (c[1].to_string(), split_bases(c.get(2).map_or("", |m| m.as_str())), true)),
                Language::JavaScript | Language::TypeScript => TS_CLASS_RE
                    .captures(line)
                    .map(|c| (c[1].to_string(), split_bases(c.get(2).map_or("", |m| m.as_str())), true)),
                Language::Go => GO_TYPE_RE
                    .captures(line)
                    .map(|c| (c[1].to_string(), Vec::new(), true)),
                Language::Cpp => CPP_CLASS_RE
                    .captures(line)
                    .map(|c| (c[1].to_string(), split_bases(c.get(2).map_or("", |m| m.as_str())), true)),
                Language::Rust => {
                    if let Some(c) = RUST_TYPE_RE.captures(line) {
                        Some((c[2].to_string(), Vec::new(), true))
                    } else if let Some(c) = RUST_IMPL_RE.captures(line) {
                        let owner = last_segment(&c[2]);
                        if let Some(trait_name) = c.get(1) {
                            trait_impls
                                .entry(owner.clone())
                                .or_default()
                                .push(last_segment(trait_name.as_str()));
                        }
                        Some((owner, Vec::new(), false))
                    } else {
                        None
                    }
                }
                Language::Python => None,
            };
            let Some((name, bases, is_type)) = found else {
                continue;
            };
            let block = self.block_from(idx, 0);
            if is_type && (block.is_some() || self.language == Language::Rust) {
                out.types.push(RawType {
                    name: name.clone(),
                    bases,
                    fields: Vec::new(),
                    line: idx + 1,
                });
            }
            if let Some(block) = block {
                scopes.push(Scope {
                    name,
                    start: idx,
                    end: block.close_line,
                });
            }
        }
        for raw_type in &mut out.types {
            if let Some(traits) = trait_impls.remove(&raw_type.name) {
                raw_type.bases.extend(traits);
            }
        }

        let mut skip_until: Option<usize> = None;
        for idx in 0..self.len() {
            if skip_until.is_some_and(|end| idx <= end) {
                continue;
            }
            let enclosing = scopes
                .iter()
                .filter(|s| idx > s.start && idx <= s.end)
                .max_by_key(|s| s.start)
                .map(|s| s.name.clone());
            let Some(header) = self.match_header(idx, enclosing.as_deref()) else {
                continue;
            };
            let Some(sig) = self.signature(idx, header.paren_col) else {
                continue;
            };
            let start_col = if sig.end_line == idx { header.paren_col } else { 0 };
            let block = self.block_from(sig.end_line, start_col);

            let (body_start, body_end, first_col, raw_first) = match block {
                Some(block) => {
                    let raw_line = self.raw[block.open_line];
                    (
                        block.open_line,
                        block.close_line,
                        block.open_col,
                        raw_line.find('{').unwrap_or(0),
                    )
                }
                None => {
                    // Expression-bodied members and arrow functions.
                    if !sig.tail.contains("=>") {
                        continue;
                    }
                    let code_col = self.code[sig.end_line].find("=>").unwrap_or(0);
                    let raw_col = self.raw[sig.end_line].find("=>").unwrap_or(0);
                    (sig.end_line, sig.end_line, code_col + 2, raw_col + 2)
                }
            };
            skip_until = Some(body_end);
            if header.name.starts_with('~') {
                continue;
            }

            let mut body_lines: Vec<&str> = self.raw[body_start..=body_end].to_vec();
            body_lines[0] = &body_lines[0][raw_first.min(body_lines[0].len())..];
            let body = body_lines.join("\n");
            let mut code_lines: Vec<&str> =
                self.code[body_start..=body_end].iter().map(String::as_str).collect();
            code_lines[0] = &code_lines[0][first_col.min(code_lines[0].len())..];
            let body_code = code_lines.join("\n");

            let (parameters, has_self) = parse_parameters(&sig.params, self.language);
            let owner = header.owner.clone().or(enclosing);
            let return_type = return_type(self.language, &header, &sig.tail);
            let is_static = match self.language {
                Language::Rust => owner.is_some() && !has_self,
                Language::Go => false,
                _ => header.modifiers.split_whitespace().any(|m| m == "static"),
            };
            let is_constructor = match self.language {
                Language::Java | Language::CSharp | Language::Cpp => {
                    owner.as_deref() == Some(header.name.as_str())
                }
                Language::JavaScript | Language::TypeScript => {
                    owner.is_some() && header.name == "constructor"
                }
                Language::Rust => {
                    is_static
                        && header.name == "new"
                        && return_type.as_deref().is_some_and(|ty| {
                            ty.contains("Self") || owner.as_deref().is_some_and(|o| ty.contains(o))
                        })
                }
                Language::Go | Language::Python => false,
            };
            let declares_throws = sig.tail.contains("throws");
            let scan = self.scan_body(body_start, body_end, first_col, &parameters);

            out.callables.push(RawCallable {
                name: header.name.clone(),
                owner,
                is_static,
                is_constructor,
                parameters,
                return_type,
                prelude: self.prelude(idx),
                body,
                body_line: body_start + 1,
                line: idx + 1,
                decisions: scan.decisions,
                loops: scan.loops,
                raises: scan.raises || declares_throws,
                calls: call_sites(&body_code, self.language),
                receiver_var: header.receiver_var,
            });
        }
        out
    }

    fn match_header(&self, idx: usize, enclosing: Option<&str>) -> Option<Header> {
        let line = &self.keep[idx];
        let header = |name: &str, paren_end: usize| Header {
            name: name.to_string(),
            owner: None,
            receiver_var: None,
            modifiers: String::new(),
            return_prefix: None,
            paren_col: paren_end - 1,
        };
        match self.language {
            Language::Java | Language::CSharp => {
                if let Some(c) = JAVA_METHOD_RE.captures(line) {
                    let ty = c[2].to_string();
                    if is_definition_keyword(&c[3]) || is_definition_keyword(&ty) {
                        return None;
                    }
                    let mut h = header(&c[3], c.get(0)?.end());
                    h.modifiers = c[1].to_string();
                    h.return_prefix = Some(ty);
                    return Some(h);
                }
                let c = CONSTRUCTOR_RE.captures(line)?;
                (enclosing == Some(&c[1])).then(|| header(&c[1], c.get(0).map_or(1, |m| m.end())))
            }
            Language::JavaScript | Language::TypeScript => {
                if let Some(c) = TS_FUNCTION_RE.captures(line) {
                    return Some(header(&c[1], c.get(0)?.end()));
                }
                if let Some(c) = TS_ARROW_RE.captures(line) {
                    return Some(header(&c[1], c.get(0)?.end()));
                }
                enclosing?;
                let c = TS_METHOD_RE.captures(line)?;
                if is_definition_keyword(&c[2]) {
                    return None;
                }
                let mut h = header(&c[2], c.get(0)?.end());
                h.modifiers = c[1].to_string();
                Some(h)
            }
            Language::Go => {
                if let Some(c) = GO_METHOD_RE.captures(line) {
                    let mut h = header(&c[3], c.get(0)?.end());
                    h.owner = Some(c[2].to_string());
                    h.receiver_var = c.get(1).map(|m| m.as_str().to_string());
                    return Some(h);
                }
                let c = GO_FUNCTION_RE.captures(line)?;
                Some(header(&c[1], c.get(0)?.end()))
            }
            Language::Rust => {
                let c = RUST_FN_RE.captures(line)?;
                Some(header(&c[1], c.get(0)?.end()))
            }
            Language::Cpp => {
                let c = CPP_FN_RE.captures(line)?;
                let name = &c[4];
                let ty = c.get(2).map(|m| m.as_str().trim().to_string());
                let type_keyword = ty
                    .as_deref()
                    .and_then(|t| t.split_whitespace().next())
                    .is_some_and(is_definition_keyword);
                if is_definition_keyword(name) || type_keyword {
                    return None;
                }
                let mut h = header(name, c.get(0)?.end());
                h.modifiers = c[1].to_string();
                h.return_prefix = ty.filter(|t| !t.is_empty());
                let qualifier = c[3].trim_end_matches("::");
                if !qualifier.is_empty() {
                    h.owner = Some(last_segment(qualifier));
                }
                Some(h)
            }
            Language::Python => None,
        }
    }

    // -----------------------------------------------------------------------
    // Bodies
    // -----------------------------------------------------------------------

    fn loop_end(&self, idx: usize, col: usize) -> usize {
        if self.language == Language::Python {
            self.indented_end(idx, indent_width(self.raw[idx]))
        } else {
            self.block_from(idx, col).map_or(idx, |block| block.close_line)
        }
    }

    fn scan_body(&self, start: usize, end: usize, first_col: usize, parameters: &[Parameter]) -> BodyScan {
        let python = self.language == Language::Python;
        let mut scan = BodyScan::default();
        let mut push = |kind: DecisionKind, line: usize, comparison| {
            scan.decisions.push(DecisionPoint {
                kind,
                comparison,
                line,
            });
        };
        let mut loop_bounds: Vec<(usize, usize)> = Vec::new();
        let mut raises = false;

        for idx in start..=end.min(self.len().saturating_sub(1)) {
            let offset = if idx == start { first_col } else { 0 };
            let code = &self.code[idx][offset.min(self.code[idx].len())..];
            let keep = &self.keep[idx];
            let line_no = idx + 1;
            let compare = |text: &str| comparison_in(text, self.language, parameters);

            if python {
                let trimmed = code.trim_start();
                if PY_BRANCH_RE.is_match(code) {
                    push(DecisionKind::Branch, line_no, compare(keep));
                } else if PY_CONDITIONAL_RE.is_match(code) && !trimmed.starts_with("else") {
                    push(DecisionKind::Conditional, line_no, compare(keep));
                }
                if let Some(m) = PY_LOOP_RE.find(code) {
                    push(DecisionKind::Loop, line_no, compare(keep));
                    loop_bounds.push((idx, self.loop_end(idx, m.start())));
                }
            } else {
                for _ in BRANCH_RE.find_iter(code) {
                    push(DecisionKind::Branch, line_no, compare(keep));
                }
                if let Some(m) = LOOP_RE.find(code) {
                    push(DecisionKind::Loop, line_no, compare(keep));
                    loop_bounds.push((idx, self.loop_end(idx, offset + m.start())));
                }
                if !matches!(self.language, Language::Rust | Language::Go) {
                    for _ in TERNARY_RE.find_iter(code) {
                        push(DecisionKind::Conditional, line_no, compare(keep));
                    }
                }
                if self.language == Language::Rust
                    && code.contains("=>")
                    && !code.trim_start().starts_with('_')
                {
                    push(DecisionKind::Case, line_no, None);
                }
            }
            for _ in CASE_RE.find_iter(code) {
                push(DecisionKind::Case, line_no, None);
            }
            for _ in CATCH_RE.find_iter(code) {
                push(DecisionKind::Catch, line_no, None);
            }
            let bool_re: &Regex = if python { &PY_BOOL_RE } else { &BOOL_RE };
            let keep_ops: Vec<usize> = bool_re.find_iter(keep).map(|m| m.end()).collect();
            for (n, _) in bool_re.find_iter(code).enumerate() {
                let comparison = keep_ops.get(n).and_then(|&pos| compare(&keep[pos..]));
                push(DecisionKind::Boolean, line_no, comparison);
            }
            if RAISE_RE.is_match(code) {
                raises = true;
            }
        }

        scan.raises = raises;
        scan.loops = loop_bounds
            .iter()
            .map(|&(s, e)| {
                let enclosing = loop_bounds
                    .iter()
                    .filter(|&&(os, oe)| os < s && s <= oe)
                    .count();
                LoopSpan {
                    start: s + 1,
                    end: e + 1,
                    depth: enclosing + 1,
                }
            })
            .collect();
        scan
    }
}

fn last_segment(path: &str) -> String {
    path.rsplit("::").next().unwrap_or(path).trim().to_string()
}
