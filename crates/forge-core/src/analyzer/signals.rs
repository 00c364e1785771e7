//! Line-level body scanning shared by both extraction strategies.
//!
//! Everything here works on text: call sites and locals for the pattern
//! strategy, and the raw quality signals (sinks, indexing, dereferences,
//! loop allocations, secrets) for every callable regardless of how it was
//! found.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::analyzer::{CallSite, LoopSpan};
use crate::models::{BodySignals, Comparison, Language, Parameter};

// ---------------------------------------------------------------------------
// Compiled regex patterns
// ---------------------------------------------------------------------------

static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\bnew\s+)?\b((?:[A-Za-z_][A-Za-z0-9_]*\s*(?:\.|::|->)\s*)*)([A-Za-z_][A-Za-z0-9_]*)\s*(!)?\s*\(",
    )
    .unwrap()
});

static SINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(os\.system|os\.popen|subprocess\.(?:run|call|Popen|check_output|check_call)|eval|exec|execute|executemany|executescript|raw|query|Runtime\.getRuntime\(\)\.exec|exec\.Command|Command::new|system|popen|ProcessBuilder|Process\.Start|execSync|spawn|execFile|createStatement|prepareStatement|SqlCommand|Exec|Query|QueryRow)\s*\(",
    )
    .unwrap()
});

static STRING_BUILD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"["'`]\s*\+\s*[A-Za-z_]|[A-Za-z_0-9)\]]\s*\+\s*["'`]|\bf["']|\$\{|["']\s*%\s*[A-Za-z_(]|\.format\(|String\.format\(|fmt\.Sprintf\(|format!\(|\$"|String\.Concat\(|strcat\(|\.concat\("#,
    )
    .unwrap()
});

static ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:let|const|var|val|auto|final|String|string|std::string)\s+(?:mut\s+)?)?([A-Za-z_][A-Za-z0-9_]*)\s*(?::\s*[A-Za-z0-9_<>\[\]&]+\s*)?(?::=|\+=|=)(?:[^=]|$)",
    )
    .unwrap()
});

static INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z_][A-Za-z0-9_.]*\s*\[\s*([^\[\]]+?)\s*\]").unwrap()
});

static CHAR_AT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(?:charAt|at|elementAt|ElementAt)\(\s*([^()]+?)\s*\)").unwrap()
});

static RELATIONAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^<>=\-])(?:<=|>=|<|>)(?:[^<>=]|$)").unwrap());

static CONDITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:if|elif|while|assert|guard|require|check|when|unless|for)\b|\b(?:min|max|clamp)\s*\(|\bin\s+range\(",
    )
    .unwrap()
});

static INDEX_GUARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:IndexError|IndexOutOfBounds\w*|ArrayIndexOutOfBounds\w*|RangeError|out_of_range|ArgumentOutOfRange\w*)\b").unwrap()
});

static EXIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:break|return|raise|throw)\b").unwrap());

static MEMO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b_*(?:lru_cache|cache|cached|memo|memoize|memoized|memoization|useMemo)\b").unwrap()
});

static ALLOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[[^\]]*\]\s*\*\s*[A-Za-z0-9_]+|\bnew\s+[A-Za-z_][A-Za-z0-9_.]*(?:<[^>]*>)?\s*\[\s*[A-Za-z0-9_]+|\bnew\s+(?:Array|ArrayList|HashMap|HashSet|LinkedList|List|Dictionary|StringBuilder|Map|Set)\b|\bmake\(\s*(?:\[\]|map\[)|\bvec!\[[^\]]*;|\bVec::with_capacity\(|\blist\(range\(|\[\s*(?:[^\[\]]*,){8,}[^\[\]]*\]|\{\s*(?:[^{}]*,){8,}[^{}]*\}|\bnp\.(?:zeros|ones|empty)\(|\bcopy\.deepcopy\(",
    )
    .unwrap()
});

static SECRET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b[A-Za-z0-9_]*(?:password|passwd|pwd|secret|api_?key|access_?token|auth_?token|private_?key)[A-Za-z0-9_]*\s*[:=]\s*["'][^"']{4,}["']"#,
    )
    .unwrap()
});

static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\.(?:innerHTML|outerHTML)\s*\+?=(?:[^=]|$)|\bdocument\.write(?:ln)?\s*\(|\binsertAdjacentHTML\s*\(|\bdangerouslySetInnerHTML\b|\bmark_safe\s*\(|\bMarkup\s*\(",
    )
    .unwrap()
});

static RANDOM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\brandom\.(?:randint|random|choice|randrange|getrandbits)\s*\(|\bMath\.random\s*\(|\bnew\s+Random\s*\(|\brand::(?:random|thread_rng)\b|\bthread_rng\s*\(|\brand\.(?:Intn|Int63|Int31|Int|Float64)\s*\(|\brand\s*\(\s*\)",
    )
    .unwrap()
});

static CREDENTIAL_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)token|secret|password|passwd|salt|nonce|otp|session|api_?key|reset_?code|verification").unwrap()
});

static CONCAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_.]*)\s*(\+=|=\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\+)").unwrap()
});

static TEXTUAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'`]|\bstr\(|\.toString\(|\.to_string\(|String\.valueOf\(|\bString\("#).unwrap()
});

static BOOL_OP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&&|\|\||\band\b|\bor\b").unwrap());

static DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^\s*|[;{(]\s*)(?:let|const|var|val|auto)\s+(?:mut\s+)?([A-Za-z_][A-Za-z0-9_]*)")
        .unwrap()
});

static TUPLE_ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*(?:\s*,\s*[A-Za-z_][A-Za-z0-9_]*)+)\s*(?::=|=)(?:[^=]|$)")
        .unwrap()
});

static TYPED_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:final\s+)?([A-Za-z_][A-Za-z0-9_.:]*)(?:<[^=;]*>)?(?:\[\])*[*&]?\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:=|;)",
    )
    .unwrap()
});

static FOR_BINDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bfor\s*\(?\s*(?:(?:let|const|var|final|auto|mut)\s+)?(?:[A-Za-z_][A-Za-z0-9_.<>\[\]]*\s+)?([A-Za-z_][A-Za-z0-9_]*)(?:\s*,\s*([A-Za-z_][A-Za-z0-9_]*))?\s*(?:\bin\b|\bof\b|:=|:|=)",
    )
    .unwrap()
});

static AS_BINDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bas\s+([A-Za-z_][A-Za-z0-9_]*)\s*:").unwrap());

static LAMBDA_BINDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*=>").unwrap());

static CATCH_BINDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bcatch\s*\(\s*[A-Za-z_][A-Za-z0-9_.|\s]*\s+([A-Za-z_][A-Za-z0-9_]*)\s*\)").unwrap()
});

static COMPARISON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(len\([A-Za-z_][A-Za-z0-9_.]*\)|-?[0-9]+(?:\.[0-9]+)?|[A-Za-z_][A-Za-z0-9_.]*(?:\(\))?)\s*(===|!==|==|!=|<=|>=|<|>)\s*(-?[0-9]+(?:\.[0-9]+)?|len\([A-Za-z_][A-Za-z0-9_.]*\)|[A-Za-z_][A-Za-z0-9_.]*(?:\(\))?|"[^"]*"|'[^']*')"#,
    )
    .unwrap()
});

static IS_NONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z_][A-Za-z0-9_.]*)\s+(is\s+not|is)\s+None\b").unwrap()
});

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Keywords that look like calls when followed by a parenthesis.
pub(crate) fn is_call_keyword(name: &str) -> bool {
    matches!(
        name,
        "if" | "elif"
            | "else"
            | "for"
            | "foreach"
            | "while"
            | "do"
            | "switch"
            | "match"
            | "case"
            | "return"
            | "function"
            | "func"
            | "fn"
            | "def"
            | "class"
            | "catch"
            | "except"
            | "with"
            | "using"
            | "lock"
            | "fixed"
            | "when"
            | "throw"
            | "raise"
            | "assert"
            | "await"
            | "yield"
            | "lambda"
            | "and"
            | "or"
            | "not"
            | "in"
            | "sizeof"
            | "typeof"
            | "instanceof"
            | "defer"
            | "go"
            | "select"
            | "synchronized"
            | "super"
            | "this"
    )
}

pub(crate) fn is_self_receiver(receiver: &str, _language: Language) -> bool {
    matches!(receiver, "self" | "this" | "cls" | "super" | "Self" | "base")
}

const PYTHON_BUILTINS: &[&str] = &[
    "print", "len", "range", "int", "str", "float", "bool", "list", "dict", "set", "tuple",
    "sorted", "reversed", "enumerate", "zip", "map", "filter", "min", "max", "sum", "abs",
    "round", "isinstance", "issubclass", "hasattr", "getattr", "setattr", "type", "iter", "next",
    "any", "all", "repr", "hash", "id", "format", "divmod", "pow", "ord", "chr", "callable",
    "vars", "frozenset", "bytes", "bytearray", "object", "property", "staticmethod",
    "classmethod", "slice",
];

const ECMASCRIPT_BUILTINS: &[&str] = &[
    "parseInt", "parseFloat", "isNaN", "isFinite", "Number", "String", "Boolean", "Array",
    "Object", "Symbol", "BigInt", "require",
];

const GO_BUILTINS: &[&str] = &[
    "len", "cap", "append", "make", "new", "panic", "recover", "copy", "delete", "close", "print",
    "println", "min", "max", "clear", "complex", "real", "imag", "int", "int8", "int16", "int32",
    "int64", "uint", "uint8", "uint16", "uint32", "uint64", "float32", "float64", "string",
    "byte", "rune", "bool",
];

const RUST_BUILTINS: &[&str] = &["Some", "Ok", "Err", "Box", "drop", "Default"];

const CPP_BUILTINS: &[&str] = &[
    "printf", "sizeof", "static_cast", "dynamic_cast", "reinterpret_cast", "const_cast",
    "malloc", "free", "memcpy", "memset", "strlen", "abs", "swap", "move",
];

fn is_builtin(language: Language, name: &str) -> bool {
    match language {
        Language::Python => PYTHON_BUILTINS.contains(&name),
        Language::JavaScript | Language::TypeScript => ECMASCRIPT_BUILTINS.contains(&name),
        Language::Go => GO_BUILTINS.contains(&name),
        Language::Rust => RUST_BUILTINS.contains(&name),
        Language::Cpp => CPP_BUILTINS.contains(&name),
        // Unqualified calls in class-based languages resolve to members.
        Language::Java | Language::CSharp => true,
    }
}

fn is_core_module(language: Language, receiver: &str) -> bool {
    let core: &[&str] = match language {
        Language::Python => &[
            "math", "re", "json", "string", "itertools", "functools", "collections", "operator",
            "typing", "dataclasses", "copy", "statistics", "decimal", "fractions", "str", "int",
            "list", "dict", "set", "tuple", "bytes",
        ],
        Language::JavaScript | Language::TypeScript => &[
            "Math", "JSON", "Object", "Array", "Number", "String", "Boolean", "console", "Promise",
            "Symbol", "Reflect", "Intl", "Set", "Map", "RegExp", "BigInt", "Error",
        ],
        Language::Java => &[
            "Math", "String", "Integer", "Long", "Double", "Float", "Boolean", "Character",
            "Arrays", "Collections", "Objects", "List", "Map", "Set", "Optional", "Stream",
            "Collectors", "StringBuilder", "System",
        ],
        Language::Go => &[
            "fmt", "strings", "strconv", "math", "errors", "sort", "unicode", "bytes", "utf8",
            "slices", "maps",
        ],
        Language::Rust => &[
            "std", "core", "alloc", "Vec", "String", "Box", "Option", "Result", "HashMap",
            "HashSet", "BTreeMap", "BTreeSet", "Rc", "Arc", "str", "char", "iter", "mem", "cmp",
            "fmt", "i32", "i64", "u32", "u64", "usize", "f64",
        ],
        Language::Cpp => &["std"],
        Language::CSharp => &[
            "Math", "String", "string", "Console", "Convert", "Enumerable", "List", "Dictionary",
            "Array", "Int32", "Double", "StringBuilder", "Task",
        ],
    };
    core.contains(&receiver)
}

/// Conversion and container methods every value answers to. Calling one
/// never leaves the unit, whatever the receiver.
const CORE_METHODS: &[&str] = &[
    "unwrap", "expect", "unwrap_or", "unwrap_or_default", "unwrap_or_else", "into", "clone",
    "to_string", "to_owned", "as_str", "as_ref", "iter", "into_iter", "collect", "len",
    "is_empty", "map", "ok", "err", "toString", "equals", "hashCode", "length", "size",
];

fn is_exception_type(name: &str) -> bool {
    name.ends_with("Error") || name.ends_with("Exception")
}

/// Whether a call reaches outside the unit: not a keyword, builtin, local
/// definition, or a method on `self`/a local/a core-library module.
pub(crate) fn is_external(
    call: &CallSite,
    language: Language,
    locals: &BTreeSet<String>,
    local_definitions: &BTreeSet<String>,
) -> bool {
    if call.derived || is_call_keyword(&call.name) || is_exception_type(&call.name) {
        return false;
    }
    match call.receiver.as_deref() {
        None => {
            !(local_definitions.contains(&call.name)
                || locals.contains(&call.name)
                || is_builtin(language, &call.name))
        }
        Some(receiver) => {
            let literal = receiver
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit() || c == '"' || c == '\'');
            !(literal
                || CORE_METHODS.contains(&call.name.as_str())
                || is_self_receiver(receiver, language)
                || locals.contains(receiver)
                || local_definitions.contains(receiver)
                || is_core_module(language, receiver))
        }
    }
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Whether `word` occurs in `haystack` as a whole identifier.
pub(crate) fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

/// Drop the trailing line comment and, unless `keep_strings`, the contents
/// of string literals (the quotes stay so that string construction is still
/// visible).
pub(crate) fn strip_line(line: &str, language: Language, keep_strings: bool) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) => {
                if c == '\\' {
                    if keep_strings {
                        out.push(c);
                        if let Some(next) = chars.get(i + 1) {
                            out.push(*next);
                        }
                    }
                    i += 2;
                    continue;
                }
                if c == q {
                    quote = None;
                    out.push(c);
                } else if keep_strings {
                    out.push(c);
                }
            }
            None => {
                let comment = match language {
                    Language::Python => c == '#',
                    _ => c == '/' && chars.get(i + 1) == Some(&'/'),
                };
                if comment {
                    break;
                }
                let opens = match c {
                    '"' | '`' => true,
                    // Rust lifetimes share the quote character with chars.
                    '\'' if language == Language::Rust => {
                        chars.get(i + 2) == Some(&'\'')
                            || (chars.get(i + 1) == Some(&'\\') && chars.get(i + 3) == Some(&'\''))
                    }
                    '\'' => true,
                    _ => false,
                };
                if opens {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
        i += 1;
    }
    out
}

/// `Base`, `Base<T>`, `extends A implements B, C` to plain names.
pub(crate) fn split_bases(text: &str) -> Vec<String> {
    let mut cleaned = String::new();
    let mut generic_depth = 0usize;
    for c in text.chars() {
        match c {
            '<' | '[' => generic_depth += 1,
            '>' | ']' => generic_depth = generic_depth.saturating_sub(1),
            '(' | ')' | '{' | '}' => cleaned.push(' '),
            _ if generic_depth == 0 => cleaned.push(c),
            _ => {}
        }
    }
    cleaned
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|name| {
            !name.is_empty()
                && !matches!(*name, "extends" | "implements" | "object" | "public" | "private" | "protected" | "virtual")
                && !name.contains('=')
        })
        .map(str::to_string)
        .collect()
}

fn is_comment_line(trimmed: &str, language: Language) -> bool {
    match language {
        Language::Python => trimmed.starts_with('#'),
        _ => {
            trimmed.starts_with("//")
                || trimmed.starts_with("/*")
                || trimmed.starts_with('*')
                || trimmed.starts_with("*/")
        }
    }
}

/// Non-blank, non-comment lines.
pub fn lines_of_code(text: &str, language: Language) -> usize {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_comment_line(line, language))
        .count()
}

/// Deepest block nesting in the unit: brace depth for brace languages,
/// indentation levels for Python.
pub fn nesting_depth(text: &str, language: Language) -> usize {
    if language.uses_braces() {
        let mut depth: i64 = 0;
        let mut max_depth: i64 = 0;
        for line in text.lines() {
            for c in strip_line(line, language, false).chars() {
                match c {
                    '{' => {
                        depth += 1;
                        max_depth = max_depth.max(depth);
                    }
                    '}' => depth = (depth - 1).max(0),
                    _ => {}
                }
            }
        }
        return max_depth as usize;
    }

    let mut stack: Vec<usize> = Vec::new();
    let mut max_depth = 0;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = indent_width(line);
        while stack.last().is_some_and(|&top| top >= indent) {
            stack.pop();
        }
        stack.push(indent);
        max_depth = max_depth.max(stack.len() - 1);
    }
    max_depth
}

pub(crate) fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

// ---------------------------------------------------------------------------
// Calls, locals and comparisons
// ---------------------------------------------------------------------------

/// Call sites found by pattern, in order of appearance.
pub(crate) fn call_sites(text: &str, language: Language) -> Vec<CallSite> {
    let mut sites = Vec::new();
    for line in text.lines() {
        let code = strip_line(line, language, false);
        for caps in CALL_RE.captures_iter(&code) {
            if caps.get(1).is_some() || caps.get(4).is_some() {
                continue;
            }
            let name = caps[3].to_string();
            if is_call_keyword(&name) {
                continue;
            }
            let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            let before = code[..start].trim_end();
            if ["def", "fn", "func", "function"]
                .iter()
                .any(|kw| before.ends_with(kw))
            {
                continue;
            }
            let chain: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();
            let mut site = call_site(&chain, &name);
            // `f(x).status()`: the chain continues from an expression.
            if ends_with_separator(before) {
                site.derived = true;
            }
            sites.push(site);
        }
    }
    sites
}

fn ends_with_separator(text: &str) -> bool {
    text.ends_with('.') || text.ends_with("::") || text.ends_with("->")
}

/// Build a call site from a receiver chain (`os.path.` or empty) and name.
pub(crate) fn call_site(chain: &str, name: &str) -> CallSite {
    let trimmed = chain
        .trim_end_matches('.')
        .trim_end_matches("::")
        .trim_end_matches("->");
    if trimmed.is_empty() {
        return CallSite {
            name: name.to_string(),
            receiver: None,
            chain: String::new(),
            path: name.to_string(),
            derived: false,
        };
    }
    let derived = trimmed.contains(['(', '[']) || trimmed.ends_with(['"', '\'', '`']);
    let receiver: String = trimmed
        .split(['.', ':', '-', '(', '[', '>'])
        .next()
        .unwrap_or(trimmed)
        .trim()
        .to_string();
    let separator = if chain.ends_with("::") { "::" } else { "." };
    let simple = trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == ':');
    let path = if simple {
        format!("{trimmed}{separator}{name}")
    } else {
        format!("{receiver}{separator}{name}")
    };
    CallSite {
        name: name.to_string(),
        receiver: Some(receiver),
        chain: trimmed.to_string(),
        path,
        derived,
    }
}

/// Names bound inside a body: declarations, assignments, loop and handler
/// bindings.
pub(crate) fn local_names(text: &str, language: Language) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for line in text.lines() {
        let code = strip_line(line, language, false);
        for caps in DECL_RE.captures_iter(&code) {
            names.insert(caps[1].to_string());
        }
        if let Some(caps) = TUPLE_ASSIGN_RE.captures(&code) {
            for name in caps[1].split(',') {
                names.insert(name.trim().to_string());
            }
        } else if let Some(caps) = ASSIGN_RE.captures(&code) {
            names.insert(caps[1].to_string());
        }
        if let Some(caps) = TYPED_DECL_RE.captures(&code) {
            if !is_call_keyword(&caps[1]) && !matches!(&caps[1], "return" | "else" | "goto") {
                names.insert(caps[2].to_string());
            }
        }
        for caps in FOR_BINDING_RE.captures_iter(&code) {
            names.insert(caps[1].to_string());
            if let Some(second) = caps.get(2) {
                names.insert(second.as_str().to_string());
            }
        }
        for regex in [&*AS_BINDING_RE, &*LAMBDA_BINDING_RE, &*CATCH_BINDING_RE] {
            for caps in regex.captures_iter(&code) {
                names.insert(caps[1].to_string());
            }
        }
    }
    names.retain(|name| !is_call_keyword(name) && name != "_");
    names
}

fn flip_operator(operator: &str) -> String {
    match operator {
        "<" => ">",
        ">" => "<",
        "<=" => ">=",
        ">=" => "<=",
        other => other,
    }
    .to_string()
}

/// Orient a comparison so that a parameter (if either side is one) is the
/// subject, and map identity tests onto equality.
pub(crate) fn normalize_comparison(
    left: &str,
    operator: &str,
    right: &str,
    parameters: &[Parameter],
) -> Comparison {
    let is_param = |side: &str| parameters.iter().any(|p| p.name == side);
    let operator = match operator.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
        "is" | "===" => "==".to_string(),
        "is not" | "!==" => "!=".to_string(),
        other => other.to_string(),
    };
    if !is_param(left) && is_param(right) {
        Comparison {
            subject: right.trim().to_string(),
            operator: flip_operator(&operator),
            operand: left.trim().to_string(),
        }
    } else {
        Comparison {
            subject: left.trim().to_string(),
            operator,
            operand: right.trim().to_string(),
        }
    }
}

/// First comparison on a line (comments removed, strings kept).
pub(crate) fn comparison_in(
    line: &str,
    language: Language,
    parameters: &[Parameter],
) -> Option<Comparison> {
    let code = strip_line(line, language, true);
    if let Some(caps) = IS_NONE_RE.captures(&code) {
        return Some(normalize_comparison(&caps[1], &caps[2], "None", parameters));
    }
    let caps = COMPARISON_RE.captures(&code)?;
    Some(normalize_comparison(&caps[1], &caps[2], &caps[3], parameters))
}

// ---------------------------------------------------------------------------
// Quality signals
// ---------------------------------------------------------------------------

pub(crate) struct BodyView<'a> {
    pub language: Language,
    pub text: &'a str,
    pub prelude: &'a str,
    /// 1-based line of the first body line.
    pub first_line: usize,
    pub parameters: &'a [Parameter],
    pub loops: &'a [LoopSpan],
}

fn is_text_hint(parameter: &Parameter) -> bool {
    parameter
        .type_hint
        .as_deref()
        .is_some_and(|hint| hint.contains("str") || hint.contains("String") || hint.contains("string"))
}

fn null_check_re(name: &str) -> Option<Regex> {
    let p = regex::escape(name);
    Regex::new(&format!(
        r"\b{p}\b\s*(?:is\s+(?:not\s+)?None|[!=]==?\s*(?:null|nil|None|undefined|nullptr))|(?:null|nil|None|undefined|nullptr)\s*[!=]==?\s*\b{p}\b|\bif\s+(?:not\s+)?{p}\s*:|\bif\s*\(\s*!?\s*{p}\s*\)|requireNonNull\(\s*{p}\b|\b{p}\s*\?\?|\b{p}\.is_(?:none|some)\(\)|Some\([A-Za-z_]+\)\s*=\s*{p}\b|\b{p}\s+or\s+|\b{p}\s*\|\|"
    ))
    .ok()
}

fn deref_re(name: &str) -> Option<Regex> {
    let p = regex::escape(name);
    Regex::new(&format!(r"\b{p}\s*(?:\.|->)\s*[A-Za-z_]")).ok()
}

/// `acc += "x"` or `acc = acc + str(i)`: a string rebuilt in place.
fn grows_string(code: &str) -> bool {
    let Some(caps) = CONCAT_RE.captures(code) else {
        return false;
    };
    let self_append = match caps.get(3) {
        Some(source) => source.as_str() == &caps[1],
        None => true,
    };
    self_append && TEXTUAL_RE.is_match(code)
}

/// The first argument of a call whose opening parenthesis was just
/// consumed, with borrows and derefs peeled off (`&cmd` reads as `cmd`).
fn first_argument(args: &str) -> &str {
    let mut depth = 0usize;
    let mut end = args.len();
    for (idx, c) in args.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth == 0 => {
                end = idx;
                break;
            }
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                end = idx;
                break;
            }
            _ => {}
        }
    }
    args[..end].trim().trim_start_matches(['&', '*']).trim()
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

/// Read the raw quality signals of one callable body.
pub(crate) fn scan(view: &BodyView<'_>) -> BodySignals {
    let mut signals = BodySignals {
        max_loop_depth: view.loops.iter().map(|span| span.depth).max().unwrap_or(0),
        memoized: MEMO_RE.is_match(view.prelude) || MEMO_RE.is_match(view.text),
        statement_lines: lines_of_code(view.text, view.language),
        ..BodySignals::default()
    };

    let nullable: Vec<(&Parameter, Option<Regex>, Option<Regex>)> = view
        .parameters
        .iter()
        .map(|p| {
            let deref = if p.is_nullable() { deref_re(&p.name) } else { None };
            (p, deref, null_check_re(&p.name))
        })
        .collect();
    let mut tainted_locals: Vec<String> = Vec::new();
    let mut index_guarded = false;

    for (offset, raw_line) in view.text.lines().enumerate() {
        let line_no = view.first_line + offset;
        let code = strip_line(raw_line, view.language, false);
        let with_strings = strip_line(raw_line, view.language, true);
        let in_loop = view
            .loops
            .iter()
            .any(|span| line_no >= span.start && line_no <= span.end);
        let in_loop_body = view
            .loops
            .iter()
            .any(|span| line_no > span.start && line_no <= span.end);

        if in_loop && EXIT_RE.is_match(&code) {
            signals.early_exit_in_loop = true;
        }

        let mentioned: Vec<&Parameter> = view
            .parameters
            .iter()
            .filter(|p| contains_word(&code, &p.name))
            .collect();
        // Interpolated strings carry parameters inside the literal.
        let interpolated = view
            .parameters
            .iter()
            .any(|p| contains_word(&with_strings, &p.name));
        let builds_string = STRING_BUILD_RE.is_match(&with_strings);
        let uses_tainted = tainted_locals.iter().any(|l| contains_word(&code, l));

        if let Some(caps) = ASSIGN_RE.captures(&code) {
            if builds_string && (interpolated || uses_tainted) {
                push_unique(&mut tainted_locals, &caps[1]);
            }
        }
        if let Some(caps) = SINK_RE.captures(&code) {
            let fed_directly = builds_string && interpolated;
            let passed_through = caps.get(0).is_some_and(|m| {
                let argument = first_argument(&code[m.end()..]);
                view.parameters.iter().any(|p| p.name == argument)
                    || tainted_locals.iter().any(|l| l == argument)
            });
            if fed_directly || uses_tainted || passed_through {
                push_unique(&mut signals.tainted_sinks, &caps[1]);
            }
        }

        for regex in [&*INDEX_RE, &*CHAR_AT_RE] {
            for caps in regex.captures_iter(&code) {
                let index_expr = &caps[1];
                for p in view.parameters {
                    if contains_word(index_expr, &p.name) && !is_text_hint(p) {
                        push_unique(&mut signals.indexed_parameters, &p.name);
                    }
                }
            }
        }

        if INDEX_GUARD_RE.is_match(&code) {
            index_guarded = true;
        }
        if CONDITION_RE.is_match(&code) && RELATIONAL_RE.is_match(&code) {
            for p in &mentioned {
                push_unique(&mut signals.bounds_checked, &p.name);
            }
        }

        for (p, deref, null_check) in &nullable {
            if deref.as_ref().is_some_and(|re| re.is_match(&code)) {
                push_unique(&mut signals.dereferenced_parameters, &p.name);
            }
            if null_check.as_ref().is_some_and(|re| re.is_match(&code)) {
                push_unique(&mut signals.null_checked, &p.name);
            }
        }

        if in_loop_body && ALLOC_RE.is_match(&code) {
            signals.loop_allocations.push(line_no);
        }
        if SECRET_RE.is_match(&with_strings) {
            signals.secret_literals.push(line_no);
        }
        if MARKUP_RE.is_match(&code) && (!mentioned.is_empty() || interpolated || uses_tainted) {
            signals.markup_sinks.push(line_no);
        }
        if RANDOM_RE.is_match(&code) && CREDENTIAL_WORD_RE.is_match(&code) {
            signals.weak_random.push(line_no);
        }
        if in_loop_body && grows_string(&code) {
            signals.loop_concatenations.push(line_no);
        }
        if BOOL_OP_RE.find_iter(&code).count() >= 3 {
            signals.complex_conditions.push(line_no);
        }
    }

    if index_guarded {
        for p in view.parameters {
            push_unique(&mut signals.bounds_checked, &p.name);
        }
    }
    signals
}
