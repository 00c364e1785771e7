//! Unit-level hygiene facts: unused imports, overlong lines, magic numbers
//! and documentation of definitions.
//!
//! Import tracking covers the languages whose imports bind plain names
//! (Python, JavaScript/TypeScript, Java, Go). Rust `use` items can bring
//! traits into scope that are only used through method syntax, and C#/C++
//! import whole namespaces, so those units never report unused imports.

use std::sync::LazyLock;

use regex::Regex;

use crate::analyzer::signals::{contains_word, strip_line};
use crate::config::LONG_LINE_LIMIT;
use crate::models::Language;

static PY_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(.+)$").unwrap());

static PY_FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*from\s+(\S+)\s+import\s+\(?([^)]*)\)?").unwrap());

static ES_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(?:type\s+)?(.+?)\s+from\s+["']"#).unwrap()
});

static ES_REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:const|let|var)\s+(\{[^}]*\}|[A-Za-z_$][\w$]*)\s*=\s*require\s*\(").unwrap()
});

static JAVA_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(?:static\s+)?[\w.]*?(\w+|\*)\s*;").unwrap());

static GO_SPEC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:import\s+)?(?:([A-Za-z_]\w*|\.)\s+)?"([^"]+)"\s*$"#).unwrap()
});

static MAGIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\w.])(\d{3,})(?:[^\w.]|$)").unwrap());

static CONSTANT_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:const|final|static\s+readonly|readonly)\b|^\s*[A-Z][A-Z0-9_]*\s*(?::[^=]+)?=")
        .unwrap()
});

/// Names bound by one import line, or `None` when the line imports nothing.
fn imported_names(line: &str, language: Language) -> Option<Vec<String>> {
    let names: Vec<String> = match language {
        Language::Python => {
            if let Some(caps) = PY_FROM_RE.captures(line) {
                if &caps[1] == "__future__" {
                    return Some(Vec::new());
                }
                caps[2].split(',').filter_map(bound_name).collect()
            } else if let Some(caps) = PY_IMPORT_RE.captures(line) {
                caps[1]
                    .split(',')
                    .filter_map(|item| {
                        if item.contains(" as ") {
                            bound_name(item)
                        } else {
                            bound_name(item.split('.').next().unwrap_or(item))
                        }
                    })
                    .collect()
            } else {
                return None;
            }
        }
        Language::JavaScript | Language::TypeScript => {
            let clause = ES_IMPORT_RE
                .captures(line)
                .or_else(|| ES_REQUIRE_RE.captures(line))?;
            clause[1]
                .replace(['{', '}'], ",")
                .split(',')
                .map(|item| item.trim().trim_start_matches("type ").trim_start_matches("* as "))
                .filter_map(|item| bound_name(&item.replace(':', " as ")))
                .collect()
        }
        Language::Java => {
            let caps = JAVA_IMPORT_RE.captures(line)?;
            if &caps[1] == "*" {
                Vec::new()
            } else {
                vec![caps[1].to_string()]
            }
        }
        _ => return None,
    };
    Some(names)
}

/// `a as b` binds `b`; a bare item binds itself.
fn bound_name(item: &str) -> Option<String> {
    let item = item.trim();
    let name = item.rsplit(" as ").next().unwrap_or(item).trim();
    let valid = !name.is_empty()
        && name != "*"
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    valid.then(|| name.to_string())
}

/// Go import specs, from single imports and `import ( ... )` blocks.
fn go_imports(lines: &[&str]) -> Vec<(usize, String)> {
    let mut found = Vec::new();
    let mut in_block = false;
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("import (") {
            in_block = true;
            continue;
        }
        if in_block && trimmed.starts_with(')') {
            in_block = false;
            continue;
        }
        if !(in_block || trimmed.starts_with("import ")) {
            continue;
        }
        let Some(caps) = GO_SPEC_RE.captures(trimmed) else {
            continue;
        };
        let name = match caps.get(1) {
            Some(alias) if alias.as_str() == "." || alias.as_str() == "_" => continue,
            Some(alias) => alias.as_str().to_string(),
            None => caps[2].rsplit('/').next().unwrap_or(&caps[2]).to_string(),
        };
        found.push((idx, name));
    }
    found
}

/// Imported names that nothing else in the unit mentions, in import order.
pub fn unused_imports(text: &str, language: Language) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let imports: Vec<(usize, String)> = if language == Language::Go {
        go_imports(&lines)
    } else {
        lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| {
                imported_names(&strip_line(line, language, true), language)
                    .map(|names| names.into_iter().map(move |n| (idx, n)))
            })
            .flatten()
            .collect()
    };
    if imports.is_empty() {
        return Vec::new();
    }

    let import_lines: Vec<usize> = imports.iter().map(|(idx, _)| *idx).collect();
    let rest: String = lines
        .iter()
        .enumerate()
        .filter(|(idx, _)| !import_lines.contains(idx))
        .map(|(_, line)| strip_line(line, language, true))
        .collect::<Vec<_>>()
        .join("\n");

    let mut unused: Vec<String> = Vec::new();
    for (_, name) in imports {
        if !contains_word(&rest, &name) && !unused.contains(&name) {
            unused.push(name);
        }
    }
    unused
}

/// 1-based lines longer than the limit, counted in characters.
pub fn long_lines(text: &str) -> Vec<usize> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| line.trim_end().chars().count() > LONG_LINE_LIMIT)
        .map(|(idx, _)| idx + 1)
        .collect()
}

/// Numeric literals of three or more digits outside constant declarations.
pub fn magic_numbers(text: &str, language: Language) -> usize {
    text.lines()
        .map(|line| strip_line(line, language, false))
        .filter(|code| !CONSTANT_DECL_RE.is_match(code))
        .map(|code| MAGIC_RE.find_iter(&code).count())
        .sum()
}

/// Whether the definition at 1-based `line` carries a docstring (Python) or
/// an adjacent doc comment above it and its attributes.
pub fn is_documented(text: &str, language: Language, line: usize, body_line: usize) -> bool {
    let lines: Vec<&str> = text.lines().collect();
    if language == Language::Python {
        return lines
            .iter()
            .skip(body_line.saturating_sub(1).max(line))
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .is_some_and(|first| {
                let first = first.trim_start_matches(['r', 'u', 'b', 'R', 'U', 'B']);
                first.starts_with("\"\"\"") || first.starts_with("'''") || first.starts_with('"')
            });
    }
    let mut idx = line.saturating_sub(1);
    while idx > 0 {
        idx -= 1;
        let trimmed = lines.get(idx).map_or("", |l| l.trim());
        let attribute = trimmed.starts_with('@')
            || trimmed.starts_with("#[")
            || (language == Language::CSharp && trimmed.starts_with('['));
        if attribute {
            continue;
        }
        return trimmed.starts_with("//")
            || trimmed.starts_with("/*")
            || trimmed.starts_with('*')
            || trimmed.ends_with("*/");
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_unused_imports() {
        let src = "\
import os
import os.path as osp
from typing import List, Dict as D
from __future__ import annotations

def f(xs: List[int]) -> int:
    return len(os.listdir(\".\"))
";
        assert_eq!(unused_imports(src, Language::Python), vec!["osp", "D"]);
    }

    #[test]
    fn test_typescript_unused_imports() {
        let src = "\
import React, { useState, useMemo as memo } from \"react\";
import type { Props } from \"./types\";
const fs = require(\"fs\");

export function view(p: Props) {
  const [x] = useState(0);
  return React.createElement(\"div\", null, x);
}
";
        assert_eq!(unused_imports(src, Language::TypeScript), vec!["memo", "fs"]);
    }

    #[test]
    fn test_java_and_go_unused_imports() {
        let java = "\
import java.util.List;
import java.util.Map;
import java.io.*;

class A {
    List<String> names;
}
";
        assert_eq!(unused_imports(java, Language::Java), vec!["Map"]);

        let go = "\
package main

import (
\t\"fmt\"
\tstr \"strings\"
\t_ \"embed\"
\t\"net/http\"
)

func main() {
\tfmt.Println(\"hi\")
}
";
        assert_eq!(unused_imports(go, Language::Go), vec!["str", "http"]);
    }

    #[test]
    fn test_rust_use_items_are_not_tracked() {
        assert!(unused_imports("use std::io::Write;\nfn f() {}\n", Language::Rust).is_empty());
    }

    #[test]
    fn test_long_lines_and_magic_numbers() {
        let src = format!("x = 1\ny = \"{}\"\nz = 86400\nMAX_SIZE = 1024\n", "a".repeat(90));
        assert_eq!(long_lines(&src), vec![2]);
        assert_eq!(magic_numbers(&src, Language::Python), 1);
        assert_eq!(magic_numbers("let ratio = 0.125;", Language::Rust), 0);
    }

    #[test]
    fn test_documentation_detection() {
        let py = "def f():\n    \"\"\"Docs.\"\"\"\n    return 1\n\ndef g():\n    return 2\n";
        assert!(is_documented(py, Language::Python, 1, 2));
        assert!(!is_documented(py, Language::Python, 5, 6));

        let java = "class A {\n    /** Adds. */\n    @Override\n    int add() { return 1; }\n\n    int sub() { return 0; }\n}\n";
        assert!(is_documented(java, Language::Java, 4, 4));
        assert!(!is_documented(java, Language::Java, 6, 6));
    }
}
