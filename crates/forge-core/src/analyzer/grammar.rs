//! Per-language node-kind tables for the tree-sitter walk.
//!
//! The walker in `native.rs` is language-agnostic; everything it needs to
//! know about a grammar's vocabulary lives here.

use crate::models::{DecisionKind, Language};

pub struct Grammar {
    pub language: Language,
    pub function_kinds: &'static [&'static str],
    pub class_kinds: &'static [&'static str],
    /// Wrappers whose children are definitions (decorators, exports).
    pub wrapper_kinds: &'static [&'static str],
    /// Variable declarations that may bind a function value.
    pub binding_kinds: &'static [&'static str],
    pub function_value_kinds: &'static [&'static str],
    pub branch_kinds: &'static [&'static str],
    pub loop_kinds: &'static [&'static str],
    pub case_kinds: &'static [&'static str],
    pub catch_kinds: &'static [&'static str],
    pub conditional_kinds: &'static [&'static str],
    /// Nodes that may hold a relational or boolean operator.
    pub operator_kinds: &'static [&'static str],
    pub raise_kinds: &'static [&'static str],
    pub call_kinds: &'static [&'static str],
    /// Node kinds for member access (`a.b`) in call position.
    pub member_kinds: &'static [&'static str],
    pub boolean_operators: &'static [&'static str],
}

impl Grammar {
    pub fn decision_kind(&self, kind: &str) -> Option<DecisionKind> {
        if self.branch_kinds.contains(&kind) {
            Some(DecisionKind::Branch)
        } else if self.loop_kinds.contains(&kind) {
            Some(DecisionKind::Loop)
        } else if self.case_kinds.contains(&kind) {
            Some(DecisionKind::Case)
        } else if self.catch_kinds.contains(&kind) {
            Some(DecisionKind::Catch)
        } else if self.conditional_kinds.contains(&kind) {
            Some(DecisionKind::Conditional)
        } else {
            None
        }
    }
}

pub const RELATIONAL_OPERATORS: &[&str] = &[
    "==", "!=", "===", "!==", "<", ">", "<=", ">=", "is", "is not",
];

static PYTHON: Grammar = Grammar {
    language: Language::Python,
    function_kinds: &["function_definition"],
    class_kinds: &["class_definition"],
    wrapper_kinds: &["decorated_definition"],
    binding_kinds: &[],
    function_value_kinds: &[],
    branch_kinds: &["if_statement", "elif_clause"],
    loop_kinds: &["for_statement", "while_statement"],
    case_kinds: &["case_clause"],
    catch_kinds: &["except_clause"],
    conditional_kinds: &["conditional_expression", "if_clause"],
    operator_kinds: &["comparison_operator", "boolean_operator"],
    raise_kinds: &["raise_statement"],
    call_kinds: &["call"],
    member_kinds: &["attribute"],
    boolean_operators: &["and", "or"],
};

static JAVA: Grammar = Grammar {
    language: Language::Java,
    function_kinds: &["method_declaration", "constructor_declaration"],
    class_kinds: &[
        "class_declaration",
        "interface_declaration",
        "enum_declaration",
        "record_declaration",
    ],
    wrapper_kinds: &[],
    binding_kinds: &[],
    function_value_kinds: &[],
    branch_kinds: &["if_statement"],
    loop_kinds: &[
        "for_statement",
        "enhanced_for_statement",
        "while_statement",
        "do_statement",
    ],
    case_kinds: &["switch_label"],
    catch_kinds: &["catch_clause"],
    conditional_kinds: &["ternary_expression"],
    operator_kinds: &["binary_expression"],
    raise_kinds: &["throw_statement"],
    call_kinds: &["method_invocation"],
    member_kinds: &["field_access"],
    boolean_operators: &["&&", "||"],
};

// TypeScript and JavaScript share one vocabulary for everything the walker
// reads; TypeScript adds abstract classes.
const ECMASCRIPT: Grammar = Grammar {
    language: Language::JavaScript,
    function_kinds: &[
        "function_declaration",
        "method_definition",
        "generator_function_declaration",
    ],
    class_kinds: &["class_declaration"],
    wrapper_kinds: &["export_statement"],
    binding_kinds: &["lexical_declaration", "variable_declaration"],
    function_value_kinds: &["arrow_function", "function_expression", "function"],
    branch_kinds: &["if_statement"],
    loop_kinds: &[
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
    ],
    case_kinds: &["switch_case"],
    catch_kinds: &["catch_clause"],
    conditional_kinds: &["ternary_expression"],
    operator_kinds: &["binary_expression"],
    raise_kinds: &["throw_statement"],
    call_kinds: &["call_expression"],
    member_kinds: &["member_expression"],
    boolean_operators: &["&&", "||"],
};

static JAVASCRIPT: Grammar = ECMASCRIPT;

static TYPESCRIPT: Grammar = Grammar {
    language: Language::TypeScript,
    class_kinds: &["class_declaration", "abstract_class_declaration"],
    ..ECMASCRIPT
};

static GO: Grammar = Grammar {
    language: Language::Go,
    function_kinds: &["function_declaration", "method_declaration"],
    class_kinds: &["type_declaration"],
    wrapper_kinds: &[],
    binding_kinds: &[],
    function_value_kinds: &[],
    branch_kinds: &["if_statement"],
    loop_kinds: &["for_statement"],
    case_kinds: &["expression_case", "type_case", "communication_case"],
    catch_kinds: &[],
    conditional_kinds: &[],
    operator_kinds: &["binary_expression"],
    raise_kinds: &[],
    call_kinds: &["call_expression"],
    member_kinds: &["selector_expression"],
    boolean_operators: &["&&", "||"],
};

/// Grammar table for languages with a linked tree-sitter grammar.
pub fn grammar_for(language: Language) -> Option<&'static Grammar> {
    match language {
        Language::Python => Some(&PYTHON),
        Language::Java => Some(&JAVA),
        Language::TypeScript => Some(&TYPESCRIPT),
        Language::JavaScript => Some(&JAVASCRIPT),
        Language::Go => Some(&GO),
        Language::Rust | Language::Cpp | Language::CSharp => None,
    }
}

pub fn ts_language(language: Language) -> Option<tree_sitter::Language> {
    let language_fn = match language {
        Language::Python => tree_sitter_python::LANGUAGE,
        Language::Java => tree_sitter_java::LANGUAGE,
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT,
        Language::JavaScript => tree_sitter_javascript::LANGUAGE,
        Language::Go => tree_sitter_go::LANGUAGE,
        Language::Rust | Language::Cpp | Language::CSharp => return None,
    };
    Some(language_fn.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_languages_match_tables() {
        for language in Language::ALL {
            let grammar = grammar_for(language);
            assert_eq!(grammar.is_some(), ts_language(language).is_some());
            if let Some(grammar) = grammar {
                assert_eq!(grammar.language, language);
            }
        }
    }

    #[test]
    fn test_decision_kind_lookup() {
        let grammar = grammar_for(Language::Python).unwrap();
        assert_eq!(grammar.decision_kind("elif_clause"), Some(DecisionKind::Branch));
        assert_eq!(grammar.decision_kind("except_clause"), Some(DecisionKind::Catch));
        assert_eq!(grammar.decision_kind("return_statement"), None);
    }
}
