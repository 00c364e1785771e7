//! Template catalog: (language, framework, category) to test skeleton.
//!
//! The catalog is built once into a process-wide static and only read
//! afterwards. `lookup` is exact; `resolve` applies the fallback order
//! framework-specific, then language-generic, then `NoTemplate`.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::errors::{ForgeError, ForgeResult};
use crate::models::{Language, TestCategory};

/// A parameterized test skeleton.
///
/// `skeleton` carries `{{slot}}` markers. A slot alone on its line expands
/// to zero or more lines at that indentation; anywhere else it is replaced
/// inline. The smaller patterns are rendered per step or per dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub language: Language,
    pub framework: &'static str,
    pub category: TestCategory,
    pub skeleton: &'static str,
    /// Uses `{{actual}}` and `{{expected}}`.
    pub assertion: &'static str,
    /// Asserts a thrown exception or panic around `{{call}}`.
    pub failure: &'static str,
    /// Asserts a returned error; `{{binding}}` receives the call's values.
    pub error_check: Option<&'static str>,
    /// One mock placeholder: `{{fixture}}`, `{{dependency}}`, `{{dependency_type}}`.
    pub fixture: &'static str,
}

/// Named slot values for one rendering.
#[derive(Debug, Clone, Default)]
pub struct Slots {
    inline: Vec<(&'static str, String)>,
    lines: Vec<(&'static str, Vec<String>)>,
}

impl Slots {
    pub fn inline(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.inline.push((name, value.into()));
        self
    }

    pub fn lines(mut self, name: &'static str, value: Vec<String>) -> Self {
        self.lines.push((name, value));
        self
    }
}

/// Replace inline `{{slot}}` markers in a pattern.
pub fn fill(pattern: &str, values: &[(&str, &str)]) -> String {
    let mut out = pattern.to_string();
    for (name, value) in values {
        out = out.replace(&format!("{{{{{name}}}}}"), value);
    }
    out
}

impl Template {
    pub fn render(&self, slots: &Slots) -> String {
        let mut out: Vec<String> = Vec::new();
        for line in self.skeleton.lines() {
            let trimmed = line.trim();
            let block = slots
                .lines
                .iter()
                .find(|(name, _)| trimmed == format!("{{{{{name}}}}}"));
            if let Some((_, values)) = block {
                let indent = &line[..line.len() - line.trim_start().len()];
                for value in values {
                    for sub in value.lines() {
                        if sub.is_empty() {
                            out.push(String::new());
                        } else {
                            out.push(format!("{indent}{sub}"));
                        }
                    }
                }
                continue;
            }
            let values: Vec<(&str, &str)> = slots
                .inline
                .iter()
                .map(|(name, value)| (*name, value.as_str()))
                .collect();
            out.push(fill(line, &values));
        }
        let mut text = out.join("\n");
        text.push('\n');
        text
    }
}

// ---------------------------------------------------------------------------
// Framework kits
// ---------------------------------------------------------------------------

/// Everything one framework registers. Unit, edge-case, error and
/// integration cases share `case`; mock and performance are optional.
struct Kit {
    languages: &'static [Language],
    framework: &'static str,
    case: Option<&'static str>,
    mock: Option<&'static str>,
    performance: Option<&'static str>,
    assertion: &'static str,
    failure: &'static str,
    error_check: Option<&'static str>,
    fixture: &'static str,
}

const PYTHON: &[Language] = &[Language::Python];
const ECMASCRIPT: &[Language] = &[Language::JavaScript, Language::TypeScript];
const JAVA: &[Language] = &[Language::Java];
const GO: &[Language] = &[Language::Go];
const RUST: &[Language] = &[Language::Rust];
const CPP: &[Language] = &[Language::Cpp];
const CSHARP: &[Language] = &[Language::CSharp];

const KITS: &[Kit] = &[
    Kit {
        languages: PYTHON,
        framework: "pytest",
        case: Some("def {{test_name}}():\n    {{doc}}\n    {{setup}}\n    {{steps}}"),
        mock: Some("def {{test_name}}(mocker):\n    {{doc}}\n    {{dependency}}\n    {{setup}}\n    {{steps}}"),
        performance: Some("def {{test_name}}(benchmark):\n    {{doc}}\n    {{setup}}\n    benchmark(lambda: {{call}})"),
        assertion: "assert {{actual}} == {{expected}}",
        failure: "with pytest.raises(Exception):\n    {{call}}",
        error_check: None,
        fixture: "{{fixture}} = mocker.patch(\"{{dependency}}\")",
    },
    Kit {
        languages: PYTHON,
        framework: "unittest",
        case: Some("def {{test_name}}(self):\n    {{doc}}\n    {{setup}}\n    {{steps}}"),
        mock: Some("def {{test_name}}(self):\n    {{doc}}\n    self.addCleanup(patch.stopall)\n    {{dependency}}\n    {{setup}}\n    {{steps}}"),
        performance: Some("def {{test_name}}(self):\n    {{doc}}\n    {{setup}}\n    started = time.perf_counter()\n    {{call}}\n    self.assertLess(time.perf_counter() - started, 1.0)"),
        assertion: "self.assertEqual({{actual}}, {{expected}})",
        failure: "with self.assertRaises(Exception):\n    {{call}}",
        error_check: None,
        fixture: "{{fixture}} = patch(\"{{dependency}}\").start()",
    },
    Kit {
        languages: ECMASCRIPT,
        framework: "jest",
        case: Some("test(\"{{test_name}}\", () => {\n  {{doc}}\n  {{setup}}\n  {{steps}}\n});"),
        mock: Some("test(\"{{test_name}}\", () => {\n  {{doc}}\n  {{dependency}}\n  {{setup}}\n  {{steps}}\n});"),
        performance: Some("test(\"{{test_name}}\", () => {\n  {{doc}}\n  {{setup}}\n  const started = Date.now();\n  {{call}};\n  expect(Date.now() - started).toBeLessThan(1000);\n});"),
        assertion: "expect({{actual}}).toEqual({{expected}});",
        failure: "expect(() => {{call}}).toThrow();",
        error_check: None,
        fixture: "const {{fixture}} = jest.fn().mockName(\"{{dependency}}\");",
    },
    Kit {
        languages: ECMASCRIPT,
        framework: "mocha",
        case: Some("it(\"{{test_name}}\", () => {\n  {{doc}}\n  {{setup}}\n  {{steps}}\n});"),
        mock: Some("it(\"{{test_name}}\", () => {\n  {{doc}}\n  {{dependency}}\n  {{setup}}\n  {{steps}}\n});"),
        performance: Some("it(\"{{test_name}}\", function () {\n  this.timeout(1000);\n  {{doc}}\n  {{setup}}\n  {{call}};\n});"),
        assertion: "assert.deepStrictEqual({{actual}}, {{expected}});",
        failure: "assert.throws(() => {{call}});",
        error_check: None,
        fixture: "const {{fixture}} = sinon.stub().named(\"{{dependency}}\");",
    },
    Kit {
        languages: JAVA,
        framework: "junit5",
        case: Some("@Test\nvoid {{test_name}}() throws Exception {\n    {{doc}}\n    {{setup}}\n    {{steps}}\n}"),
        mock: Some("@Test\nvoid {{test_name}}() throws Exception {\n    {{doc}}\n    {{dependency}}\n    {{setup}}\n    {{steps}}\n}"),
        performance: Some("@Test\nvoid {{test_name}}() throws Exception {\n    {{doc}}\n    {{setup}}\n    assertTimeout(Duration.ofSeconds(1), () -> {\n        {{call}};\n    });\n}"),
        assertion: "assertEquals({{expected}}, {{actual}});",
        failure: "assertThrows(Exception.class, () -> {{call}});",
        error_check: None,
        fixture: "Object {{fixture}} = Mockito.mock(Object.class, \"{{dependency}}\");",
    },
    Kit {
        languages: JAVA,
        framework: "testng",
        case: Some("@Test\npublic void {{test_name}}() throws Exception {\n    {{doc}}\n    {{setup}}\n    {{steps}}\n}"),
        mock: Some("@Test\npublic void {{test_name}}() throws Exception {\n    {{doc}}\n    {{dependency}}\n    {{setup}}\n    {{steps}}\n}"),
        performance: None,
        assertion: "Assert.assertEquals({{actual}}, {{expected}});",
        failure: "Assert.expectThrows(Exception.class, () -> {{call}});",
        error_check: None,
        fixture: "Object {{fixture}} = Mockito.mock(Object.class, \"{{dependency}}\");",
    },
    Kit {
        languages: GO,
        framework: "testing",
        case: Some("func {{test_name}}(t *testing.T) {\n\t{{doc}}\n\t{{setup}}\n\t{{steps}}\n}"),
        mock: Some("func {{test_name}}(t *testing.T) {\n\t{{doc}}\n\t{{dependency}}\n\t{{setup}}\n\t{{steps}}\n}"),
        performance: Some("func {{test_name}}(b *testing.B) {\n\t{{doc}}\n\t{{setup}}\n\tfor i := 0; i < b.N; i++ {\n\t\t{{call}}\n\t}\n}"),
        assertion: "if !reflect.DeepEqual({{actual}}, {{expected}}) {\n\tt.Errorf(\"got %v, want %v\", {{actual}}, {{expected}})\n}",
        failure: "defer func() {\n\tif recover() == nil {\n\t\tt.Fatal(\"expected a panic\")\n\t}\n}()\n{{call}}",
        error_check: Some("{{binding}} := {{call}}\nif err == nil {\n\tt.Fatal(\"expected an error\")\n}"),
        fixture: "{{fixture}} := struct{ Name string }{Name: \"{{dependency}}\"}\n_ = {{fixture}}",
    },
    Kit {
        languages: GO,
        framework: "testify",
        case: Some("func {{test_name}}(t *testing.T) {\n\t{{doc}}\n\t{{setup}}\n\t{{steps}}\n}"),
        mock: Some("func {{test_name}}(t *testing.T) {\n\t{{doc}}\n\t{{dependency}}\n\t{{setup}}\n\t{{steps}}\n}"),
        performance: None,
        assertion: "assert.Equal(t, {{expected}}, {{actual}})",
        failure: "assert.Panics(t, func() { {{call}} })",
        error_check: Some("{{binding}} := {{call}}\nassert.Error(t, err)"),
        fixture: "{{fixture}} := new(mock.Mock)\n{{fixture}}.On(\"{{dependency}}\")",
    },
    Kit {
        languages: RUST,
        framework: "cargo",
        case: Some("#[test]\nfn {{test_name}}() {\n    {{doc}}\n    {{setup}}\n    {{steps}}\n}"),
        mock: None,
        performance: None,
        assertion: "assert_eq!({{actual}}, {{expected}});",
        failure: "let outcome = std::panic::catch_unwind(|| {{call}});\nassert!(outcome.is_err());",
        error_check: Some("assert!({{call}}.is_err());"),
        fixture: "",
    },
    Kit {
        languages: RUST,
        framework: "mockall",
        case: None,
        mock: Some("#[test]\nfn {{test_name}}() {\n    {{doc}}\n    {{dependency}}\n    {{setup}}\n    {{steps}}\n}"),
        performance: None,
        assertion: "assert_eq!({{actual}}, {{expected}});",
        failure: "let outcome = std::panic::catch_unwind(|| {{call}});\nassert!(outcome.is_err());",
        error_check: Some("assert!({{call}}.is_err());"),
        fixture: "let {{fixture}} = Mock{{dependency_type}}::new();",
    },
    Kit {
        languages: CPP,
        framework: "gtest",
        case: Some("TEST({{type_name}}, {{test_name}}) {\n    {{doc}}\n    {{setup}}\n    {{steps}}\n}"),
        mock: None,
        performance: None,
        assertion: "EXPECT_EQ({{actual}}, {{expected}});",
        failure: "EXPECT_ANY_THROW({{call}});",
        error_check: None,
        fixture: "",
    },
    Kit {
        languages: CPP,
        framework: "catch2",
        case: Some("TEST_CASE(\"{{test_name}}\", \"[{{target}}]\") {\n    {{doc}}\n    {{setup}}\n    {{steps}}\n}"),
        mock: None,
        performance: None,
        assertion: "REQUIRE({{actual}} == {{expected}});",
        failure: "REQUIRE_THROWS({{call}});",
        error_check: None,
        fixture: "",
    },
    Kit {
        languages: CSHARP,
        framework: "nunit",
        case: Some("[Test]\npublic void {{test_name}}()\n{\n    {{doc}}\n    {{setup}}\n    {{steps}}\n}"),
        mock: Some("[Test]\npublic void {{test_name}}()\n{\n    {{doc}}\n    {{dependency}}\n    {{setup}}\n    {{steps}}\n}"),
        performance: None,
        assertion: "Assert.That({{actual}}, Is.EqualTo({{expected}}));",
        failure: "Assert.Catch(() => {{call}});",
        error_check: None,
        fixture: "var {{fixture}} = new Mock<I{{dependency_type}}>();",
    },
    Kit {
        languages: CSHARP,
        framework: "xunit",
        case: Some("[Fact]\npublic void {{test_name}}()\n{\n    {{doc}}\n    {{setup}}\n    {{steps}}\n}"),
        mock: Some("[Fact]\npublic void {{test_name}}()\n{\n    {{doc}}\n    {{dependency}}\n    {{setup}}\n    {{steps}}\n}"),
        performance: None,
        assertion: "Assert.Equal({{expected}}, {{actual}});",
        failure: "Assert.ThrowsAny<Exception>(() => {{call}});",
        error_check: None,
        fixture: "var {{fixture}} = new Mock<I{{dependency_type}}>();",
    },
];

/// Framework used when none is requested, and the target of the generic
/// fallback step.
pub fn default_framework(language: Language) -> &'static str {
    match language {
        Language::Python => "pytest",
        Language::JavaScript | Language::TypeScript => "jest",
        Language::Java => "junit5",
        Language::Go => "testing",
        Language::Rust => "cargo",
        Language::Cpp => "gtest",
        Language::CSharp => "nunit",
    }
}

/// Canonical framework key for a requested label. Empty and `generic`
/// select the language default.
pub fn normalize_framework(language: Language, framework: Option<&str>) -> String {
    let requested = framework.map(|f| f.trim().to_lowercase()).unwrap_or_default();
    let canonical = match requested.as_str() {
        "" | "generic" | "default" => default_framework(language),
        "junit" | "junit 5" | "jupiter" => "junit5",
        "go test" | "gotest" => "testing",
        "cargo test" | "libtest" | "rust" => "cargo",
        "googletest" | "google test" => "gtest",
        "catch" => "catch2",
        "xunit.net" => "xunit",
        "py.test" => "pytest",
        "vitest" => "jest",
        other => other,
    };
    canonical.to_string()
}

pub struct TemplateCatalog {
    templates: HashMap<(Language, &'static str, TestCategory), Template>,
}

impl TemplateCatalog {
    fn build() -> Self {
        let mut templates = HashMap::new();
        for kit in KITS {
            for &language in kit.languages {
                let mut register = |category: TestCategory, skeleton: &'static str| {
                    templates.insert(
                        (language, kit.framework, category),
                        Template {
                            language,
                            framework: kit.framework,
                            category,
                            skeleton,
                            assertion: kit.assertion,
                            failure: kit.failure,
                            error_check: kit.error_check,
                            fixture: kit.fixture,
                        },
                    );
                };
                if let Some(case) = kit.case {
                    for category in [
                        TestCategory::Unit,
                        TestCategory::EdgeCase,
                        TestCategory::Error,
                        TestCategory::Integration,
                    ] {
                        register(category, case);
                    }
                }
                if let Some(mock) = kit.mock {
                    register(TestCategory::Mock, mock);
                }
                if let Some(performance) = kit.performance {
                    register(TestCategory::Performance, performance);
                }
            }
        }
        Self { templates }
    }

    /// Exact lookup on a canonical framework key.
    pub fn lookup(
        &self,
        language: Language,
        framework: &str,
        category: TestCategory,
    ) -> ForgeResult<&Template> {
        self.templates
            .iter()
            .find(|((l, f, c), _)| *l == language && *f == framework && *c == category)
            .map(|(_, template)| template)
            .ok_or_else(|| ForgeError::NoTemplate {
                language: language.to_string(),
                framework: framework.to_string(),
                category: category.to_string(),
            })
    }

    /// Framework-specific template, else the language default's.
    pub fn resolve(
        &self,
        language: Language,
        framework: Option<&str>,
        category: TestCategory,
    ) -> ForgeResult<&Template> {
        let requested = normalize_framework(language, framework);
        match self.lookup(language, &requested, category) {
            Ok(template) => Ok(template),
            Err(err) => {
                let generic = default_framework(language);
                if requested == generic {
                    return Err(err);
                }
                self.lookup(language, generic, category)
                    .map_err(|_| ForgeError::NoTemplate {
                        language: language.to_string(),
                        framework: requested,
                        category: category.to_string(),
                    })
            }
        }
    }

    /// Registered frameworks per language, sorted.
    pub fn frameworks(&self, language: Language) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .templates
            .keys()
            .filter(|(l, _, _)| *l == language)
            .map(|(_, f, _)| *f)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

pub static CATALOG: LazyLock<TemplateCatalog> = LazyLock::new(TemplateCatalog::build);

pub fn lookup(
    language: Language,
    framework: &str,
    category: TestCategory,
) -> ForgeResult<&'static Template> {
    CATALOG.lookup(language, framework, category)
}

pub fn resolve(
    language: Language,
    framework: Option<&str>,
    category: TestCategory,
) -> ForgeResult<&'static Template> {
    CATALOG.resolve(language, framework, category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_exact() {
        assert!(lookup(Language::Python, "pytest", TestCategory::Unit).is_ok());
        assert!(lookup(Language::Python, "nose", TestCategory::Unit).is_err());
        // mockall only registers mocks; lookup does not fall back.
        assert!(lookup(Language::Rust, "mockall", TestCategory::Unit).is_err());
    }

    #[test]
    fn test_resolve_falls_back_to_language_default() {
        let template = resolve(Language::Rust, Some("mockall"), TestCategory::Unit).unwrap();
        assert_eq!(template.framework, "cargo");
        let template = resolve(Language::Go, Some("testify"), TestCategory::Performance).unwrap();
        assert_eq!(template.framework, "testing");
        let template = resolve(Language::Python, Some("nose"), TestCategory::Error).unwrap();
        assert_eq!(template.framework, "pytest");
    }

    #[test]
    fn test_unregistered_combinations_report_no_template() {
        match resolve(Language::Cpp, None, TestCategory::Mock) {
            Err(ForgeError::NoTemplate { framework, category, .. }) => {
                assert_eq!(framework, "gtest");
                assert_eq!(category, "mock");
            }
            other => panic!("expected NoTemplate, got {other:?}"),
        }
        assert!(resolve(Language::Rust, None, TestCategory::Mock).is_err());
        for language in [Language::Rust, Language::Cpp, Language::CSharp] {
            assert!(resolve(language, None, TestCategory::Performance).is_err());
        }
        match resolve(Language::Cpp, Some("catch2"), TestCategory::Mock) {
            Err(ForgeError::NoTemplate { framework, .. }) => assert_eq!(framework, "catch2"),
            other => panic!("expected NoTemplate, got {other:?}"),
        }
    }

    #[test]
    fn test_framework_aliases() {
        assert_eq!(normalize_framework(Language::Java, Some("JUnit")), "junit5");
        assert_eq!(normalize_framework(Language::Go, None), "testing");
        assert_eq!(normalize_framework(Language::TypeScript, Some("generic")), "jest");
        assert_eq!(CATALOG.frameworks(Language::Python), vec!["pytest", "unittest"]);
    }

    #[test]
    fn test_render_expands_line_slots_with_indentation() {
        let template = lookup(Language::Python, "pytest", TestCategory::Unit).unwrap();
        let slots = Slots::default()
            .inline("test_name", "test_add")
            .lines("doc", vec![])
            .lines("setup", vec!["x = 1".to_string()])
            .lines("steps", vec!["with ctx:\n    add(x)".to_string()]);
        assert_eq!(
            template.render(&slots),
            "def test_add():\n    x = 1\n    with ctx:\n        add(x)\n"
        );
    }

    #[test]
    fn test_fill_inline_pattern() {
        assert_eq!(
            fill("assert {{actual}} == {{expected}}", &[("actual", "r"), ("expected", "None")]),
            "assert r == None"
        );
    }
}
