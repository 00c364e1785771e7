//! Assertion enrichment: replace placeholder assertions with text supplied
//! by an outside collaborator.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::models::{CasePlan, Suite};
use crate::synthesis;

/// Apply assertion replacements keyed by case id.
///
/// `{{actual}}` in a replacement is filled with each bound result; text
/// without it is appended once after the last step. Unknown ids are skipped.
/// Cases are never added, removed or reordered, and the suite revision is
/// left alone: enrichment is not a refinement step.
pub fn enrich(suite: &Suite, replacements: &BTreeMap<String, String>) -> Suite {
    let mut enriched = suite.clone();
    let mut applied = 0usize;
    for (id, assertion) in replacements {
        let Some(case) = enriched.cases.get_mut(id) else {
            debug!(%id, "enrichment for unknown case skipped");
            continue;
        };
        let assertion = assertion.trim();
        if assertion.is_empty() {
            continue;
        }
        let plan = CasePlan {
            assertion: Some(assertion.to_string()),
            ..case.plan.clone()
        };
        match synthesis::rerender(suite.ir.language, &suite.framework, case, plan) {
            Ok(updated) => {
                *case = updated;
                applied += 1;
            }
            Err(err) => warn!(%id, error = %err, "enrichment not applied"),
        }
    }
    debug!(applied, requested = replacements.len(), "enriched suite");
    enriched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::models::{SourceUnit, SynthesisOptions};
    use crate::synthesis::generate_suite;

    fn suite() -> Suite {
        let src = "def square(x: int) -> int:\n    return x * x\n";
        let ir = analyze(&SourceUnit::new(src, "python")).unwrap();
        generate_suite(&ir, &SynthesisOptions::default())
    }

    #[test]
    fn test_replacement_fills_actual_and_drops_placeholder_note() {
        let suite = suite();
        let replacements = BTreeMap::from([(
            "square::unit::01".to_string(),
            "assert {{actual}} >= 0".to_string(),
        )]);
        let enriched = enrich(&suite, &replacements);
        let case = &enriched.cases["square::unit::01"];
        assert!(case.source.contains("result1 = square(1)\n    assert result1 >= 0"));
        assert!(!case.source.contains("== None"));
        assert!(!case.source.contains("Placeholder"));
        assert_eq!(case.revision, 2);
        assert_eq!(enriched.revision, suite.revision);
    }

    #[test]
    fn test_unknown_ids_are_skipped() {
        let suite = suite();
        let replacements = BTreeMap::from([("nope::unit::01".to_string(), "assert True".to_string())]);
        let enriched = enrich(&suite, &replacements);
        assert_eq!(enriched, suite);
    }

    #[test]
    fn test_standalone_assertion_is_appended_once() {
        let suite = suite();
        let replacements = BTreeMap::from([(
            "square::unit::01".to_string(),
            "assert square(3) == 9".to_string(),
        )]);
        let enriched = enrich(&suite, &replacements);
        let source = &enriched.cases["square::unit::01"].source;
        assert_eq!(source.matches("assert square(3) == 9").count(), 1);
        assert!(source.trim_end().ends_with("assert square(3) == 9"));
        assert_eq!(
            enriched.cases.keys().collect::<Vec<_>>(),
            suite.cases.keys().collect::<Vec<_>>()
        );
    }
}
