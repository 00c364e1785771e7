//! JSON encoding for archived and exchanged values.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::ForgeResult;
use crate::models::{Ir, Suite};

pub fn to_json<T: Serialize>(value: &T) -> ForgeResult<String> {
    Ok(serde_json::to_string(value)?)
}

pub fn from_json<T: DeserializeOwned>(payload: &str) -> ForgeResult<T> {
    Ok(serde_json::from_str(payload)?)
}

pub fn encode_suite(suite: &Suite) -> ForgeResult<String> {
    to_json(suite)
}

pub fn decode_suite(payload: &str) -> ForgeResult<Suite> {
    from_json(payload)
}

pub fn encode_ir(ir: &Ir) -> ForgeResult<String> {
    to_json(ir)
}

pub fn decode_ir(payload: &str) -> ForgeResult<Ir> {
    from_json(payload)
}

/// CRC32 of a stored payload, widened for an SQLite INTEGER column.
pub fn checksum(payload: &str) -> i64 {
    i64::from(crc32fast::hash(payload.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::errors::ForgeError;
    use crate::models::{SourceUnit, SynthesisOptions};
    use crate::synthesis::generate_suite;

    #[test]
    fn test_suite_survives_json() {
        let src = "class Stack:\n    def push(self, item):\n        pass\n\n    def pop(self):\n        return 1\n";
        let ir = analyze(&SourceUnit::new(src, "python")).unwrap();
        let suite = generate_suite(&ir, &SynthesisOptions::default());
        let decoded = decode_suite(&encode_suite(&suite).unwrap()).unwrap();
        assert_eq!(decoded, suite);
        // Case order is part of the value.
        assert!(decoded.cases.keys().eq(suite.cases.keys()));
    }

    #[test]
    fn test_gap_reason_is_tagged() {
        let json = to_json(&crate::models::GapReason::EdgeCaseCap { cap: 3, candidates: 5 }).unwrap();
        assert_eq!(json, r#"{"kind":"edge_case_cap","cap":3,"candidates":5}"#);
    }

    #[test]
    fn test_malformed_payload_is_a_json_error() {
        assert!(matches!(decode_ir("{\"language\":"), Err(ForgeError::Json(_))));
    }

    #[test]
    fn test_checksum_is_stable() {
        assert_eq!(checksum("forge"), checksum("forge"));
        assert_ne!(checksum("forge"), checksum("Forge"));
        assert!(checksum("anything") >= 0);
    }
}
