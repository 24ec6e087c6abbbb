use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::extract::extract_json_payload;

/// A record shape a pipeline stage expects back from the model.
///
/// Required fields are enforced by deserialization; `check` covers the rules serde
/// cannot express (unique ids, bounded scores).
pub trait StructuredOutput: DeserializeOwned {
    /// Stage label used in diagnostics.
    const STAGE: &'static str;

    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// The model's output could not be accepted as a whole. Carries the raw text for diagnosis.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Malformed {stage} output: {reason}")]
pub struct MalformedOutputError {
    pub stage: &'static str,
    pub reason: String,
    pub raw: String,
}

/// Parses an extracted candidate into `T`. `raw` is only kept for the error.
pub fn validate<T: StructuredOutput>(candidate: &str, raw: &str) -> Result<T, MalformedOutputError> {
    let malformed = |reason: String| MalformedOutputError {
        stage: T::STAGE,
        reason,
        raw: raw.to_string(),
    };

    let value: Value =
        serde_json::from_str(candidate).map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    if !value.is_object() {
        return Err(malformed("expected a JSON object".to_string()));
    }

    let record: T = serde_json::from_value(value)
        .map_err(|e| malformed(format!("unexpected shape: {e}")))?;

    record.check().map_err(malformed)?;

    Ok(record)
}

/// Extractor then validator, the way every stage consumes model text.
pub fn extract_and_validate<T: StructuredOutput>(raw: &str) -> Result<T, MalformedOutputError> {
    validate(extract_json_payload(raw), raw)
}

/// Rejects blank ids and ids repeated within one batch.
pub fn ensure_unique_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Result<(), String> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err("record with blank id".to_string());
        }
        if !seen.insert(id) {
            return Err(format!("duplicate id '{id}'"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Batch {
        items: Vec<Item>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
        label: String,
    }

    impl StructuredOutput for Batch {
        const STAGE: &'static str = "test";

        fn check(&self) -> Result<(), String> {
            ensure_unique_ids(self.items.iter().map(|i| i.id.as_str()))
        }
    }

    #[test]
    fn test_valid_payload_parses() {
        let batch: Batch =
            extract_and_validate("```json\n{\"items\": [{\"id\": \"A\", \"label\": \"x\"}]}\n```")
                .unwrap();
        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.items[0].id, "A");
    }

    #[test]
    fn test_truncated_json_is_malformed_and_keeps_raw() {
        let raw = "```json\n{\"items\": [{\"id\": \"A\", \"label\": \"x\"}]\n```";
        let err = extract_and_validate::<Batch>(raw).unwrap_err();
        assert_eq!(err.stage, "test");
        assert!(err.reason.starts_with("invalid JSON"), "{}", err.reason);
        assert_eq!(err.raw, raw);
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        let err = extract_and_validate::<Batch>(r#"{"items": [{"label": "no id"}]}"#).unwrap_err();
        assert!(err.reason.contains("missing field `id`"), "{}", err.reason);
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = extract_and_validate::<Batch>("[1, 2, 3]").unwrap_err();
        assert_eq!(err.reason, "expected a JSON object");
    }

    #[test]
    fn test_check_failure_rejects_whole_record() {
        let raw = r#"{"items": [{"id": "A", "label": "x"}, {"id": "A", "label": "y"}]}"#;
        let err = extract_and_validate::<Batch>(raw).unwrap_err();
        assert_eq!(err.reason, "duplicate id 'A'");
    }

    #[test]
    fn test_repeated_validation_is_deterministic() {
        let raw = "Sure!\n```json\n{\"items\": [{\"id\": \"B\", \"label\": \"y\"}]}\n```";
        let first: Batch = extract_and_validate(raw).unwrap();
        let second: Batch = extract_and_validate(raw).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_blank_id_rejected() {
        assert_eq!(
            ensure_unique_ids(["A", "  "]),
            Err("record with blank id".to_string())
        );
        assert!(ensure_unique_ids(["A", "B"]).is_ok());
    }
}
