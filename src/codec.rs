//! Wire <-> entity conversion for analysis results and stored history.
//!
//! Payloads from the engine and from the history store are untrusted. Every
//! required field is checked by name before serde sees the value, so a
//! rejection names the field that was missing.

use serde_json::Value;

use crate::models::{AnalysisResult, HistoryEntry};

/// Fields every analysis result payload must carry.
pub const REQUIRED_FIELDS: &[&str] = &[
    "triage_level",
    "reasoning",
    "symptoms",
    "safety_alerts",
    "recommendations",
    "disclaimer",
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("Payload is not a JSON object")]
    NotAnObject,
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid result shape: {0}")]
    InvalidShape(String),
    #[error("Invalid JSON: {0}")]
    Json(String),
}

/// Parse an engine payload into a typed result.
pub fn decode(payload: Value) -> Result<AnalysisResult, CodecError> {
    check_required(&payload)?;
    serde_json::from_value(payload).map_err(|e| CodecError::InvalidShape(e.to_string()))
}

/// Parse raw response text.
pub fn decode_str(text: &str) -> Result<AnalysisResult, CodecError> {
    let payload: Value = serde_json::from_str(text).map_err(|e| CodecError::Json(e.to_string()))?;
    decode(payload)
}

/// Inverse of [`decode`].
pub fn encode(result: &AnalysisResult) -> Value {
    // Every field is a string, a list, or an optional float: this cannot fail.
    serde_json::to_value(result).unwrap_or(Value::Null)
}

/// Parse a stored history array. Any bad entry rejects the whole array.
pub fn decode_history(text: &str) -> Result<Vec<HistoryEntry>, CodecError> {
    let payload: Value = serde_json::from_str(text).map_err(|e| CodecError::Json(e.to_string()))?;
    let Value::Array(items) = payload else {
        return Err(CodecError::InvalidShape("history is not an array".into()));
    };

    items
        .into_iter()
        .map(|item| {
            check_required(&item)?;
            if item.get("date").and_then(Value::as_str).is_none() {
                return Err(CodecError::MissingField("date"));
            }
            serde_json::from_value(item).map_err(|e| CodecError::InvalidShape(e.to_string()))
        })
        .collect()
}

/// Serialize history for the durable store.
pub fn encode_history(entries: &[HistoryEntry]) -> Result<String, CodecError> {
    serde_json::to_string(entries).map_err(|e| CodecError::Json(e.to_string()))
}

fn check_required(payload: &Value) -> Result<(), CodecError> {
    let object = payload.as_object().ok_or(CodecError::NotAnObject)?;
    for &field in REQUIRED_FIELDS {
        match object.get(field) {
            None | Some(Value::Null) => return Err(CodecError::MissingField(field)),
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SafetyAlert, TriageLevel};
    use serde_json::json;

    fn full_payload() -> Value {
        json!({
            "triage_level": "URGENT",
            "reasoning": "Possible NSAID-related GI bleed",
            "symptoms": [
                {"name": "abdominal pain", "severity": "severe", "duration": "2 days"},
                {"name": "nausea", "severity": "mild"}
            ],
            "safety_alerts": [
                {"med_a": "Aspirin", "med_b": "Ibuprofen", "risk": "Increased risk of stomach ulcers and bleeding", "severity": "HIGH"},
                {"med": "Warfarin", "risk": "Risk of internal bleeding", "condition": "Ulcer", "severity": "CRITICAL"},
                {"med": "Ibuprofen", "risk": "NSAID sensitivity"}
            ],
            "recommendations": ["Stop ibuprofen", "Seek care within 24 hours"],
            "disclaimer": "Decision support only.",
            "confidence_score": 0.82
        })
    }

    #[test]
    fn decode_full_payload() {
        let result = decode(full_payload()).unwrap();
        assert_eq!(result.triage_level, TriageLevel::Urgent);
        assert_eq!(result.symptoms.len(), 2);
        assert_eq!(result.symptoms[0].duration(), Some("2 days"));
        assert_eq!(result.symptoms[1].duration, None);
        assert_eq!(result.confidence(), Some(0.82));

        assert!(matches!(
            &result.safety_alerts[0],
            SafetyAlert::Interaction { medication_a, medication_b, .. }
                if medication_a == "Aspirin" && medication_b == "Ibuprofen"
        ));
        assert_eq!(result.safety_alerts[1].condition(), Some("Ulcer"));
        assert_eq!(result.safety_alerts[1].severity(), Some("CRITICAL"));
        assert_eq!(result.safety_alerts[2], SafetyAlert::single("Ibuprofen", "NSAID sensitivity"));
    }

    #[test]
    fn encode_decode_round_trip_is_exact() {
        let payload = full_payload();
        let result = decode(payload.clone()).unwrap();
        assert_eq!(encode(&result), payload);
    }

    /// Shaped like a live engine reply: optional keys are sent as `null`
    /// and alerts may carry keys the client does not model.
    fn engine_reply() -> Value {
        json!({
            "symptoms": [
                {"name": "nausea", "severity": "mild", "duration": null},
                {"name": "headache", "severity": "unknown", "duration": "3 hours"}
            ],
            "triage_level": "ROUTINE",
            "reasoning": "Mild symptoms without red flags",
            "recommendations": ["Hydrate", "Rest"],
            "safety_alerts": [
                {"med_a": "A", "med_b": "B", "risk": "R", "condition": "Ulcer"},
                {"med": "Ibuprofen", "risk": "NSAID sensitivity", "severity": null, "source": "rules"}
            ],
            "confidence_score": 0.64,
            "disclaimer": "Decision support only.",
            "model": "triage-v2"
        })
    }

    #[test]
    fn engine_reply_round_trip_is_exact() {
        let payload = engine_reply();
        let result = decode(payload.clone()).unwrap();
        assert_eq!(encode(&result), payload);
    }

    #[test]
    fn explicit_null_is_kept_apart_from_absent() {
        let result = decode(engine_reply()).unwrap();
        assert_eq!(result.symptoms[0].duration, Some(None));
        assert_eq!(result.symptoms[0].duration(), None);
        assert_eq!(result.symptoms[1].duration(), Some("3 hours"));
        assert_eq!(
            encode(&result)["symptoms"][0],
            json!({"name": "nausea", "severity": "mild", "duration": null})
        );
    }

    #[test]
    fn unmodeled_keys_are_written_back() {
        let result = decode(engine_reply()).unwrap();
        assert!(matches!(
            &result.safety_alerts[0],
            SafetyAlert::Interaction { extra, .. } if extra.get("condition") == Some(&json!("Ulcer"))
        ));
        assert_eq!(result.safety_alerts[0].condition(), None);
        assert_eq!(result.extra.get("model"), Some(&json!("triage-v2")));

        let encoded = encode(&result);
        assert_eq!(encoded["safety_alerts"][0]["condition"], json!("Ulcer"));
        assert_eq!(encoded["safety_alerts"][1]["source"], json!("rules"));
        assert_eq!(encoded["model"], json!("triage-v2"));
    }

    #[test]
    fn engine_reply_survives_history_storage() {
        let mut item = engine_reply();
        item["date"] = json!("2026-10-18T07:45:00.000Z");
        let stored = Value::Array(vec![item]);

        let decoded = decode_history(&stored.to_string()).unwrap();
        assert_eq!(decoded[0].date, "2026-10-18T07:45:00.000Z");
        assert!(!decoded[0].result.extra.contains_key("date"));

        let encoded: Value = serde_json::from_str(&encode_history(&decoded).unwrap()).unwrap();
        assert_eq!(encoded, stored);
    }

    #[test]
    fn minimal_payload_round_trips_without_optional_fields() {
        let payload = json!({
            "triage_level": "ROUTINE",
            "reasoning": "",
            "symptoms": [],
            "safety_alerts": [],
            "recommendations": [],
            "disclaimer": ""
        });
        assert_eq!(encode(&decode(payload.clone()).unwrap()), payload);
    }

    #[test]
    fn unknown_triage_level_round_trips() {
        let mut payload = full_payload();
        payload["triage_level"] = json!("SELF_CARE");
        let result = decode(payload.clone()).unwrap();
        assert_eq!(result.triage_level, TriageLevel::Unspecified("SELF_CARE".into()));
        assert_eq!(encode(&result), payload);
    }

    #[test]
    fn each_missing_required_field_is_rejected() {
        for field in REQUIRED_FIELDS {
            let mut payload = full_payload();
            payload.as_object_mut().unwrap().remove(*field);
            assert_eq!(decode(payload), Err(CodecError::MissingField(field)), "field {field}");
        }
    }

    #[test]
    fn null_required_field_is_rejected() {
        let mut payload = full_payload();
        payload["disclaimer"] = Value::Null;
        assert_eq!(decode(payload), Err(CodecError::MissingField("disclaimer")));
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        let mut payload = full_payload();
        payload["symptoms"] = json!("chest pain");
        assert!(matches!(decode(payload), Err(CodecError::InvalidShape(_))));

        let mut payload = full_payload();
        payload["safety_alerts"] = json!([{"risk": "no medication"}]);
        assert!(matches!(decode(payload), Err(CodecError::InvalidShape(_))));

        let mut payload = full_payload();
        payload["triage_level"] = json!(3);
        assert!(matches!(decode(payload), Err(CodecError::InvalidShape(_))));

        assert_eq!(decode(json!([1, 2])), Err(CodecError::NotAnObject));
    }

    #[test]
    fn decode_str_reports_bad_json() {
        assert!(matches!(decode_str("{not json"), Err(CodecError::Json(_))));
        assert!(decode_str(&full_payload().to_string()).is_ok());
    }

    #[test]
    fn history_round_trip_is_exact() {
        let entries: Vec<Value> = (0..5)
            .map(|i| {
                let mut item = full_payload();
                item["reasoning"] = json!(format!("entry {i}"));
                item["date"] = json!(format!("2026-02-0{}T09:30:00.000Z", i + 1));
                item
            })
            .collect();
        let stored = Value::Array(entries);

        let decoded = decode_history(&stored.to_string()).unwrap();
        assert_eq!(decoded.len(), 5);
        assert_eq!(decoded[0].result.reasoning, "entry 0");
        assert_eq!(decoded[4].date, "2026-02-05T09:30:00.000Z");

        let encoded: Value = serde_json::from_str(&encode_history(&decoded).unwrap()).unwrap();
        assert_eq!(encoded, stored);
    }

    #[test]
    fn history_entry_without_date_is_rejected() {
        let stored = Value::Array(vec![full_payload()]);
        assert_eq!(
            decode_history(&stored.to_string()),
            Err(CodecError::MissingField("date"))
        );
    }

    #[test]
    fn history_must_be_an_array() {
        assert!(matches!(
            decode_history("{\"date\": \"x\"}"),
            Err(CodecError::InvalidShape(_))
        ));
        assert_eq!(decode_history("[]"), Ok(vec![]));
    }
}
