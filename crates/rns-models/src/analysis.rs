//! Scene analysis result model.
//!
//! The hosted model is asked for a strict six-field JSON object. Replies are
//! validated field by field before they are accepted; a reply with any field
//! missing or of the wrong type is rejected as a whole.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Wire names of the required fields, in schema order.
pub const ANALYSIS_FIELDS: [&str; 6] = [
    "environment",
    "subjects",
    "lighting",
    "cinematography",
    "originalCar",
    "suggestedPrompt",
];

/// Reasons a model reply is not an acceptable analysis.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisParseError {
    #[error("Response is not valid JSON: {0}")]
    Malformed(String),

    #[error("Response is not a JSON object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field is not a string: {0}")]
    NotAString(&'static str),
}

/// Scene description produced by the analysis model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Setting of the scene (e.g. "snowy Antarctic tundra")
    pub environment: String,
    /// Main subjects in frame
    pub subjects: String,
    /// Lighting conditions
    pub lighting: String,
    /// Camera work (shot types, depth of field)
    pub cinematography: String,
    /// Description of the subject that will be replaced
    pub original_car: String,
    /// Scene prompt with the subject replaced by the placeholder token
    pub suggested_prompt: String,
}

impl AnalysisResult {
    /// Parse and validate a raw model reply.
    ///
    /// Accepts the object bare or wrapped in a Markdown code fence.
    pub fn from_json(text: &str) -> Result<Self, AnalysisParseError> {
        let text = strip_code_fence(text);
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AnalysisParseError::Malformed(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Validate an already-parsed JSON value.
    pub fn from_value(value: &Value) -> Result<Self, AnalysisParseError> {
        let object = value.as_object().ok_or(AnalysisParseError::NotAnObject)?;

        let field = |name: &'static str| -> Result<String, AnalysisParseError> {
            match object.get(name) {
                None | Some(Value::Null) => Err(AnalysisParseError::MissingField(name)),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(_) => Err(AnalysisParseError::NotAString(name)),
            }
        };

        Ok(Self {
            environment: field(ANALYSIS_FIELDS[0])?,
            subjects: field(ANALYSIS_FIELDS[1])?,
            lighting: field(ANALYSIS_FIELDS[2])?,
            cinematography: field(ANALYSIS_FIELDS[3])?,
            original_car: field(ANALYSIS_FIELDS[4])?,
            suggested_prompt: field(ANALYSIS_FIELDS[5])?,
        })
    }
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn desert() -> Value {
        json!({
            "environment": "desert",
            "subjects": "car",
            "lighting": "bright",
            "cinematography": "wide shot",
            "originalCar": "red sedan",
            "suggestedPrompt": "A wide shot of [TARGET_CAR] in the desert"
        })
    }

    #[test]
    fn test_parses_complete_reply() {
        let result = AnalysisResult::from_json(&desert().to_string()).unwrap();
        assert_eq!(result.environment, "desert");
        assert_eq!(result.original_car, "red sedan");
        assert_eq!(
            result.suggested_prompt,
            "A wide shot of [TARGET_CAR] in the desert"
        );
    }

    #[test]
    fn test_parses_fenced_reply() {
        let fenced = format!("```json\n{}\n```", desert());
        assert!(AnalysisResult::from_json(&fenced).is_ok());
    }

    #[test]
    fn test_each_missing_field_is_rejected() {
        for name in ANALYSIS_FIELDS {
            let mut value = desert();
            value.as_object_mut().unwrap().remove(name);
            assert_eq!(
                AnalysisResult::from_value(&value),
                Err(AnalysisParseError::MissingField(name))
            );
        }
    }

    #[test]
    fn test_null_and_non_string_fields_are_rejected() {
        let mut value = desert();
        value["lighting"] = Value::Null;
        assert_eq!(
            AnalysisResult::from_value(&value),
            Err(AnalysisParseError::MissingField("lighting"))
        );

        let mut value = desert();
        value["subjects"] = json!(["car", "penguins"]);
        assert_eq!(
            AnalysisResult::from_value(&value),
            Err(AnalysisParseError::NotAString("subjects"))
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            AnalysisResult::from_json("the scene is a desert"),
            Err(AnalysisParseError::Malformed(_))
        ));
        assert_eq!(
            AnalysisResult::from_json("[1, 2]"),
            Err(AnalysisParseError::NotAnObject)
        );
    }

    #[test]
    fn test_serializes_with_wire_names() {
        let result = AnalysisResult::from_value(&desert()).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, desert());
    }
}
