//! Request and result types for the generation service.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ReconcileError;

/// Request body sent to the generation service.
///
/// Research requests carry `persona`; refresh requests may carry
/// `existing_data` with the previous document for the business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub business_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

impl GenerationRequest {
    /// Create a request for a business with no extra context.
    pub fn new(business_name: impl Into<String>) -> Self {
        Self {
            business_name: business_name.into(),
            existing_data: None,
            persona: None,
        }
    }

    /// Attach the previous document as context.
    pub fn with_existing_data(mut self, existing: Value) -> Self {
        self.existing_data = Some(existing);
        self
    }

    /// Attach the target personas.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }
}

/// Validated output of the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedResult {
    pub list_of_keywords: Vec<String>,
    pub list_of_ad_text: Vec<String>,
    pub list_of_paths_taken: Option<Vec<String>>,
    pub business: Option<Value>,
    pub user_personas: Option<Value>,
}

impl GeneratedResult {
    /// Validates a raw response body.
    ///
    /// `keywords` and `ad_text_variations` are accepted in place of
    /// `list_of_keywords` and `list_of_ad_text`. Optional fields that are
    /// absent or null come back as `None`.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::MissingField` naming the first absent required
    /// field, or `ReconcileError::InvalidField` if a list has the wrong shape.
    pub fn from_value(value: Value) -> Result<Self, ReconcileError> {
        let Value::Object(mut fields) = value else {
            return Err(ReconcileError::NotAnObject);
        };

        let keywords = take_present(&mut fields, "list_of_keywords")
            .or_else(|| take_present(&mut fields, "keywords"))
            .ok_or(ReconcileError::MissingField("list_of_keywords"))?;
        let ad_text = take_present(&mut fields, "list_of_ad_text")
            .or_else(|| take_present(&mut fields, "ad_text_variations"))
            .ok_or(ReconcileError::MissingField("list_of_ad_text"))?;

        let list_of_paths_taken = take_present(&mut fields, "list_of_paths_taken")
            .map(|paths| string_list(paths, "list_of_paths_taken"))
            .transpose()?;

        Ok(Self {
            list_of_keywords: string_list(keywords, "list_of_keywords")?,
            list_of_ad_text: string_list(ad_text, "list_of_ad_text")?,
            list_of_paths_taken,
            business: take_present(&mut fields, "business"),
            user_personas: take_present(&mut fields, "user_personas"),
        })
    }

    /// The full document stored on insert. Absent optional fields become null.
    pub fn to_document(&self, written_on: NaiveDate) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert(
            "list_of_keywords".to_string(),
            Value::from(self.list_of_keywords.clone()),
        );
        doc.insert(
            "list_of_ad_text".to_string(),
            Value::from(self.list_of_ad_text.clone()),
        );
        doc.insert(
            "list_of_paths_taken".to_string(),
            self.list_of_paths_taken
                .clone()
                .map(Value::from)
                .unwrap_or(Value::Null),
        );
        doc.insert(
            "business".to_string(),
            self.business.clone().unwrap_or(Value::Null),
        );
        doc.insert(
            "user_personas".to_string(),
            self.user_personas.clone().unwrap_or(Value::Null),
        );
        doc.insert(
            "date_written".to_string(),
            DateWritten::from(written_on).to_value(),
        );
        doc
    }

    /// The subset overwritten when an existing document is updated.
    pub fn to_update_fields(&self, written_on: NaiveDate) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(
            "list_of_keywords".to_string(),
            Value::from(self.list_of_keywords.clone()),
        );
        fields.insert(
            "list_of_ad_text".to_string(),
            Value::from(self.list_of_ad_text.clone()),
        );
        fields.insert(
            "date_written".to_string(),
            DateWritten::from(written_on).to_value(),
        );
        fields
    }
}

/// Calendar stamp stored with every document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWritten {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DateWritten {
    fn to_value(self) -> Value {
        serde_json::json!({
            "year": self.year,
            "month": self.month,
            "day": self.day,
        })
    }
}

impl From<NaiveDate> for DateWritten {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

fn take_present(fields: &mut Map<String, Value>, key: &str) -> Option<Value> {
    fields.remove(key).filter(|value| !value.is_null())
}

fn string_list(value: Value, field: &'static str) -> Result<Vec<String>, ReconcileError> {
    serde_json::from_value(value).map_err(|e| ReconcileError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 14).unwrap()
    }

    #[test]
    fn test_request_skips_absent_context() {
        let body = serde_json::to_value(GenerationRequest::new("Acme")).unwrap();
        assert_eq!(body, json!({"business_name": "Acme"}));

        let body = serde_json::to_value(
            GenerationRequest::new("Acme").with_persona("commuters, racers"),
        )
        .unwrap();
        assert_eq!(
            body,
            json!({"business_name": "Acme", "persona": "commuters, racers"})
        );
    }

    #[test]
    fn test_from_value_with_all_fields() {
        let result = GeneratedResult::from_value(json!({
            "list_of_keywords": ["bike", "repair"],
            "list_of_ad_text": ["Fix it fast"],
            "list_of_paths_taken": ["search"],
            "business": {"name": "Acme"},
            "user_personas": [{"name": "commuter"}],
        }))
        .unwrap();

        assert_eq!(result.list_of_keywords, vec!["bike", "repair"]);
        assert_eq!(result.list_of_paths_taken, Some(vec!["search".to_string()]));
        assert_eq!(result.business, Some(json!({"name": "Acme"})));
    }

    #[test]
    fn test_from_value_names_missing_field() {
        let err = GeneratedResult::from_value(json!({"list_of_keywords": []})).unwrap_err();
        assert!(matches!(err, ReconcileError::MissingField("list_of_ad_text")));

        let err = GeneratedResult::from_value(json!({"list_of_ad_text": []})).unwrap_err();
        assert!(matches!(err, ReconcileError::MissingField("list_of_keywords")));

        let err = GeneratedResult::from_value(json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(err, ReconcileError::NotAnObject));
    }

    #[test]
    fn test_from_value_accepts_legacy_names() {
        let result = GeneratedResult::from_value(json!({
            "keywords": ["a"],
            "ad_text_variations": ["b", "c"],
        }))
        .unwrap();
        assert_eq!(result.list_of_keywords, vec!["a"]);
        assert_eq!(result.list_of_ad_text, vec!["b", "c"]);
        assert!(result.business.is_none());
    }

    #[test]
    fn test_from_value_rejects_malformed_list() {
        let err = GeneratedResult::from_value(json!({
            "list_of_keywords": "bike",
            "list_of_ad_text": [],
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::InvalidField {
                field: "list_of_keywords",
                ..
            }
        ));
    }

    #[test]
    fn test_document_stores_absent_fields_as_null() {
        let result = GeneratedResult::from_value(json!({
            "list_of_keywords": ["a"],
            "list_of_ad_text": ["b"],
        }))
        .unwrap();

        let doc = result.to_document(date());
        assert_eq!(doc.get("business"), Some(&Value::Null));
        assert_eq!(doc.get("list_of_paths_taken"), Some(&Value::Null));
        assert_eq!(
            doc.get("date_written"),
            Some(&json!({"year": 2024, "month": 9, "day": 14}))
        );
        assert_eq!(doc.len(), 6);
    }

    #[test]
    fn test_update_fields_are_limited() {
        let result = GeneratedResult::from_value(json!({
            "list_of_keywords": ["a"],
            "list_of_ad_text": ["b"],
            "business": {"name": "ignored on update"},
        }))
        .unwrap();

        let fields = result.to_update_fields(date());
        let mut keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["date_written", "list_of_ad_text", "list_of_keywords"]);
    }
}
