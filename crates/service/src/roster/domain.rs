use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ServiceError;

pub const ROSTER_FILE: &str = "students.json";
pub const METADATA_FILE: &str = "meta.json";

/// Student records are opaque; only the surrounding array is checked.
pub type Roster = Vec<Value>;

/// Validated body of a save request.
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolRoster {
    pub school_name: String,
    pub students: Roster,
}

impl SchoolRoster {
    /// Accepts `{ "schoolName": <non-empty string>, "students": <array> }`.
    /// Extra fields are ignored.
    pub fn from_value(body: &Value) -> Result<Self, ServiceError> {
        let school_name = match body.get("schoolName") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(ServiceError::InvalidPayload("schoolName must be a non-empty string".into())),
        };
        let students = match body.get("students") {
            Some(Value::Array(items)) => items.clone(),
            _ => return Err(ServiceError::InvalidPayload("students must be an array".into())),
        };
        Ok(Self { school_name, students })
    }
}

/// Contents of `meta.json`, rewritten on every save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub school_name: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Outcome of reading a school's roster.
#[derive(Debug, Clone, PartialEq)]
pub enum RosterRead {
    Saved(Roster),
    /// No `students.json` in the school folder.
    NeverSaved,
}

impl RosterRead {
    pub fn into_students(self) -> Roster {
        match self {
            RosterRead::Saved(r) => r,
            RosterRead::NeverSaved => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_well_formed_body() -> Result<(), anyhow::Error> {
        let r = SchoolRoster::from_value(&json!({
            "schoolName": "Lincoln High",
            "students": [{"id": 1, "name": "Ann"}],
            "extra": true
        }))?;
        assert_eq!(r.school_name, "Lincoln High");
        assert_eq!(r.students, vec![json!({"id": 1, "name": "Ann"})]);
        Ok(())
    }

    #[test]
    fn rejects_malformed_bodies() {
        let cases = [
            json!({"students": []}),
            json!({"schoolName": "", "students": []}),
            json!({"schoolName": 7, "students": []}),
            json!({"schoolName": "A"}),
            json!({"schoolName": "A", "students": {"0": "x"}}),
            json!([1, 2]),
        ];
        for body in cases {
            let err = SchoolRoster::from_value(&body).unwrap_err();
            assert!(matches!(err, ServiceError::InvalidPayload(_)), "{body}");
        }
    }

    #[test]
    fn metadata_serializes_camel_case() -> Result<(), anyhow::Error> {
        let m = Metadata { school_name: "A".into(), uploaded_at: "2024-05-01T10:00:00Z".parse()? };
        assert_eq!(
            serde_json::to_value(&m)?,
            json!({"schoolName": "A", "uploadedAt": "2024-05-01T10:00:00Z"})
        );
        Ok(())
    }
}
