use serde::{Deserialize, Serialize};

/// Body of `GET /health-check` on success.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub success: bool,
    pub root_id: String,
}

impl HealthReport {
    pub fn ok(root_id: impl Into<String>) -> Self {
        Self { success: true, root_id: root_id.into() }
    }
}

/// `{ "success": true }`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SuccessBody {
    pub success: bool,
}

impl SuccessBody {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// `{ "error": "..." }`, the body of every non-2xx JSON response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}
