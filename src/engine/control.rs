use serde::{Deserialize, Serialize};

/// Request accepted over the control channel.
///
/// Wire form: `{ "action": "toggleDistractions", "show": true }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ControlRequest {
    #[serde(rename = "toggleDistractions")]
    ToggleDistractions { show: bool },
}

/// Wire form: `{ "success": false, "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlResponse {
    pub fn ok() -> Self {
        ControlResponse {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        ControlResponse {
            success: false,
            error: Some(error.to_string()),
        }
    }
}
