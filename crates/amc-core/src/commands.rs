//! Request and reply bodies for the one-shot commands.

use serde::{Deserialize, Serialize};

use crate::lenient::{bool_or_false, string_or_empty, u64_or_zero};

/// Reply to `POST /api/scan`. The body is optional; an empty 2xx reply
/// decodes to a successful receipt with no details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReceipt {
    #[serde(default = "default_true", deserialize_with = "bool_or_false")]
    pub success: bool,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub projects_found: u64,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub message: String,
}

impl Default for ScanReceipt {
    fn default() -> Self {
        Self {
            success: true,
            projects_found: 0,
            message: String::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenProjectRequest {
    pub project_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenProjectReceipt {
    #[serde(default, deserialize_with = "bool_or_false")]
    pub success: bool,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantQuery {
    pub prompt: String,
    #[serde(default)]
    pub project_context: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantReply {
    #[serde(default, deserialize_with = "bool_or_false")]
    pub success: bool,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub response: String,
}
