use serde::{Deserialize, Serialize};

use crate::lenient::{bool_or_false, f64_or_zero, null_as_default, string_list, string_or_empty};

/// Availability of the three assistants the dashboard tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub desktop_commander: PlanningAssistant,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cline: CodingAssistant,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lmstudio: InferenceServer,
    #[serde(default, deserialize_with = "crate::lenient::optional_string")]
    pub timestamp: Option<String>,
}

/// Remote planning assistant (cloud hosted).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningAssistant {
    #[serde(default, deserialize_with = "bool_or_false")]
    pub available: bool,
    #[serde(default, rename = "type", deserialize_with = "string_or_empty")]
    pub kind: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub model: String,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub rate_limited: bool,
}

/// Local coding assistant; it is usable only while the inference server is up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodingAssistant {
    #[serde(default, deserialize_with = "bool_or_false")]
    pub configured: bool,
    #[serde(default, rename = "type", deserialize_with = "string_or_empty")]
    pub kind: String,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub connected: bool,
    #[serde(default, deserialize_with = "crate::lenient::optional_string")]
    pub model: Option<String>,
}

impl CodingAssistant {
    pub fn model_label(&self) -> &str {
        match self.model.as_deref() {
            Some(model) if !model.trim().is_empty() => model,
            _ => "Not loaded",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceServer {
    #[serde(default, deserialize_with = "bool_or_false")]
    pub online: bool,
    #[serde(default, deserialize_with = "string_list")]
    pub models: Vec<String>,
    #[serde(default, deserialize_with = "crate::lenient::optional_string")]
    pub active_model: Option<String>,
}

impl InferenceServer {
    pub fn loaded_models(&self) -> usize {
        self.models.len()
    }
}

/// Instantaneous host metrics from `GET /api/system-resources`.
///
/// The backend answers `{}` when sampling fails, which decodes to all zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub cpu_percent: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub memory_percent: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub memory_available_gb: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub disk_percent: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub disk_free_gb: f64,
}

impl ResourceSnapshot {
    pub fn cpu_ratio(&self) -> f64 {
        percent_ratio(self.cpu_percent)
    }

    pub fn memory_ratio(&self) -> f64 {
        percent_ratio(self.memory_percent)
    }

    pub fn disk_ratio(&self) -> f64 {
        percent_ratio(self.disk_percent)
    }
}

fn percent_ratio(value: f64) -> f64 {
    if value.is_finite() {
        (value / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
