pub mod assistants;
pub mod commands;
pub mod endpoints;
mod lenient;

pub use assistants::{
    AssistantStatus, CodingAssistant, InferenceServer, PlanningAssistant, ResourceSnapshot,
};
pub use commands::{AssistantQuery, AssistantReply, OpenProjectReceipt, OpenProjectRequest, ScanReceipt};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use lenient::{
    bool_or_false, count_map, f64_or_zero, null_as_default, string_list, string_or_empty,
    u64_or_zero,
};

/// One discovered project as reported by `GET /api/projects`.
///
/// Identity is the filesystem `path`; names are not guaranteed unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub path: String,
    #[serde(default, rename = "type", deserialize_with = "string_or_empty")]
    pub kind: String,
    #[serde(default, deserialize_with = "string_list")]
    pub stack: Vec<String>,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub health_score: f64,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub has_git: bool,
    #[serde(default)]
    pub git_status: Option<GitStatus>,
    #[serde(default, deserialize_with = "bool_or_false")]
    pub has_readme: bool,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub size: u64,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub last_modified: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub package_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub version: Option<String>,
}

impl ProjectSummary {
    /// Health clamped to the 0-100 band and rounded for display.
    pub fn health(&self) -> u8 {
        self.health_score.clamp(0.0, 100.0).round() as u8
    }

    pub fn pending_changes(&self) -> Option<u64> {
        self.git_status
            .as_ref()
            .filter(|status| status.has_changes)
            .map(|status| status.files_changed)
    }

    /// Badge text shown next to projects with uncommitted work.
    pub fn change_indicator(&self) -> Option<String> {
        self.pending_changes().map(|count| format!("{count} changes"))
    }

    pub fn display_kind(&self) -> &str {
        if self.kind.trim().is_empty() {
            "unknown"
        } else {
            self.kind.as_str()
        }
    }

    pub fn last_modified_at(&self) -> Option<NaiveDateTime> {
        let raw = self.last_modified.as_deref()?.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitStatus {
    #[serde(default, deserialize_with = "bool_or_false")]
    pub has_changes: bool,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub files_changed: u64,
}

/// Envelope returned by `GET /api/projects`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub projects: Vec<ProjectSummary>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub scanned_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub root_dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub total_projects: u64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub average_health: f64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub has_git: u64,
    #[serde(default, deserialize_with = "count_map")]
    pub tech_stack_breakdown: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "count_map")]
    pub project_types: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub has_readme: u64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub total_size_gb: f64,
}

impl AggregateStats {
    pub fn average_health_rounded(&self) -> u64 {
        if self.average_health.is_finite() && self.average_health > 0.0 {
            self.average_health.round() as u64
        } else {
            0
        }
    }

    pub fn tech_stack_count(&self) -> usize {
        self.tech_stack_breakdown.len()
    }

    /// Tech stacks ordered by descending project count, ties by name.
    pub fn tech_stack_entries(&self) -> Vec<(String, u64)> {
        ranked_entries(&self.tech_stack_breakdown)
    }

    pub fn project_type_entries(&self) -> Vec<(String, u64)> {
        ranked_entries(&self.project_types)
    }
}

fn ranked_entries(map: &BTreeMap<String, u64>) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = map
        .iter()
        .map(|(name, count)| (name.clone(), *count))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}
