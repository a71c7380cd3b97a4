//! Backend routes, relative to the configured base URL.

pub const PROJECTS: &str = "/api/projects";
pub const STATS: &str = "/api/stats";
pub const AI_STATUS: &str = "/api/ai-status";
pub const SYSTEM_RESOURCES: &str = "/api/system-resources";
pub const SCAN: &str = "/api/scan";
pub const OPEN_PROJECT: &str = "/api/project/open-cline";
pub const AI_QUERY: &str = "/api/ai/query";

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
