use amc_core::{
    endpoints, AggregateStats, AssistantQuery, AssistantReply, AssistantStatus,
    OpenProjectReceipt, OpenProjectRequest, ProjectList, ProjectSummary, ResourceSnapshot,
    ScanReceipt,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::error::SyncError;
use crate::transport::Transport;

/// Typed view of the backend routes on top of a raw [`Transport`].
#[derive(Clone, Debug)]
pub struct DashboardApi<T> {
    transport: T,
}

impl<T: Transport> DashboardApi<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn projects(&self) -> Result<Vec<ProjectSummary>, SyncError> {
        let list: ProjectList = self.get_typed(endpoints::PROJECTS).await?;
        Ok(list.projects)
    }

    pub async fn stats(&self) -> Result<AggregateStats, SyncError> {
        self.get_typed(endpoints::STATS).await
    }

    pub async fn ai_status(&self) -> Result<AssistantStatus, SyncError> {
        self.get_typed(endpoints::AI_STATUS).await
    }

    pub async fn system_resources(&self) -> Result<ResourceSnapshot, SyncError> {
        self.get_typed(endpoints::SYSTEM_RESOURCES).await
    }

    pub async fn project_detail(&self, name: &str) -> Result<ProjectSummary, SyncError> {
        let path = project_detail_path(name)?;
        self.get_typed(&path).await
    }

    pub async fn scan(&self) -> Result<ScanReceipt, SyncError> {
        let value = self.transport.post(endpoints::SCAN, None).await?;
        if value.is_null() {
            return Ok(ScanReceipt::default());
        }
        decode(endpoints::SCAN, value)
    }

    pub async fn open_project(&self, project_path: &str) -> Result<OpenProjectReceipt, SyncError> {
        let request = OpenProjectRequest {
            project_path: project_path.to_string(),
        };
        let body = serde_json::to_value(&request)
            .map_err(|err| SyncError::InvalidRequest(err.to_string()))?;
        let value = self
            .transport
            .post(endpoints::OPEN_PROJECT, Some(body))
            .await?;
        if value.is_null() {
            return Ok(OpenProjectReceipt {
                success: true,
                message: String::new(),
            });
        }
        decode(endpoints::OPEN_PROJECT, value)
    }

    pub async fn ask(&self, query: &AssistantQuery) -> Result<AssistantReply, SyncError> {
        let body =
            serde_json::to_value(query).map_err(|err| SyncError::InvalidRequest(err.to_string()))?;
        let value = self.transport.post(endpoints::AI_QUERY, Some(body)).await?;
        decode(endpoints::AI_QUERY, value)
    }

    async fn get_typed<R: DeserializeOwned>(&self, path: &str) -> Result<R, SyncError> {
        let value = self.transport.get(path).await?;
        decode(path, value)
    }
}

fn decode<R: DeserializeOwned>(path: &str, value: Value) -> Result<R, SyncError> {
    if !value.is_object() {
        return Err(SyncError::decode(path, "expected a JSON object"));
    }
    serde_json::from_value(value).map_err(|err| SyncError::decode(path, err))
}

/// `/api/projects/{name}` with the name percent-encoded as one path segment.
pub fn project_detail_path(name: &str) -> Result<String, SyncError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SyncError::InvalidRequest("project name is empty".to_string()));
    }
    let mut url = Url::parse("http://backend.invalid")
        .map_err(|err| SyncError::InvalidRequest(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| SyncError::InvalidRequest("cannot build project path".to_string()))?
        .pop_if_empty()
        .extend(["api", "projects", trimmed]);
    Ok(url.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_path_encodes_name() {
        assert_eq!(
            project_detail_path("demo").expect("path"),
            "/api/projects/demo"
        );
        assert_eq!(
            project_detail_path("my app").expect("path"),
            "/api/projects/my%20app"
        );
        assert_eq!(
            project_detail_path("a/b").expect("path"),
            "/api/projects/a%2Fb"
        );
        assert!(project_detail_path("  ").is_err());
    }

    #[test]
    fn decode_rejects_non_object_bodies() {
        let err = decode::<AggregateStats>("/api/stats", Value::Array(Vec::new())).unwrap_err();
        assert_eq!(err.kind(), "decode");
        let err = decode::<AggregateStats>("/api/stats", Value::Null).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }
}
