use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::error::SyncError;

/// Raw JSON exchange with the backend.
///
/// Implementations map network failures, non-2xx replies and unparseable
/// bodies onto [`SyncError`]. An empty reply body is `Value::Null`.
pub trait Transport: Send + Sync + 'static {
    fn get(&self, path: &str) -> impl Future<Output = Result<Value, SyncError>> + Send;

    fn post(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> impl Future<Output = Result<Value, SyncError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn get(&self, path: &str) -> impl Future<Output = Result<Value, SyncError>> + Send {
        self.as_ref().get(path)
    }

    fn post(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> impl Future<Output = Result<Value, SyncError>> + Send {
        self.as_ref().post(path, body)
    }
}
