//! Thin helpers that pin a base path and name common calls.

use serde::Serialize;

use crate::{ApiClient, ClientResult, Result};

/// Metrics endpoints under `<base>/metrics`.
#[derive(Clone, Debug)]
pub struct MetricsApi {
    client: ApiClient,
}

impl MetricsApi {
    pub const DEFAULT_PERIOD: &'static str = "30d";
    pub const DEFAULT_RANKING_LIMIT: u32 = 100;

    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.scoped("/metrics"),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn dashboard_data(&self) -> Result<ClientResult> {
        self.client.get("/dashboard", &[]).await
    }

    /// `period` defaults to [`Self::DEFAULT_PERIOD`].
    pub async fn traffic_data(&self, period: Option<&str>) -> Result<ClientResult> {
        let period = period.unwrap_or(Self::DEFAULT_PERIOD);
        self.client.get("/traffic", &[("period", period)]).await
    }

    /// `limit` defaults to [`Self::DEFAULT_RANKING_LIMIT`].
    pub async fn keyword_rankings(&self, limit: Option<u32>) -> Result<ClientResult> {
        let limit = limit.unwrap_or(Self::DEFAULT_RANKING_LIMIT).to_string();
        self.client
            .get("/keywords/rankings", &[("limit", limit.as_str())])
            .await
    }
}

/// Content endpoints under `<base>/content`.
#[derive(Clone, Debug)]
pub struct ContentApi {
    client: ApiClient,
}

impl ContentApi {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.scoped("/content"),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn create_content<T: Serialize + ?Sized>(&self, data: &T) -> Result<ClientResult> {
        self.client.post("/", data).await
    }

    pub async fn update_content<T: Serialize + ?Sized>(
        &self,
        id: &str,
        data: &T,
    ) -> Result<ClientResult> {
        self.client.put(&format!("/{id}"), data).await
    }

    pub async fn publish_content(&self, id: &str) -> Result<ClientResult> {
        self.client
            .post(&format!("/{id}/publish"), &serde_json::json!({}))
            .await
    }

    pub async fn content_performance(&self, id: &str) -> Result<ClientResult> {
        self.client.get(&format!("/{id}/performance"), &[]).await
    }
}
