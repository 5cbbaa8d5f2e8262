//! PostgREST client
//!
//! Talks to the hosted database's REST endpoint (`{url}/rest/v1/{table}`).
//! Equality filters become `column=eq.value` query parameters, ordering
//! becomes `order=column.desc`. Every request carries the project `apikey`
//! and a bearer token, the user's access token when one is set so row-level
//! security applies.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};

use crate::remote::{Filter, OrderBy, RemoteStore};
use crate::shared::config::BackendConfig;
use crate::shared::error::{Result, StorageError};
use crate::shared::record::Record;

/// REST client of the hosted database
#[derive(Debug, Clone)]
pub struct RestRemote {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestRemote {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
        }
    }

    /// Authenticate requests as a signed-in user
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        let remote = Self::new(config.url.clone(), config.anon_key.clone());
        match &config.access_token {
            Some(token) => remote.with_access_token(token.clone()),
            None => remote,
        }
    }

    /// Full URL of a table endpoint
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    /// Turn a non-success response into [`StorageError::Remote`]
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(StorageError::remote(status.as_u16(), body))
    }
}

fn filter_params(filter: &Filter) -> Vec<(String, String)> {
    filter
        .conditions()
        .iter()
        .map(|(column, value)| (column.clone(), format!("eq.{}", value)))
        .collect()
}

#[async_trait]
impl RemoteStore for RestRemote {
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Record>> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filter_params(filter));
        if let Some(order) = order {
            let direction = if order.descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }

        let response = self.request(Method::GET, table).query(&params).send().await?;
        let rows = Self::check(response).await?.json::<Vec<Record>>().await?;
        tracing::debug!("Selected {} rows from {}", rows.len(), table);
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Record) -> Result<()> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update(&self, table: &str, filter: &Filter, changes: Record) -> Result<()> {
        let response = self
            .request(Method::PATCH, table)
            .header("Prefer", "return=minimal")
            .query(&filter_params(filter))
            .json(&changes)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<()> {
        let response = self
            .request(Method::DELETE, table)
            .query(&filter_params(filter))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
