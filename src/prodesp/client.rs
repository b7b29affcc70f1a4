use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::error::ProdespError;
use super::types::LookupQuery;
use crate::config::{ApiConfig, BehaviorConfig};

/// Key of the issued token in the authentication response.
const TOKEN_KEY: &str = "outAutenticacao";

/// The two calls the reconciliation engine makes against PRODESP.
///
/// Implemented by [`ProdespClient`] and by in-memory mocks in tests.
pub trait StudentLookup {
    /// Requests a fresh bearer token using the configured credentials.
    async fn authenticate(&self) -> Result<String, ProdespError>;

    /// Runs a phonetic search and returns the parsed JSON body, whatever
    /// its shape. Classification happens in [`classify`](super::classify).
    async fn lookup(&self, token: &str, query: &LookupQuery) -> Result<Value, ProdespError>;
}

pub struct ProdespClient {
    client: Client,
    auth_url: String,
    search_url: String,
    user: String,
    pass: String,
}

impl ProdespClient {
    pub fn new(api: &ApiConfig, behavior: &BehaviorConfig) -> Result<Self, ProdespError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(behavior.connect_timeout_secs))
            .timeout(Duration::from_secs(behavior.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            auth_url: format!("{}{}", api.base_url, api.auth_path),
            search_url: format!("{}{}", api.base_url, api.search_path),
            user: api.user.clone(),
            pass: api.pass.clone(),
        })
    }

    // The service answers errors (including 401) with a JSON body, so the
    // status code alone says nothing; parse first and let callers decide.
    async fn read_json(response: reqwest::Response) -> Result<Value, ProdespError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProdespError::Decode {
            status,
            message: e.to_string(),
        })
    }
}

impl StudentLookup for ProdespClient {
    async fn authenticate(&self) -> Result<String, ProdespError> {
        let response = self
            .client
            .get(&self.auth_url)
            .basic_auth(&self.user, Some(&self.pass))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = Self::read_json(response).await?;

        match body.get(TOKEN_KEY).and_then(Value::as_str) {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(ProdespError::MissingToken {
                status,
                body: body.to_string(),
            }),
        }
    }

    async fn lookup(&self, token: &str, query: &LookupQuery) -> Result<Value, ProdespError> {
        debug!(url = %self.search_url, name = %query.name, "phonetic search");
        let response = self
            .client
            .get(&self.search_url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        Self::read_json(response).await
    }
}
