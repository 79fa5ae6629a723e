//! HTTP implementation of the remote email service.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::RemoteConfig;
use crate::error::RemoteError;

use super::{
    ConfirmCopyRequest, ConfirmCopyResponse, GenerateRequest, GenerateResponse, RemoteApi,
    SlotStatusRow,
};

/// Remote email service over HTTP with optional bearer auth.
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<SecretString>,
}

impl HttpRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemoteError::Transport {
                endpoint: config.base_url.clone(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn check_status(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(RemoteError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

fn transport(endpoint: &str, e: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    }
}

fn malformed(endpoint: &str, e: reqwest::Error) -> RemoteError {
    RemoteError::MalformedPayload {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, RemoteError> {
        const ENDPOINT: &str = "/emails/generate";

        let response = self
            .authorize(self.client.post(self.url(ENDPOINT)).json(request))
            .send()
            .await
            .map_err(|e| transport(ENDPOINT, e))?;

        Self::check_status(ENDPOINT, response)
            .await?
            .json::<GenerateResponse>()
            .await
            .map_err(|e| malformed(ENDPOINT, e))
    }

    async fn confirm_copy(&self, request: &ConfirmCopyRequest) -> Result<(), RemoteError> {
        const ENDPOINT: &str = "/emails/confirm-copy";

        let response = self
            .authorize(self.client.post(self.url(ENDPOINT)).json(request))
            .send()
            .await
            .map_err(|e| transport(ENDPOINT, e))?;

        let body: ConfirmCopyResponse = Self::check_status(ENDPOINT, response)
            .await?
            .json()
            .await
            .map_err(|e| malformed(ENDPOINT, e))?;

        if body.success {
            Ok(())
        } else {
            Err(RemoteError::Rejected {
                endpoint: ENDPOINT.to_string(),
                reason: body
                    .error
                    .unwrap_or_else(|| "confirm-copy was not successful".to_string()),
            })
        }
    }

    async fn fetch_states(&self, prospect_id: &str) -> Result<Vec<SlotStatusRow>, RemoteError> {
        let endpoint = format!("/prospects/{prospect_id}/email-states");

        let response = self
            .authorize(self.client.get(self.url(&endpoint)))
            .send()
            .await
            .map_err(|e| transport(&endpoint, e))?;

        Self::check_status(&endpoint, response)
            .await?
            .json::<Vec<SlotStatusRow>>()
            .await
            .map_err(|e| malformed(&endpoint, e))
    }
}
