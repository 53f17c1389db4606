use std::time::Duration;

use fieldloom_core::{AppError, AppResult};
use reqwest::header;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

/// JSON client for the backend REST API.
///
/// Requests are sent once; failures surface as `AppError::Network` and are never retried.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl ApiClient {
    /// Creates a client for `base_url` with a request timeout.
    pub fn new(base_url: &str, bearer_token: Option<String>, timeout: Duration) -> AppResult<Self> {
        let base_url = Url::parse(base_url.trim()).map_err(|error| {
            AppError::Validation(format!("invalid API base URL '{base_url}': {error}"))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "API base URL '{base_url}' must be an http or https URL"
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            http_client,
            base_url,
            bearer_token: bearer_token
                .map(|token| token.trim().to_owned())
                .filter(|token| !token.is_empty()),
        })
    }

    /// Builds `{base}/{segments...}/` with each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AppError::Internal(format!(
                    "API base URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    /// Sends a GET request and decodes the JSON response body.
    pub async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> AppResult<T> {
        let endpoint = self.endpoint(segments)?;
        debug!(endpoint = %endpoint, "GET");
        let response = self
            .authorize(self.http_client.get(endpoint.clone()))
            .send()
            .await
            .map_err(|error| {
                AppError::Network(format!("failed to call '{endpoint}': {error}"))
            })?;

        let response = ensure_success(&endpoint, response).await?;
        response.json::<T>().await.map_err(|error| {
            AppError::Network(format!(
                "failed to parse response body of '{endpoint}': {error}"
            ))
        })
    }

    /// Sends a POST request with a JSON body, ignoring the response body.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> AppResult<()> {
        let endpoint = self.endpoint(segments)?;
        debug!(endpoint = %endpoint, "POST");
        let response = self
            .authorize(self.http_client.post(endpoint.clone()))
            .json(body)
            .send()
            .await
            .map_err(|error| {
                AppError::Network(format!("failed to call '{endpoint}': {error}"))
            })?;

        ensure_success(&endpoint, response).await?;
        Ok(())
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }
}

async fn ensure_success(endpoint: &Url, response: reqwest::Response) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_owned());
    warn!(endpoint = %endpoint, status = status.as_u16(), "API request rejected");
    Err(AppError::Network(format!(
        "'{endpoint}' returned status {}: {body}",
        status.as_u16()
    )))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ApiClient;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(base_url, None, Duration::from_secs(5)).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn endpoints_keep_base_path_and_trailing_slash() {
        let endpoint = client("https://erp.example.com/api/")
            .endpoint(&["role-management", "user", "roles"])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            endpoint.as_str(),
            "https://erp.example.com/api/role-management/user/roles/"
        );

        let endpoint = client("https://erp.example.com/api")
            .endpoint(&["field-attributes-schema"])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            endpoint.as_str(),
            "https://erp.example.com/api/field-attributes-schema/"
        );
    }

    #[test]
    fn endpoint_segments_are_percent_encoded() {
        let endpoint = client("http://127.0.0.1:8000")
            .endpoint(&["sop-steps", "step 1/a", "form-fields"])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(
            endpoint.as_str(),
            "http://127.0.0.1:8000/sop-steps/step%201%2Fa/form-fields/"
        );
    }

    #[test]
    fn non_http_base_urls_are_rejected() {
        let result = ApiClient::new("ftp://example.com", None, Duration::from_secs(5));
        assert!(result.is_err());
        let result = ApiClient::new("not a url", None, Duration::from_secs(5));
        assert!(result.is_err());
    }
}
