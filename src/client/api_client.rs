/// Resilient API client.
///
/// Wraps every outbound call to the booking API. When an authorized request
/// comes back 401, the client exchanges its token pair at the refresh
/// endpoint and replays the original request exactly once with the new
/// credential. A failed refresh clears the token provider and surfaces
/// `ClientError::AuthExpired`; the original request is aborted, never
/// retried in a loop.

use reqwest::{Method, StatusCode};
use std::fmt;
use std::sync::Arc;

use crate::api_response::ApiResponse;
use crate::auth::TokenPair;
use crate::client::token_provider::TokenProvider;

/// Failure the caller cannot recover from within the request: the session's
/// refresh flow is exhausted and the caller must sign in again. Every other
/// failure arrives as an unsuccessful `ApiResponse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    AuthExpired,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::AuthExpired => write!(f, "Session expired; sign in again"),
        }
    }
}

impl std::error::Error for ClientError {}

/// One logical request to the API.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the client's base URL, e.g. "/api/v2/villas".
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// Attach the stored access token as a bearer credential.
    pub with_bearer: bool,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
            with_bearer: true,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
            with_bearer: true,
        }
    }

    pub fn without_bearer(mut self) -> Self {
        self.with_bearer = false;
        self
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenProvider>,
}

impl ApiClient {
    pub fn new(base_url: String, tokens: Arc<TokenProvider>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// Send one logical request, refreshing the access token at most once.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let current = self.tokens.get();

        let response = match self.dispatch(&request, current.as_ref()).await {
            Ok(response) => response,
            Err(e) => return Ok(ApiResponse::failure(e.to_string())),
        };

        if response.status() != StatusCode::UNAUTHORIZED || !request.with_bearer {
            return Ok(Self::read_envelope(response).await);
        }

        let pair = match current {
            Some(pair) => pair,
            // Nothing to refresh with; hand the 401 back.
            None => return Ok(Self::read_envelope(response).await),
        };

        let refreshed = self.invoke_refresh(&pair).await?;
        // Persist before rebuilding so the retry reads the new credential.
        self.tokens.set(refreshed);
        let retry_pair = self.tokens.get();

        match self.dispatch(&request, retry_pair.as_ref()).await {
            Ok(response) => Ok(Self::read_envelope(response).await),
            Err(e) => Ok(ApiResponse::failure(e.to_string())),
        }
    }

    /// POST /api/v2/UsersAuth/login; the returned pair is stored on success.
    pub async fn login(
        &self,
        user_name: &str,
        password: &str,
    ) -> Result<ApiResponse, ClientError> {
        let body = serde_json::json!({ "userName": user_name, "password": password });
        let response = self
            .send(ApiRequest::post("/api/v2/UsersAuth/login", body).without_bearer())
            .await?;

        if response.is_success {
            if let Some(pair) = response
                .result
                .clone()
                .and_then(|v| serde_json::from_value::<TokenPair>(v).ok())
            {
                self.tokens.set(pair);
            }
        }

        Ok(response)
    }

    /// POST /api/v2/UsersAuth/register. No tokens are stored; the caller
    /// follows up with `login`.
    pub async fn register(
        &self,
        user_name: &str,
        password: &str,
        name: &str,
        role: &str,
    ) -> Result<ApiResponse, ClientError> {
        let body = serde_json::json!({
            "userName": user_name,
            "password": password,
            "name": name,
            "role": role,
        });
        self.send(ApiRequest::post("/api/v2/UsersAuth/register", body).without_bearer())
            .await
    }

    /// POST /api/v2/UsersAuth/revoke with the stored pair, then drop it.
    pub async fn logout(&self) -> Result<ApiResponse, ClientError> {
        let response = match self.tokens.get() {
            Some(pair) => {
                let body = serde_json::to_value(&pair).unwrap_or(serde_json::Value::Null);
                self.send(ApiRequest::post("/api/v2/UsersAuth/revoke", body).without_bearer())
                    .await?
            }
            None => ApiResponse::accepted(),
        };

        self.tokens.clear();
        Ok(response)
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        tokens: Option<&TokenPair>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .http_client
            .request(request.method.clone(), url)
            .header("Accept", "application/json");

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if request.with_bearer {
            if let Some(pair) = tokens {
                builder = builder.bearer_auth(&pair.access_token);
            }
        }

        builder.send().await
    }

    /// Exchange the current pair at the refresh endpoint. Any failure —
    /// transport, non-success envelope, unusable payload — terminates the
    /// session: the stored pair is cleared and `AuthExpired` is returned.
    async fn invoke_refresh(&self, pair: &TokenPair) -> Result<TokenPair, ClientError> {
        let url = format!("{}/api/v2/UsersAuth/refresh", self.base_url);

        let envelope: Option<ApiResponse> = match self
            .http_client
            .post(&url)
            .header("Accept", "application/json")
            .json(pair)
            .send()
            .await
        {
            Ok(response) => response.json().await.ok(),
            Err(e) => {
                tracing::warn!("Refresh call failed: {}", e);
                None
            }
        };

        let refreshed = envelope
            .filter(|e| e.is_success)
            .and_then(|e| e.result)
            .and_then(|v| serde_json::from_value::<TokenPair>(v).ok())
            .filter(|p| !p.access_token.is_empty());

        match refreshed {
            Some(new_pair) => Ok(new_pair),
            None => {
                tracing::warn!("Refresh exchange denied; terminating session");
                self.tokens.clear();
                Err(ClientError::AuthExpired)
            }
        }
    }

    async fn read_envelope(response: reqwest::Response) -> ApiResponse {
        match response.status() {
            StatusCode::NOT_FOUND => ApiResponse::failure("Not Found"),
            StatusCode::FORBIDDEN => ApiResponse::failure("Forbidden"),
            StatusCode::UNAUTHORIZED => ApiResponse::failure("Unauthorized"),
            StatusCode::INTERNAL_SERVER_ERROR => ApiResponse::failure("Internal Server Error"),
            _ => response
                .json::<ApiResponse>()
                .await
                .unwrap_or_else(|e| ApiResponse::failure(format!("Malformed response: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builders_set_bearer_flag() {
        let get = ApiRequest::get("/api/v2/villas");
        assert!(get.with_bearer);
        assert_eq!(get.method, Method::GET);

        let post = ApiRequest::post("/api/v2/UsersAuth/login", serde_json::json!({}))
            .without_bearer();
        assert!(!post.with_bearer);
        assert_eq!(post.method, Method::POST);
    }
}
