use std::time::Duration;
use rquest::{Client, Response, RequestBuilder};
use rquest_util::Emulation;
use http::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use http::StatusCode;
use serde::Serialize;
use crate::error::{Error, Result};
use tracing::debug;

/// Shared HTTP client for the REST-backed auth and document adapters.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    headers: HeaderMap,
}

/// Maps a configured browser name onto an emulation profile.
pub fn emulation_for(name: &str) -> Emulation {
    match name.to_ascii_lowercase().as_str() {
        "firefox" => Emulation::Firefox136,
        "safari" => Emulation::Safari18_3,
        "edge" => Emulation::Edge134,
        _ => Emulation::Chrome133,
    }
}

impl HttpClient {
    /// `timeout` bounds every request, connecting included.
    pub fn new(emulation: Emulation, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("x-client-app", HeaderValue::from_static("dibantuin"));

        debug!(
            emulation = ?emulation,
            timeout_secs = timeout.as_secs(),
            "Creating client with emulation"
        );

        let client = Client::builder()
            .emulation(emulation)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, headers })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        let mut request = self.client.get(url);
        for (key, value) in self.headers.iter() {
            request = request.header(key, value);
        }
        request
    }

    pub fn post_json<T: Serialize>(&self, url: &str, body: &T) -> Result<RequestBuilder> {
        let payload = serde_json::to_vec(body)?;
        let mut request = self.client.post(url);
        for (key, value) in self.headers.iter() {
            request = request.header(key, value);
        }
        Ok(request
            .header(CONTENT_TYPE, "application/json")
            .body(payload))
    }

    pub fn with_bearer(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;

        debug!(
            status = response.status().as_u16(),
            url = %response.url(),
            "Response received"
        );

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                debug!("Rate limit exceeded");
                Err(Error::RateLimit)
            }
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                debug!(url = %response.url(), "Request was refused");
                Err(Error::Forbidden)
            }
            _ => Ok(response),
        }
    }
}
