use async_trait::async_trait;
use reqwest::header::{ACCEPT, ETAG, IF_NONE_MATCH};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::BootstrapConfig;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRequest {
    pub role_key: String,
    /// Last revalidation token; `None` forces a full transfer.
    pub if_none_match: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapResponse {
    Modified { body: Value, etag: Option<String> },
    NotModified,
}

/// Fetches the bootstrap payload. Exactly one request per call; retries
/// belong to callers.
#[async_trait]
pub trait BootstrapTransport: Send + Sync {
    async fn fetch(&self, request: &BootstrapRequest) -> AppResult<BootstrapResponse>;
}

/// Hook that turns the bootstrap path into the URL actually requested.
pub trait UrlResolver: Send + Sync {
    fn resolve(&self, path: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct BaseUrlResolver {
    base: String,
}

impl BaseUrlResolver {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl UrlResolver for BaseUrlResolver {
    fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

/// Conditional GET over reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, path: &str, resolver: Option<&dyn UrlResolver>) -> Self {
        let url = match resolver {
            Some(resolver) => resolver.resolve(path),
            None => path.to_string(),
        };
        Self { client, url }
    }

    pub fn from_config(config: &BootstrapConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| AppError::configuration(format!("failed to build http client: {err}")))?;
        let resolver = config.base_url.as_deref().map(BaseUrlResolver::new);
        Ok(Self::new(
            client,
            &config.path,
            resolver.as_ref().map(|r| r as &dyn UrlResolver),
        ))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BootstrapTransport for HttpTransport {
    async fn fetch(&self, request: &BootstrapRequest) -> AppResult<BootstrapResponse> {
        let mut builder = self.client.get(&self.url).header(ACCEPT, "application/json");
        if let Some(etag) = &request.if_none_match {
            builder = builder.header(IF_NONE_MATCH, etag.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            return Ok(BootstrapResponse::NotModified);
        }
        // 200 is the only status that carries a payload.
        if status != StatusCode::OK {
            return Err(AppError::status(status.as_u16()));
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|err| AppError::decode(format!("bootstrap body is not JSON: {err}")))?
        };

        Ok(BootstrapResponse::Modified { body, etag })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_resolver_joins_paths() {
        let resolver = BaseUrlResolver::new("http://api.local/");
        assert_eq!(resolver.resolve("/api/bootstrap"), "http://api.local/api/bootstrap");
        assert_eq!(resolver.resolve("https://other/x"), "https://other/x");
    }

    #[test]
    fn literal_path_without_resolver() {
        let transport = HttpTransport::new(reqwest::Client::new(), "/api/bootstrap", None);
        assert_eq!(transport.url(), "/api/bootstrap");
    }
}
