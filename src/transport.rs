use crate::error::{LumiereError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;

/// A fully built outbound call: endpoint, headers and JSON body.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl ProviderRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, request: &ProviderRequest) -> Result<HttpReply>;
}

#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build_headers(request: &ProviderRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| LumiereError::ConfigError(format!("bad header name: {}", e)))?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                LumiereError::ConfigError(format!("bad value for header {}: {}", name, e))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, request: &ProviderRequest) -> Result<HttpReply> {
        let response = self
            .client
            .post(&request.url)
            .headers(Self::build_headers(request)?)
            .json(&request.body)
            .send()
            .await
            .map_err(|e| LumiereError::TransportError(format!("request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| LumiereError::TransportError(format!("reading body failed: {}", e)))?;

        Ok(HttpReply {
            status,
            body: body.to_vec(),
        })
    }
}
