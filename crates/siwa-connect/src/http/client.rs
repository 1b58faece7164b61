/*
[INPUT]:  HTTP configuration (base URL, timeouts)
[OUTPUT]: Configured reqwest client ready for JSON calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::http::{Result, SiwaError};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// JSON HTTP client bound to one base URL
#[derive(Debug, Clone)]
pub struct HttpClient {
    http_client: Client,
    base_url: Url,
}

impl HttpClient {
    pub fn new(base_url: &str, config: &ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build request builder for an endpoint relative to the base URL
    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// Send a request and decode a successful JSON body
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SiwaError::status_error(status, body));
        }
        Ok(response.json::<T>().await?)
    }

    /// Send a request without interpreting the status
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build()?;
        debug!(method = %request.method(), url = %request.url(), "sending request");
        Ok(self.http_client.execute(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_joins_endpoints() {
        let client = HttpClient::new("https://node.example.com", &ClientConfig::default()).unwrap();
        let request = client
            .request(Method::GET, "/v2/transactions/params")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://node.example.com/v2/transactions/params"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpClient::new("not a url", &ClientConfig::default()).unwrap_err();
        assert!(matches!(err, SiwaError::UrlParse(_)));
    }
}
