use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// The header name and value are validated once, at construction. The value
/// is marked sensitive so it never shows up in debug output.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .with_context(|| format!("invalid header name '{header_name}'"))?;
        let mut value = HeaderValue::from_str(key).context("API key is not a valid header value")?;
        value.set_sensitive(true);
        Ok(Self {
            inner,
            header_name,
            value,
        })
    }

    /// Convenience constructor that uses `Authorization: Bearer <token>`, the
    /// scheme Canvas access tokens use.
    pub fn bearer(inner: C, token: &str) -> Result<Self> {
        Self::new(inner, "Authorization", &format!("Bearer {token}"))
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header() {
        let client = ApiKey::bearer((), "abc123").unwrap();
        assert_eq!(client.header_name, "authorization");
        assert_eq!(client.value.to_str().unwrap(), "Bearer abc123");
        assert!(client.value.is_sensitive());
    }

    #[test]
    fn test_rejects_token_with_newline() {
        assert!(ApiKey::bearer((), "abc\n123").is_err());
    }

    #[test]
    fn test_rejects_bad_header_name() {
        assert!(ApiKey::new((), "bad header", "x").is_err());
    }
}
