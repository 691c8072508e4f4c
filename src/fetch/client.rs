use async_trait::async_trait;
use reqwest::{Request, Response};

/// Seam over the HTTP transport so credentials and test doubles can wrap it.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
