use super::{MetadataSource, PageMetadata};
use crate::config::OpenGraphConfig;
use crate::{truncate_for_log, ExtractError};
use async_trait::async_trait;
use log::{error, warn};
use reqwest::{Client, Response, Url};
use std::time::Duration;

/// Client for the OpenGraph.io `site` endpoint
pub struct OpenGraphClient {
    client: Client,
    base_url: String,
    app_id: String,
}

impl OpenGraphClient {
    pub fn new(config: &OpenGraphConfig) -> Result<Self, ExtractError> {
        let app_id = config.resolve_api_key().ok_or_else(|| {
            ExtractError::BuilderError("OPENGRAPH_API_KEY not found in config or environment".into())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            app_id,
        })
    }

    /// `{base}/api/1.1/site/{url}` with every reserved character of the
    /// target URL percent-encoded, `:` and `=` included
    fn request_url(
        &self,
        target: &str,
        full_render: bool,
        use_proxy: bool,
    ) -> Result<Url, ExtractError> {
        let endpoint = format!(
            "{}/api/1.1/site/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(target)
        );
        let mut url = Url::parse(&endpoint)
            .map_err(|e| ExtractError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;

        url.query_pairs_mut()
            .append_pair("app_id", &self.app_id)
            .append_pair("full_render", &full_render.to_string())
            .append_pair("use_proxy", &use_proxy.to_string());

        Ok(url)
    }

    async fn fetch_with_params(
        &self,
        target: &str,
        full_render: bool,
        use_proxy: bool,
    ) -> Result<PageMetadata, ExtractError> {
        let url = self.request_url(target, full_render, use_proxy)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            log_error_response(
                response,
                &format!("full_render={full_render}, use_proxy={use_proxy}"),
            )
            .await;
            return Err(ExtractError::MetadataError(format!(
                "OpenGraph returned HTTP {status}"
            )));
        }

        Ok(response.json::<PageMetadata>().await?)
    }
}

/// Log status, headers and body of a failed call (quota problems show up
/// in the headers)
async fn log_error_response(response: Response, context: &str) {
    let status = response.status();
    let headers = format!("{:?}", response.headers());
    let body = response.text().await.unwrap_or_default();
    let body = if body.is_empty() {
        "(empty)".to_string()
    } else {
        truncate_for_log(&body, 2000)
    };

    error!(
        "[OpenGraph {}] status={}, headers={}, body={}",
        context, status, headers, body
    );
}

#[async_trait]
impl MetadataSource for OpenGraphClient {
    fn name(&self) -> &str {
        "opengraph"
    }

    /// Full render through the proxy first; any failure retries once with
    /// both disabled.
    async fn fetch(&self, url: &str) -> Result<PageMetadata, ExtractError> {
        match self.fetch_with_params(url, true, true).await {
            Ok(metadata) => Ok(metadata),
            Err(e) => {
                warn!(
                    "OpenGraph full render failed ({}), retrying with full_render=false, use_proxy=false",
                    e
                );
                self.fetch_with_params(url, false, false).await
            }
        }
    }
}
