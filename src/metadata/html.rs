use super::{ImageRef, MetadataSource, PageMetadata};
use crate::ExtractError;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

/// Reads Open Graph tags straight from the page when no metadata API is
/// available
pub struct HtmlMetaFetcher {
    client: Client,
}

impl HtmlMetaFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, ExtractError> {
        let timeout = timeout.unwrap_or(Duration::from_secs(30));
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; RottenRecipeBot/1.0)")
            .build()?;

        Ok(Self { client })
    }
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<scraper::ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    select_first(document, selector)
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

/// Extract description, image, title and site name from page HTML
pub fn parse_html_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    let description = meta_content(&document, r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="description"]"#));

    let title = meta_content(&document, r#"meta[property="og:title"]"#).or_else(|| {
        select_first(&document, "title")
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|title| !title.is_empty())
    });

    PageMetadata {
        title,
        description,
        og_image: meta_content(&document, r#"meta[property="og:image"]"#).map(ImageRef::Url),
        og_site_name: meta_content(&document, r#"meta[property="og:site_name"]"#),
        ..PageMetadata::default()
    }
}

#[async_trait]
impl MetadataSource for HtmlMetaFetcher {
    fn name(&self) -> &str {
        "html"
    }

    async fn fetch(&self, url: &str) -> Result<PageMetadata, ExtractError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ExtractError::MetadataError(format!(
                "Page request failed with status: {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        debug!("Fetched {} bytes of HTML from {}", html.len(), url);
        Ok(parse_html_metadata(&html))
    }
}
