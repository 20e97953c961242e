mod html;
mod opengraph;

pub use html::{parse_html_metadata, HtmlMetaFetcher};
pub use opengraph::OpenGraphClient;

use crate::ExtractError;
use async_trait::async_trait;
use log::{info, warn};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

/// An image reference as metadata providers send it: a bare URL, an
/// object carrying `url`, or a list of either.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Object { url: Option<String> },
    Many(Vec<ImageRef>),
    Other(Value),
}

impl ImageRef {
    pub fn url(&self) -> Option<&str> {
        match self {
            ImageRef::Url(url) => Some(url.as_str()),
            ImageRef::Object { url } => url.as_deref(),
            ImageRef::Many(images) => images.iter().find_map(ImageRef::url),
            ImageRef::Other(_) => None,
        }
    }
}

/// One graph section of a metadata response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphSection {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageRef>,
    pub site_name: Option<String>,
}

/// Page metadata. Social-media posts usually carry the post body in
/// `hybridGraph`, so that section wins over `openGraph` and the root fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PageMetadata {
    #[serde(rename = "hybridGraph", default)]
    pub hybrid_graph: Option<GraphSection>,
    #[serde(rename = "openGraph", default)]
    pub open_graph: Option<GraphSection>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(rename = "og:image", default)]
    pub og_image: Option<ImageRef>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(rename = "og:site_name", default)]
    pub og_site_name: Option<String>,
}

fn first_non_empty<'a, I>(values: I) -> Option<&'a str>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    values
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
}

impl PageMetadata {
    fn sections(&self) -> [Option<&GraphSection>; 2] {
        [self.hybrid_graph.as_ref(), self.open_graph.as_ref()]
    }

    pub fn title(&self) -> Option<&str> {
        let [hybrid, open] = self.sections();
        first_non_empty([
            hybrid.and_then(|s| s.title.as_deref()),
            open.and_then(|s| s.title.as_deref()),
            self.title.as_deref(),
        ])
    }

    pub fn thumbnail(&self) -> Option<&str> {
        let [hybrid, open] = self.sections();
        first_non_empty([
            hybrid.and_then(|s| s.image.as_ref()).and_then(ImageRef::url),
            open.and_then(|s| s.image.as_ref()).and_then(ImageRef::url),
            self.og_image.as_ref().and_then(ImageRef::url),
            self.image.as_ref().and_then(ImageRef::url),
        ])
    }

    pub fn site_name(&self) -> Option<&str> {
        let [hybrid, open] = self.sections();
        first_non_empty([
            hybrid.and_then(|s| s.site_name.as_deref()),
            open.and_then(|s| s.site_name.as_deref()),
            self.site_name.as_deref(),
            self.og_site_name.as_deref(),
        ])
    }

    pub fn description(&self) -> Option<&str> {
        let [hybrid, open] = self.sections();
        first_non_empty([
            hybrid.and_then(|s| s.description.as_deref()),
            open.and_then(|s| s.description.as_deref()),
            self.description.as_deref(),
        ])
    }
}

/// Host of `url` without a leading `www.`, or "" when it has none
pub fn source_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .map(|host| host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
        .unwrap_or_default()
}

/// Fields of a recipe taken from page metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMetadata {
    pub title: String,
    pub thumbnail: String,
    pub source_name: String,
    /// Text handed to ingredient extraction
    pub analysis_text: String,
}

impl ResolvedMetadata {
    /// Pick each field by provider precedence. When the page has no
    /// description the real title becomes the analysis text, since
    /// social-media posts often put the whole caption there.
    pub fn resolve(metadata: &PageMetadata, url: &str, default_title: &str) -> Self {
        let title = metadata.title();
        let analysis_text = metadata
            .description()
            .or(title)
            .unwrap_or_default()
            .to_string();

        Self {
            title: title.unwrap_or(default_title).to_string(),
            thumbnail: metadata.thumbnail().unwrap_or_default().to_string(),
            source_name: metadata
                .site_name()
                .map(str::to_string)
                .unwrap_or_else(|| source_from_url(url)),
            analysis_text,
        }
    }
}

/// A service that can describe a web page
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, url: &str) -> Result<PageMetadata, ExtractError>;
}

/// Tries metadata sources in order, returning the first success
pub struct MetadataChain {
    sources: Vec<Box<dyn MetadataSource>>,
}

impl MetadataChain {
    pub fn new(sources: Vec<Box<dyn MetadataSource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn fetch(&self, url: &str) -> Result<PageMetadata, ExtractError> {
        let mut errors = Vec::new();

        for source in &self.sources {
            match source.fetch(url).await {
                Ok(metadata) => {
                    info!("Fetched metadata for {} with {}", url, source.name());
                    return Ok(metadata);
                }
                Err(e) => {
                    warn!("Metadata source {} failed for {}: {}", source.name(), url, e);
                    errors.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        if errors.is_empty() {
            return Err(ExtractError::MetadataError(
                "No metadata sources configured".to_string(),
            ));
        }
        Err(ExtractError::MetadataError(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn instagram_response() -> PageMetadata {
        serde_json::from_value(json!({
            "hybridGraph": {
                "title": "닭다리살 배추 우동",
                "description": "닭다리살 300g, 배추 1/4통, 우동면 2개",
                "image": "https://cdn.example.com/hybrid.jpg",
                "site_name": "Instagram"
            },
            "openGraph": {
                "title": "Instagram post",
                "image": {"url": "https://cdn.example.com/og.jpg"},
                "site_name": "instagram.com"
            },
            "title": "root title",
            "og:image": "https://cdn.example.com/root.jpg"
        }))
        .unwrap()
    }

    #[test]
    fn test_hybrid_graph_wins() {
        let metadata = instagram_response();
        assert_eq!(metadata.title(), Some("닭다리살 배추 우동"));
        assert_eq!(metadata.thumbnail(), Some("https://cdn.example.com/hybrid.jpg"));
        assert_eq!(metadata.site_name(), Some("Instagram"));
        assert_eq!(
            metadata.description(),
            Some("닭다리살 300g, 배추 1/4통, 우동면 2개")
        );
    }

    #[test]
    fn test_empty_fields_fall_through() {
        let metadata: PageMetadata = serde_json::from_value(json!({
            "hybridGraph": {"title": "", "image": "", "description": "  "},
            "openGraph": {"title": "OG title", "image": {"url": "https://cdn.example.com/og.jpg"}},
            "description": "root description",
            "og:site_name": "example"
        }))
        .unwrap();

        assert_eq!(metadata.title(), Some("OG title"));
        assert_eq!(metadata.thumbnail(), Some("https://cdn.example.com/og.jpg"));
        assert_eq!(metadata.description(), Some("root description"));
        assert_eq!(metadata.site_name(), Some("example"));
    }

    #[test]
    fn test_image_variants() {
        let metadata: PageMetadata = serde_json::from_value(json!({
            "openGraph": {"image": [{"url": null}, {"url": "https://cdn.example.com/2.jpg"}]},
            "image": 42
        }))
        .unwrap();
        assert_eq!(metadata.thumbnail(), Some("https://cdn.example.com/2.jpg"));

        let metadata: PageMetadata = serde_json::from_value(json!({"image": 42})).unwrap();
        assert_eq!(metadata.thumbnail(), None);
    }

    #[test]
    fn test_source_from_url() {
        assert_eq!(
            source_from_url("https://www.instagram.com/p/abc/"),
            "instagram.com"
        );
        assert_eq!(source_from_url("https://m.blog.naver.com/x"), "m.blog.naver.com");
        assert_eq!(source_from_url("not a url"), "");
    }

    #[test]
    fn test_resolve_uses_title_when_description_missing() {
        let metadata: PageMetadata = serde_json::from_value(json!({
            "hybridGraph": {"title": "사과 5개로 만드는 잼"}
        }))
        .unwrap();

        let resolved =
            ResolvedMetadata::resolve(&metadata, "https://www.instagram.com/p/1", "레시피");
        assert_eq!(resolved.title, "사과 5개로 만드는 잼");
        assert_eq!(resolved.analysis_text, "사과 5개로 만드는 잼");
        assert_eq!(resolved.source_name, "instagram.com");
        assert_eq!(resolved.thumbnail, "");
    }

    #[test]
    fn test_resolve_empty_metadata() {
        let resolved =
            ResolvedMetadata::resolve(&PageMetadata::default(), "https://example.com/r", "레시피");
        assert_eq!(resolved.title, "레시피");
        assert_eq!(resolved.analysis_text, "");
        assert_eq!(resolved.source_name, "example.com");
    }

    struct FailingSource;

    #[async_trait]
    impl MetadataSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self, _url: &str) -> Result<PageMetadata, ExtractError> {
            Err(ExtractError::MetadataError("quota exceeded".to_string()))
        }
    }

    struct FixedSource(PageMetadata);

    #[async_trait]
    impl MetadataSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self, _url: &str) -> Result<PageMetadata, ExtractError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_chain_returns_first_success() {
        let chain = MetadataChain::new(vec![
            Box::new(FailingSource),
            Box::new(FixedSource(instagram_response())),
        ]);

        let metadata = chain.fetch("https://instagram.com/p/1").await.unwrap();
        assert_eq!(metadata.title(), Some("닭다리살 배추 우동"));
        assert_eq!(chain.source_names(), vec!["failing", "fixed"]);
    }

    #[tokio::test]
    async fn test_chain_reports_every_failure() {
        let chain = MetadataChain::new(vec![Box::new(FailingSource), Box::new(FailingSource)]);
        let err = chain.fetch("https://instagram.com/p/1").await.unwrap_err();
        assert!(err.to_string().contains("failing: Metadata fetch failed: quota exceeded"));

        let empty = MetadataChain::new(Vec::new());
        assert!(empty.fetch("https://instagram.com/p/1").await.is_err());
    }
}
