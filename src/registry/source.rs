use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::registry::error::ConfigError;
use crate::registry::registry_model::SelectorDocument;

/// Where the selector configuration comes from.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> String;

    async fn fetch(&self) -> Result<SelectorDocument, ConfigError>;
}

pub fn parse_document(origin: &str, content: &str) -> Result<SelectorDocument, ConfigError> {
    serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
        origin: origin.to_string(),
        source,
    })
}

/// YAML or JSON file on disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn fetch(&self) -> Result<SelectorDocument, ConfigError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ConfigError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        parse_document(&self.name(), &content)
    }
}

/// Remote JSON document fetched over HTTP.
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        HttpSource {
            url: url.to_string(),
            client,
        }
    }
}

#[async_trait]
impl ConfigSource for HttpSource {
    fn name(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<SelectorDocument, ConfigError> {
        let http_err = |source| ConfigError::Http {
            url: self.url.clone(),
            source,
        };
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?;
        response.json::<SelectorDocument>().await.map_err(http_err)
    }
}

/// In-memory document text, for tests and embedders that already hold the config.
pub struct StaticSource {
    name: String,
    content: String,
}

impl StaticSource {
    pub fn new(name: &str, content: &str) -> Self {
        StaticSource {
            name: name.to_string(),
            content: content.to_string(),
        }
    }
}

#[async_trait]
impl ConfigSource for StaticSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn fetch(&self) -> Result<SelectorDocument, ConfigError> {
        parse_document(&self.name, &self.content)
    }
}
