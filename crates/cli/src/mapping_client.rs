use anyhow::{Context as AnyhowContext, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use supply_search::{FileMappingSource, MappingSource, MappingTable, SearchError};

use crate::config::{FinderConfig, MappingLocation};

/// Mapping served over HTTP as a JSON object (see `serve-mapping`).
#[derive(Clone, Debug)]
pub struct HttpMappingSource {
    url: String,
    client: Client,
}

impl HttpMappingSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for the mapping source")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl MappingSource for HttpMappingSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> supply_search::Result<MappingTable> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|err| SearchError::MappingFetch(err.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|err| SearchError::MappingFetch(err.to_string()))?;
        MappingTable::from_json_str(&body)
    }
}

pub(crate) fn mapping_source(cfg: &FinderConfig) -> Result<Arc<dyn MappingSource>> {
    let source: Arc<dyn MappingSource> = match &cfg.mapping {
        MappingLocation::File(path) => Arc::new(FileMappingSource::new(path)),
        MappingLocation::Url(url) => Arc::new(HttpMappingSource::new(url, cfg.mapping_timeout)?),
    };
    Ok(source)
}
