//! Paging through the archive service.
//!
//! `ArchiveScanner` is a lazy iterator over `RawHit`s. It requests pages
//! `1..=max_pages` on demand and stops at the first empty page or the first
//! failed request; failures are logged, never retried and never fatal. A scan
//! cannot be restarted; create a new scanner to start again at page 1.
//!
//! Each archive hit is mapped to a `RawHit`. When the hit lists a descriptor
//! file, the descriptor is fetched to recover a display name and a type. A
//! failed fetch or parse degrades to the defaults (type `unknown`, name = the
//! version DOI).

use std::collections::VecDeque;
use std::time::Duration;

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_yaml::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::ingest::changeset::maintainers_from_descriptor;
use crate::model::{timestamp, RdfSource, Version, UNKNOWN_TYPE};

/// User-Agent string for archive requests.
const USER_AGENT: &str = concat!("resource-catalog/", env!("CARGO_PKG_VERSION"));

/// `rdf_source` recorded for hits without a descriptor file.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Read access to the archive service.
pub trait ArchiveClient {
    /// Fetch one page of hits. A non-success response is an error.
    fn fetch_page(&self, page: u32, size: u32) -> Result<Vec<ArchiveHit>>;

    /// Fetch a descriptor file as text.
    fn fetch_text(&self, url: &str) -> Result<String>;
}

impl<C: ArchiveClient + ?Sized> ArchiveClient for &C {
    fn fetch_page(&self, page: u32, size: u32) -> Result<Vec<ArchiveHit>> {
        (**self).fetch_page(page, size)
    }

    fn fetch_text(&self, url: &str) -> Result<String> {
        (**self).fetch_text(url)
    }
}

/// Record identifier, numeric on some archives and textual on others.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

/// One search hit as returned by the archive.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveHit {
    pub id: RecordId,
    /// Identifier shared by all versions of a record.
    pub conceptdoi: String,
    /// Identifier of this version.
    pub doi: String,
    #[serde(default)]
    pub owners: Vec<serde_json::Value>,
    pub created: String,
    #[serde(default)]
    pub files: Vec<ArchiveFile>,
    #[serde(default)]
    pub metadata: HitMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveFile {
    pub key: String,
    pub links: FileLinks,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileLinks {
    #[serde(rename = "self")]
    pub self_link: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HitMetadata {
    #[serde(default)]
    pub relations: Relations,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Relations {
    #[serde(default)]
    pub version: Vec<VersionRelation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionRelation {
    /// 0-based position of this version.
    pub index: u64,
}

impl ArchiveHit {
    /// Human label derived from the 0-based version index.
    pub fn version_name(&self) -> Option<String> {
        self.metadata
            .relations
            .version
            .first()
            .map(|rel| format!("version {}", rel.index + 1))
    }

    /// Fetch URLs of all files named `descriptor_name`, sorted.
    pub fn descriptor_urls(&self, descriptor_name: &str) -> Vec<&str> {
        let mut urls: Vec<&str> = self
            .files
            .iter()
            .filter(|f| f.key == descriptor_name)
            .map(|f| f.links.self_link.as_str())
            .collect();
        urls.sort_unstable();
        urls
    }
}

/// A hit mapped to the fields the ingest pipeline needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    /// Stable across versions (the concept DOI).
    pub resource_id: String,
    pub version_id: String,
    pub doi: String,
    pub owners: Vec<Value>,
    pub created: NaiveDateTime,
    pub version_name: String,
    pub rdf_source: RdfSource,
    pub name: String,
    pub resource_type: String,
    /// Parsed descriptor, when it could be fetched.
    pub descriptor: Option<Value>,
}

impl RawHit {
    /// The version record to merge into the resource history.
    pub fn to_version(&self) -> Version {
        let mut version = Version::new(
            self.version_id.clone(),
            self.created,
            Some(self.rdf_source.clone()),
        )
        .with_field("doi", self.doi.as_str())
        .with_field("name", self.name.as_str())
        .with_field("version_name", self.version_name.as_str());
        version.owners = Some(self.owners.clone());
        version
    }

    /// Maintainer handles declared in the descriptor.
    pub fn maintainers(&self) -> Vec<String> {
        self.descriptor
            .as_ref()
            .map(maintainers_from_descriptor)
            .unwrap_or_default()
    }
}

/// Paging parameters of a scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub page_size: u32,
    pub max_pages: u32,
    pub descriptor_name: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            page_size: crate::defaults::ARCHIVE_PAGE_SIZE,
            max_pages: crate::defaults::ARCHIVE_MAX_PAGES,
            descriptor_name: crate::defaults::DESCRIPTOR_FILE.to_string(),
        }
    }
}

/// Lazy, finite iterator over the hits of an archive query.
pub struct ArchiveScanner<C> {
    client: C,
    options: ScanOptions,
    page: u32,
    buffer: VecDeque<ArchiveHit>,
    exhausted: bool,
}

impl<C: ArchiveClient> ArchiveScanner<C> {
    pub fn new(client: C, options: ScanOptions) -> Self {
        Self {
            client,
            options,
            page: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Number of pages requested so far.
    pub fn pages_requested(&self) -> u32 {
        self.page
    }

    fn fetch_next_page(&mut self) {
        if self.page >= self.options.max_pages {
            debug!("Reached page cap of {}", self.options.max_pages);
            self.exhausted = true;
            return;
        }
        self.page += 1;

        match self.client.fetch_page(self.page, self.options.page_size) {
            Ok(hits) if hits.is_empty() => {
                debug!("Archive page {} is empty", self.page);
                self.exhausted = true;
            }
            Ok(hits) => {
                info!("Collecting {} items from archive page {}", hits.len(), self.page);
                self.buffer.extend(hits);
            }
            Err(e) => {
                warn!("Could not get archive records page {}: {}", self.page, e);
                self.exhausted = true;
            }
        }
    }

    /// Map an archive hit, or `None` if it lacks required fields.
    fn map_hit(&self, hit: ArchiveHit) -> Option<RawHit> {
        let Some(created) = timestamp::parse(&hit.created) else {
            warn!("Skipping hit {}: invalid creation time '{}'", hit.id, hit.created);
            return None;
        };
        let Some(version_name) = hit.version_name() else {
            warn!("Skipping hit {}: no version index", hit.id);
            return None;
        };

        let mut name = hit.doi.clone();
        let mut resource_type = UNKNOWN_TYPE.to_string();
        let mut descriptor = None;
        let mut rdf_source = RdfSource::Url(UNKNOWN_SOURCE.to_string());

        let urls = hit.descriptor_urls(&self.options.descriptor_name);
        if let Some(first) = urls.first() {
            if urls.len() > 1 {
                warn!(
                    "Found {} '{}' sources for {}, using {}",
                    urls.len(),
                    self.options.descriptor_name,
                    hit.id,
                    first
                );
            }
            rdf_source = RdfSource::Url(first.to_string());

            match self.fetch_descriptor(first) {
                Ok(value) => {
                    if let Some(n) = value.get("name").and_then(Value::as_str) {
                        name = n.to_string();
                    }
                    if let Some(t) = value.get("type").and_then(Value::as_str) {
                        resource_type = t.to_string();
                    }
                    descriptor = Some(value);
                }
                Err(e) => warn!("Failed to obtain descriptor for {}: {}", hit.id, e),
            }
        }

        let owners = hit
            .owners
            .iter()
            .filter_map(|o| serde_yaml::to_value(o).ok())
            .collect();

        Some(RawHit {
            resource_id: hit.conceptdoi,
            version_id: hit.id.to_string(),
            doi: hit.doi,
            owners,
            created,
            version_name,
            rdf_source,
            name,
            resource_type,
            descriptor,
        })
    }

    fn fetch_descriptor(&self, url: &str) -> Result<Value> {
        let text = self.client.fetch_text(url)?;
        let value: Value = serde_yaml::from_str(&text)?;
        if !value.is_mapping() {
            return Err(Error::Fetch {
                url: url.to_string(),
                message: "descriptor is not a mapping".to_string(),
            });
        }
        Ok(value)
    }
}

impl<C: ArchiveClient> Iterator for ArchiveScanner<C> {
    type Item = RawHit;

    fn next(&mut self) -> Option<RawHit> {
        loop {
            if let Some(hit) = self.buffer.pop_front() {
                match self.map_hit(hit) {
                    Some(raw) => return Some(raw),
                    None => continue,
                }
            }
            if self.exhausted {
                return None;
            }
            self.fetch_next_page();
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    hits: HitList,
}

#[derive(Debug, Deserialize)]
struct HitList {
    hits: Vec<ArchiveHit>,
}

/// `ArchiveClient` over HTTP using a blocking reqwest client.
pub struct HttpArchiveClient {
    client: reqwest::blocking::Client,
    base_url: Url,
    keywords: String,
}

impl HttpArchiveClient {
    pub fn new(base_url: &str, keywords: &str, timeout_secs: u64) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Fetch {
                url: base_url.to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url,
            keywords: keywords.to_string(),
        })
    }

    /// Query URL for one page, most recent first, all versions.
    pub fn page_url(&self, page: u32, size: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("sort", "mostrecent")
            .append_pair("page", &page.to_string())
            .append_pair("size", &size.to_string())
            .append_pair("all_versions", "1")
            .append_pair("keywords", &self.keywords);
        url
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        let response = self.client.get(url).send().map_err(|e| Error::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                url: url.to_string(),
                message: format!("HTTP {status}"),
            });
        }
        Ok(response)
    }
}

impl ArchiveClient for HttpArchiveClient {
    fn fetch_page(&self, page: u32, size: u32) -> Result<Vec<ArchiveHit>> {
        let url = self.page_url(page, size);
        let response = self.get(url.as_str())?;
        let body: SearchPage = response.json().map_err(|e| Error::Fetch {
            url: url.to_string(),
            message: format!("invalid search response: {e}"),
        })?;
        Ok(body.hits.hits)
    }

    fn fetch_text(&self, url: &str) -> Result<String> {
        self.get(url)?.text().map_err(|e| Error::Fetch {
            url: url.to_string(),
            message: format!("failed to read body: {e}"),
        })
    }
}
