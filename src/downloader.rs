use std::path::Path;

use indicatif::ProgressBar;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{LocalizeError, Result};
use crate::file_manager::FileManager;
use crate::url_resolver::AssetReference;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:132.0) Gecko/20100101 Firefox/132.0";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Record HTTP failures and keep going instead of aborting the run.
    pub skip_errors: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            skip_errors: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFetch {
    pub url: String,
    pub status: Option<u16>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: Vec<FailedFetch>,
}

/// Downloads assets into the output root, each at most once.
pub struct AssetFetcher {
    client: Client,
    file_manager: FileManager,
    skip_errors: bool,
    progress: ProgressBar,
    report: FetchReport,
}

impl AssetFetcher {
    pub fn new(file_manager: FileManager, config: &FetchConfig) -> Result<Self> {
        let client = build_http_client(&config.user_agent)?;

        Ok(Self {
            client,
            file_manager,
            skip_errors: config.skip_errors,
            progress: ProgressBar::hidden(),
            report: FetchReport::default(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn file_manager(&self) -> &FileManager {
        &self.file_manager
    }

    pub fn report(&self) -> &FetchReport {
        &self.report
    }

    pub fn into_report(self) -> FetchReport {
        self.progress.finish_and_clear();
        self.report
    }

    /// Computes the local path for `url` and makes sure the asset is there.
    pub async fn localize(&mut self, url: Url) -> Result<AssetReference> {
        let asset = AssetReference::new(url)?;
        self.fetch_once(&asset).await?;
        Ok(asset)
    }

    pub async fn fetch_once(&mut self, asset: &AssetReference) -> Result<FetchOutcome> {
        let dest = self.file_manager.path_for(&asset.local_path)?;

        self.progress
            .set_message(format!("Downloading: {}", asset.origin_url));

        match download_if_missing(&self.client, &asset.origin_url, &dest).await {
            Ok(FetchOutcome::Skipped) => {
                debug!(path = %asset.local_path, "already exists, skipping");
                self.report.skipped += 1;
                Ok(FetchOutcome::Skipped)
            }
            Ok(outcome) => {
                info!(url = %asset.origin_url, path = %asset.local_path, "downloaded");
                self.report.downloaded += 1;
                Ok(outcome)
            }
            Err(LocalizeError::HttpFetch {
                url,
                status,
                reason,
            }) if self.skip_errors => {
                warn!(%url, status = ?status, %reason, "fetch failed, continuing");
                self.report.failed.push(FailedFetch {
                    url,
                    status,
                    reason,
                });
                Ok(FetchOutcome::Failed)
            }
            Err(e) => {
                error!(url = %asset.origin_url, "{}", e);
                Err(e)
            }
        }
    }
}

fn build_http_client(user_agent: &str) -> Result<Client> {
    ClientBuilder::new()
        .use_rustls_tls()
        .user_agent(user_agent)
        .build()
        .map_err(|e| LocalizeError::io("failed to build HTTP client", std::io::Error::other(e)))
}

/// Fetches `url` into `dest` unless `dest` already exists.
///
/// Parent directories are created first. An existing destination is never
/// re-requested, which makes the filesystem the download cache.
pub async fn download_if_missing(client: &Client, url: &Url, dest: &Path) -> Result<FetchOutcome> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LocalizeError::io(format!("failed to create directory {:?}", parent), e))?;
    }

    if dest.exists() {
        return Ok(FetchOutcome::Skipped);
    }

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| LocalizeError::HttpFetch {
            url: url.to_string(),
            status: None,
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(LocalizeError::HttpFetch {
            url: url.to_string(),
            status: Some(status.as_u16()),
            reason: format!("HTTP {}", status),
        });
    }

    let body = response.bytes().await.map_err(|e| LocalizeError::HttpFetch {
        url: url.to_string(),
        status: Some(status.as_u16()),
        reason: format!("failed to read response body: {}", e),
    })?;

    tokio::fs::write(dest, &body)
        .await
        .map_err(|e| LocalizeError::io(format!("failed to write {:?}", dest), e))?;

    Ok(FetchOutcome::Downloaded)
}
