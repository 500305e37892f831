use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use tracing::info;
use url::Url;

use crate::context::{root_href, ResolutionContext};
use crate::dom::{collect_elements, get_attr, is_element, parse_html, serialize_html};
use crate::downloader::{AssetFetcher, FetchConfig, FetchReport};
use crate::error::{LocalizeError, Result};
use crate::file_manager::{write_new_file, FileManager};
use crate::html_rewriter::DocumentRewriter;

const OUTPUT_SUFFIX: &str = "-processed.html";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The previously fetched HTML document.
    pub input: PathBuf,
    /// Where the document was fetched from; enables root-relative mode.
    pub source_url: Option<String>,
    /// Directory the downloaded asset tree is rooted at.
    pub output_root: PathBuf,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Written { output: PathBuf, report: FetchReport },
    /// The output document was already there; nothing was done.
    AlreadyExists { output: PathBuf },
}

/// `<input>-processed.html`, next to the input.
pub fn output_path_for(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(OUTPUT_SUFFIX);
    PathBuf::from(name)
}

pub fn parse_source_url(source: &str) -> Result<Url> {
    let url = Url::parse(source.trim()).map_err(|e| LocalizeError::invalid_url(source, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LocalizeError::InvalidUrlScheme {
            url: source.to_string(),
            scheme: other.to_string(),
        }),
    }
}

pub async fn run(config: &PipelineConfig) -> Result<PipelineOutcome> {
    run_with_progress(config, ProgressBar::hidden()).await
}

pub async fn run_with_progress(config: &PipelineConfig, progress: ProgressBar) -> Result<PipelineOutcome> {
    let output = output_path_for(&config.input);
    if output.exists() {
        info!(output = %output.display(), "already exists, skipping");
        return Ok(PipelineOutcome::AlreadyExists { output });
    }

    let source_url = config
        .source_url
        .as_deref()
        .map(parse_source_url)
        .transpose()?;

    let html = fs::read(&config.input)
        .map_err(|e| LocalizeError::io(format!("failed to read {:?}", config.input), e))?;
    let dom = parse_html(&html);

    let file_manager = FileManager::new(&config.output_root)?;
    let href_to_root = root_href(&document_dir(&output)?, &canonical(file_manager.base_dir())?);
    let base_href = collect_elements(&dom.document)
        .iter()
        .filter(|node| is_element(node, "base"))
        .find_map(|node| get_attr(node, "href"));
    let ctx = ResolutionContext::new(source_url, base_href.as_deref(), href_to_root);

    info!(
        input = %config.input.display(),
        mode = ?ctx.mode(),
        base = ?ctx.base_url().map(Url::as_str),
        "localizing document"
    );

    let mut fetcher = AssetFetcher::new(file_manager, &config.fetch)?.with_progress(progress);
    DocumentRewriter::new(&ctx, &mut fetcher).rewrite(&dom).await?;
    let report = fetcher.into_report();

    let mut serialized = serialize_html(&dom)?;
    if !serialized.ends_with(b"\n") {
        serialized.push(b'\n');
    }

    if !write_new_file(&output, &serialized)? {
        info!(output = %output.display(), "created concurrently, leaving it untouched");
        return Ok(PipelineOutcome::AlreadyExists { output });
    }

    Ok(PipelineOutcome::Written { output, report })
}

fn document_dir(output: &Path) -> Result<PathBuf> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    canonical(dir)
}

fn canonical(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|e| LocalizeError::io(format!("failed to resolve {:?}", path), e))
}
