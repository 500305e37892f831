use std::path::{Component, Path};

use tracing::warn;
use url::Url;

use crate::error::Result;
use crate::url_resolver::resolve;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// The page's source URL is known; relative references are resolved
    /// against it (or against its `<base>`).
    RootRelative,
    /// No source URL: references are expected to be absolute already.
    Legacy,
}

/// How references in one document are resolved. Built once per document.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    source_url: Option<Url>,
    base_url: Option<Url>,
    root_href: String,
}

impl ResolutionContext {
    /// `base_href` is the document's own `<base href>`, if any. `root_href`
    /// is the relative path from the output document back to the output root.
    pub fn new(source_url: Option<Url>, base_href: Option<&str>, root_href: impl Into<String>) -> Self {
        let base_href = base_href.map(str::trim).filter(|href| !href.is_empty());

        let base_url = match (&source_url, base_href) {
            (Some(source), Some(href)) => match source.join(href) {
                Ok(base) => Some(base),
                Err(e) => {
                    warn!(%href, "ignoring unusable <base href>: {}", e);
                    Some(source.clone())
                }
            },
            (Some(source), None) => Some(source.clone()),
            // An absolute <base> still tells us where relative references point
            (None, Some(href)) => Url::parse(href).ok(),
            (None, None) => None,
        };

        Self {
            source_url,
            base_url,
            root_href: root_href.into(),
        }
    }

    pub fn mode(&self) -> ResolutionMode {
        if self.source_url.is_some() {
            ResolutionMode::RootRelative
        } else {
            ResolutionMode::Legacy
        }
    }

    pub fn source_url(&self) -> Option<&Url> {
        self.source_url.as_ref()
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn root_href(&self) -> &str {
        &self.root_href
    }

    pub fn resolve(&self, candidate: &str) -> Result<Url> {
        resolve(self.base_url.as_ref(), candidate)
    }
}

/// Relative href from `document_dir` to `output_root`, always ending in `/`.
///
/// Both paths should be absolute; `./` is returned when they coincide or no
/// relative path exists between them.
pub fn root_href(document_dir: &Path, output_root: &Path) -> String {
    let Some(relative) = pathdiff::diff_paths(output_root, document_dir) else {
        return "./".to_string();
    };

    let segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::ParentDir => Some("..".to_string()),
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if segments.is_empty() {
        "./".to_string()
    } else {
        format!("{}/", segments.join("/"))
    }
}
