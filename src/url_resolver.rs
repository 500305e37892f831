use url::Url;

use crate::error::{LocalizeError, Result};

/// A remote asset and the path (relative to the output root) it is stored at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub origin_url: Url,
    pub local_path: String,
}

impl AssetReference {
    pub fn new(origin_url: Url) -> Result<Self> {
        let local_path = local_path(&origin_url)?;
        Ok(Self {
            origin_url,
            local_path,
        })
    }

    /// The local path in the form written into `src`/`href` attributes.
    pub fn attribute_value(&self) -> String {
        escape_for_attribute(&self.local_path)
    }
}

/// True for `data:` URLs, which are never downloaded or rewritten.
pub fn is_inline_data(url: &str) -> bool {
    url.trim_start()
        .get(..5)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("data:"))
}

/// True when `candidate` carries its own scheme (`https:`, `about:`, ...) or
/// is protocol-relative, i.e. it can be resolved without a base.
pub fn is_absolute(candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.starts_with("//") {
        return true;
    }
    let Some((scheme, _)) = candidate.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Resolves `candidate` against `base` with RFC 3986 semantics.
///
/// Without a base the candidate has to be absolute already; a protocol-relative
/// reference then falls back to `https`.
pub fn resolve(base: Option<&Url>, candidate: &str) -> Result<Url> {
    let candidate = candidate.trim();
    match base {
        Some(base) => base
            .join(candidate)
            .map_err(|e| LocalizeError::invalid_url(candidate, e)),
        None if candidate.starts_with("//") => Url::parse(&format!("https:{}", candidate))
            .map_err(|e| LocalizeError::invalid_url(candidate, e)),
        None => Url::parse(candidate).map_err(|e| LocalizeError::invalid_url(candidate, e)),
    }
}

/// Derives the deterministic local path for an absolute http(s) URL:
/// `host[:port]/path[?query]` with the scheme removed.
pub fn local_path(url: &Url) -> Result<String> {
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(LocalizeError::InvalidUrlScheme {
                url: url.to_string(),
                scheme: other.to_string(),
            })
        }
    }

    let host = match url.host_str() {
        None | Some("") => return Err(LocalizeError::invalid_url(url.as_str(), "URL has no host")),
        // `.` and `..` parse as hosts but would step outside the output root
        Some("." | "..") => {
            return Err(LocalizeError::invalid_url(url.as_str(), "host is not a valid directory name"))
        }
        Some(host) => host,
    };

    let mut path = host.to_string();
    if let Some(port) = url.port() {
        path.push(':');
        path.push_str(&port.to_string());
    }
    path.push_str(url.path());

    // A directory URL still needs a file to live in
    if path.ends_with('/') {
        path.push_str("index.html");
    }

    // Slashes inside the query must not become directory separators
    if let Some(query) = url.query() {
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query.replace('/', "%2F"));
        }
    }

    Ok(path)
}

/// Escapes a local path for use in an HTML attribute so that `?` and `#` in
/// file names are not taken as query or fragment delimiters, and `%` is not
/// taken as the start of an escape.
pub fn escape_for_attribute(path: &str) -> String {
    path.replace('%', "%25")
        .replace('?', "%3F")
        .replace('#', "%23")
}
