use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub struct SrcsetCandidate {
    pub url: String,
    pub descriptor: String,
}

/// Splits a `srcset` value into `(url, descriptor)` candidates.
///
/// URLs may contain commas; a candidate ends at the first comma that follows
/// its descriptor (outside parentheses), or at a comma trailing the URL itself.
pub fn parse_srcset(srcset: &str) -> Vec<SrcsetCandidate> {
    let mut candidates = Vec::new();
    let mut rest = srcset;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let url_end = rest.find(|c: char| c.is_ascii_whitespace()).unwrap_or(rest.len());
        let mut url = &rest[..url_end];
        rest = &rest[url_end..];

        let mut descriptor = "";
        if url.ends_with(',') {
            url = url.trim_end_matches(',');
        } else {
            let mut depth = 0usize;
            let mut end = rest.len();
            for (i, c) in rest.char_indices() {
                match c {
                    '(' => depth += 1,
                    ')' => depth = depth.saturating_sub(1),
                    ',' if depth == 0 => {
                        end = i;
                        break;
                    }
                    _ => {}
                }
            }
            descriptor = rest[..end].trim();
            rest = &rest[end..];
        }

        if !url.is_empty() {
            candidates.push(SrcsetCandidate {
                url: url.to_string(),
                descriptor: descriptor.to_string(),
            });
        }
    }

    candidates
}

/// Numeric size of a descriptor with every non-numeric character removed
/// (`640w` -> 640, `1.5x` -> 1.5). A missing descriptor means `1x`.
pub fn descriptor_value(descriptor: &str) -> f64 {
    static NON_NUMERIC: OnceLock<Option<Regex>> = OnceLock::new();

    if descriptor.trim().is_empty() {
        return 1.0;
    }
    let Some(non_numeric) = NON_NUMERIC.get_or_init(|| Regex::new(r"[^0-9.]").ok()) else {
        return 0.0;
    };
    non_numeric
        .replace_all(descriptor, "")
        .parse::<f64>()
        .unwrap_or(0.0)
}

/// The candidate URL with the largest descriptor; ties go to the later one.
pub fn largest_candidate(srcset: &str) -> Option<String> {
    let mut best: Option<(f64, String)> = None;
    for candidate in parse_srcset(srcset) {
        let value = descriptor_value(&candidate.descriptor);
        if best.as_ref().map_or(true, |(top, _)| value >= *top) {
            best = Some((value, candidate.url));
        }
    }
    best.map(|(_, url)| url)
}

/// Picks the highest resolution source for an `<img>`: the full-size
/// `data-orig-file` marker, then the largest `srcset` candidate, then `src`.
pub fn choose_image_url(
    data_orig_file: Option<&str>,
    srcset: Option<&str>,
    src: Option<&str>,
) -> Option<String> {
    if let Some(original) = non_empty(data_orig_file) {
        return Some(original.to_string());
    }
    if let Some(largest) = non_empty(srcset).and_then(largest_candidate) {
        return Some(largest);
    }
    non_empty(src).map(str::to_string)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
