//! Character encoding detection for fetched documents and stylesheets.
//!
//! Everything is decoded to UTF-8 on the way in and written back out as
//! UTF-8, so in-document declarations are rewritten to say so.

use std::borrow::Cow;
use std::sync::OnceLock;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252, X_USER_DEFINED};
use markup5ever_rcdom::Handle;
use regex::Regex;

use crate::dom::{collect_elements, get_attr, is_element, set_attr};

const UTF8_LABEL: &str = "utf-8";

/// Stylesheets only honour `@charset` as the very first bytes of the file.
const CHARSET_RULE_PREFIX: &[u8] = b"@charset \"";

fn charset_param() -> Option<&'static Regex> {
    static CHARSET_PARAM: OnceLock<Option<Regex>> = OnceLock::new();
    CHARSET_PARAM
        .get_or_init(|| Regex::new(r#"(?i)charset\s*=\s*["']?\s*([^\s;"']+)"#).ok())
        .as_ref()
}

/// Maps a declared label onto the encoding a browser would actually use.
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    let encoding = Encoding::for_label_no_replacement(label.trim().as_bytes())?;
    Some(match encoding {
        e if e == UTF_16BE || e == UTF_16LE => UTF_8,
        e if e == X_USER_DEFINED => WINDOWS_1252,
        e => e,
    })
}

/// The charset a parsed document declares through `<meta charset>` or a
/// `<meta http-equiv="content-type">` content attribute.
pub fn declared_charset(root: &Handle) -> Option<String> {
    collect_elements(root)
        .iter()
        .filter(|node| is_element(node, "meta"))
        .find_map(|meta| {
            if let Some(charset) = get_attr(meta, "charset") {
                return Some(charset.trim().to_string());
            }
            let http_equiv = get_attr(meta, "http-equiv")?;
            if !http_equiv.trim().eq_ignore_ascii_case("content-type") {
                return None;
            }
            let content = get_attr(meta, "content")?;
            let captures = charset_param()?.captures(&content)?;
            captures.get(1).map(|m| m.as_str().to_string())
        })
}

/// Decodes `bytes` as `fallback` unless a byte order mark says otherwise.
pub fn decode_with_bom<'a>(bytes: &'a [u8], fallback: &'static Encoding) -> (Cow<'a, str>, &'static Encoding) {
    let (text, encoding, _) = fallback.decode(bytes);
    (text, encoding)
}

/// Points every charset declaration in the document at UTF-8.
pub fn declare_utf8(metas: &[Handle]) {
    for meta in metas {
        if get_attr(meta, "charset").is_some() {
            set_attr(meta, "charset", Some(UTF8_LABEL.to_string()));
            continue;
        }
        let is_content_type = get_attr(meta, "http-equiv")
            .map_or(false, |value| value.trim().eq_ignore_ascii_case("content-type"));
        let (Some(content), Some(param)) = (get_attr(meta, "content"), charset_param()) else {
            continue;
        };
        if is_content_type && param.is_match(&content) {
            let rewritten = param.replace(&content, format!("charset={}", UTF8_LABEL).as_str());
            set_attr(meta, "content", Some(rewritten.into_owned()));
        }
    }
}

/// Decodes a stylesheet: BOM first, then a leading `@charset` rule, then
/// UTF-8. A leading `@charset` rule is rewritten to name UTF-8.
pub fn decode_stylesheet(bytes: &[u8]) -> String {
    let declared = charset_rule_label(bytes).and_then(encoding_for_label);
    let (text, _) = decode_with_bom(bytes, declared.unwrap_or(UTF_8));
    let text = text.into_owned();

    match charset_rule_end(&text) {
        Some(end) => format!("@charset \"{}\";{}", UTF8_LABEL, &text[end..]),
        None => text,
    }
}

fn charset_rule_label(bytes: &[u8]) -> Option<&str> {
    let rest = bytes.strip_prefix(CHARSET_RULE_PREFIX)?;
    let end = rest.iter().take(1024).position(|&b| b == b'"')?;
    if rest.get(end + 1) != Some(&b';') {
        return None;
    }
    std::str::from_utf8(&rest[..end]).ok()
}

/// Byte index just past the `";` closing a leading `@charset` rule.
fn charset_rule_end(text: &str) -> Option<usize> {
    let rest = text.strip_prefix("@charset \"")?;
    let end = rest.find("\";")?;
    Some(CHARSET_RULE_PREFIX.len() + end + 2)
}
