//! `url()` extraction and rewriting for stylesheet text.
//!
//! References are found with `cssparser`'s tokenizer, so comments, strings,
//! escapes and nested blocks follow CSS syntax. Each hit keeps the byte span
//! of the whole `url(...)` so it can be spliced without reserializing the
//! rest of the sheet.

use std::ops::Range;

use cssparser::{ParseError, Parser, ParserInput, Token};
use url::Url;

use crate::downloader::AssetFetcher;
use crate::error::Result;
use crate::url_resolver::{is_absolute, is_inline_data, resolve};

/// One `url(...)` occurrence in a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlToken {
    /// Byte range of the whole token, `url(` through `)`.
    pub span: Range<usize>,
    /// The reference with CSS escapes decoded.
    pub value: String,
    pub quote: Option<char>,
}

pub fn find_url_tokens(css: &str) -> Vec<UrlToken> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut tokens = Vec::new();
    scan(&mut parser, &mut tokens);
    tokens
}

fn scan<'i, 't>(parser: &mut Parser<'i, 't>, out: &mut Vec<UrlToken>) {
    loop {
        let start = parser.position();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::UnquotedUrl(value) => {
                // EOF before `)` still yields a url token; leave those alone
                if parser.slice_from(start).ends_with(')') {
                    out.push(UrlToken {
                        span: start.byte_index()..parser.position().byte_index(),
                        value: value.as_ref().to_string(),
                        quote: None,
                    });
                }
            }
            Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                let argument = parser.parse_nested_block(|nested| {
                    Ok::<_, ParseError<'i, ()>>(quoted_argument(nested))
                });
                let closed = parser.slice_from(start).ends_with(')');
                if let (Ok(Some((value, quote))), true) = (argument, closed) {
                    out.push(UrlToken {
                        span: start.byte_index()..parser.position().byte_index(),
                        value,
                        quote: Some(quote),
                    });
                }
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                let _ = parser.parse_nested_block(|nested| {
                    scan(nested, out);
                    Ok::<_, ParseError<'i, ()>>(())
                });
            }
            _ => {}
        }
    }
}

/// The string argument of a `url("...")` function and its quote character.
fn quoted_argument(nested: &mut Parser<'_, '_>) -> Option<(String, char)> {
    loop {
        let start = nested.position();
        let token = match nested.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return None,
        };
        match token {
            Token::WhiteSpace(_) | Token::Comment(_) => {}
            Token::QuotedString(value) => {
                let source = nested.slice_from(start);
                let quote = source.chars().next()?;
                if source.len() < 2 || !source.ends_with(quote) {
                    return None;
                }
                return Some((value.as_ref().to_string(), quote));
            }
            _ => return None,
        }
    }
}

/// Serializes a `url()` token for `path`, keeping the original quoting style
/// when possible.
pub fn format_url_token(path: &str, quote: Option<char>) -> String {
    let needs_quotes = path
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\'' | '\\'));
    let quote = match quote {
        Some(q) => q,
        None if needs_quotes => '"',
        None => return format!("url({})", path),
    };

    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\a "),
            c if c == quote => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }
    format!("url({q}{escaped}{q})", q = quote)
}

/// Which URL, if any, a `url()` value should be localized from.
///
/// Inline data, empty values and fragment-only references are left alone.
/// Without a base only absolute references can be localized; relative ones
/// are left as they are.
pub fn localizable_target(value: &str, base: Option<&Url>) -> Result<Option<Url>> {
    let value = value.trim();
    if value.is_empty() || value.starts_with('#') || is_inline_data(value) {
        return Ok(None);
    }
    if base.is_none() && !is_absolute(value) {
        return Ok(None);
    }
    resolve(base, value).map(Some)
}

/// Downloads every resource `css` references and points the references at
/// the local copies. Paths are written unescaped.
pub async fn rewrite_stylesheet(
    css: &str,
    base: Option<&Url>,
    fetcher: &mut AssetFetcher,
) -> Result<String> {
    let mut out = String::with_capacity(css.len());
    let mut last = 0;

    for token in find_url_tokens(css) {
        let Some(target) = localizable_target(&token.value, base)? else {
            continue;
        };
        let asset = fetcher.localize(target).await?;

        out.push_str(&css[last..token.span.start]);
        out.push_str(&format_url_token(&asset.local_path, token.quote));
        last = token.span.end;
    }

    out.push_str(&css[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(css: &str) -> Vec<String> {
        find_url_tokens(css).into_iter().map(|t| t.value).collect()
    }

    #[test]
    fn test_finds_all_quoting_styles() {
        let css = r#"
            .a { background: url('img/a.png'); }
            .b { background-image: url("img/b.png"); }
            .c { background: url(img/c.png) no-repeat; }
            .d { background: URL(  img/d.png  ); }
        "#;
        assert_eq!(values(css), vec!["img/a.png", "img/b.png", "img/c.png", "img/d.png"]);
    }

    #[test]
    fn test_token_spans_cover_the_whole_function() {
        let css = "a{background:url( 'x.png' )}";
        let tokens = find_url_tokens(css);
        assert_eq!(tokens.len(), 1);
        assert_eq!(&css[tokens[0].span.clone()], "url( 'x.png' )");
        assert_eq!(tokens[0].quote, Some('\''));
    }

    #[test]
    fn test_escaped_parentheses_and_quotes() {
        let css = r#"a{background:url(img/a\(1\).png)} b{background:url('it\'s.png')}"#;
        assert_eq!(values(css), vec!["img/a(1).png", "it's.png"]);
    }

    #[test]
    fn test_hex_escapes() {
        let css = r"a{background:url(img/\41 .png)}";
        assert_eq!(values(css), vec!["img/A.png"]);
    }

    #[test]
    fn test_skips_comments_and_strings() {
        let css = r#"
            /* background: url(commented.png) */
            .q::before { content: "url(not-a-token.png)"; }
            .r { background: url(real.png); }
        "#;
        assert_eq!(values(css), vec!["real.png"]);
    }

    #[test]
    fn test_ignores_identifiers_ending_in_url() {
        let css = "a{mask:myurl(x.png); b: url(y.png)}";
        assert_eq!(values(css), vec!["y.png"]);
    }

    #[test]
    fn test_data_urls_are_tokens_but_not_targets() {
        let css = "a{background:url(data:image/png;base64,iVBORw0KGgo=)}";
        let tokens = find_url_tokens(css);
        assert_eq!(tokens.len(), 1);
        let base = Url::parse("https://example.com/").unwrap();
        assert_eq!(localizable_target(&tokens[0].value, Some(&base)).unwrap(), None);
    }

    #[test]
    fn test_urls_inside_at_rules_and_functions() {
        let css = r#"
            @media screen { .a { background: url(a.png); } }
            @font-face { src: url("f.woff2") format("woff2"), url(f.woff) format("woff"); }
            .b { background: image-set(url(b1.png) 1x, url('b2.png') 2x); }
        "#;
        assert_eq!(values(css), vec!["a.png", "f.woff2", "f.woff", "b1.png", "b2.png"]);
    }

    #[test]
    fn test_splicing_spans_keeps_surrounding_text() {
        let css = "a{b:url(x.png) no-repeat;c:url( \"y.png\" )}";
        let tokens = find_url_tokens(css);
        let spans: Vec<&str> = tokens.iter().map(|t| &css[t.span.clone()]).collect();
        assert_eq!(spans, vec!["url(x.png)", "url( \"y.png\" )"]);
        assert_eq!(tokens[1].quote, Some('"'));
    }

    #[test]
    fn test_unterminated_url_is_ignored() {
        assert!(values("a{background:url(img/a.png").is_empty());
        assert!(values("a{background:url('img/a.png)}").is_empty());
    }

    #[test]
    fn test_localizable_target() {
        let base = Url::parse("https://example.com/css/site.css").unwrap();

        let target = localizable_target("../img/x.png", Some(&base)).unwrap();
        assert_eq!(target.unwrap().as_str(), "https://example.com/img/x.png");

        assert_eq!(localizable_target("#filter", Some(&base)).unwrap(), None);
        assert_eq!(localizable_target("  ", Some(&base)).unwrap(), None);

        // No base: only absolute references are touched
        assert_eq!(localizable_target("img/x.png", None).unwrap(), None);
        let target = localizable_target("http://cdn.example.com/x.png", None).unwrap();
        assert_eq!(target.unwrap().as_str(), "http://cdn.example.com/x.png");
    }

    #[test]
    fn test_format_url_token() {
        assert_eq!(format_url_token("example.com/a.png", Some('\'')), "url('example.com/a.png')");
        assert_eq!(format_url_token("example.com/a.png", Some('"')), "url(\"example.com/a.png\")");
        assert_eq!(format_url_token("example.com/a.png", None), "url(example.com/a.png)");
        assert_eq!(format_url_token("example.com/a b.png", None), "url(\"example.com/a b.png\")");
        assert_eq!(format_url_token("example.com/it's.png", Some('\'')), r"url('example.com/it\'s.png')");
    }
}
