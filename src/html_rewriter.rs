//! Per-element localization policies for a parsed document.
//!
//! Target nodes are collected first and mutated afterwards, so removing or
//! replacing a node never disturbs an ongoing walk.

use markup5ever_rcdom::{Handle, RcDom};
use tracing::{debug, warn};
use url::Url;

use crate::charset::declare_utf8;
use crate::context::{ResolutionContext, ResolutionMode};
use crate::css::rewrite_stylesheet;
use crate::dom::{
    collect_elements, create_element, get_attr, is_element, prepend_child, remove_node,
    replace_node, set_attr, set_text_content, text_content,
};
use crate::downloader::AssetFetcher;
use crate::error::Result;
use crate::srcset::choose_image_url;
use crate::url_resolver::{escape_for_attribute, is_inline_data, AssetReference};

/// Attributes carried over when a `<link>` stylesheet becomes a `<style>`.
const INLINED_STYLE_ATTRS: [&str; 3] = ["id", "media", "title"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Stylesheet,
    Icon,
    Other,
}

impl LinkKind {
    pub fn from_rel(rel: &str) -> Self {
        let tokens: Vec<String> = rel.split_ascii_whitespace().map(str::to_ascii_lowercase).collect();
        if tokens.iter().any(|t| t == "stylesheet") {
            LinkKind::Stylesheet
        } else if tokens.iter().any(|t| t == "icon" || t == "apple-touch-icon") {
            LinkKind::Icon
        } else {
            LinkKind::Other
        }
    }
}

struct Anchor {
    node: Handle,
    href: String,
    resolved: Option<Url>,
}

pub struct DocumentRewriter<'a> {
    ctx: &'a ResolutionContext,
    fetcher: &'a mut AssetFetcher,
}

impl<'a> DocumentRewriter<'a> {
    pub fn new(ctx: &'a ResolutionContext, fetcher: &'a mut AssetFetcher) -> Self {
        Self { ctx, fetcher }
    }

    pub async fn rewrite(&mut self, dom: &RcDom) -> Result<()> {
        let elements = collect_elements(&dom.document);
        let with_tag = |tag: &str| -> Vec<Handle> {
            elements
                .iter()
                .filter(|node| is_element(node, tag))
                .cloned()
                .collect()
        };

        let anchors: Vec<Anchor> = with_tag("a")
            .into_iter()
            .filter_map(|node| {
                let href = get_attr(&node, "href")?;
                let resolved = self.ctx.resolve(&href).ok();
                Some(Anchor {
                    node,
                    href,
                    resolved,
                })
            })
            .collect();
        let removed: Vec<Handle> = with_tag("iframe").into_iter().chain(with_tag("script")).collect();
        let styled: Vec<Handle> = elements
            .iter()
            .filter(|node| get_attr(node, "style").is_some())
            .filter(|node| !is_element(node, "iframe") && !is_element(node, "script"))
            .cloned()
            .collect();
        // Collected before any <link> turns into a <style>
        let styles = with_tag("style");

        self.rewrite_base(&with_tag("base"), &with_tag("head"));
        // The document is serialized as UTF-8 whatever it was read as
        declare_utf8(&with_tag("meta"));

        for img in with_tag("img") {
            self.rewrite_image(&img, &anchors).await?;
        }
        for link in with_tag("link") {
            self.rewrite_link(&link).await?;
        }
        for style in &styles {
            self.rewrite_style_element(style).await?;
        }
        for node in &styled {
            self.rewrite_style_attribute(node).await?;
        }

        debug!(count = removed.len(), "removing script and iframe elements");
        for node in &removed {
            remove_node(node);
        }

        Ok(())
    }

    /// Points `<base>` back at the output root so relative local paths keep
    /// resolving from wherever the document sits.
    fn rewrite_base(&self, bases: &[Handle], heads: &[Handle]) {
        let href = escape_for_attribute(self.ctx.root_href());

        if let Some(base) = bases.iter().find(|base| get_attr(base, "href").is_some()) {
            set_attr(base, "href", Some(href));
            return;
        }

        let needs_base =
            self.ctx.mode() == ResolutionMode::RootRelative || self.ctx.root_href() != "./";
        if needs_base {
            if let Some(head) = heads.first() {
                prepend_child(head, create_element("base", vec![("href", href)]));
            }
        }
    }

    async fn rewrite_image(&mut self, img: &Handle, anchors: &[Anchor]) -> Result<()> {
        let chosen = choose_image_url(
            get_attr(img, "data-orig-file").as_deref(),
            get_attr(img, "srcset").as_deref(),
            get_attr(img, "src").as_deref(),
        );
        let Some(chosen) = chosen else {
            return Ok(());
        };
        if is_inline_data(&chosen) {
            return Ok(());
        }

        let asset = self.fetcher.localize(self.ctx.resolve(&chosen)?).await?;
        let local = asset.attribute_value();

        set_attr(img, "src", Some(local.clone()));
        set_attr(img, "srcset", None);

        for anchor in anchors {
            if anchor.href == chosen || anchor.resolved.as_ref() == Some(&asset.origin_url) {
                set_attr(&anchor.node, "href", Some(local.clone()));
            }
        }

        Ok(())
    }

    async fn rewrite_link(&mut self, link: &Handle) -> Result<()> {
        let kind = LinkKind::from_rel(&get_attr(link, "rel").unwrap_or_default());
        let href = get_attr(link, "href").filter(|href| !href.trim().is_empty());

        let href = match (kind, href) {
            (LinkKind::Other, _) | (_, None) => {
                remove_node(link);
                return Ok(());
            }
            (_, Some(href)) => href,
        };
        if is_inline_data(&href) {
            return Ok(());
        }

        let asset = self.fetcher.localize(self.ctx.resolve(&href)?).await?;
        set_attr(link, "href", Some(asset.attribute_value()));

        if kind == LinkKind::Stylesheet {
            self.inline_stylesheet(link, &asset).await?;
        }

        Ok(())
    }

    /// Replaces a stylesheet `<link>` with a `<style>` holding the rewritten
    /// CSS. The CSS is rewritten before the node is swapped.
    async fn inline_stylesheet(&mut self, link: &Handle, asset: &AssetReference) -> Result<()> {
        let file_manager = self.fetcher.file_manager();
        if !file_manager.file_exists(&asset.local_path) {
            warn!(url = %asset.origin_url, "stylesheet unavailable, leaving <link> in place");
            return Ok(());
        }
        let css = file_manager.read_stylesheet(&asset.local_path)?;

        let css = rewrite_stylesheet(&css, Some(&asset.origin_url), self.fetcher).await?;

        let attrs = INLINED_STYLE_ATTRS
            .iter()
            .filter_map(|&name| get_attr(link, name).map(|value| (name, value)))
            .collect();
        let style = create_element("style", attrs);
        set_text_content(&style, &css);
        replace_node(link, style);

        Ok(())
    }

    async fn rewrite_style_element(&mut self, style: &Handle) -> Result<()> {
        let css = text_content(style);
        let rewritten = rewrite_stylesheet(&css, self.ctx.base_url(), self.fetcher).await?;
        if rewritten != css {
            set_text_content(style, &rewritten);
        }
        Ok(())
    }

    async fn rewrite_style_attribute(&mut self, node: &Handle) -> Result<()> {
        let Some(css) = get_attr(node, "style") else {
            return Ok(());
        };
        let rewritten = rewrite_stylesheet(&css, self.ctx.base_url(), self.fetcher).await?;
        if rewritten != css {
            set_attr(node, "style", Some(rewritten));
        }
        Ok(())
    }
}
