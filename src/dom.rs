//! Small helpers over `markup5ever_rcdom` trees.

use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::{Encoding, UTF_8};
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, parse_document, Attribute, LocalName, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use tracing::debug;

use crate::charset::{declared_charset, decode_with_bom, encoding_for_label};
use crate::error::{LocalizeError, Result};

/// Parses a document, decoding it per its byte order mark or, failing that,
/// its `<meta>` charset declaration. Undeclared documents are read as UTF-8.
pub fn parse_html(bytes: &[u8]) -> RcDom {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return parse_html_str(&decode_with_bom(bytes, encoding).0);
    }

    let (text, _) = decode_with_bom(bytes, UTF_8);
    let dom = parse_html_str(&text);
    match declared_charset(&dom.document).as_deref().and_then(encoding_for_label) {
        Some(encoding) if encoding != UTF_8 => {
            debug!(encoding = encoding.name(), "re-decoding document with its declared charset");
            parse_html_str(&decode_with_bom(bytes, encoding).0)
        }
        _ => dom,
    }
}

fn parse_html_str(text: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(text)
}

pub fn serialize_html(dom: &RcDom) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let document: SerializableHandle = dom.document.clone().into();
    serialize(&mut buf, &document, SerializeOpts::default())
        .map_err(|e| LocalizeError::io("failed to serialize HTML document", e))?;
    Ok(buf)
}

pub fn is_element(node: &Handle, tag: &str) -> bool {
    match node.data {
        NodeData::Element { ref name, .. } => &*name.local == tag,
        _ => false,
    }
}

/// Every element under `root`, in document order. The contents of
/// `<template>` elements are included, right after the template itself.
pub fn collect_elements(root: &Handle) -> Vec<Handle> {
    let mut elements = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        for child in node.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
        if let NodeData::Element {
            ref template_contents,
            ..
        } = node.data
        {
            if let Some(contents) = template_contents.borrow().as_ref() {
                stack.push(contents.clone());
            }
            elements.push(node.clone());
        }
    }

    elements
}

pub fn get_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// Sets `attr_name` to `value`, or removes it when `value` is `None`.
pub fn set_attr(node: &Handle, attr_name: &str, value: Option<String>) {
    let NodeData::Element { ref attrs, .. } = node.data else {
        return;
    };
    let mut attrs = attrs.borrow_mut();
    let position = attrs.iter().position(|attr| &*attr.name.local == attr_name);

    match (position, value) {
        (Some(i), Some(value)) => attrs[i].value = StrTendril::from(value),
        (Some(i), None) => {
            attrs.remove(i);
        }
        (None, Some(value)) => attrs.push(attribute(attr_name, value)),
        (None, None) => {}
    }
}

fn attribute(name: &str, value: String) -> Attribute {
    Attribute {
        name: QualName::new(None, ns!(), LocalName::from(name)),
        value: StrTendril::from(value),
    }
}

pub fn create_element(tag: &str, attrs: Vec<(&str, String)>) -> Handle {
    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag)),
        attrs: RefCell::new(
            attrs
                .into_iter()
                .map(|(name, value)| attribute(name, value))
                .collect(),
        ),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// Concatenated text of the node's direct text children.
pub fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    for child in node.children.borrow().iter() {
        if let NodeData::Text { ref contents } = child.data {
            text.push_str(&contents.borrow());
        }
    }
    text
}

pub fn set_text_content(node: &Handle, text: &str) {
    let text_node = Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from(text)),
    });
    for child in node.children.borrow_mut().drain(..) {
        child.parent.set(None);
    }
    append_child(node, text_node);
}

fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

pub fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

pub fn prepend_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().insert(0, child);
}

/// Detaches `node` from its parent. Detached nodes are left as they are.
pub fn remove_node(node: &Handle) {
    if let Some(parent) = parent_of(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

/// Puts `replacement` where `node` is in its parent's children.
pub fn replace_node(node: &Handle, replacement: Handle) {
    let Some(parent) = parent_of(node) else {
        return;
    };
    let mut children = parent.children.borrow_mut();
    if let Some(i) = children.iter().position(|child| Rc::ptr_eq(child, node)) {
        replacement.parent.set(Some(Rc::downgrade(&parent)));
        children[i] = replacement;
        node.parent.set(None);
    }
}
