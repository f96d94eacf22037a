//! Owned, typed view of the article body.
//!
//! `scraper` keeps its nodes in an arena that is awkward to mutate, so the
//! content root is copied into this small tree once. The asset rewriter edits
//! it in place and the Markdown translator pattern-matches over it.

use scraper::{ElementRef, node::Node as DomNode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lower-case local name.
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value, treating blank values as absent.
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    /// Concatenated text of every descendant, like the DOM `textContent`.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    pub fn has_text(&self) -> bool {
        self.text().chars().any(|c| !c.is_whitespace())
    }

    /// Descendant `img` elements in document order.
    pub fn images(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        collect_images(&self.children, &mut out);
        out
    }

    pub fn heading_level(&self) -> Option<usize> {
        match self.tag.as_str() {
            "h1" => Some(1),
            "h2" => Some(2),
            "h3" => Some(3),
            "h4" => Some(4),
            "h5" => Some(5),
            "h6" => Some(6),
            _ => None,
        }
    }
}

impl Node {
    pub fn element(tag: impl Into<String>, children: Vec<Node>) -> Self {
        let mut el = Element::new(tag);
        el.children = children;
        Node::Element(el)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// Copy a parsed element and its subtree. Comments and processing
    /// instructions are dropped.
    pub fn from_element_ref(el: ElementRef<'_>) -> Self {
        let value = el.value();
        let mut element = Element::new(value.name().to_ascii_lowercase());
        element.attrs = value
            .attrs()
            .map(|(name, val)| (name.to_string(), val.to_string()))
            .collect();

        for child in el.children() {
            match child.value() {
                DomNode::Text(text) => element.children.push(Node::Text(text.text.to_string())),
                DomNode::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        element.children.push(Node::from_element_ref(child_el));
                    }
                }
                _ => {}
            }
        }

        Node::Element(element)
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => collect_text(&el.children, out),
        }
    }
}

fn collect_images<'a>(nodes: &'a [Node], out: &mut Vec<&'a Element>) {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.tag == "img" {
                out.push(el);
            } else {
                collect_images(&el.children, out);
            }
        }
    }
}
