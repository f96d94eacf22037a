//! Structural HTML → Markdown translation.
//!
//! The article renderer nests presentational `span`/`section` wrappers
//! arbitrarily deep, so this is a fixed tag mapping applied in one
//! depth-first pass rather than a general serializer. Elements outside the
//! mapping are dropped together with their subtree.

use regex::Regex;
use std::sync::LazyLock;

use crate::extractor::{
    model::collapse_whitespace,
    tree::{Element, Node},
};

static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

// Code blocks are parked behind this marker while the surrounding text is
// normalized, so their whitespace survives untouched. HTML parsers never
// produce NUL in text.
const CODE_MARKER: char = '\u{0}';

const BLOCK_BREAK: &str = "\n\n";

/// Translate the children of `root` into Markdown.
pub fn translate(root: &Node) -> String {
    let mut translator = Translator::default();
    let mut out = String::new();
    translator.render_node_children(root, &mut out);
    translator.finish(&out)
}

#[derive(Default)]
struct Translator {
    code_blocks: Vec<String>,
}

impl Translator {
    fn render_node_children(&mut self, node: &Node, out: &mut String) {
        match node {
            Node::Element(el) => self.render_children(&el.children, out),
            Node::Text(text) => push_text(text, out),
        }
    }

    fn render_children(&mut self, nodes: &[Node], out: &mut String) {
        for node in nodes {
            match node {
                Node::Text(text) => push_text(text, out),
                Node::Element(el) => self.render_element(el, out),
            }
        }
    }

    fn render_inline(&mut self, nodes: &[Node]) -> String {
        let mut buf = String::new();
        self.render_children(nodes, &mut buf);
        buf
    }

    fn render_element(&mut self, el: &Element, out: &mut String) {
        match el.tag.as_str() {
            "img" => {
                out.push_str(&image_markdown(el));
                return;
            }
            "br" => {
                out.push('\n');
                return;
            }
            "hr" => {
                push_block(out, "---");
                return;
            }
            _ => {}
        }

        // Blank elements only matter when they carry images.
        if !el.has_text() && el.images().is_empty() {
            return;
        }

        if let Some(level) = el.heading_level() {
            if !el.has_text() {
                push_images(el, out);
                return;
            }
            let text = collapse_whitespace(&el.text());
            push_block(out, &format!("{} {}", "#".repeat(level), text));
            return;
        }

        match el.tag.as_str() {
            "p" => self.render_paragraph(el, out),
            "ul" => self.render_list(el, false, out),
            "ol" => self.render_list(el, true, out),
            "blockquote" => {
                let inner = normalize_lines(&self.render_inline(&el.children));
                if !inner.is_empty() {
                    // Fences span several lines, so they must be in place
                    // before every line gets its prefix.
                    push_block(out, &quote(&self.expand_code(&inner)));
                }
            }
            "pre" => {
                let marker = self.park_code(raw_text(&el.children));
                push_block(out, &marker);
            }
            "code" => {
                let text = collapse_whitespace(&el.text());
                if !text.is_empty() {
                    out.push_str(&inline_code(&text));
                }
            }
            "a" => {
                let inner = self.render_inline(&el.children);
                let inner = inner.trim();
                match el.non_empty_attr("href") {
                    Some(href) if !inner.is_empty() => {
                        out.push_str(&format!("[{}]({})", inner, href));
                    }
                    _ => out.push_str(inner),
                }
            }
            "strong" | "b" => self.render_emphasis(el, "**", out),
            "em" | "i" => self.render_emphasis(el, "*", out),
            "span" | "section" => {
                self.render_children(&el.children, out);
                out.push_str(BLOCK_BREAK);
            }
            _ => {}
        }
    }

    fn render_paragraph(&mut self, el: &Element, out: &mut String) {
        // An image-only paragraph becomes the image itself.
        if !el.has_text() {
            push_images(el, out);
            return;
        }

        let inner = self.render_inline(&el.children);
        let inner = inner.trim();
        if !inner.is_empty() {
            push_block(out, inner);
        }
    }

    fn render_list(&mut self, el: &Element, ordered: bool, out: &mut String) {
        let mut lines = Vec::new();
        for item in el
            .children
            .iter()
            .filter_map(Node::as_element)
            .filter(|child| child.tag == "li")
        {
            let text = collapse_whitespace(&self.render_inline(&item.children));
            if text.is_empty() {
                continue;
            }
            let line = if ordered {
                format!("{}. {}", lines.len() + 1, text)
            } else {
                format!("* {}", text)
            };
            lines.push(line);
        }

        if !lines.is_empty() {
            push_block(out, &lines.join("\n"));
        }
    }

    /// Markers hug the trimmed content so renderers recognise the emphasis.
    fn render_emphasis(&mut self, el: &Element, marker: &str, out: &mut String) {
        let inner = collapse_whitespace(&self.render_inline(&el.children));
        if inner.is_empty() {
            return;
        }
        out.push_str(marker);
        out.push_str(&inner);
        out.push_str(marker);
    }

    fn park_code(&mut self, code: String) -> String {
        let index = self.code_blocks.len();
        self.code_blocks.push(code);
        format!("{CODE_MARKER}{index}{CODE_MARKER}")
    }

    /// Swap parked markers in `text` for their fenced code.
    fn expand_code(&self, text: &str) -> String {
        let mut text = text.to_string();
        for (index, code) in self.code_blocks.iter().enumerate() {
            let marker = format!("{CODE_MARKER}{index}{CODE_MARKER}");
            if text.contains(&marker) {
                text = text.replacen(&marker, &fence(code), 1);
            }
        }
        text
    }

    fn finish(self, raw: &str) -> String {
        self.expand_code(&normalize_lines(raw))
    }
}

/// Text nodes collapse to single spaces but keep a boundary space so inline
/// neighbours do not run together.
fn push_text(text: &str, out: &mut String) {
    if text.is_empty() {
        return;
    }
    let collapsed = collapse_whitespace(text);
    if collapsed.is_empty() {
        out.push(' ');
        return;
    }
    if text.starts_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(&collapsed);
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn push_block(out: &mut String, block: &str) {
    out.push_str(BLOCK_BREAK);
    out.push_str(block);
    out.push_str(BLOCK_BREAK);
}

fn push_images(el: &Element, out: &mut String) {
    for img in el.images() {
        let md = image_markdown(img);
        if !md.is_empty() {
            push_block(out, &md);
        }
    }
}

fn image_markdown(img: &Element) -> String {
    let Some(src) = img.non_empty_attr("src") else {
        return String::new();
    };
    let alt = img
        .attr("alt")
        .map(|alt| escape_brackets(&collapse_whitespace(alt)))
        .unwrap_or_default();
    match img.non_empty_attr("title") {
        Some(title) => format!("![{}]({} \"{}\")", alt, src, title.replace('"', "\\\"")),
        None => format!("![{}]({})", alt, src),
    }
}

/// Verbatim text for code blocks; `<br>` counts as a newline.
fn raw_text(nodes: &[Node]) -> String {
    fn walk(nodes: &[Node], out: &mut String) {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) if el.tag == "br" => out.push('\n'),
                Node::Element(el) => walk(&el.children, out),
            }
        }
    }
    let mut out = String::new();
    walk(nodes, &mut out);
    out.trim_matches('\n').to_string()
}

fn escape_brackets(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

fn fence(code: &str) -> String {
    let ticks = "`".repeat(longest_backtick_run(code).max(2) + 1);
    format!("{ticks}\n{code}\n{ticks}")
}

/// Code spans need a longer delimiter than any backtick run inside them, and
/// a space of padding when the content itself starts or ends with one.
fn inline_code(text: &str) -> String {
    let ticks = "`".repeat(longest_backtick_run(text) + 1);
    if text.starts_with('`') || text.ends_with('`') {
        format!("{ticks} {text} {ticks}")
    } else {
        format!("{ticks}{text}{ticks}")
    }
}

fn quote(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim every line, squeeze runs of blank lines to one, trim the result.
fn normalize_lines(raw: &str) -> String {
    let trimmed = raw
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_LINES.replace_all(&trimmed, "\n\n").trim().to_string()
}
