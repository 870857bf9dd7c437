//! Pure mapping from document nodes to a render tree, plus HTML output.

use std::fmt::Write as _;

use quire_core::{BlockType, Document, ElementNode, Node, TextNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    P,
    H1,
    H2,
    Blockquote,
    Ul,
    Ol,
    Li,
    Code,
    Strong,
    Em,
    U,
    Span,
    Div,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::Blockquote => "blockquote",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Code => "code",
            Tag::Strong => "strong",
            Tag::Em => "em",
            Tag::U => "u",
            Tag::Span => "span",
            Tag::Div => "div",
        }
    }
}

/// Inline style declarations, emitted in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style(Vec<(&'static str, &'static str)>);

impl Style {
    pub fn with(mut self, property: &'static str, value: &'static str) -> Self {
        self.0.push((property, value));
        self
    }

    pub fn get(&self, property: &str) -> Option<&'static str> {
        self.0
            .iter()
            .find(|(name, _)| *name == property)
            .map(|(_, value)| *value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn to_css(&self) -> String {
        self.0
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderNode {
    Element {
        tag: Tag,
        style: Style,
        attrs: Vec<(&'static str, String)>,
        children: Vec<RenderNode>,
    },
    Text(String),
}

impl RenderNode {
    pub fn element(tag: Tag, children: Vec<RenderNode>) -> Self {
        Self::styled(tag, Style::default(), children)
    }

    pub fn styled(tag: Tag, style: Style, children: Vec<RenderNode>) -> Self {
        RenderNode::Element {
            tag,
            style,
            attrs: Vec::new(),
            children,
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        if let RenderNode::Element { attrs, .. } = &mut self {
            attrs.push((name, value.into()));
        }
        self
    }

    pub fn tag(&self) -> Option<Tag> {
        match self {
            RenderNode::Element { tag, .. } => Some(*tag),
            RenderNode::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[RenderNode] {
        match self {
            RenderNode::Element { children, .. } => children,
            RenderNode::Text(_) => &[],
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            RenderNode::Text(text) => out.push_str(&escape_html(text)),
            RenderNode::Element {
                tag,
                style,
                attrs,
                children,
            } => {
                let _ = write!(out, "<{}", tag.as_str());
                for (name, value) in attrs {
                    let _ = write!(out, " {name}=\"{}\"", escape_html(value));
                }
                if !style.is_empty() {
                    let _ = write!(out, " style=\"{}\"", escape_html(&style.to_css()));
                }
                out.push('>');
                for child in children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{}>", tag.as_str());
            }
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Block representation keyed by type. Unknown types render as `p`.
pub fn render_element(element: &ElementNode, children: Vec<RenderNode>) -> RenderNode {
    match element.kind {
        BlockType::BlockQuote => RenderNode::styled(
            Tag::Blockquote,
            Style::default()
                .with("color", "#777")
                .with("background-color", "#EEE"),
            children,
        ),
        BlockType::BulletedList => RenderNode::element(Tag::Ul, children),
        BlockType::HeadingOne => RenderNode::element(Tag::H1, children),
        BlockType::HeadingTwo => {
            RenderNode::styled(Tag::H2, Style::default().with("color", "#555"), children)
        }
        BlockType::ListItem => RenderNode::element(Tag::Li, children),
        BlockType::NumberedList => RenderNode::element(Tag::Ol, children),
        BlockType::Code => RenderNode::element(Tag::Code, children),
        BlockType::Paragraph | BlockType::Other(_) => RenderNode::element(Tag::P, children),
    }
}

/// Inline representation: one wrapper per set flag, bold outermost, then
/// code, italic and underline, all inside a `span`.
pub fn render_leaf(leaf: &TextNode, children: Vec<RenderNode>) -> RenderNode {
    let marks = leaf.marks;
    let mut children = children;
    for (set, tag) in [
        (marks.underline, Tag::U),
        (marks.italic, Tag::Em),
        (marks.code, Tag::Code),
        (marks.bold, Tag::Strong),
    ] {
        if set {
            children = vec![RenderNode::element(tag, children)];
        }
    }
    RenderNode::element(Tag::Span, children)
}

pub fn render_node(node: &Node) -> RenderNode {
    match node {
        Node::Text(leaf) => render_leaf(leaf, vec![RenderNode::Text(leaf.text.clone())]),
        Node::Element(element) => {
            let children = element.children.iter().map(render_node).collect();
            render_element(element, children)
        }
    }
}

pub fn render_document(doc: &Document) -> Vec<RenderNode> {
    doc.children.iter().map(render_node).collect()
}

/// Shown over a blank document.
pub const PLACEHOLDER: &str = "Enter some text here...";

/// A single block with no text: what a fresh or cleared document looks like.
pub fn is_blank(doc: &Document) -> bool {
    matches!(doc.children.as_slice(), [Node::Element(el)] if el.is_text_block() && el.text().is_empty())
}

pub fn render_placeholder(text: &str) -> RenderNode {
    RenderNode::styled(
        Tag::Span,
        Style::default()
            .with("pointer-events", "none")
            .with("opacity", "0.333"),
        vec![RenderNode::Text(text.to_string())],
    )
    .attr("data-placeholder", "true")
}

pub fn document_to_html(doc: &Document) -> String {
    render_document(doc)
        .iter()
        .map(RenderNode::to_html)
        .collect()
}
