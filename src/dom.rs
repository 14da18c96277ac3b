//! Owned model of the mounted region.
//!
//! Nodes live in an arena and are addressed by `NodeId`. Ids stay valid
//! while a node is detached, so callers check `is_attached` before trusting
//! one. Document order is always recomputed from the sibling links.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::DocumentError;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose body is never parsed as markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How an element is closed when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseStyle {
    Normal,
    SelfClosing,
    Void,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Attribute values are kept in their escaped source form.
    pub attrs: Vec<(String, String)>,
    pub close: CloseStyle,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Element(Element),
    /// Raw, still-escaped character data.
    Text(String),
    Comment(String),
    /// Doctype, CDATA and processing instructions, stored verbatim.
    Markup(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Root)],
        }
    }

    /// Parses an HTML fragment leniently.
    ///
    /// A `<` that cannot open a tag is kept as text (`&lt;`), and the bodies
    /// of raw-text elements are stored as opaque markup.
    pub fn parse(markup: &str) -> Result<Self, DocumentError> {
        let source = escape_stray_angles(markup);
        let mut doc = Document::new();
        let mut stack: Vec<(NodeId, String)> = Vec::new();
        let mut offset = 0;
        while offset < source.len() {
            offset = doc.parse_from(&source, offset, &mut stack)?;
        }
        Ok(doc)
    }

    /// Parses `source[offset..]` until the end, or until a raw-text element
    /// has been consumed. Returns the offset to resume from.
    fn parse_from(
        &mut self,
        source: &str,
        offset: usize,
        stack: &mut Vec<(NodeId, String)>,
    ) -> Result<usize, DocumentError> {
        let mut reader = Reader::from_str(&source[offset..]);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        loop {
            let parent = stack.last().map(|(id, _)| *id).unwrap_or(self.root());
            let position = (offset + reader.buffer_position() as usize) as u64;
            let event = reader.read_event().map_err(|err| DocumentError::Parse {
                position,
                message: err.to_string(),
            })?;
            match event {
                Event::Start(start) => {
                    let element = element_from(&start, CloseStyle::Normal, position)?;
                    let is_void = is_void(&element.name);
                    let name = element.name.clone();
                    let close = if is_void {
                        CloseStyle::Void
                    } else {
                        CloseStyle::Normal
                    };
                    let id = self.push(NodeKind::Element(Element { close, ..element }));
                    self.append_child(parent, id);
                    if is_raw_text(&name) {
                        let body_start = offset + reader.buffer_position() as usize;
                        let (body_end, resume) = raw_text_end(source, body_start, &name);
                        if body_end > body_start {
                            let body =
                                self.push(NodeKind::Markup(source[body_start..body_end].to_string()));
                            self.append_child(id, body);
                        }
                        return Ok(resume);
                    }
                    if !is_void {
                        stack.push((id, name));
                    }
                }
                Event::Empty(start) => {
                    let element = element_from(&start, CloseStyle::SelfClosing, position)?;
                    let id = self.push(NodeKind::Element(element));
                    self.append_child(parent, id);
                }
                Event::End(end) => {
                    let end_name = end.name();
                    let name = utf8(end_name.as_ref(), position)?;
                    if let Some(depth) = stack
                        .iter()
                        .rposition(|(_, open)| open.eq_ignore_ascii_case(name))
                    {
                        stack.truncate(depth);
                    }
                }
                Event::Text(text) => {
                    let raw = utf8(&text, position)?;
                    if !raw.is_empty() {
                        let id = self.push(NodeKind::Text(raw.to_string()));
                        self.append_child(parent, id);
                    }
                }
                Event::CData(data) => {
                    let raw = utf8(&data, position)?;
                    let id = self.push(NodeKind::Markup(format!("<![CDATA[{raw}]]>")));
                    self.append_child(parent, id);
                }
                Event::Comment(comment) => {
                    let raw = utf8(&comment, position)?;
                    let id = self.push(NodeKind::Comment(raw.to_string()));
                    self.append_child(parent, id);
                }
                Event::DocType(doctype) => {
                    let raw = utf8(&doctype, position)?;
                    let id = self.push(NodeKind::Markup(format!("<!DOCTYPE {}>", raw.trim())));
                    self.append_child(parent, id);
                }
                Event::Decl(decl) => {
                    let raw = utf8(&decl, position)?;
                    let id = self.push(NodeKind::Markup(format!("<?{raw}?>")));
                    self.append_child(parent, id);
                }
                Event::PI(pi) => {
                    let raw = utf8(&pi, position)?;
                    let id = self.push(NodeKind::Markup(format!("<?{raw}?>")));
                    self.append_child(parent, id);
                }
                Event::Eof => return Ok(source.len()),
            }
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|node| &node.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.first_child)
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.last_child)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.next_sibling)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.prev_sibling)
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.first_child(id),
        }
    }

    /// True when the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if id.0 >= self.nodes.len() {
            return false;
        }
        let mut cursor = id;
        loop {
            if cursor == self.root() {
                return true;
            }
            match self.parent(cursor) {
                Some(parent) => cursor = parent,
                None => return false,
            }
        }
    }

    pub fn create_element(&mut self, name: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.push(NodeKind::Element(Element {
            name: name.to_string(),
            attrs,
            close: CloseStyle::Normal,
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind));
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let last = self.nodes[parent.0].last_child;
        {
            let node = &mut self.nodes[child.0];
            node.parent = Some(parent);
            node.prev_sibling = last;
            node.next_sibling = None;
        }
        match last {
            Some(last) => self.nodes[last.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    /// Inserts `child` immediately before `reference` under the same parent.
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(child);
        let prev = self.nodes[reference.0].prev_sibling;
        {
            let node = &mut self.nodes[child.0];
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = Some(reference);
        }
        self.nodes[reference.0].prev_sibling = Some(child);
        match prev {
            Some(prev) => self.nodes[prev.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
    }

    /// Unlinks a node (and its subtree) from its parent.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.0];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        let Some(parent) = parent else {
            return;
        };
        match prev {
            Some(prev) => self.nodes[prev.0].next_sibling = next,
            None => self.nodes[parent.0].first_child = next,
        }
        match next {
            Some(next) => self.nodes[next.0].prev_sibling = prev,
            None => self.nodes[parent.0].last_child = prev,
        }
        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Replaces `old` with `replacements`, in order.
    pub fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) {
        if self.parent(old).is_none() {
            return;
        }
        for &node in replacements {
            self.insert_before(old, node);
        }
        self.detach(old);
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|element| element.has_class(class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let Some(NodeKind::Element(element)) = self.nodes.get_mut(id.0).map(|node| &mut node.kind)
        else {
            return;
        };
        match element
            .attrs
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case("class"))
        {
            Some((_, value)) if value.trim().is_empty() => *value = class.to_string(),
            Some((_, value)) => {
                value.push(' ');
                value.push_str(class);
            }
            None => element.attrs.push(("class".to_string(), class.to_string())),
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let Some(NodeKind::Element(element)) = self.nodes.get_mut(id.0).map(|node| &mut node.kind)
        else {
            return;
        };
        if let Some((_, value)) = element
            .attrs
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case("class"))
        {
            *value = value
                .split_ascii_whitespace()
                .filter(|c| *c != class)
                .collect::<Vec<_>>()
                .join(" ");
        }
    }

    /// Concatenated raw text below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.text(id) {
            out.push_str(text);
            return out;
        }
        let mut cursor = self.first_child(id).map(|_| id);
        while let Some(node) = cursor.and_then(|c| self.next_within(c, id)) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
            cursor = Some(node);
        }
        out
    }

    /// Pre-order successor of `id`, staying below the root.
    pub fn next_in_order(&self, id: NodeId) -> Option<NodeId> {
        self.next_within(id, self.root())
    }

    fn next_within(&self, id: NodeId, scope: NodeId) -> Option<NodeId> {
        if let Some(child) = self.first_child(id) {
            return Some(child);
        }
        let mut cursor = id;
        loop {
            if cursor == scope {
                return None;
            }
            if let Some(next) = self.next_sibling(cursor) {
                return Some(next);
            }
            cursor = self.parent(cursor)?;
        }
    }

    /// Pre-order predecessor of `id`; never returns the root.
    pub fn previous_in_order(&self, id: NodeId) -> Option<NodeId> {
        if id == self.root() {
            return None;
        }
        match self.prev_sibling(id) {
            Some(prev) => {
                let mut cursor = prev;
                while let Some(last) = self.last_child(cursor) {
                    cursor = last;
                }
                Some(cursor)
            }
            None => self.parent(id).filter(|parent| *parent != self.root()),
        }
    }

    /// The first text node after `id` in document order.
    pub fn next_text_node(&self, id: NodeId) -> Option<NodeId> {
        let mut cursor = self.next_in_order(id);
        while let Some(node) = cursor {
            if self.text(node).is_some() {
                return Some(node);
            }
            cursor = self.next_in_order(node);
        }
        None
    }

    /// Inner markup of the root.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.root()) {
            self.write_node(child, &mut out);
        }
        out
    }

    /// Outer markup of one node.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(kind) = self.kind(id) else {
            return;
        };
        match kind {
            NodeKind::Root => {
                for child in self.children(id) {
                    self.write_node(child, out);
                }
            }
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for (name, value) in &element.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&value.replace('"', "&quot;"));
                    out.push('"');
                }
                match element.close {
                    CloseStyle::SelfClosing => out.push_str("/>"),
                    CloseStyle::Void => out.push('>'),
                    CloseStyle::Normal => {
                        out.push('>');
                        for child in self.children(id) {
                            self.write_node(child, out);
                        }
                        out.push_str("</");
                        out.push_str(&element.name);
                        out.push('>');
                    }
                }
            }
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Markup(raw) => out.push_str(raw),
        }
    }
}

pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_sibling(current);
        Some(current)
    }
}

fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS
        .iter()
        .any(|raw| raw.eq_ignore_ascii_case(name))
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS
        .iter()
        .any(|void| void.eq_ignore_ascii_case(name))
}

fn utf8(bytes: &[u8], position: u64) -> Result<&str, DocumentError> {
    std::str::from_utf8(bytes).map_err(|_| DocumentError::Encoding { position })
}

fn element_from(
    start: &BytesStart<'_>,
    close: CloseStyle,
    position: u64,
) -> Result<Element, DocumentError> {
    let start_name = start.name();
    let name = utf8(start_name.as_ref(), position)?.to_string();
    let mut attrs = Vec::new();
    for attr in start.html_attributes() {
        let attr = attr.map_err(|err| DocumentError::Parse {
            position,
            message: err.to_string(),
        })?;
        let key = utf8(attr.key.as_ref(), position)?.to_string();
        let value = utf8(&attr.value, position)?.to_string();
        attrs.push((key, value));
    }
    Ok(Element { name, attrs, close })
}

/// Body end and resume offset for a raw-text element whose body starts at
/// `from`. An unterminated body runs to the end of the input.
fn raw_text_end(source: &str, from: usize, name: &str) -> (usize, usize) {
    let lowered = source[from..].to_ascii_lowercase();
    let closing = format!("</{}", name.to_ascii_lowercase());
    match lowered.find(&closing) {
        Some(rel) => {
            let body_end = from + rel;
            let resume = source[body_end..]
                .find('>')
                .map_or(source.len(), |gt| body_end + gt + 1);
            (body_end, resume)
        }
        None => (source.len(), source.len()),
    }
}

/// Offset just past the tag, comment or declaration opening at `start`.
fn markup_end(source: &str, start: usize) -> usize {
    let rest = &source[start..];
    let terminator = if rest.starts_with("<!--") {
        Some("-->")
    } else if rest.starts_with("<![CDATA[") {
        Some("]]>")
    } else {
        None
    };
    if let Some(terminator) = terminator {
        return rest
            .find(terminator)
            .map_or(source.len(), |at| start + at + terminator.len());
    }
    let mut quote = None;
    for (at, ch) in rest.char_indices().skip(1) {
        match (quote, ch) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '>') => return start + at + 1,
            (None, _) => {}
        }
    }
    source.len()
}

/// Rewrites every `<` that cannot start markup as `&lt;`, leaving tags,
/// comments and raw-text bodies untouched.
fn escape_stray_angles(markup: &str) -> Cow<'_, str> {
    let bytes = markup.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut cursor = 0;
    while let Some(rel) = markup[cursor..].find('<') {
        let at = cursor + rel;
        let opens_markup = bytes
            .get(at + 1)
            .is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?'));
        if !opens_markup {
            out.push_str(&markup[copied..at]);
            out.push_str("&lt;");
            copied = at + 1;
            cursor = at + 1;
            continue;
        }
        cursor = markup_end(markup, at);
        if let Some(name) = raw_text_name(&markup[at..cursor]) {
            cursor = raw_text_end(markup, cursor, name).0;
        }
    }
    if copied == 0 {
        return Cow::Borrowed(markup);
    }
    out.push_str(&markup[copied..]);
    Cow::Owned(out)
}

/// Name of a raw-text element when `tag` opens one.
fn raw_text_name(tag: &str) -> Option<&str> {
    if tag.ends_with("/>") {
        return None;
    }
    let name = tag
        .strip_prefix('<')?
        .split(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .next()?;
    is_raw_text(name).then_some(name)
}
