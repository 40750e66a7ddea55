use std::collections::BTreeMap;

use uuid::Uuid;

use crate::blocks::{Fragment, Registry};
use crate::editing::document::{
    BlockKind, CustomData, Document, HeadingLevel, ListKind, NodeKind, StyleSet, StyleTag,
};
use crate::markup::{MarkupError, Sanitizer};

/// Parse persisted markup into a content tree.
///
/// Custom blocks are validated against the registry on the way in: an
/// unknown type tag or a payload the descriptor cannot parse marks the node
/// degraded (read-only, attributes preserved) instead of failing the whole
/// load. Structural errors (unknown tags, mismatched nesting) do fail.
pub fn parse_document(
    input: &str,
    registry: &Registry,
    sanitizer: &dyn Sanitizer,
) -> Result<Document, MarkupError> {
    let mut doc = Document::new();
    let seed = doc.children(doc.root())[0];
    doc.remove_subtree(seed);

    let mut stack: Vec<(crate::editing::document::NodeId, String)> = Vec::new();
    let mut cursor = Cursor::new(input);

    while !cursor.at_end() {
        let at = cursor.pos;
        if cursor.rest().starts_with("</") {
            let name = cursor.read_close_tag()?;
            match stack.pop() {
                Some((_, open_name)) if open_name == name => {}
                _ => return Err(MarkupError::UnexpectedClose { name, at }),
            }
        } else if cursor.rest().starts_with('<') {
            let (name, attrs, self_closing) = cursor.read_open_tag()?;
            let kind = build_kind(&name, &attrs, registry, sanitizer, at)?;
            let parent = stack.last().map(|(id, _)| *id).unwrap_or(doc.root());
            let node = doc.alloc(kind);
            doc.append_child(parent, node);
            if !self_closing {
                stack.push((node, name));
            }
        } else {
            let raw = cursor.read_text();
            let text = html_escape::decode_html_entities(raw).to_string();
            let (parent, parent_name) = stack
                .last()
                .map(|(id, name)| (*id, name.as_str()))
                .unwrap_or((doc.root(), "root"));
            if accepts_inline(doc.kind(parent)) {
                let run = doc.alloc_text(text);
                doc.append_child(parent, run);
            } else if !text.trim().is_empty() {
                return Err(MarkupError::StrayText {
                    parent: parent_name.to_string(),
                    at,
                });
            }
        }
    }

    if let Some((_, name)) = stack.pop() {
        return Err(MarkupError::Unclosed { name });
    }
    if doc.children(doc.root()).is_empty() {
        let para = doc.alloc(NodeKind::Block(BlockKind::Paragraph));
        doc.append_child(doc.root(), para);
    }
    Ok(doc)
}

fn accepts_inline(kind: Option<&NodeKind>) -> bool {
    matches!(
        kind,
        Some(
            NodeKind::Span { .. }
                | NodeKind::Block(
                    BlockKind::Paragraph
                        | BlockKind::Heading { .. }
                        | BlockKind::Blockquote
                        | BlockKind::ListItem { .. }
                )
        )
    )
}

fn build_kind(
    name: &str,
    attrs: &BTreeMap<String, String>,
    registry: &Registry,
    sanitizer: &dyn Sanitizer,
    at: usize,
) -> Result<NodeKind, MarkupError> {
    let kind = match name {
        "p" => NodeKind::Block(BlockKind::Paragraph),
        "h1" | "h2" | "h3" => {
            let level = match name {
                "h1" => HeadingLevel::H1,
                "h2" => HeadingLevel::H2,
                _ => HeadingLevel::H3,
            };
            let id = attrs
                .get("data-id")
                .and_then(|raw| Uuid::parse_str(raw).ok());
            NodeKind::Block(BlockKind::Heading { level, id })
        }
        "blockquote" => NodeKind::Block(BlockKind::Blockquote),
        "ul" => {
            let kind = if attrs.get("data-list").map(String::as_str) == Some("checklist") {
                ListKind::Checklist
            } else {
                ListKind::Unordered
            };
            NodeKind::Block(BlockKind::List { kind })
        }
        "ol" => NodeKind::Block(BlockKind::List {
            kind: ListKind::Ordered,
        }),
        "li" => NodeKind::Block(BlockKind::ListItem {
            checked: attrs.get("data-checked").map(|v| v == "true"),
        }),
        "span" => {
            if attrs.contains_key("data-block-type") {
                NodeKind::InlineCustom(custom_data(attrs, registry, sanitizer, at)?)
            } else {
                NodeKind::Span {
                    styles: parse_styles(attrs.get("data-styles").map(String::as_str)),
                }
            }
        }
        "figure" => NodeKind::Block(BlockKind::Custom(custom_data(
            attrs, registry, sanitizer, at,
        )?)),
        _ => {
            return Err(MarkupError::UnknownTag {
                name: name.to_string(),
                at,
            });
        }
    };
    Ok(kind)
}

fn parse_styles(raw: Option<&str>) -> StyleSet {
    let mut styles = StyleSet::new();
    for name in raw.unwrap_or("").split(',') {
        match StyleTag::from_str(name.trim()) {
            Some(style) => {
                styles.insert(style);
            }
            None if name.trim().is_empty() => {}
            None => log::warn!("ignoring unknown style tag `{name}` in markup"),
        }
    }
    styles
}

/// Build custom node data: sanitize payload attributes, then validate the
/// payload against the registered descriptor. Validation failure or a
/// missing descriptor degrades the block rather than dropping it.
fn custom_data(
    attrs: &BTreeMap<String, String>,
    registry: &Registry,
    sanitizer: &dyn Sanitizer,
    at: usize,
) -> Result<CustomData, MarkupError> {
    let tag = attrs
        .get("data-block-type")
        .ok_or(MarkupError::MissingBlockType { at })?
        .clone();
    let mut clean = BTreeMap::new();
    for (name, value) in attrs {
        if name == "data-block-type" || name == "data-degraded" {
            continue;
        }
        if let Some(kept) = sanitizer.sanitize_attr(&tag, name, value) {
            clean.insert(name.clone(), kept);
        }
    }

    let degraded = match registry.lookup(&tag) {
        None => {
            log::warn!("no descriptor for custom block type `{tag}`; keeping it read-only");
            true
        }
        Some(descriptor) => {
            let fragment = Fragment {
                tag: tag.clone(),
                attrs: clean.clone(),
            };
            match (descriptor.parse)(&fragment) {
                Ok(_) => false,
                Err(e) => {
                    log::warn!("custom block `{tag}` payload failed to parse ({e}); degrading");
                    true
                }
            }
        }
    };

    Ok(CustomData {
        tag,
        attrs: clean,
        degraded,
    })
}

/// Byte cursor over the markup input. Tags and attribute names are ASCII;
/// text and attribute values are arbitrary UTF-8 handled by slicing between
/// ASCII delimiters.
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn read_text(&mut self) -> &'a str {
        let start = self.pos;
        match self.rest().find('<') {
            Some(offset) => self.pos += offset,
            None => self.pos = self.input.len(),
        }
        &self.input[start..self.pos]
    }

    fn read_close_tag(&mut self) -> Result<String, MarkupError> {
        let at = self.pos;
        self.pos += 2; // consume "</"
        let name = self.read_name();
        if name.is_empty() || !self.rest().starts_with('>') {
            return Err(MarkupError::MalformedTag { at });
        }
        self.pos += 1;
        Ok(name)
    }

    fn read_open_tag(
        &mut self,
    ) -> Result<(String, BTreeMap<String, String>, bool), MarkupError> {
        let at = self.pos;
        self.pos += 1; // consume '<'
        let name = self.read_name();
        if name.is_empty() {
            return Err(MarkupError::MalformedTag { at });
        }
        let mut attrs = BTreeMap::new();
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok((name, attrs, true));
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                return Ok((name, attrs, false));
            }
            let attr_name = self.read_name();
            if attr_name.is_empty() {
                return Err(MarkupError::MalformedTag { at });
            }
            if self.rest().starts_with("=\"") {
                self.pos += 2;
                let value_start = self.pos;
                match self.rest().find('"') {
                    Some(offset) => {
                        let raw = &self.input[value_start..value_start + offset];
                        self.pos += offset + 1;
                        attrs.insert(
                            attr_name,
                            html_escape::decode_html_entities(raw).to_string(),
                        );
                    }
                    None => return Err(MarkupError::MalformedTag { at }),
                }
            } else {
                attrs.insert(attr_name, String::new());
            }
        }
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        for (offset, c) in self.rest().char_indices() {
            if c.is_ascii_alphanumeric() || c == '-' {
                continue;
            }
            self.pos = start + offset;
            return self.input[start..self.pos].to_string();
        }
        self.pos = self.input.len();
        self.input[start..].to_string()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }
}
