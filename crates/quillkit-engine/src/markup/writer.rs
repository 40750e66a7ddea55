use crate::editing::document::{
    BlockKind, CustomData, Document, ListKind, NodeId, NodeKind,
};

/// Serialize the whole tree to canonical markup.
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    for &child in doc.children(doc.root()) {
        write_node(doc, child, &mut out);
    }
    out
}

/// Serialize one subtree. Used for whole-document saves and history entries
/// alike; both go through the same canonical encoding.
pub fn serialize_subtree(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    let Some(node) = doc.get(id) else {
        return;
    };
    match &node.kind {
        NodeKind::Root => {
            for &child in &node.children {
                write_node(doc, child, out);
            }
        }
        NodeKind::Text(text) => {
            out.push_str(&html_escape::encode_text(text));
        }
        NodeKind::Span { styles } => {
            let list: Vec<&str> = styles.iter().map(|s| s.as_str()).collect();
            open(out, "span", &[("data-styles", &list.join(","))]);
            for &child in &node.children {
                write_node(doc, child, out);
            }
            close(out, "span");
        }
        NodeKind::InlineCustom(data) => {
            write_custom(out, "span", data);
        }
        NodeKind::Block(block) => write_block(doc, id, block, out),
    }
}

fn write_block(doc: &Document, id: NodeId, block: &BlockKind, out: &mut String) {
    let children = doc.children(id);
    match block {
        BlockKind::Paragraph => {
            open(out, "p", &[]);
            for &child in children {
                write_node(doc, child, out);
            }
            close(out, "p");
        }
        BlockKind::Heading { level, id: stable } => {
            let tag = match level.as_u8() {
                1 => "h1",
                2 => "h2",
                _ => "h3",
            };
            match stable {
                Some(uuid) => open(out, tag, &[("data-id", &uuid.to_string())]),
                None => open(out, tag, &[]),
            }
            for &child in children {
                write_node(doc, child, out);
            }
            close(out, tag);
        }
        BlockKind::Blockquote => {
            open(out, "blockquote", &[]);
            for &child in children {
                write_node(doc, child, out);
            }
            close(out, "blockquote");
        }
        BlockKind::List { kind } => {
            let (tag, attrs): (&str, &[(&str, &str)]) = match kind {
                ListKind::Ordered => ("ol", &[]),
                ListKind::Unordered => ("ul", &[]),
                ListKind::Checklist => ("ul", &[("data-list", "checklist")]),
            };
            open(out, tag, attrs);
            for &child in children {
                write_node(doc, child, out);
            }
            close(out, tag);
        }
        BlockKind::ListItem { checked } => {
            match checked {
                Some(state) => open(out, "li", &[("data-checked", if *state { "true" } else { "false" })]),
                None => open(out, "li", &[]),
            }
            for &child in children {
                write_node(doc, child, out);
            }
            close(out, "li");
        }
        BlockKind::Custom(data) => {
            write_custom(out, "figure", data);
        }
    }
}

/// Custom nodes serialize as their payload attributes on the root element,
/// nothing else; presentation is the host renderer's job.
fn write_custom(out: &mut String, tag: &str, data: &CustomData) {
    // Reserved attributes merge into the payload map so the emitted order
    // stays alphabetical and therefore canonical.
    let mut attrs = data.attrs.clone();
    attrs.insert("data-block-type".to_string(), data.tag.clone());
    if data.degraded {
        attrs.insert("data-degraded".to_string(), "true".to_string());
    }
    out.push('<');
    out.push_str(tag);
    for (name, value) in &attrs {
        push_attr(out, name, value);
    }
    out.push('>');
    close(out, tag);
}

fn open(out: &mut String, tag: &str, attrs: &[(&str, &str)]) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attrs {
        push_attr(out, name, value);
    }
    out.push('>');
}

fn close(out: &mut String, tag: &str) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&html_escape::encode_double_quoted_attribute(value));
    out.push('"');
}
