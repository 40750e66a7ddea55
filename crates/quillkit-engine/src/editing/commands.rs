use uuid::Uuid;

use crate::blocks::{Descriptor, Placement};
use crate::editing::document::{
    BlockKind, CustomData, Document, HeadingLevel, NodeId, NodeKind, StyleTag,
};
use crate::editing::inline::{self, FlatRun};
use crate::editing::selection::{Caret, Selection};
use crate::error::EditError;
use crate::markup::Sanitizer;

/// Block-level format targets for `applyBlockFormat`. Paragraph is the
/// default format every toggle falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFormat {
    Paragraph,
    Heading(HeadingLevel),
    Blockquote,
}

impl BlockFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockFormat::Paragraph => "paragraph",
            BlockFormat::Heading(HeadingLevel::H1) => "heading1",
            BlockFormat::Heading(HeadingLevel::H2) => "heading2",
            BlockFormat::Heading(HeadingLevel::H3) => "heading3",
            BlockFormat::Blockquote => "blockquote",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "paragraph" => Some(BlockFormat::Paragraph),
            "heading1" => Some(BlockFormat::Heading(HeadingLevel::H1)),
            "heading2" => Some(BlockFormat::Heading(HeadingLevel::H2)),
            "heading3" => Some(BlockFormat::Heading(HeadingLevel::H3)),
            "blockquote" => Some(BlockFormat::Blockquote),
            _ => None,
        }
    }
}

/// Toggle `tag` across the selected range.
///
/// If every styleable position in the selection already carries the tag the
/// whole range is unstyled, otherwise the tag is added to exactly the
/// selected range; content outside the bounds is untouched. A collapsed
/// selection is a no-op by contract.
pub fn apply_inline_style(
    doc: &mut Document,
    selection: &Selection,
    tag: StyleTag,
) -> Result<(), EditError> {
    if selection.is_collapsed() {
        return Ok(());
    }
    let segments = selected_segments(doc, selection)?;
    if segments.is_empty() {
        return Ok(());
    }

    let fully_styled = segments.iter().all(|(block, range)| {
        let runs = inline::flatten(doc, *block);
        inline::range_fully_styled(&runs, range.clone(), tag)
    });
    let add = !fully_styled;

    for (block, range) in segments {
        if range.start == range.end {
            continue;
        }
        let runs = inline::flatten(doc, block);
        let restyled = inline::restyle(runs, range, tag, add);
        inline::rebuild(doc, block, restyled);
    }
    Ok(())
}

/// Convert the block enclosing the selection start to `format`.
///
/// Toggle rule: requesting the block's current tag converts it back to
/// paragraph, unless the request *is* paragraph, which is a plain no-op.
/// The asymmetry keeps heading-to-heading conversion direct instead of
/// bouncing through paragraph. Children are preserved verbatim, and a
/// heading's stable id survives conversion between heading levels.
pub fn apply_block_format(
    doc: &mut Document,
    selection: &Selection,
    format: BlockFormat,
) -> Result<NodeId, EditError> {
    let block = formattable_block(doc, selection.anchor.node).ok_or_else(|| {
        EditError::TreeInconsistency {
            op: "apply_block_format",
            detail: "selection start is not inside a formattable block".to_string(),
        }
    })?;
    let current = match doc.kind(block) {
        Some(NodeKind::Block(BlockKind::Paragraph)) => BlockFormat::Paragraph,
        Some(NodeKind::Block(BlockKind::Heading { level, .. })) => BlockFormat::Heading(*level),
        Some(NodeKind::Block(BlockKind::Blockquote)) => BlockFormat::Blockquote,
        _ => {
            return Err(EditError::TreeInconsistency {
                op: "apply_block_format",
                detail: "enclosing block lost its format mid-operation".to_string(),
            });
        }
    };

    let target = if current == format && format != BlockFormat::Paragraph {
        BlockFormat::Paragraph
    } else {
        format
    };
    if target == current {
        return Ok(block);
    }

    let carried_id = match doc.kind(block) {
        Some(NodeKind::Block(BlockKind::Heading { id, .. })) => *id,
        _ => None,
    };
    let kind = match target {
        BlockFormat::Paragraph => NodeKind::Block(BlockKind::Paragraph),
        BlockFormat::Blockquote => NodeKind::Block(BlockKind::Blockquote),
        BlockFormat::Heading(level) => NodeKind::Block(BlockKind::Heading {
            level,
            // Assigned once, then stable across heading-level conversions.
            id: Some(carried_id.unwrap_or_else(Uuid::new_v4)),
        }),
    };
    doc.set_kind(block, kind);
    Ok(block)
}

/// Insert a rendered custom block at the caret.
///
/// The fragment's attributes pass through the sanitizer and receive a
/// stable block id. A block-level fragment that ends up last in the tree
/// gets a trailing empty paragraph appended so the caret always has a
/// typable destination afterwards. Returns the caret destination.
pub fn insert_custom_block(
    doc: &mut Document,
    selection: &Selection,
    descriptor: &Descriptor,
    payload: &crate::blocks::Payload,
    sanitizer: &dyn Sanitizer,
) -> Result<Caret, EditError> {
    let fragment = (descriptor.render)(payload)?;
    let mut fragment = sanitizer.sanitize_fragment(&fragment);
    fragment
        .attrs
        .insert("data-block-id".to_string(), Uuid::new_v4().to_string());
    let data = CustomData {
        tag: fragment.tag,
        attrs: fragment.attrs,
        degraded: false,
    };

    match descriptor.placement {
        Placement::Block => {
            let top = doc.top_block(selection.anchor.node).ok_or_else(|| {
                EditError::TreeInconsistency {
                    op: "insert_custom_block",
                    detail: "caret is not inside a top-level block".to_string(),
                }
            })?;
            let index = doc.child_index(top).ok_or_else(|| EditError::TreeInconsistency {
                op: "insert_custom_block",
                detail: "caret block has no root position".to_string(),
            })?;
            let node = doc.alloc(NodeKind::Block(BlockKind::Custom(data)));
            doc.insert_child(doc.root(), index + 1, node);

            let root = doc.root();
            let is_last = doc.children(root).last() == Some(&node);
            let dest = if is_last {
                let para = doc.alloc(NodeKind::Block(BlockKind::Paragraph));
                doc.append_child(root, para);
                para
            } else {
                doc.children(root)[index + 2]
            };
            Ok(Caret {
                node: dest,
                offset: 0,
            })
        }
        Placement::Inline => {
            let block = formattable_block(doc, selection.anchor.node)
                .or_else(|| doc.enclosing_block(selection.anchor.node))
                .ok_or_else(|| EditError::TreeInconsistency {
                    op: "insert_custom_block",
                    detail: "caret is not inside a block".to_string(),
                })?;
            let offset = inline::caret_flat_offset(doc, block, &selection.anchor)
                .unwrap_or_else(|| inline::runs_len(&inline::flatten(doc, block)));
            let runs = inline::flatten(doc, block);
            let (mut head, tail) = inline::split_at(runs, offset);
            head.push(FlatRun::Custom(data));
            head.extend(tail);
            inline::rebuild(doc, block, head);
            Ok(inline::caret_for_flat_offset(doc, block, offset + 1))
        }
    }
}

/// Nearest ancestor-or-self block that inline formatting applies to.
fn formattable_block(doc: &Document, from: NodeId) -> Option<NodeId> {
    let mut current = from;
    loop {
        if matches!(
            doc.kind(current),
            Some(NodeKind::Block(
                BlockKind::Paragraph | BlockKind::Heading { .. } | BlockKind::Blockquote
            ))
        ) {
            return Some(current);
        }
        current = doc.parent(current)?;
    }
}

/// Blocks whose inline content a selection can cover, in document order.
fn inline_blocks(doc: &Document) -> Vec<NodeId> {
    let mut blocks = Vec::new();
    collect_inline_blocks(doc, doc.root(), &mut blocks);
    blocks
}

fn collect_inline_blocks(doc: &Document, id: NodeId, out: &mut Vec<NodeId>) {
    for &child in doc.children(id) {
        match doc.kind(child) {
            Some(NodeKind::Block(
                BlockKind::Paragraph
                | BlockKind::Heading { .. }
                | BlockKind::Blockquote
                | BlockKind::ListItem { .. },
            )) => {
                out.push(child);
                collect_inline_blocks(doc, child, out);
            }
            Some(NodeKind::Block(BlockKind::List { .. })) => {
                collect_inline_blocks(doc, child, out);
            }
            _ => {}
        }
    }
}

/// Resolve an expanded selection into per-block flat ranges, ordered from
/// document start to end.
fn selected_segments(
    doc: &Document,
    selection: &Selection,
) -> Result<Vec<(NodeId, std::ops::Range<usize>)>, EditError> {
    let blocks = inline_blocks(doc);
    let locate = |caret: &Caret| -> Option<(usize, usize)> {
        let block = inline_block_of(doc, caret.node, &blocks)?;
        let position = blocks.iter().position(|&b| b == block)?;
        let offset = inline::caret_flat_offset(doc, block, caret)?;
        Some((position, offset))
    };
    let a = locate(&selection.anchor).ok_or_else(|| EditError::TreeInconsistency {
        op: "apply_inline_style",
        detail: "selection anchor does not resolve to inline content".to_string(),
    })?;
    let b = locate(&selection.focus).ok_or_else(|| EditError::TreeInconsistency {
        op: "apply_inline_style",
        detail: "selection focus does not resolve to inline content".to_string(),
    })?;
    let (start, end) = if a <= b { (a, b) } else { (b, a) };

    let mut segments = Vec::new();
    for position in start.0..=end.0 {
        let block = blocks[position];
        let len = inline::runs_len(&inline::flatten(doc, block));
        let from = if position == start.0 { start.1 } else { 0 };
        let to = if position == end.0 { end.1 } else { len };
        segments.push((block, from..to.min(len)));
    }
    Ok(segments)
}

/// The inline-bearing block a caret belongs to, restricted to the collected
/// block list so list roots and custom blocks never become segments.
fn inline_block_of(doc: &Document, from: NodeId, blocks: &[NodeId]) -> Option<NodeId> {
    let mut current = from;
    loop {
        if blocks.contains(&current) {
            return Some(current);
        }
        current = doc.parent(current)?;
    }
}
