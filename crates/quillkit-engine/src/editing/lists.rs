use crate::editing::document::{BlockKind, Document, ListKind, NodeId, NodeKind};
use crate::editing::inline;
use crate::editing::selection::{Caret, Selection};
use crate::error::EditError;

/// What Enter does inside a list item. Pure decision, mutation elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Empty item: leave the list, replacing the item with a paragraph.
    Exit,
    /// Non-empty item: continue the list with a fresh item of the same kind.
    Continue,
}

/// Enter-key decision as a function of the item's emptiness. The list kind
/// only influences the created item (checklists continue unchecked).
pub fn continuation(_kind: ListKind, item_is_empty: bool) -> Continuation {
    if item_is_empty {
        Continuation::Exit
    } else {
        Continuation::Continue
    }
}

/// Wrap the selected top-level block(s) in a list root of `kind`.
///
/// When the selection already spans list roots the conversion happens in
/// place (re-tagging the roots) rather than nesting a list in a list.
/// Callers run the normalizer and `merge_adjacent_lists` afterwards.
pub fn create_list(
    doc: &mut Document,
    selection: &Selection,
    kind: ListKind,
) -> Result<(), EditError> {
    let anchor_top = doc
        .top_block(selection.anchor.node)
        .ok_or_else(|| inconsistency("create_list", "selection anchor is not in the tree"))?;
    let focus_top = doc
        .top_block(selection.focus.node)
        .ok_or_else(|| inconsistency("create_list", "selection focus is not in the tree"))?;
    let a = doc
        .child_index(anchor_top)
        .ok_or_else(|| inconsistency("create_list", "anchor block has no root position"))?;
    let b = doc
        .child_index(focus_top)
        .ok_or_else(|| inconsistency("create_list", "focus block has no root position"))?;
    let (lo, hi) = (a.min(b), a.max(b));
    let range: Vec<NodeId> = doc.children(doc.root())[lo..=hi].to_vec();

    let touches_list = range
        .iter()
        .any(|&block| matches!(doc.kind(block), Some(NodeKind::Block(BlockKind::List { .. }))));
    if touches_list {
        for block in range {
            if let Some(NodeKind::Block(BlockKind::List { kind: existing })) = doc.kind(block) {
                if *existing != kind {
                    doc.set_kind(block, NodeKind::Block(BlockKind::List { kind }));
                }
            }
        }
        return Ok(());
    }

    // Wrap the contiguous run of text-bearing blocks starting at the
    // selection; a custom block ends the run untouched.
    let eligible: Vec<NodeId> = range
        .iter()
        .copied()
        .take_while(|&block| {
            matches!(
                doc.kind(block),
                Some(NodeKind::Block(
                    BlockKind::Paragraph | BlockKind::Heading { .. } | BlockKind::Blockquote
                ))
            )
        })
        .collect();
    if eligible.is_empty() {
        return Err(inconsistency("create_list", "no convertible block in selection"));
    }

    let list = doc.alloc(NodeKind::Block(BlockKind::List { kind }));
    doc.insert_child(doc.root(), lo, list);
    for block in eligible {
        let checked = match kind {
            ListKind::Checklist => Some(false),
            _ => None,
        };
        let item = doc.alloc(NodeKind::Block(BlockKind::ListItem { checked }));
        let content: Vec<NodeId> = doc.children(block).to_vec();
        for node in content {
            doc.append_child(item, node);
        }
        doc.remove_subtree(block);
        doc.append_child(list, item);
    }
    Ok(())
}

/// Flip the checked flag on exactly one checklist item.
pub fn toggle_checked(doc: &mut Document, item: NodeId) -> Result<bool, EditError> {
    match doc.kind(item).cloned() {
        Some(NodeKind::Block(BlockKind::ListItem {
            checked: Some(state),
        })) => {
            doc.set_kind(
                item,
                NodeKind::Block(BlockKind::ListItem {
                    checked: Some(!state),
                }),
            );
            Ok(!state)
        }
        Some(NodeKind::Block(BlockKind::ListItem { checked: None })) => Err(inconsistency(
            "toggle_checked",
            "item is not in a checklist",
        )),
        _ => Err(inconsistency("toggle_checked", "node is not a list item")),
    }
}

/// Apply the Enter key inside a list item.
///
/// Splits the item's inline content at the caret for `Continue`, or removes
/// the item and drops a paragraph after the list for `Exit`. Returns the
/// caret destination.
pub fn split_list_item(doc: &mut Document, caret: &Caret) -> Result<Caret, EditError> {
    let item = enclosing_list_item(doc, caret.node)
        .ok_or_else(|| inconsistency("split_list_item", "caret is not inside a list item"))?;
    let list = doc
        .parent(item)
        .ok_or_else(|| inconsistency("split_list_item", "list item has no parent list"))?;
    let Some(NodeKind::Block(BlockKind::List { kind })) = doc.kind(list).cloned() else {
        return Err(inconsistency("split_list_item", "item parent is not a list"));
    };

    let runs = inline::flatten(doc, item);
    match continuation(kind, inline::runs_len(&runs) == 0) {
        Continuation::Exit => {
            let parent = doc
                .parent(list)
                .ok_or_else(|| inconsistency("split_list_item", "list has no parent"))?;
            let list_index = doc
                .child_index(list)
                .ok_or_else(|| inconsistency("split_list_item", "list has no position"))?;
            doc.remove_subtree(item);
            let insert_at = if doc.children(list).is_empty() {
                doc.remove_subtree(list);
                list_index
            } else {
                list_index + 1
            };
            let para = doc.alloc(NodeKind::Block(BlockKind::Paragraph));
            doc.insert_child(parent, insert_at, para);
            Ok(Caret {
                node: para,
                offset: 0,
            })
        }
        Continuation::Continue => {
            let offset =
                inline::caret_flat_offset(doc, item, caret).unwrap_or(inline::runs_len(&runs));
            let (head, tail) = inline::split_at(runs, offset);
            inline::rebuild(doc, item, head);

            let checked = match kind {
                ListKind::Checklist => Some(false),
                _ => None,
            };
            let new_item = doc.alloc(NodeKind::Block(BlockKind::ListItem { checked }));
            let item_index = doc
                .child_index(item)
                .ok_or_else(|| inconsistency("split_list_item", "item has no position"))?;
            doc.insert_child(list, item_index + 1, new_item);
            inline::rebuild(doc, new_item, tail);
            Ok(inline::caret_for_flat_offset(doc, new_item, 0))
        }
    }
}

/// Splice adjacent list roots of the same kind under `parent` into one.
/// Returns the number of merges performed.
pub fn merge_adjacent_lists(doc: &mut Document, parent: NodeId) -> usize {
    let mut merged = 0;
    let mut index = 1;
    loop {
        let children = doc.children(parent);
        if index >= children.len() {
            break;
        }
        let prev = children[index - 1];
        let cur = children[index];
        let same_kind = match (doc.kind(prev), doc.kind(cur)) {
            (
                Some(NodeKind::Block(BlockKind::List { kind: a })),
                Some(NodeKind::Block(BlockKind::List { kind: b })),
            ) => a == b,
            _ => false,
        };
        if same_kind {
            let items: Vec<NodeId> = doc.children(cur).to_vec();
            for item in items {
                doc.append_child(prev, item);
            }
            doc.remove_subtree(cur);
            merged += 1;
        } else {
            index += 1;
        }
    }
    merged
}

fn enclosing_list_item(doc: &Document, from: NodeId) -> Option<NodeId> {
    let mut current = from;
    loop {
        if matches!(
            doc.kind(current),
            Some(NodeKind::Block(BlockKind::ListItem { .. }))
        ) {
            return Some(current);
        }
        current = doc.parent(current)?;
    }
}

fn inconsistency(op: &'static str, detail: &str) -> EditError {
    EditError::TreeInconsistency {
        op,
        detail: detail.to_string(),
    }
}
