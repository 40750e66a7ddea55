use crate::editing::document::{BlockKind, Document, ListKind, NodeId, NodeKind};

/// Restore structural invariants below `scope`, bottom-up.
///
/// After the pass:
/// - no inline wrapper is empty (spans with no children, empty text runs),
/// - no span's only child is a span with the identical style set, and the
///   same for directly nested blockquotes,
/// - no two adjacent siblings are spans with identical style sets,
/// - no two adjacent siblings are plain text runs,
/// - checklist items carry a checked flag, other list items never do.
///
/// Invoked after every command dispatcher operation and after bulk content
/// import. Idempotent: a second pass over an already-normalized tree changes
/// nothing.
pub fn normalize(doc: &mut Document, scope: NodeId) {
    let children: Vec<NodeId> = doc.children(scope).to_vec();
    for child in children {
        normalize(doc, child);
    }
    coerce_checklist_flags(doc, scope);
    // Merging two span siblings can create fresh adjacency at the seam, so
    // repeat the local fix until the child list is stable.
    loop {
        let mut changed = false;
        changed |= drop_empty_inline_children(doc, scope);
        changed |= unwrap_redundant_children(doc, scope);
        changed |= merge_adjacent_children(doc, scope);
        if !changed {
            break;
        }
    }
}

/// Normalize the entire document.
pub fn normalize_tree(doc: &mut Document) {
    let root = doc.root();
    normalize(doc, root);
}

/// Checklist items always carry a checked flag (default unchecked); items of
/// ordered/unordered lists never do. This is also what keeps checklist lists
/// from rendering a bullet marker downstream.
fn coerce_checklist_flags(doc: &mut Document, scope: NodeId) {
    let Some(NodeKind::Block(BlockKind::List { kind })) = doc.kind(scope).cloned() else {
        return;
    };
    let items: Vec<NodeId> = doc.children(scope).to_vec();
    for item in items {
        let Some(NodeKind::Block(BlockKind::ListItem { checked })) = doc.kind(item).cloned() else {
            continue;
        };
        let wanted = match kind {
            ListKind::Checklist => Some(checked.unwrap_or(false)),
            ListKind::Ordered | ListKind::Unordered => None,
        };
        if checked != wanted {
            doc.set_kind(item, NodeKind::Block(BlockKind::ListItem { checked: wanted }));
        }
    }
}

fn drop_empty_inline_children(doc: &mut Document, scope: NodeId) -> bool {
    let children: Vec<NodeId> = doc.children(scope).to_vec();
    let mut changed = false;
    for child in children {
        let empty = match doc.kind(child) {
            Some(NodeKind::Text(text)) => text.is_empty(),
            Some(NodeKind::Span { .. }) => doc.children(child).is_empty(),
            _ => false,
        };
        if empty {
            doc.remove_subtree(child);
            changed = true;
        }
    }
    changed
}

/// Unwrap a child whose only child carries the same tag: a span whose single
/// child is a span with the identical style set, or a blockquote whose
/// single child is a blockquote.
fn unwrap_redundant_children(doc: &mut Document, scope: NodeId) -> bool {
    let children: Vec<NodeId> = doc.children(scope).to_vec();
    let mut changed = false;
    for child in children {
        let grandchildren = doc.children(child);
        if grandchildren.len() != 1 {
            continue;
        }
        let only = grandchildren[0];
        let redundant = match (doc.kind(child), doc.kind(only)) {
            (Some(NodeKind::Span { styles: a }), Some(NodeKind::Span { styles: b })) => a == b,
            (
                Some(NodeKind::Block(BlockKind::Blockquote)),
                Some(NodeKind::Block(BlockKind::Blockquote)),
            ) => true,
            _ => false,
        };
        if redundant {
            let inner: Vec<NodeId> = doc.children(only).to_vec();
            for (i, node) in inner.into_iter().enumerate() {
                doc.insert_child(child, i, node);
            }
            doc.remove_subtree(only);
            changed = true;
        }
    }
    changed
}

fn merge_adjacent_children(doc: &mut Document, scope: NodeId) -> bool {
    let mut changed = false;
    let mut index = 1;
    loop {
        let children = doc.children(scope);
        if index >= children.len() {
            break;
        }
        let prev = children[index - 1];
        let cur = children[index];
        match (doc.kind(prev).cloned(), doc.kind(cur).cloned()) {
            (Some(NodeKind::Text(a)), Some(NodeKind::Text(b))) => {
                doc.set_kind(prev, NodeKind::Text(format!("{a}{b}")));
                doc.remove_subtree(cur);
                changed = true;
            }
            (Some(NodeKind::Span { styles: a }), Some(NodeKind::Span { styles: b })) if a == b => {
                let moved: Vec<NodeId> = doc.children(cur).to_vec();
                for node in moved {
                    doc.append_child(prev, node);
                }
                doc.remove_subtree(cur);
                changed = true;
            }
            _ => index += 1,
        }
    }
    changed
}
