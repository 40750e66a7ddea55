use serde::{Deserialize, Serialize};

use crate::editing::document::{Document, NodeId, NodeKind};

/// One end of the live selection: a node plus an offset.
///
/// For text runs the offset counts characters; for every other node it
/// counts children. Carets hold `NodeId`s, which can go stale across a
/// mutation; that is exactly why snapshots exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub node: NodeId,
    pub offset: usize,
}

/// The live selection. `anchor == focus` means a collapsed caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Caret,
    pub focus: Caret,
}

impl Selection {
    pub fn caret(at: Caret) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// One end of a selection snapshot: a path of child indices from the root
/// plus an offset. Never a node reference: nodes may be replaced
/// mid-operation, paths re-resolve against whatever tree exists afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCaret {
    pub path: Vec<usize>,
    pub offset: usize,
}

/// Structural, node-independent snapshot of the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    pub anchor: PathCaret,
    pub focus: PathCaret,
}

/// Capture the live selection as a snapshot.
///
/// Returns `None` when there is no live selection or its nodes are no
/// longer attached; callers treat that as "nothing to restore", not as an
/// error.
pub fn capture(doc: &Document, selection: Option<&Selection>) -> Option<SelectionSnapshot> {
    let selection = selection?;
    let anchor = capture_caret(doc, &selection.anchor)?;
    let focus = capture_caret(doc, &selection.focus)?;
    Some(SelectionSnapshot { anchor, focus })
}

fn capture_caret(doc: &Document, caret: &Caret) -> Option<PathCaret> {
    let path = doc.path_of(caret.node)?;
    Some(PathCaret {
        path,
        offset: caret.offset,
    })
}

/// Re-resolve a snapshot against the current tree.
///
/// Out-of-range path components clamp to the nearest valid sibling; an
/// offset past the end of the resolved node clamps to its end. If nothing
/// resolves (for example the tree shrank to just the root), the caret falls
/// back to the end of the tree. Idempotent: restoring the same snapshot
/// twice yields the same carets.
pub fn restore(doc: &Document, snapshot: &SelectionSnapshot) -> Selection {
    Selection {
        anchor: resolve_clamped(doc, &snapshot.anchor),
        focus: resolve_clamped(doc, &snapshot.focus),
    }
}

fn resolve_clamped(doc: &Document, caret: &PathCaret) -> Caret {
    let mut current = doc.root();
    for &index in &caret.path {
        let children = doc.children(current);
        if children.is_empty() {
            break;
        }
        current = children[index.min(children.len() - 1)];
    }
    if current == doc.root() {
        return end_of_tree(doc);
    }
    Caret {
        node: current,
        offset: clamp_offset(doc, current, caret.offset),
    }
}

fn clamp_offset(doc: &Document, node: NodeId, offset: usize) -> usize {
    match doc.kind(node) {
        Some(NodeKind::Text(text)) => offset.min(text.chars().count()),
        _ => offset.min(doc.children(node).len()),
    }
}

/// Caret at the very end of the document: the deepest last node, offset at
/// its end. Used as the restore fallback and after destructive edits.
pub fn end_of_tree(doc: &Document) -> Caret {
    let mut current = doc.root();
    while let Some(&last) = doc.children(current).last() {
        current = last;
    }
    Caret {
        node: current,
        offset: clamp_offset(doc, current, usize::MAX),
    }
}

/// Caret at the end of a specific block's content.
pub fn end_of_block(doc: &Document, block: NodeId) -> Caret {
    let mut current = block;
    while let Some(&last) = doc.children(current).last() {
        current = last;
    }
    Caret {
        node: current,
        offset: clamp_offset(doc, current, usize::MAX),
    }
}

/// Caret at the start of a specific block's content.
pub fn start_of_block(doc: &Document, block: NodeId) -> Caret {
    let mut current = block;
    while let Some(&first) = doc.children(current).first() {
        current = first;
    }
    Caret {
        node: current,
        offset: 0,
    }
}
