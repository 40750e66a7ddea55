//! Flat-run view of a block's inline content.
//!
//! Styling and splitting both reduce to the same shape of work: read a
//! block's inline tree as a flat sequence of styled runs, edit the sequence,
//! and rebuild the tree. Rebuilding produces one node per run and leaves the
//! normalizer to merge and prune, which keeps every edit path converging on
//! the same invariants.

use crate::editing::document::{CustomData, Document, NodeId, NodeKind, StyleSet, StyleTag};
use crate::editing::selection::Caret;

/// One element of a block's flattened inline content.
///
/// An inline custom node is atomic and occupies one character position in
/// flat-offset space.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatRun {
    Text { text: String, styles: StyleSet },
    Custom(CustomData),
}

impl FlatRun {
    pub fn char_len(&self) -> usize {
        match self {
            FlatRun::Text { text, .. } => text.chars().count(),
            FlatRun::Custom(_) => 1,
        }
    }
}

/// Total flat length of a run sequence.
pub fn runs_len(runs: &[FlatRun]) -> usize {
    runs.iter().map(FlatRun::char_len).sum()
}

/// Flatten a block's inline children to runs, resolving nested spans to
/// their accumulated style sets. Block-level children (nested structure) are
/// ignored; callers that rebuild are expected to leave them alone.
pub fn flatten(doc: &Document, block: NodeId) -> Vec<FlatRun> {
    let mut runs = Vec::new();
    for &child in doc.children(block) {
        flatten_into(doc, child, &StyleSet::new(), &mut runs);
    }
    runs
}

fn flatten_into(doc: &Document, id: NodeId, inherited: &StyleSet, runs: &mut Vec<FlatRun>) {
    match doc.kind(id) {
        Some(NodeKind::Text(text)) => runs.push(FlatRun::Text {
            text: text.clone(),
            styles: inherited.clone(),
        }),
        Some(NodeKind::Span { styles }) => {
            let mut combined = inherited.clone();
            combined.extend(styles.iter().copied());
            let children: Vec<NodeId> = doc.children(id).to_vec();
            for child in children {
                flatten_into(doc, child, &combined, runs);
            }
        }
        Some(NodeKind::InlineCustom(data)) => runs.push(FlatRun::Custom(data.clone())),
        _ => {}
    }
}

/// Flat offset of a caret within `block`, or `None` when the caret does not
/// point into this block's inline content.
pub fn caret_flat_offset(doc: &Document, block: NodeId, caret: &Caret) -> Option<usize> {
    if caret.node == block {
        // Caret between top-level children: sum the widths before it.
        let children = doc.children(block);
        let upto = caret.offset.min(children.len());
        let mut acc = 0;
        for &child in &children[..upto] {
            let mut runs = Vec::new();
            flatten_into(doc, child, &StyleSet::new(), &mut runs);
            acc += runs_len(&runs);
        }
        return Some(acc);
    }
    let mut acc = 0;
    for &child in doc.children(block) {
        match locate(doc, child, caret, &mut acc) {
            Located::Found(offset) => return Some(offset),
            Located::NotHere => {}
        }
    }
    None
}

enum Located {
    Found(usize),
    NotHere,
}

fn locate(doc: &Document, id: NodeId, caret: &Caret, acc: &mut usize) -> Located {
    match doc.kind(id) {
        Some(NodeKind::Text(text)) => {
            let len = text.chars().count();
            if id == caret.node {
                return Located::Found(*acc + caret.offset.min(len));
            }
            *acc += len;
        }
        Some(NodeKind::InlineCustom(_)) => {
            if id == caret.node {
                return Located::Found(*acc);
            }
            *acc += 1;
        }
        Some(NodeKind::Span { .. }) => {
            if id == caret.node {
                // Caret addressed between the span's children: descend by
                // summing the widths of the skipped children.
                let children = doc.children(id);
                let upto = caret.offset.min(children.len());
                let mut inner = 0;
                for &child in &children[..upto] {
                    let mut runs = Vec::new();
                    flatten_into(doc, child, &StyleSet::new(), &mut runs);
                    inner += runs_len(&runs);
                }
                return Located::Found(*acc + inner);
            }
            let children: Vec<NodeId> = doc.children(id).to_vec();
            for child in children {
                if let Located::Found(offset) = locate(doc, child, caret, acc) {
                    return Located::Found(offset);
                }
            }
        }
        _ => {}
    }
    Located::NotHere
}

/// Split a run sequence at a flat offset.
pub fn split_at(runs: Vec<FlatRun>, offset: usize) -> (Vec<FlatRun>, Vec<FlatRun>) {
    let mut head = Vec::new();
    let mut tail = Vec::new();
    let mut remaining = offset;
    for run in runs {
        let len = run.char_len();
        if remaining >= len {
            remaining -= len;
            head.push(run);
        } else if remaining == 0 {
            tail.push(run);
        } else {
            match run {
                FlatRun::Text { text, styles } => {
                    let first: String = text.chars().take(remaining).collect();
                    let second: String = text.chars().skip(remaining).collect();
                    head.push(FlatRun::Text {
                        text: first,
                        styles: styles.clone(),
                    });
                    tail.push(FlatRun::Text {
                        text: second,
                        styles,
                    });
                }
                // Atomic runs cannot be split; keep them whole on the left.
                FlatRun::Custom(data) => head.push(FlatRun::Custom(data)),
            }
            remaining = 0;
        }
    }
    (head, tail)
}

/// Whether every styleable position in `range` already carries `tag`.
/// Atomic custom runs are transparent to the check. An empty or
/// custom-only range counts as not styled.
pub fn range_fully_styled(runs: &[FlatRun], range: std::ops::Range<usize>, tag: StyleTag) -> bool {
    let mut pos = 0;
    let mut saw_text = false;
    for run in runs {
        let len = run.char_len();
        let run_range = pos..pos + len;
        pos += len;
        let overlap = run_range.start.max(range.start)..run_range.end.min(range.end);
        if overlap.start >= overlap.end {
            continue;
        }
        if let FlatRun::Text { styles, .. } = run {
            saw_text = true;
            if !styles.contains(&tag) {
                return false;
            }
        }
    }
    saw_text
}

/// Add or remove `tag` across `range`, splitting runs at the boundaries.
pub fn restyle(
    runs: Vec<FlatRun>,
    range: std::ops::Range<usize>,
    tag: StyleTag,
    add: bool,
) -> Vec<FlatRun> {
    let (head, rest) = split_at(runs, range.start);
    let (mut mid, tail) = split_at(rest, range.end.saturating_sub(range.start));
    for run in &mut mid {
        if let FlatRun::Text { styles, .. } = run {
            if add {
                styles.insert(tag);
            } else {
                styles.remove(&tag);
            }
        }
    }
    let mut out = head;
    out.extend(mid);
    out.extend(tail);
    out
}

/// Replace a block's inline children with nodes built from `runs`.
///
/// Emits one node per run (plain text, single span wrapping a text run, or
/// inline custom node); the normalizer merges adjacent results afterwards.
/// Non-inline children of the block are left untouched.
pub fn rebuild(doc: &mut Document, block: NodeId, runs: Vec<FlatRun>) {
    let inline_children: Vec<NodeId> = doc
        .children(block)
        .iter()
        .copied()
        .filter(|&c| doc.kind(c).is_some_and(NodeKind::is_inline))
        .collect();
    for child in inline_children {
        doc.remove_subtree(child);
    }
    let mut index = 0;
    for run in runs {
        let node = match run {
            FlatRun::Text { text, styles } => {
                if text.is_empty() {
                    continue;
                }
                if styles.is_empty() {
                    doc.alloc_text(text)
                } else {
                    let span = doc.alloc(NodeKind::Span { styles });
                    let run = doc.alloc_text(text);
                    doc.append_child(span, run);
                    span
                }
            }
            FlatRun::Custom(data) => doc.alloc(NodeKind::InlineCustom(data)),
        };
        doc.insert_child(block, index, node);
        index += 1;
    }
}

/// Caret for a flat offset within `block`, against the current tree.
pub fn caret_for_flat_offset(doc: &Document, block: NodeId, offset: usize) -> Caret {
    let mut remaining = offset;
    let mut last = Caret {
        node: block,
        offset: 0,
    };
    if let Some(found) = descend(doc, block, &mut remaining, &mut last) {
        return found;
    }
    last
}

fn descend(
    doc: &Document,
    id: NodeId,
    remaining: &mut usize,
    last: &mut Caret,
) -> Option<Caret> {
    let children: Vec<NodeId> = doc.children(id).to_vec();
    for child in children {
        match doc.kind(child) {
            Some(NodeKind::Text(text)) => {
                let len = text.chars().count();
                if *remaining <= len {
                    return Some(Caret {
                        node: child,
                        offset: *remaining,
                    });
                }
                *remaining -= len;
                *last = Caret {
                    node: child,
                    offset: len,
                };
            }
            Some(NodeKind::InlineCustom(_)) => {
                if *remaining == 0 {
                    return Some(Caret {
                        node: child,
                        offset: 0,
                    });
                }
                *remaining -= 1;
            }
            Some(NodeKind::Span { .. }) => {
                if let Some(found) = descend(doc, child, remaining, last) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}
