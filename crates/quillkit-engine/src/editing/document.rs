use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

/// Stable handle into the document arena.
///
/// A `NodeId` is an index plus a generation counter. Removing a node frees
/// its slot and bumps the generation, so a stale handle held across a
/// mutation (for example by the history manager or a deferred task) resolves
/// to `None` instead of aliasing whatever node reused the slot.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Kind of a list root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered,
    Checklist,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Unordered => "unordered",
            ListKind::Ordered => "ordered",
            ListKind::Checklist => "checklist",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unordered" => Some(ListKind::Unordered),
            "ordered" => Some(ListKind::Ordered),
            "checklist" => Some(ListKind::Checklist),
            _ => None,
        }
    }
}

/// Heading depth. Only levels 1–3 exist in the document model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    pub fn as_u8(&self) -> u8 {
        match self {
            HeadingLevel::H1 => 1,
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
        }
    }

    pub fn from_u8(level: u8) -> Option<Self> {
        match level {
            1 => Some(HeadingLevel::H1),
            2 => Some(HeadingLevel::H2),
            3 => Some(HeadingLevel::H3),
            _ => None,
        }
    }
}

/// Inline style applied by a styled span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StyleTag {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

impl StyleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleTag::Bold => "bold",
            StyleTag::Italic => "italic",
            StyleTag::Underline => "underline",
            StyleTag::Strikethrough => "strikethrough",
            StyleTag::Code => "code",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bold" => Some(StyleTag::Bold),
            "italic" => Some(StyleTag::Italic),
            "underline" => Some(StyleTag::Underline),
            "strikethrough" => Some(StyleTag::Strikethrough),
            "code" => Some(StyleTag::Code),
            _ => None,
        }
    }
}

/// Set of styles carried by a span. Ordered so serialization is canonical.
pub type StyleSet = BTreeSet<StyleTag>;

/// Payload data carried by a custom (embedded) block or inline node.
///
/// The engine knows nothing about the attributes beyond the fact that they
/// are a flat string map; descriptors in the `blocks` module own their
/// meaning. `degraded` marks a node whose payload failed to round-trip and
/// which is therefore held read-only with its raw attributes preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomData {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub degraded: bool,
}

/// Block-level node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Paragraph,
    /// Heading with its stable identifier. The id is assigned the first time
    /// a block becomes a heading and survives level conversions.
    Heading { level: HeadingLevel, id: Option<Uuid> },
    Blockquote,
    /// List root; children are `ListItem` blocks.
    List { kind: ListKind },
    /// List item; `checked` is `Some(_)` exactly when the parent list is a
    /// checklist (enforced by the normalizer).
    ListItem { checked: Option<bool> },
    Custom(CustomData),
}

/// All node kinds in the content tree.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The single tree root. Never serialized, never removed.
    Root,
    Block(BlockKind),
    /// A plain text run. Offsets into text runs are character offsets.
    Text(String),
    /// Styled inline wrapper around further inline content.
    Span { styles: StyleSet },
    InlineCustom(CustomData),
}

impl NodeKind {
    pub fn is_block(&self) -> bool {
        matches!(self, NodeKind::Block(_))
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::Text(_) | NodeKind::Span { .. } | NodeKind::InlineCustom(_)
        )
    }
}

/// A node in the arena: kind plus parent/child links stored as ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// The content tree: an arena of block and inline nodes.
///
/// All structure lives in the arena; nodes refer to each other only through
/// `NodeId`s, so snapshots and deferred tasks can hold ids without keeping
/// nodes alive or dangling. The command dispatcher is the only writer.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Document {
    /// Create a document containing a single empty paragraph, so the caret
    /// always has a typable destination.
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        let root = doc.alloc(NodeKind::Root);
        doc.root = root;
        let para = doc.alloc(NodeKind::Block(BlockKind::Paragraph));
        doc.append_child(root, para);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocate a node. Reuses freed slots, bumping their generation.
    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.get(id).map(|n| &n.kind)
    }

    /// Children of a node, or an empty slice for a stale id.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Position of `id` within its parent's child list.
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Whether `id` is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    /// Insert `child` under `parent` at `index` (clamped to the child count).
    /// Detaches `child` from any previous parent first.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let len = self.children(parent).len();
        let index = index.min(len);
        if let Some(node) = self.get_mut(parent) {
            node.children.insert(index, child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
    }

    /// Unlink `id` from its parent without freeing it.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(node) = self.get_mut(parent) {
                node.children.retain(|&c| c != id);
            }
            if let Some(node) = self.get_mut(id) {
                node.parent = None;
            }
        }
    }

    /// Detach and free a subtree. Every freed id becomes stale.
    pub fn remove_subtree(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.get(current) {
                stack.extend(node.children.iter().copied());
            }
            let slot = &mut self.slots[current.index as usize];
            if slot.generation == current.generation && slot.node.is_some() {
                slot.node = None;
                self.free.push(current.index);
            }
        }
    }

    /// Swap a node's kind in place, keeping children and position. Used for
    /// block format conversion where child content is preserved verbatim.
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        if let Some(node) = self.get_mut(id) {
            node.kind = kind;
        }
    }

    /// Path of child indices from the root down to `id`.
    pub fn path_of(&self, id: NodeId) -> Option<Vec<usize>> {
        if !self.is_attached(id) {
            return None;
        }
        let mut path = Vec::new();
        let mut current = id;
        while current != self.root {
            path.push(self.child_index(current)?);
            current = self.parent(current)?;
        }
        path.reverse();
        Some(path)
    }

    /// Resolve a path exactly; `None` if any component is out of range.
    pub fn node_at_path(&self, path: &[usize]) -> Option<NodeId> {
        let mut current = self.root;
        for &index in path {
            current = *self.children(current).get(index)?;
        }
        Some(current)
    }

    /// Nearest ancestor-or-self that is a block node.
    pub fn enclosing_block(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match self.kind(current)? {
                NodeKind::Block(_) => return Some(current),
                _ => current = self.parent(current)?,
            }
        }
    }

    /// Ancestor-or-self whose parent is the root (the top-level block).
    pub fn top_block(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let parent = self.parent(current)?;
            if parent == self.root {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Concatenated text of all text runs in a subtree.
    pub fn text_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(node) = self.get(id) {
            if let NodeKind::Text(text) = &node.kind {
                out.push_str(text);
            }
            for &child in &node.children {
                self.collect_text(child, out);
            }
        }
    }

    /// Convenience: allocate a text run and return its id.
    pub fn alloc_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    /// Count of live (allocated, non-freed) nodes. Test and diagnostics aid.
    pub fn live_nodes(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
