//! The host-facing editing surface.
//!
//! [`Editor`] owns the content tree, the live selection, the undo history
//! and the custom-block registry, and exposes the command surface hosts
//! drive from a toolbar. Mutations run synchronously; history capture and
//! deferred caret verification are paid for on [`Editor::tick`], which the
//! host calls once per frame or event-loop turn.

use uuid::Uuid;

use crate::blocks::{Descriptor, MediaProvider, NoteProvider, Payload, Registry, Teardown};
use crate::config::EngineConfig;
use crate::editing::commands::{
    BlockFormat, apply_block_format, apply_inline_style, insert_custom_block,
};
use crate::editing::document::{
    BlockKind, CustomData, Document, ListKind, NodeId, NodeKind, StyleTag,
};
use crate::editing::history::{History, HistoryEntry};
use crate::editing::lists::{create_list, merge_adjacent_lists, split_list_item, toggle_checked};
use crate::editing::normalize::normalize_tree;
use crate::editing::selection::{
    Caret, Selection, capture, end_of_tree, restore, start_of_block,
};
use crate::error::EditError;
use crate::markup::{AttributeSanitizer, MarkupError, Sanitizer, parse_document, serialize};

type ChangeCallback = Box<dyn FnMut(&str)>;
type CustomCommandCallback = Box<dyn FnMut(&str)>;

/// Heading row for a host-rendered document outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub level: u8,
    pub id: Option<Uuid>,
    pub text: String,
}

pub struct Editor {
    doc: Document,
    selection: Option<Selection>,
    history: History,
    registry: Registry,
    sanitizer: Box<dyn Sanitizer>,
    config: EngineConfig,
    /// Remaining ticks before the current edit burst is considered settled.
    settle_in: Option<u32>,
    /// Caret node whose on-screen position is re-checked one turn after the
    /// mutation, once the host surface has rendered the new tree.
    pending_verify: Option<NodeId>,
    on_change: Option<ChangeCallback>,
    on_custom_command_requested: Option<CustomCommandCallback>,
    note_provider: Option<Box<dyn NoteProvider>>,
    media_provider: Option<Box<dyn MediaProvider>>,
}

impl Editor {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let doc = Document::new();
        let markup = serialize(&doc);
        let history = History::new(HistoryEntry::new(markup, None), config.history_depth);
        Self {
            doc,
            selection: None,
            history,
            registry: Registry::with_builtins(),
            sanitizer: Box::new(AttributeSanitizer::new()),
            config,
            settle_in: None,
            pending_verify: None,
            on_change: None,
            on_custom_command_requested: None,
            note_provider: None,
            media_provider: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Place a collapsed caret at the end of the document.
    pub fn select_end(&mut self) {
        self.selection = Some(Selection::caret(end_of_tree(&self.doc)));
    }

    pub fn set_on_change(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    pub fn set_on_custom_command_requested(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_custom_command_requested = Some(Box::new(callback));
    }

    pub fn set_note_provider(&mut self, provider: impl NoteProvider + 'static) {
        self.note_provider = Some(Box::new(provider));
    }

    pub fn set_media_provider(&mut self, provider: impl MediaProvider + 'static) {
        self.media_provider = Some(Box::new(provider));
    }

    pub fn set_sanitizer(&mut self, sanitizer: impl Sanitizer + 'static) {
        self.sanitizer = Box::new(sanitizer);
    }

    /// Register a custom block descriptor; replaces any prior registration
    /// for the same tag.
    pub fn register_block(&mut self, descriptor: Descriptor) {
        self.registry.register(descriptor);
    }

    /// Ask the host's note provider for link candidates matching `query`.
    pub fn note_candidates(&self, query: &str) -> Vec<crate::blocks::NoteCandidate> {
        self.note_provider
            .as_ref()
            .map(|p| p.candidates(query))
            .unwrap_or_default()
    }

    // ---- persistence -----------------------------------------------------

    pub fn get_serialized_content(&self) -> String {
        serialize(&self.doc)
    }

    /// Replace the document with parsed `markup`. Resets history and moves
    /// the caret to the start of the first block; edits from the previous
    /// document are no longer reachable through undo.
    pub fn load_serialized_content(&mut self, markup: &str) -> Result<(), MarkupError> {
        let mut doc = parse_document(markup, &self.registry, self.sanitizer.as_ref())?;
        normalize_tree(&mut doc);
        let first = doc.children(doc.root()).first().copied();
        self.selection = first.map(|block| Selection::caret(start_of_block(&doc, block)));
        self.doc = doc;
        self.settle_in = None;
        self.pending_verify = None;
        let entry = HistoryEntry::new(
            serialize(&self.doc),
            capture(&self.doc, self.selection.as_ref()),
        );
        self.history.reset(entry);
        Ok(())
    }

    // ---- generic command entry point -------------------------------------

    /// Invoke a dispatcher operation by name, the way a host toolbar does.
    ///
    /// Every failure is caught here: the tree stays in its last normalized
    /// state, a diagnostic is logged, and `false` is returned. Nothing
    /// escapes to the host as a panic or error value.
    pub fn exec(&mut self, name: &str, args: &[Payload]) -> bool {
        match self.dispatch(name, args) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("operation `{name}` skipped: {err}");
                false
            }
        }
    }

    fn dispatch(&mut self, name: &str, args: &[Payload]) -> Result<(), EditError> {
        match name {
            "applyInlineStyle" => {
                let tag = Self::str_arg(name, args, 0)?;
                let tag = StyleTag::from_str(tag).ok_or_else(|| EditError::InvalidArgument {
                    op: "applyInlineStyle",
                    detail: format!("unknown style tag `{tag}`"),
                })?;
                self.toggle_style(tag)
            }
            "applyBlockFormat" => {
                let tag = Self::str_arg(name, args, 0)?;
                let format =
                    BlockFormat::from_str(tag).ok_or_else(|| EditError::InvalidArgument {
                        op: "applyBlockFormat",
                        detail: format!("unknown block tag `{tag}`"),
                    })?;
                self.format_block(format)
            }
            "createList" => {
                let kind = Self::str_arg(name, args, 0)?;
                let kind = ListKind::from_str(kind).ok_or_else(|| EditError::InvalidArgument {
                    op: "createList",
                    detail: format!("unknown list kind `{kind}`"),
                })?;
                self.make_list(kind)
            }
            "toggleChecklistState" => self.toggle_checklist_item(),
            "splitListItem" => self.split_current_list_item(),
            "insertCustomBlock" => {
                let tag = Self::str_arg(name, args, 0)?.to_string();
                match args.get(1) {
                    Some(payload) => self.insert_block(&tag, payload.clone()),
                    None => self.request_custom_block(&tag),
                }
            }
            "undo" => {
                self.undo();
                Ok(())
            }
            "redo" => {
                self.redo();
                Ok(())
            }
            other => Err(EditError::UnknownOperation(other.to_string())),
        }
    }

    fn str_arg<'a>(
        op: &str,
        args: &'a [Payload],
        index: usize,
    ) -> Result<&'a str, EditError> {
        args.get(index)
            .and_then(Payload::as_str)
            .ok_or_else(|| EditError::InvalidArgument {
                op: "exec",
                detail: format!("`{op}` needs a string argument at position {index}"),
            })
    }

    // ---- typed command surface -------------------------------------------

    /// Toggle an inline style across the current selection.
    pub fn toggle_style(&mut self, tag: StyleTag) -> Result<(), EditError> {
        self.run_edit("applyInlineStyle", |doc, selection| {
            apply_inline_style(doc, selection, tag)?;
            Ok(None)
        })
    }

    /// Convert the block at the selection start to `format` (or back to
    /// paragraph, per the toggle rule).
    pub fn format_block(&mut self, format: BlockFormat) -> Result<(), EditError> {
        self.run_edit("applyBlockFormat", |doc, selection| {
            apply_block_format(doc, selection, format)?;
            Ok(None)
        })
    }

    /// Wrap the selected block(s) in a list of `kind`.
    pub fn make_list(&mut self, kind: ListKind) -> Result<(), EditError> {
        self.run_edit("createList", |doc, selection| {
            create_list(doc, selection, kind)?;
            Ok(None)
        })
    }

    /// Flip the checked flag on the checklist item at the caret.
    pub fn toggle_checklist_item(&mut self) -> Result<(), EditError> {
        self.run_edit("toggleChecklistState", |doc, selection| {
            let item = enclosing_list_item(doc, selection.anchor.node).ok_or_else(|| {
                EditError::TreeInconsistency {
                    op: "toggleChecklistState",
                    detail: "caret is not inside a list item".to_string(),
                }
            })?;
            toggle_checked(doc, item)?;
            Ok(None)
        })
    }

    /// Apply the Enter key inside a list item: continue the list, or exit
    /// it when the item is empty.
    pub fn split_current_list_item(&mut self) -> Result<(), EditError> {
        self.run_edit("splitListItem", |doc, selection| {
            let caret = split_list_item(doc, &selection.anchor)?;
            Ok(Some(Selection::caret(caret)))
        })
    }

    /// Insert a custom block of `tag` rendered from `payload` at the caret.
    pub fn insert_block(&mut self, tag: &str, payload: Payload) -> Result<(), EditError> {
        let descriptor = self
            .registry
            .lookup(tag)
            .ok_or_else(|| EditError::DescriptorMissing(tag.to_string()))?
            .clone();
        let sanitizer = &*self.sanitizer;
        let selection = self
            .selection
            .clone()
            .ok_or(EditError::SelectionUnavailable {
                op: "insertCustomBlock",
            })?;
        let caret = insert_custom_block(&mut self.doc, &selection, &descriptor, &payload, sanitizer)?;
        self.selection = Some(Selection::caret(caret));
        self.after_mutation();
        Ok(())
    }

    /// Insert an image block from a host source reference (picker result,
    /// drop, clipboard), resolved through the media provider.
    pub fn insert_image_from_source(&mut self, source: &str) -> Result<(), EditError> {
        let payload = self
            .media_provider
            .as_ref()
            .and_then(|p| p.acquire(source))
            .ok_or_else(|| {
                EditError::SerializationFailure(format!(
                    "media provider could not resolve `{source}`"
                ))
            })?;
        let src = match payload {
            crate::blocks::MediaPayload::Uri(uri) => uri,
            crate::blocks::MediaPayload::Bytes(bytes) => {
                // No blob store in the engine; hosts that hand over raw
                // bytes are expected to persist them and return a URI.
                return Err(EditError::SerializationFailure(format!(
                    "raw media bytes ({} B) need host-side storage first",
                    bytes.len()
                )));
            }
        };
        self.insert_block("image", serde_json::json!({ "src": src }))
    }

    /// Handle an insertion affordance for `tag` whose payload needs
    /// collaborator-owned UI (e.g. the note picker) before insertion can
    /// proceed.
    fn request_custom_block(&mut self, tag: &str) -> Result<(), EditError> {
        let descriptor = self
            .registry
            .lookup(tag)
            .ok_or_else(|| EditError::DescriptorMissing(tag.to_string()))?;
        if !descriptor.needs_host_ui {
            return Err(EditError::InvalidArgument {
                op: "insertCustomBlock",
                detail: format!("`{tag}` needs a payload argument"),
            });
        }
        if let Some(callback) = self.on_custom_command_requested.as_mut() {
            callback(tag);
        }
        Ok(())
    }

    /// Wire a mounted custom block's interactions, if its descriptor has an
    /// installer. The sink receives updated payloads the host should feed
    /// back through [`Editor::update_custom_block`].
    pub fn install_interactions(
        &self,
        node: NodeId,
        sink: &mut dyn FnMut(Payload),
    ) -> Option<Teardown> {
        let data = custom_data_of(&self.doc, node)?;
        let descriptor = self.registry.lookup(&data.tag)?;
        let install = descriptor.install?;
        let fragment = crate::blocks::Fragment {
            tag: data.tag.clone(),
            attrs: data.attrs.clone(),
        };
        Some(install(&fragment, sink))
    }

    /// Re-render an existing custom block from a fresh payload, keeping its
    /// stable block id.
    pub fn update_custom_block(&mut self, node: NodeId, payload: Payload) -> Result<(), EditError> {
        let data = custom_data_of(&self.doc, node)
            .cloned()
            .ok_or_else(|| EditError::TreeInconsistency {
                op: "updateCustomBlock",
                detail: "node is not a custom block".to_string(),
            })?;
        let descriptor = self
            .registry
            .lookup(&data.tag)
            .ok_or_else(|| EditError::DescriptorMissing(data.tag.clone()))?;
        let fragment = (descriptor.render)(&payload)?;
        let mut fragment = self.sanitizer.sanitize_fragment(&fragment);
        if let Some(id) = data.attrs.get("data-block-id") {
            fragment
                .attrs
                .insert("data-block-id".to_string(), id.clone());
        }
        let fresh = CustomData {
            tag: fragment.tag,
            attrs: fragment.attrs,
            degraded: false,
        };
        let kind = match self.doc.kind(node) {
            Some(NodeKind::Block(BlockKind::Custom(_))) => NodeKind::Block(BlockKind::Custom(fresh)),
            Some(NodeKind::InlineCustom(_)) => NodeKind::InlineCustom(fresh),
            _ => {
                return Err(EditError::TreeInconsistency {
                    op: "updateCustomBlock",
                    detail: "node kind changed mid-update".to_string(),
                });
            }
        };
        self.doc.set_kind(node, kind);
        self.after_mutation();
        Ok(())
    }

    // ---- history ---------------------------------------------------------

    /// Restore the previous history entry. No-op when at the oldest state.
    ///
    /// An edit still inside its settle window is flushed into its own entry
    /// first, so undo steps over it rather than skipping it.
    pub fn undo(&mut self) -> bool {
        self.flush_pending();
        let Some(entry) = self.history.undo().cloned() else {
            return false;
        };
        self.restore_entry(&entry);
        true
    }

    /// Restore the next history entry. No-op when at the newest state.
    pub fn redo(&mut self) -> bool {
        self.flush_pending();
        let Some(entry) = self.history.redo().cloned() else {
            return false;
        };
        self.restore_entry(&entry);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Record an unsettled edit burst as a history entry right now, instead
    /// of waiting for the settle window to close in `tick`.
    fn flush_pending(&mut self) {
        if self.settle_in.take().is_some() {
            let entry = HistoryEntry::new(
                serialize(&self.doc),
                capture(&self.doc, self.selection.as_ref()),
            );
            self.history.record(entry);
        }
    }

    fn restore_entry(&mut self, entry: &HistoryEntry) {
        match parse_document(&entry.markup, &self.registry, self.sanitizer.as_ref()) {
            Ok(mut doc) => {
                normalize_tree(&mut doc);
                self.doc = doc;
            }
            Err(err) => {
                // History entries were produced by our own serializer, so a
                // parse failure here means a descriptor was unregistered
                // since capture. Keep the current tree rather than lose it.
                log::warn!("history entry could not be restored: {err}");
                return;
            }
        }
        self.selection = entry
            .selection
            .as_ref()
            .map(|snapshot| restore(&self.doc, snapshot));
        // A restore is not a new edit; cancel any pending capture so the
        // restored state does not re-enter the stack.
        self.settle_in = None;
        self.pending_verify = None;
        self.notify_change();
    }

    // ---- the cooperative turn --------------------------------------------

    /// Advance the deferred work queue by one turn.
    ///
    /// Hosts call this once per frame. An edit burst settles after
    /// `settle_ticks` undisturbed calls, at which point one history entry is
    /// recorded and `on_change` fires. The deferred caret verification for
    /// the last mutation also runs here, and silently aborts when its target
    /// node has since been detached.
    pub fn tick(&mut self) {
        if let Some(node) = self.pending_verify.take() {
            if self.doc.is_attached(node) {
                if let Some(snapshot) = capture(&self.doc, self.selection.as_ref()) {
                    self.selection = Some(restore(&self.doc, &snapshot));
                }
            } else {
                log::debug!("caret verification target detached; aborting");
            }
        }

        match self.settle_in {
            Some(0) | None => {}
            Some(1) => {
                self.settle_in = None;
                let entry = HistoryEntry::new(
                    serialize(&self.doc),
                    capture(&self.doc, self.selection.as_ref()),
                );
                self.history.record(entry);
                self.notify_change();
            }
            Some(n) => self.settle_in = Some(n - 1),
        }
    }

    /// Heading blocks in document order, for a host-rendered outline pane.
    pub fn outline(&self) -> Vec<OutlineEntry> {
        self.doc
            .children(self.doc.root())
            .iter()
            .filter_map(|&block| match self.doc.kind(block) {
                Some(NodeKind::Block(BlockKind::Heading { level, id })) => Some(OutlineEntry {
                    level: level.as_u8(),
                    id: *id,
                    text: self.doc.text_of(block),
                }),
                _ => None,
            })
            .collect()
    }

    // ---- internals -------------------------------------------------------

    /// Shared mutation pipeline: resolve the live selection, apply the
    /// mutation, re-normalize, then re-clamp the selection against the new
    /// tree and schedule history capture.
    fn run_edit(
        &mut self,
        op: &'static str,
        mutate: impl FnOnce(&mut Document, &Selection) -> Result<Option<Selection>, EditError>,
    ) -> Result<(), EditError> {
        let selection = self
            .selection
            .clone()
            .ok_or(EditError::SelectionUnavailable { op })?;
        match mutate(&mut self.doc, &selection) {
            Ok(new_selection) => {
                if let Some(selection) = new_selection {
                    self.selection = Some(selection);
                }
                self.after_mutation();
                Ok(())
            }
            Err(err) => {
                if matches!(err, EditError::TreeInconsistency { .. }) {
                    normalize_tree(&mut self.doc);
                }
                Err(err)
            }
        }
    }

    fn after_mutation(&mut self) {
        // The forward tail is stale the instant a new edit lands; it must
        // not be reachable while the edit waits out its settle window.
        self.history.truncate_forward();
        normalize_tree(&mut self.doc);
        let root = self.doc.root();
        merge_adjacent_lists(&mut self.doc, root);

        // Normalization may have merged the node the caret pointed at;
        // snapshot-and-restore clamps the selection back onto live nodes.
        self.selection = match capture(&self.doc, self.selection.as_ref()) {
            Some(snapshot) => Some(restore(&self.doc, &snapshot)),
            None => self.selection.take().map(|_| Selection::caret(end_of_tree(&self.doc))),
        };
        self.pending_verify = self.selection.as_ref().map(|s| s.anchor.node);
        self.settle_in = Some(self.config.settle_ticks.max(1));
    }

    fn notify_change(&mut self) {
        let markup = serialize(&self.doc);
        if let Some(callback) = self.on_change.as_mut() {
            callback(&markup);
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
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

fn custom_data_of(doc: &Document, node: NodeId) -> Option<&CustomData> {
    match doc.kind(node)? {
        NodeKind::Block(BlockKind::Custom(data)) => Some(data),
        NodeKind::InlineCustom(data) => Some(data),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn editor_with(markup: &str) -> Editor {
        let mut editor = Editor::new();
        editor.load_serialized_content(markup).expect("loads");
        editor
    }

    /// Caret at character `offset` of the first text run in the first block.
    fn caret_in_first_run(editor: &Editor, offset: usize) -> Selection {
        let doc = editor.document();
        let block = doc.children(doc.root())[0];
        let run = doc.children(block)[0];
        Selection::caret(Caret { node: run, offset })
    }

    fn settle(editor: &mut Editor) {
        for _ in 0..8 {
            editor.tick();
        }
    }

    #[test]
    fn exec_applies_a_named_style() {
        let mut editor = editor_with("<p>hello</p>");
        let doc = editor.document();
        let block = doc.children(doc.root())[0];
        let run = doc.children(block)[0];
        editor.set_selection(Selection {
            anchor: Caret { node: run, offset: 0 },
            focus: Caret { node: run, offset: 5 },
        });

        assert!(editor.exec("applyInlineStyle", &[json!("bold")]));
        assert_eq!(
            editor.get_serialized_content(),
            "<p><span data-styles=\"bold\">hello</span></p>"
        );
    }

    #[test]
    fn exec_with_unknown_operation_is_a_logged_no_op() {
        let mut editor = editor_with("<p>hello</p>");
        let before = editor.get_serialized_content();
        assert!(!editor.exec("transmogrify", &[]));
        assert_eq!(editor.get_serialized_content(), before);
    }

    #[test]
    fn exec_without_selection_is_a_no_op() {
        let mut editor = editor_with("<p>hello</p>");
        editor.clear_selection();
        let before = editor.get_serialized_content();
        assert!(!editor.exec("applyBlockFormat", &[json!("heading1")]));
        assert_eq!(editor.get_serialized_content(), before);
    }

    #[test]
    fn block_format_round_trips_through_exec() {
        let mut editor = editor_with("<p>title</p>");
        let selection = caret_in_first_run(&editor, 0);
        editor.set_selection(selection.clone());

        assert!(editor.exec("applyBlockFormat", &[json!("heading2")]));
        let markup = editor.get_serialized_content();
        assert!(markup.starts_with("<h2 data-id=\""), "got {markup}");

        // The heading's text run survived; re-point the caret and toggle off.
        let doc = editor.document();
        let block = doc.children(doc.root())[0];
        let run = doc.children(block)[0];
        editor.set_selection(Selection::caret(Caret { node: run, offset: 0 }));
        assert!(editor.exec("applyBlockFormat", &[json!("heading2")]));
        assert_eq!(editor.get_serialized_content(), "<p>title</p>");
    }

    #[test]
    fn undo_and_redo_reproduce_states_exactly() {
        let mut editor = editor_with("<p>hello</p>");
        let initial = editor.get_serialized_content();

        editor.set_selection(caret_in_first_run(&editor, 0));
        editor.exec("applyBlockFormat", &[json!("heading1")]);
        settle(&mut editor);
        let after_heading = editor.get_serialized_content();

        editor.exec("createList", &[json!("unordered")]);
        settle(&mut editor);
        let after_list = editor.get_serialized_content();
        assert_ne!(after_heading, after_list);

        assert!(editor.undo());
        assert_eq!(editor.get_serialized_content(), after_heading);
        assert!(editor.undo());
        assert_eq!(editor.get_serialized_content(), initial);
        assert!(!editor.undo());

        assert!(editor.redo());
        assert_eq!(editor.get_serialized_content(), after_heading);
        assert!(editor.redo());
        assert_eq!(editor.get_serialized_content(), after_list);
        assert!(!editor.redo());
    }

    #[test]
    fn new_edit_after_undo_clears_redo() {
        let mut editor = editor_with("<p>hello</p>");
        editor.set_selection(caret_in_first_run(&editor, 0));
        editor.exec("applyBlockFormat", &[json!("heading1")]);
        settle(&mut editor);

        editor.undo();
        editor.set_selection(caret_in_first_run(&editor, 0));
        editor.exec("applyBlockFormat", &[json!("blockquote")]);
        settle(&mut editor);

        assert!(!editor.can_redo());
    }

    #[test]
    fn redo_tail_is_gone_before_a_new_edit_settles() {
        let mut editor = editor_with("<p>base</p>");
        editor.set_selection(caret_in_first_run(&editor, 0));
        editor.exec("applyBlockFormat", &[json!("heading1")]);
        settle(&mut editor);

        editor.undo();
        assert!(editor.can_redo());

        editor.set_selection(caret_in_first_run(&editor, 0));
        editor.exec("applyBlockFormat", &[json!("blockquote")]);

        // No tick has run, so the blockquote edit has not settled yet.
        assert!(!editor.can_redo());
        assert!(!editor.redo());
        assert_eq!(editor.get_serialized_content(), "<blockquote>base</blockquote>");
    }

    #[test]
    fn undo_before_settle_steps_over_the_pending_edit() {
        let mut editor = editor_with("<p>base</p>");
        editor.set_selection(caret_in_first_run(&editor, 0));
        editor.exec("applyBlockFormat", &[json!("blockquote")]);

        assert!(editor.undo());
        assert_eq!(editor.get_serialized_content(), "<p>base</p>");

        // The flushed edit became a regular entry, so it is redoable.
        assert!(editor.redo());
        assert_eq!(editor.get_serialized_content(), "<blockquote>base</blockquote>");
    }

    #[test]
    fn burst_of_edits_settles_into_one_history_entry() {
        let mut editor = editor_with("<p>abc</p>");
        let doc = editor.document();
        let block = doc.children(doc.root())[0];
        let run = doc.children(block)[0];
        editor.set_selection(Selection {
            anchor: Caret { node: run, offset: 0 },
            focus: Caret { node: run, offset: 1 },
        });
        editor.exec("applyInlineStyle", &[json!("bold")]);
        // A second edit before the settle window closes restarts the count.
        editor.tick();
        let doc = editor.document();
        let block = doc.children(doc.root())[0];
        let span = doc.children(block)[0];
        let styled = doc.children(span)[0];
        editor.set_selection(Selection {
            anchor: Caret { node: styled, offset: 0 },
            focus: Caret { node: styled, offset: 1 },
        });
        editor.exec("applyInlineStyle", &[json!("italic")]);
        settle(&mut editor);

        // One undo steps all the way back to the loaded state.
        assert!(editor.undo());
        assert_eq!(editor.get_serialized_content(), "<p>abc</p>");
        assert!(!editor.can_undo());
    }

    #[test]
    fn on_change_fires_once_per_settled_burst() {
        let changes: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = Rc::clone(&changes);

        let mut editor = editor_with("<p>x</p>");
        editor.set_on_change(move |markup| sink.borrow_mut().push(markup.to_string()));
        editor.set_selection(caret_in_first_run(&editor, 0));
        editor.exec("applyBlockFormat", &[json!("blockquote")]);
        settle(&mut editor);

        assert_eq!(changes.borrow().len(), 1);
        assert_eq!(changes.borrow()[0], "<blockquote>x</blockquote>");
    }

    #[test]
    fn note_link_without_payload_requests_host_ui() {
        let requested: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = Rc::clone(&requested);

        let mut editor = editor_with("<p>x</p>");
        editor.set_on_custom_command_requested(move |tag| sink.borrow_mut().push(tag.to_string()));
        editor.set_selection(caret_in_first_run(&editor, 1));

        assert!(editor.exec("insertCustomBlock", &[json!("note-link")]));
        assert_eq!(requested.borrow().as_slice(), ["note-link"]);
        // Nothing was inserted yet; the host comes back with a payload.
        assert_eq!(editor.get_serialized_content(), "<p>x</p>");
    }

    #[test]
    fn image_without_payload_is_rejected() {
        let mut editor = editor_with("<p>x</p>");
        editor.set_selection(caret_in_first_run(&editor, 1));
        assert!(!editor.exec("insertCustomBlock", &[json!("image")]));
    }

    #[test]
    fn insert_image_resolves_source_through_media_provider() {
        struct FixedUri;
        impl MediaProvider for FixedUri {
            fn acquire(&self, source: &str) -> Option<crate::blocks::MediaPayload> {
                Some(crate::blocks::MediaPayload::Uri(format!(
                    "asset://store/{source}"
                )))
            }
        }

        let mut editor = editor_with("<p>x</p>");
        editor.set_media_provider(FixedUri);
        editor.set_selection(caret_in_first_run(&editor, 1));
        editor.insert_image_from_source("pasted.png").expect("inserts");

        let markup = editor.get_serialized_content();
        assert!(
            markup.contains("data-src=\"asset://store/pasted.png\""),
            "got {markup}"
        );
        // Trailing paragraph appended after a block insert at tree end.
        assert!(markup.ends_with("<p></p>"), "got {markup}");
    }

    #[test]
    fn checklist_enter_continues_then_exits() {
        let mut editor = editor_with("<ul data-list=\"checklist\"><li data-checked=\"false\">task</li></ul>");
        let doc = editor.document();
        let list = doc.children(doc.root())[0];
        let item = doc.children(list)[0];
        let run = doc.children(item)[0];
        editor.set_selection(Selection::caret(Caret { node: run, offset: 4 }));

        // Non-empty item: Enter creates a fresh unchecked item after it.
        assert!(editor.exec("splitListItem", &[]));
        let doc = editor.document();
        let list = doc.children(doc.root())[0];
        assert_eq!(doc.children(list).len(), 2);

        // The caret sits in the new empty item; Enter again exits the list.
        assert!(editor.exec("splitListItem", &[]));
        assert_eq!(
            editor.get_serialized_content(),
            "<ul data-list=\"checklist\"><li data-checked=\"false\">task</li></ul><p></p>"
        );
    }

    #[test]
    fn toggle_checklist_flips_exactly_one_item() {
        let mut editor = editor_with(
            "<ul data-list=\"checklist\"><li data-checked=\"false\">a</li><li data-checked=\"false\">b</li></ul>",
        );
        let doc = editor.document();
        let list = doc.children(doc.root())[0];
        let second = doc.children(list)[1];
        let run = doc.children(second)[0];
        editor.set_selection(Selection::caret(Caret { node: run, offset: 0 }));

        assert!(editor.exec("toggleChecklistState", &[]));
        assert_eq!(
            editor.get_serialized_content(),
            "<ul data-list=\"checklist\"><li data-checked=\"false\">a</li><li data-checked=\"true\">b</li></ul>"
        );
    }

    #[test]
    fn outline_lists_heading_ids_in_order() {
        let mut editor = editor_with("<p>intro</p>");
        editor.set_selection(caret_in_first_run(&editor, 0));
        editor.exec("applyBlockFormat", &[json!("heading1")]);

        let outline = editor.outline();
        assert_eq!(outline.len(), 1);
        assert_eq!(outline[0].level, 1);
        assert_eq!(outline[0].text, "intro");
        assert!(outline[0].id.is_some());
    }

    #[test]
    fn update_custom_block_keeps_stable_id() {
        let mut editor = editor_with("<p>x</p>");
        editor.set_selection(caret_in_first_run(&editor, 1));
        editor
            .insert_block("image", json!({ "src": "a.png" }))
            .expect("inserts");

        let doc = editor.document();
        let block = doc.children(doc.root())[1];
        let Some(NodeKind::Block(BlockKind::Custom(data))) = doc.kind(block) else {
            panic!("expected custom block");
        };
        let id = data.attrs.get("data-block-id").cloned().expect("id");

        editor
            .update_custom_block(block, json!({ "src": "b.png" }))
            .expect("updates");
        let doc = editor.document();
        let Some(NodeKind::Block(BlockKind::Custom(data))) = doc.kind(block) else {
            panic!("custom block survived the update");
        };
        assert_eq!(data.attrs.get("data-block-id"), Some(&id));
        assert_eq!(data.attrs.get("data-src").map(String::as_str), Some("b.png"));
    }

    #[test]
    fn load_resets_history() {
        let mut editor = editor_with("<p>a</p>");
        editor.set_selection(caret_in_first_run(&editor, 0));
        editor.exec("applyBlockFormat", &[json!("heading1")]);
        settle(&mut editor);

        editor.load_serialized_content("<p>fresh</p>").expect("loads");
        assert!(!editor.can_undo());
        assert_eq!(editor.get_serialized_content(), "<p>fresh</p>");
    }

    #[test]
    fn heading_level_change_keeps_id_through_exec() {
        let mut editor = editor_with("<p>t</p>");
        editor.set_selection(caret_in_first_run(&editor, 0));
        editor.exec("applyBlockFormat", &[json!("heading1")]);
        let first = editor.outline()[0].id;

        let doc = editor.document();
        let block = doc.children(doc.root())[0];
        let run = doc.children(block)[0];
        editor.set_selection(Selection::caret(Caret { node: run, offset: 0 }));
        editor.exec("applyBlockFormat", &[json!("heading3")]);

        assert_eq!(editor.outline()[0].level, 3);
        assert_eq!(editor.outline()[0].id, first);
    }

    #[test]
    fn missing_descriptor_is_skipped_and_logged() {
        let mut editor = editor_with("<p>x</p>");
        editor.set_selection(caret_in_first_run(&editor, 1));
        assert!(!editor.exec("insertCustomBlock", &[json!("video"), json!({})]));
        assert_eq!(editor.get_serialized_content(), "<p>x</p>");
    }
}
