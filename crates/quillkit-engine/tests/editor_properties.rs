//! End-to-end behavioural guarantees exercised through the public surface.

use pretty_assertions::assert_eq;
use serde_json::json;

use quillkit_engine::editing::normalize::normalize_tree;
use quillkit_engine::editing::selection::{capture, restore};
use quillkit_engine::{
    BlockKind, Caret, Document, Editor, NodeKind, Registry, Selection, StyleTag,
    AttributeSanitizer, parse_document, serialize,
};

fn load(markup: &str) -> Editor {
    let mut editor = Editor::new();
    editor.load_serialized_content(markup).expect("markup loads");
    editor
}

fn first_run_selection(editor: &Editor, from: usize, to: usize) -> Selection {
    let doc = editor.document();
    let block = doc.children(doc.root())[0];
    let run = doc.children(block)[0];
    Selection {
        anchor: Caret { node: run, offset: from },
        focus: Caret { node: run, offset: to },
    }
}

fn settle(editor: &mut Editor) {
    for _ in 0..8 {
        editor.tick();
    }
}

#[test]
fn normalize_is_idempotent_on_a_messy_tree() {
    let mut doc = Document::new();
    let para = doc.children(doc.root())[0];

    // Two adjacent same-style spans, a split text run and an empty span.
    let bold = |doc: &mut Document| {
        let mut styles = std::collections::BTreeSet::new();
        styles.insert(StyleTag::Bold);
        doc.alloc(NodeKind::Span { styles })
    };
    let s1 = bold(&mut doc);
    let t1 = doc.alloc_text("ab");
    doc.append_child(s1, t1);
    doc.append_child(para, s1);
    let s2 = bold(&mut doc);
    let t2 = doc.alloc_text("cd");
    doc.append_child(s2, t2);
    doc.append_child(para, s2);
    let t3 = doc.alloc_text("ef");
    doc.append_child(para, t3);
    let t4 = doc.alloc_text("gh");
    doc.append_child(para, t4);
    let empty = bold(&mut doc);
    doc.append_child(para, empty);

    normalize_tree(&mut doc);
    let once = serialize(&doc);
    normalize_tree(&mut doc);
    assert_eq!(serialize(&doc), once);
    assert_eq!(once, "<p><span data-styles=\"bold\">abcd</span>efgh</p>");
}

#[test]
fn serialization_round_trips_dispatcher_output() {
    let mut editor = load("<p>alpha beta</p>");
    editor.set_selection(first_run_selection(&editor, 0, 5));
    assert!(editor.exec("applyInlineStyle", &[json!("bold")]));
    editor.set_selection(first_run_selection(&editor, 0, 0));
    assert!(editor.exec("applyBlockFormat", &[json!("heading2")]));
    editor.select_end();
    assert!(editor.exec("insertCustomBlock", &[json!("image"), json!({ "src": "a.png" })]));

    let saved = editor.get_serialized_content();
    let reloaded = parse_document(&saved, &Registry::with_builtins(), &AttributeSanitizer::new())
        .expect("own output parses");
    assert_eq!(serialize(&reloaded), saved);
}

#[test]
fn unknown_block_type_survives_a_save_load_cycle() {
    let markup = "<figure data-block-id=\"b9\" data-block-type=\"diagram\" data-shape=\"flow\"></figure><p></p>";
    let editor = load(markup);

    // The diagram type has no descriptor, so the block is degraded but its
    // payload attributes must survive the round trip untouched.
    let saved = editor.get_serialized_content();
    assert!(saved.contains("data-block-type=\"diagram\""), "got {saved}");
    assert!(saved.contains("data-shape=\"flow\""), "got {saved}");
    assert!(saved.contains("data-degraded=\"true\""), "got {saved}");
}

#[test]
fn block_format_toggle_law() {
    for tag in ["heading1", "heading2", "heading3", "blockquote"] {
        let mut editor = load("<p>content</p>");
        editor.set_selection(first_run_selection(&editor, 0, 0));
        assert!(editor.exec("applyBlockFormat", &[json!(tag)]));
        editor.set_selection(first_run_selection(&editor, 0, 0));
        assert!(editor.exec("applyBlockFormat", &[json!(tag)]));
        assert_eq!(
            editor.get_serialized_content(),
            "<p>content</p>",
            "double `{tag}` application must return to paragraph"
        );
    }
}

#[test]
fn undo_redo_law_for_a_sequence_of_edits() {
    let mut editor = load("<p>one two three</p>");
    let mut states = vec![editor.get_serialized_content()];

    editor.set_selection(first_run_selection(&editor, 0, 3));
    editor.exec("applyInlineStyle", &[json!("bold")]);
    settle(&mut editor);
    states.push(editor.get_serialized_content());

    editor.set_selection(first_run_selection(&editor, 0, 0));
    editor.exec("applyBlockFormat", &[json!("blockquote")]);
    settle(&mut editor);
    states.push(editor.get_serialized_content());

    editor.set_selection(first_run_selection(&editor, 0, 0));
    editor.exec("createList", &[json!("ordered")]);
    settle(&mut editor);
    states.push(editor.get_serialized_content());

    // N undos walk back through every state...
    for expected in states.iter().rev().skip(1) {
        assert!(editor.undo());
        assert_eq!(&editor.get_serialized_content(), expected);
    }
    assert!(!editor.can_undo());

    // ...and N redos reproduce them forward, exactly.
    for expected in states.iter().skip(1) {
        assert!(editor.redo());
        assert_eq!(&editor.get_serialized_content(), expected);
    }
    assert!(!editor.can_redo());
}

#[test]
fn checklist_continuation_produces_unchecked_items() {
    let mut editor = load("<ul data-list=\"checklist\"><li data-checked=\"true\">done</li></ul>");
    let doc = editor.document();
    let list = doc.children(doc.root())[0];
    let item = doc.children(list)[0];
    let run = doc.children(item)[0];
    editor.set_selection(Selection::caret(Caret { node: run, offset: 4 }));

    assert!(editor.exec("splitListItem", &[]));
    assert_eq!(
        editor.get_serialized_content(),
        "<ul data-list=\"checklist\"><li data-checked=\"true\">done</li><li data-checked=\"false\"></li></ul>"
    );

    // Enter in the now-empty item exits the list with a trailing paragraph.
    assert!(editor.exec("splitListItem", &[]));
    assert_eq!(
        editor.get_serialized_content(),
        "<ul data-list=\"checklist\"><li data-checked=\"true\">done</li></ul><p></p>"
    );
}

#[test]
fn adjacent_same_kind_lists_merge_in_order() {
    // Converting the paragraph between two bullet lists to a list leaves
    // three adjacent roots; the merge pass splices them into one.
    let mut editor = load("<ul><li>a</li></ul><p>b</p><ul><li>c</li></ul>");
    let doc = editor.document();
    let middle = doc.children(doc.root())[1];
    let run = doc.children(middle)[0];
    editor.set_selection(Selection::caret(Caret { node: run, offset: 0 }));

    assert!(editor.exec("createList", &[json!("unordered")]));
    assert_eq!(
        editor.get_serialized_content(),
        "<ul><li>a</li><li>b</li><li>c</li></ul>"
    );
}

#[test]
fn image_payload_round_trips_excluding_derived_values() {
    let registry = Registry::with_builtins();
    let descriptor = registry.lookup("image").expect("builtin");
    let payload = json!({ "src": "photo.png", "alt": "A photo", "width": 640, "height": 480 });

    let fragment = (descriptor.render)(&payload).expect("renders");
    // Derived presentation attribute is present on the fragment...
    assert!(fragment.attr("data-aspect-ratio").is_some());
    // ...but excluded from the parsed payload, which is exact.
    let parsed = (descriptor.parse)(&fragment).expect("parses");
    assert_eq!(parsed, payload);
}

#[test]
fn selection_snapshot_restore_is_idempotent_and_clamped() {
    let mut editor = load("<p>hello</p><p>world</p>");
    let selection = first_run_selection(&editor, 2, 2);
    editor.set_selection(selection.clone());
    let snapshot = capture(editor.document(), Some(&selection)).expect("captures");

    // Structural change: the first paragraph becomes a heading.
    editor.exec("applyBlockFormat", &[json!("heading1")]);

    let restored = restore(editor.document(), &snapshot);
    let again = restore(editor.document(), &snapshot);
    assert_eq!(restored, again);

    // The restored caret still points at live content.
    assert!(editor.document().is_attached(restored.anchor.node));
}

#[test]
fn snapshot_restore_falls_back_to_tree_end_when_paths_die() {
    let mut doc = Document::new();
    let para = doc.children(doc.root())[0];
    let run = doc.alloc_text("abc");
    doc.append_child(para, run);
    let selection = Selection::caret(Caret { node: run, offset: 3 });
    let snapshot = capture(&doc, Some(&selection)).expect("captures");

    // Replace the whole document body.
    doc.remove_subtree(para);
    let fresh = doc.alloc(NodeKind::Block(BlockKind::Paragraph));
    doc.append_child(doc.root(), fresh);

    let restored = restore(&doc, &snapshot);
    assert!(doc.is_attached(restored.anchor.node));
    let again = restore(&doc, &snapshot);
    assert_eq!(restored, again);
}

#[test]
fn failed_operations_leave_a_normalized_usable_tree() {
    let mut editor = load("<p>text</p>");
    let before = editor.get_serialized_content();

    // A checklist toggle outside any list fails and changes nothing.
    editor.set_selection(first_run_selection(&editor, 0, 0));
    assert!(!editor.exec("toggleChecklistState", &[]));
    assert_eq!(editor.get_serialized_content(), before);

    // The surface is still editable afterwards.
    editor.set_selection(first_run_selection(&editor, 0, 4));
    assert!(editor.exec("applyInlineStyle", &[json!("italic")]));
    assert_eq!(
        editor.get_serialized_content(),
        "<p><span data-styles=\"italic\">text</span></p>"
    );
}
