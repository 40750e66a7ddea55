//! Cross-document link block: an inline embed pointing at another note.
//! Producing the payload requires the host's note picker, so insertion
//! without one goes through `onCustomCommandRequested`.

use serde_json::{Map, Value};

use crate::blocks::{Descriptor, Fragment, Payload, Placement};
use crate::error::EditError;

pub fn descriptor() -> Descriptor {
    Descriptor {
        tag: "note-link",
        placement: Placement::Inline,
        render,
        parse,
        install: None,
        needs_host_ui: true,
    }
}

fn render(payload: &Payload) -> Result<Fragment, EditError> {
    let obj = payload.as_object().ok_or_else(|| {
        EditError::SerializationFailure("note-link payload must be an object".into())
    })?;
    let note_id = obj.get("note_id").and_then(Value::as_str).ok_or_else(|| {
        EditError::SerializationFailure("note-link payload needs a string `note_id`".into())
    })?;
    let title = obj.get("title").and_then(Value::as_str).ok_or_else(|| {
        EditError::SerializationFailure("note-link payload needs a string `title`".into())
    })?;
    Ok(Fragment::new("note-link")
        .with_attr("data-note-id", note_id)
        .with_attr("data-title", title))
}

fn parse(fragment: &Fragment) -> Result<Payload, EditError> {
    let mut obj = Map::new();
    obj.insert(
        "note_id".into(),
        Value::from(fragment.require_attr("data-note-id")?),
    );
    obj.insert(
        "title".into(),
        Value::from(fragment.require_attr("data-title")?),
    );
    Ok(Value::Object(obj))
}
