//! Table block: a block-level embed carrying its grid shape and cell text.
//! Cells are encoded as a single JSON attribute so the whole payload stays
//! on the fragment's root element.

use serde_json::{Map, Value};

use crate::blocks::{Descriptor, Fragment, Payload, Placement, Teardown};
use crate::error::EditError;

pub fn descriptor() -> Descriptor {
    Descriptor {
        tag: "table",
        placement: Placement::Block,
        render,
        parse,
        install: Some(install),
        needs_host_ui: false,
    }
}

fn render(payload: &Payload) -> Result<Fragment, EditError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| EditError::SerializationFailure("table payload must be an object".into()))?;
    let rows = obj.get("rows").and_then(Value::as_u64).ok_or_else(|| {
        EditError::SerializationFailure("table payload needs numeric `rows`".into())
    })?;
    let cols = obj.get("cols").and_then(Value::as_u64).ok_or_else(|| {
        EditError::SerializationFailure("table payload needs numeric `cols`".into())
    })?;

    let mut fragment = Fragment::new("table")
        .with_attr("data-rows", rows.to_string())
        .with_attr("data-cols", cols.to_string());
    if let Some(cells) = obj.get("cells") {
        if !cells.is_array() {
            return Err(EditError::SerializationFailure(
                "table `cells` must be an array of rows".into(),
            ));
        }
        let encoded = serde_json::to_string(cells)
            .map_err(|e| EditError::SerializationFailure(format!("table cells encode: {e}")))?;
        fragment = fragment.with_attr("data-cells", encoded);
    }
    Ok(fragment)
}

fn parse(fragment: &Fragment) -> Result<Payload, EditError> {
    let mut obj = Map::new();
    for (attr, key) in [("data-rows", "rows"), ("data-cols", "cols")] {
        let raw = fragment.require_attr(attr)?;
        let value: u64 = raw.parse().map_err(|_| {
            EditError::SerializationFailure(format!("table `{attr}` is not a number: {raw}"))
        })?;
        obj.insert(key.into(), Value::from(value));
    }
    if let Some(raw) = fragment.attr("data-cells") {
        let cells: Value = serde_json::from_str(raw)
            .map_err(|e| EditError::SerializationFailure(format!("table cells decode: {e}")))?;
        obj.insert("cells".into(), cells);
    }
    Ok(Value::Object(obj))
}

/// Seed the host's cell editor with the persisted payload; edited payloads
/// come back through the sink.
fn install(fragment: &Fragment, sink: &mut dyn FnMut(Payload)) -> Teardown {
    if let Ok(payload) = parse(fragment) {
        sink(payload);
    }
    Box::new(|| {})
}
