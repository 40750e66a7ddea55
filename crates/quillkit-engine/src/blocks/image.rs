//! Image block: a block-level embed whose payload is a source URI plus
//! optional alt text and dimensions.

use serde_json::{Map, Value};

use crate::blocks::{Descriptor, Fragment, Payload, Placement};
use crate::error::EditError;

pub fn descriptor() -> Descriptor {
    Descriptor {
        tag: "image",
        placement: Placement::Block,
        render,
        parse,
        install: None,
        needs_host_ui: false,
    }
}

fn render(payload: &Payload) -> Result<Fragment, EditError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| EditError::SerializationFailure("image payload must be an object".into()))?;
    let src = obj.get("src").and_then(Value::as_str).ok_or_else(|| {
        EditError::SerializationFailure("image payload needs a string `src`".into())
    })?;

    let mut fragment = Fragment::new("image").with_attr("data-src", src);
    if let Some(alt) = obj.get("alt").and_then(Value::as_str) {
        fragment = fragment.with_attr("data-alt", alt);
    }
    let width = obj.get("width").and_then(Value::as_u64);
    let height = obj.get("height").and_then(Value::as_u64);
    if let Some(width) = width {
        fragment = fragment.with_attr("data-width", width.to_string());
    }
    if let Some(height) = height {
        fragment = fragment.with_attr("data-height", height.to_string());
    }
    // Derived, presentation-only; excluded from `parse` by contract.
    if let (Some(width), Some(height)) = (width, height) {
        if height > 0 {
            let ratio = width as f64 / height as f64;
            fragment = fragment.with_attr("data-aspect-ratio", format!("{ratio:.4}"));
        }
    }
    Ok(fragment)
}

fn parse(fragment: &Fragment) -> Result<Payload, EditError> {
    let mut obj = Map::new();
    obj.insert(
        "src".into(),
        Value::from(fragment.require_attr("data-src")?),
    );
    if let Some(alt) = fragment.attr("data-alt") {
        obj.insert("alt".into(), Value::from(alt));
    }
    for (attr, key) in [("data-width", "width"), ("data-height", "height")] {
        if let Some(raw) = fragment.attr(attr) {
            let value: u64 = raw.parse().map_err(|_| {
                EditError::SerializationFailure(format!("image `{attr}` is not a number: {raw}"))
            })?;
            obj.insert(key.into(), Value::from(value));
        }
    }
    Ok(Value::Object(obj))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parse_is_left_inverse_of_render() {
        let payload = json!({
            "src": "a.png",
            "alt": "x",
            "width": 200,
            "height": 100,
        });
        let fragment = render(&payload).expect("renders");
        assert_eq!(parse(&fragment).expect("parses"), payload);
    }

    #[test]
    fn aspect_ratio_is_derived_and_not_parsed_back() {
        let payload = json!({ "src": "a.png", "width": 200, "height": 100 });
        let fragment = render(&payload).expect("renders");
        assert_eq!(fragment.attr("data-aspect-ratio"), Some("2.0000"));
        assert_eq!(parse(&fragment).expect("parses"), payload);
    }

    #[test]
    fn minimal_payload_round_trips() {
        let payload = json!({ "src": "photo.jpg" });
        let fragment = render(&payload).expect("renders");
        assert_eq!(fragment.attr("data-alt"), None);
        assert_eq!(parse(&fragment).expect("parses"), payload);
    }

    #[test]
    fn render_rejects_payload_without_src() {
        let err = render(&json!({ "alt": "no source" })).unwrap_err();
        assert!(matches!(err, EditError::SerializationFailure(_)));
    }

    #[test]
    fn parse_rejects_mangled_width() {
        let fragment = Fragment::new("image")
            .with_attr("data-src", "a.png")
            .with_attr("data-width", "wide");
        assert!(parse(&fragment).is_err());
    }
}
