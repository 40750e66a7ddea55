use regex::Regex;

use crate::blocks::Fragment;

/// Collaborator seam: vets dynamically produced markup attributes before
/// they are persisted or displayed. Every attribute a descriptor's
/// `render()` emits passes through here.
pub trait Sanitizer {
    /// Vet one attribute. `None` rejects it outright; `Some` returns the
    /// (possibly rewritten) value to keep.
    fn sanitize_attr(&self, tag: &str, name: &str, value: &str) -> Option<String>;

    /// Apply attribute vetting to a whole fragment, dropping rejected
    /// attributes.
    fn sanitize_fragment(&self, fragment: &Fragment) -> Fragment {
        let mut clean = Fragment::new(fragment.tag.clone());
        for (name, value) in &fragment.attrs {
            if let Some(kept) = self.sanitize_attr(&fragment.tag, name, value) {
                clean.attrs.insert(name.clone(), kept);
            }
        }
        clean
    }
}

/// Default sanitizer: only `data-` attributes pass (the payload channel is
/// attributes, nothing else), control characters are stripped, and URL
/// attributes must carry a whitelisted scheme or be scheme-less relative
/// references.
pub struct AttributeSanitizer {
    allowed_scheme: Regex,
}

impl AttributeSanitizer {
    pub fn new() -> Self {
        Self {
            // http(s), file and asset URIs, plus inline image data.
            allowed_scheme: Regex::new(r"(?i)^(https?:|file:|asset:|data:image/)")
                .expect("scheme pattern is valid"),
        }
    }

    fn is_url_attr(name: &str) -> bool {
        matches!(name, "data-src" | "data-href")
    }

    /// A value counts as carrying a scheme when a `:` appears before any
    /// path separator; those must match the whitelist. "a.png" and
    /// "images/a.png" stay legal.
    fn has_disallowed_scheme(&self, value: &str) -> bool {
        let head = value.split(['/', '?', '#']).next().unwrap_or(value);
        head.contains(':') && !self.allowed_scheme.is_match(value)
    }
}

impl Default for AttributeSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sanitizer for AttributeSanitizer {
    fn sanitize_attr(&self, _tag: &str, name: &str, value: &str) -> Option<String> {
        if !name.starts_with("data-") {
            return None;
        }
        let stripped: String = value.chars().filter(|c| !c.is_control()).collect();
        if Self::is_url_attr(name) && self.has_disallowed_scheme(&stripped) {
            return None;
        }
        Some(stripped)
    }
}
