//! Custom block registry: the render/parse/interact contract that lets the
//! editor host embedded non-text content without knowing its internals.
//!
//! Built-in descriptors form a closed set (`image`, `table`, `note-link`),
//! each in its own submodule; anything outside the set falls through to the
//! degraded-block branch at parse time. Payloads are JSON values, and
//! `parse` is the exact left inverse of `render` for canonical payloads,
//! excluding presentation-only derived attributes.

pub mod image;
pub mod note_link;
pub mod table;

use std::collections::BTreeMap;

use crate::error::EditError;

/// Descriptor-defined payload. Carried as JSON so descriptors own the shape.
pub type Payload = serde_json::Value;

/// Where a custom block lives in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Block,
    Inline,
}

/// Self-contained fragment produced by `render`: a type tag plus the
/// whitelisted attributes that carry the payload. No ambient state; the
/// attributes are the only channel, which is what makes the sanitizer and
/// the round trip possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
}

impl Fragment {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn require_attr(&self, name: &str) -> Result<&str, EditError> {
        self.attr(name).ok_or_else(|| {
            EditError::SerializationFailure(format!(
                "`{}` fragment is missing attribute `{name}`",
                self.tag
            ))
        })
    }
}

pub type RenderFn = fn(&Payload) -> Result<Fragment, EditError>;
pub type ParseFn = fn(&Fragment) -> Result<Payload, EditError>;

/// Teardown handle returned by an interaction installer.
pub type Teardown = Box<dyn FnOnce()>;

/// Interaction installer: the host calls this after mounting a fragment,
/// handing over a change sink; payloads pushed into the sink flow back into
/// the tree through the command dispatcher.
pub type InstallFn = fn(&Fragment, &mut dyn FnMut(Payload)) -> Teardown;

/// The pluggable contract for one embedded content type.
#[derive(Clone)]
pub struct Descriptor {
    pub tag: &'static str,
    pub placement: Placement,
    pub render: RenderFn,
    pub parse: ParseFn,
    pub install: Option<InstallFn>,
    /// Insertion needs collaborator-owned UI to produce a payload first
    /// (e.g. the note picker for cross-document links).
    pub needs_host_ui: bool,
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("tag", &self.tag)
            .field("placement", &self.placement)
            .field("needs_host_ui", &self.needs_host_ui)
            .finish()
    }
}

/// Type-tag → descriptor map. The registry owns registration only; it never
/// touches the tree.
#[derive(Debug, Default)]
pub struct Registry {
    map: BTreeMap<String, Descriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in descriptors.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(image::descriptor());
        registry.register(table::descriptor());
        registry.register(note_link::descriptor());
        registry
    }

    /// The most recent registration for a tag wins.
    pub fn register(&mut self, descriptor: Descriptor) {
        self.map.insert(descriptor.tag.to_string(), descriptor);
    }

    pub fn lookup(&self, tag: &str) -> Option<&Descriptor> {
        self.map.get(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

/// Candidate note returned by the host's note-selection provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteCandidate {
    pub id: String,
    pub title: String,
}

/// Collaborator interface: supplies note id/title pairs for the
/// cross-document link block.
pub trait NoteProvider {
    fn candidates(&self, query: &str) -> Vec<NoteCandidate>;
}

/// Binary or URI payload returned by the host's file/image provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPayload {
    Uri(String),
    Bytes(Vec<u8>),
}

/// Collaborator interface: resolves a source reference (picker result, drop,
/// clipboard) into something the image block can point at.
pub trait MediaProvider {
    fn acquire(&self, source: &str) -> Option<MediaPayload>;
}
