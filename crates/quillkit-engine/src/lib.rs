pub mod blocks;
pub mod config;
pub mod editing;
pub mod editor;
pub mod error;
pub mod markup;

// Re-export key types for easier usage
pub use blocks::{Descriptor, Fragment, MediaProvider, NoteProvider, Payload, Placement, Registry};
pub use config::EngineConfig;
pub use editing::commands::BlockFormat;
pub use editing::document::{
    BlockKind, Document, HeadingLevel, ListKind, NodeId, NodeKind, StyleTag,
};
pub use editing::selection::{Caret, Selection, SelectionSnapshot};
pub use editor::{Editor, OutlineEntry};
pub use error::EditError;
pub use markup::{AttributeSanitizer, MarkupError, Sanitizer, parse_document, serialize};
