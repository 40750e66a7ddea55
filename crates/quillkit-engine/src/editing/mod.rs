/*!
 * # Editing Core Module
 *
 * The editing system is built around a few cooperating pieces:
 *
 * ### 1. Single Source of Truth: the Content Tree
 * - The document is an arena of nodes ([`document::Document`]) addressed by
 *   generational ids; a stale id resolves to `None`, never to a reused node.
 * - Exactly one tree and one selection exist per editor, and they are always
 *   mutated together.
 *
 * ### 2. Normalized at Rest
 * - Every mutation is followed by [`normalize::normalize`], so between
 *   operations the tree never contains empty styled spans, split text runs
 *   with identical styling, or redundantly nested wrappers.
 *
 * ### 3. Command-Based Editing
 * - All host-visible edits go through the command layer ([`commands`],
 *   [`lists`]): resolve the selection, mutate, re-normalize, re-clamp the
 *   selection. A failed command is a logged no-op, never a crash.
 *
 * ### 4. Snapshot History
 * - Undo/redo ([`history`]) captures whole serialized states once an edit
 *   burst settles, rather than recording per-keystroke deltas.
 */

pub mod commands;
pub mod document;
pub mod history;
pub mod inline;
pub mod lists;
pub mod normalize;
pub mod selection;
