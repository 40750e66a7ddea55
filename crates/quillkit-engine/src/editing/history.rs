use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::editing::selection::SelectionSnapshot;

/// One recorded document state: the serialized tree plus the selection that
/// was live when the state settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub markup: String,
    pub selection: Option<SelectionSnapshot>,
    /// Capture time in milliseconds since the Unix epoch.
    pub at: u64,
}

impl HistoryEntry {
    pub fn new(markup: String, selection: Option<SelectionSnapshot>) -> Self {
        let at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            markup,
            selection,
            at,
        }
    }
}

/// Linear undo stack over serialized document states.
///
/// `cursor` points at the entry representing the current document. Undo and
/// redo move the cursor; a new mutation truncates everything past the
/// cursor (see `truncate_forward`), so a divergent redo tail becomes
/// unreachable as soon as the edit lands, not when it settles.
#[derive(Debug)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    depth: usize,
}

impl History {
    /// A history seeded with the document's initial state. The seed counts
    /// toward the depth cap like any other entry.
    pub fn new(initial: HistoryEntry, depth: usize) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            depth: depth.max(1),
        }
    }

    /// Record a settled state as the new current entry.
    ///
    /// Identical consecutive states are collapsed so a no-op edit cycle
    /// never produces an empty undo step.
    pub fn record(&mut self, entry: HistoryEntry) {
        if self.entries[self.cursor].markup == entry.markup {
            self.entries[self.cursor].selection = entry.selection;
            return;
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(entry);
        self.cursor += 1;
        while self.entries.len() > self.depth {
            self.entries.remove(0);
            self.cursor -= 1;
        }
    }

    /// Drop every entry past the cursor.
    ///
    /// Called the moment a new mutation lands, before the edit has settled
    /// into its own entry. The forward tail must become unreachable right
    /// away; waiting for `record` would leave a window where redo replays
    /// a stale state over the fresh edit.
    pub fn truncate_forward(&mut self) {
        self.entries.truncate(self.cursor + 1);
    }

    /// Step back one entry, returning the state to restore.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.entries[self.cursor])
    }

    /// Step forward one entry, returning the state to restore.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(&self.entries[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Replace the whole history with a single fresh state. Used when the
    /// host loads new content; edits from the previous document must not be
    /// reachable through undo.
    pub fn reset(&mut self, initial: HistoryEntry) {
        self.entries.clear();
        self.entries.push(initial);
        self.cursor = 0;
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}
