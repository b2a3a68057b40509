use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::document::{
    AttributeKind, AttributeQuery, AttributeValue, Attributes, Document, Selection,
};
use crate::error::Result;

mod content;
mod cursor;
mod structure;
mod styles;

pub(crate) use content::prune_and_merge_runs;
pub use content::char_to_byte_idx;
pub use cursor::{RunRef, TextPosition, offset_to_position, position_to_offset, resolve};
pub use styles::{apply_attribute, query_attribute, validate_attribute};
pub(crate) use styles::attribute_label;

use cursor::clamp_position;
use structure::attributes_at_position;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Cleared,
    Loaded,
    ParagraphAppended,
    TextEdited,
    Formatted,
}

/// Raised by every mutation of the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    /// Whether the bounds of the active selection may have moved.
    pub shifts_selection: bool,
}

/// One editing session over a [`Document`]: owns the document, the caret
/// and selection anchor, and the queue of change notifications.
#[derive(Debug)]
pub struct NoteEditor {
    document: Document,
    caret: TextPosition,
    anchor: Option<TextPosition>,
    typing: Option<Attributes>,
    changes: Vec<DocumentChange>,
}

impl NoteEditor {
    pub fn new(mut document: Document) -> Self {
        document.ensure_initialized();
        Self {
            document,
            caret: TextPosition::default(),
            anchor: None,
            typing: None,
            changes: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn length(&self) -> usize {
        self.document.length()
    }

    pub fn to_plain_text(&self) -> String {
        self.document.to_plain_text()
    }

    pub fn clear(&mut self) {
        self.document.clear();
        self.reset_cursor();
        self.notify(ChangeKind::Cleared, true);
    }

    pub fn load_plain_text(&mut self, text: &str) {
        self.document.load_plain_text(text);
        self.reset_cursor();
        self.notify(ChangeKind::Loaded, true);
    }

    /// Replaces the document with the plain-text contents of `path`.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)?;
        self.load_plain_text(&text);
        info!(path = %path.display(), chars = self.length(), "loaded note");
        Ok(())
    }

    /// Writes [`NoteEditor::to_plain_text`] to `path`. Formatting is not
    /// persisted.
    pub fn save_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_plain_text())?;
        info!(path = %path.display(), chars = self.length(), "saved note");
        Ok(())
    }

    /// Appends a paragraph at the end. The caret and selection keep their
    /// positions.
    pub fn append_paragraph(&mut self, text: &str) {
        self.document.append_paragraph(text);
        self.caret = clamp_position(&self.document, self.caret);
        self.anchor = self
            .anchor
            .map(|anchor| clamp_position(&self.document, anchor));
        self.notify(ChangeKind::ParagraphAppended, false);
    }

    /// Drains the change notifications raised since the last call.
    pub fn take_changes(&mut self) -> Vec<DocumentChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn caret(&self) -> TextPosition {
        self.caret
    }

    pub fn anchor(&self) -> Option<TextPosition> {
        self.anchor
    }

    /// The ordered selection bounds as in-paragraph positions.
    pub fn selection_positions(&self) -> (TextPosition, TextPosition) {
        match self.anchor {
            Some(anchor) if anchor < self.caret => (anchor, self.caret),
            Some(anchor) => (self.caret, anchor),
            None => (self.caret, self.caret),
        }
    }

    pub fn has_selection(&self) -> bool {
        self.anchor.is_some_and(|anchor| anchor != self.caret)
    }

    /// The active selection as document-wide offsets.
    pub fn selection(&self) -> Selection {
        let (start, end) = self.selection_positions();
        Selection::new(
            position_to_offset(&self.document, start),
            position_to_offset(&self.document, end),
        )
    }

    pub fn set_selection(&mut self, selection: Selection) {
        let start = offset_to_position(&self.document, selection.start);
        let end = offset_to_position(&self.document, selection.end);
        self.anchor = (start != end).then_some(start);
        self.caret = end;
        self.typing = None;
    }

    /// Moves the caret, extending the selection from its current anchor when
    /// `extend` is set. Returns whether the caret or selection changed.
    pub fn move_to(&mut self, position: TextPosition, extend: bool) -> bool {
        let position = clamp_position(&self.document, position);
        let before = (self.caret, self.anchor);
        if extend {
            if self.anchor.is_none() {
                self.anchor = Some(self.caret);
            }
        } else {
            self.anchor = None;
        }
        self.caret = position;
        if self.anchor == Some(self.caret) {
            self.anchor = None;
        }
        let moved = before != (self.caret, self.anchor);
        if moved {
            self.typing = None;
        }
        moved
    }

    pub fn move_left(&mut self, extend: bool) -> bool {
        if !extend && self.has_selection() {
            let (start, _) = self.selection_positions();
            return self.move_to(start, false);
        }
        let caret = self.caret;
        let target = if caret.offset > 0 {
            TextPosition::new(caret.paragraph, caret.offset - 1)
        } else if caret.paragraph > 0 {
            let previous = caret.paragraph - 1;
            TextPosition::new(previous, self.paragraph_len(previous))
        } else {
            return self.move_to(caret, extend);
        };
        self.move_to(target, extend)
    }

    pub fn move_right(&mut self, extend: bool) -> bool {
        if !extend && self.has_selection() {
            let (_, end) = self.selection_positions();
            return self.move_to(end, false);
        }
        let caret = self.caret;
        let target = if caret.offset < self.paragraph_len(caret.paragraph) {
            TextPosition::new(caret.paragraph, caret.offset + 1)
        } else if caret.paragraph + 1 < self.document.paragraphs().len() {
            TextPosition::new(caret.paragraph + 1, 0)
        } else {
            return self.move_to(caret, extend);
        };
        self.move_to(target, extend)
    }

    pub fn move_to_paragraph_start(&mut self, extend: bool) -> bool {
        self.move_to(TextPosition::new(self.caret.paragraph, 0), extend)
    }

    pub fn move_to_paragraph_end(&mut self, extend: bool) -> bool {
        let len = self.paragraph_len(self.caret.paragraph);
        self.move_to(TextPosition::new(self.caret.paragraph, len), extend)
    }

    pub fn select_all(&mut self) -> bool {
        let last = self.document.paragraphs().len() - 1;
        let end = TextPosition::new(last, self.paragraph_len(last));
        let changed = self.anchor != Some(TextPosition::default()) || self.caret != end;
        self.anchor = Some(TextPosition::default());
        self.caret = end;
        if self.anchor == Some(self.caret) {
            self.anchor = None;
        }
        self.typing = None;
        changed
    }

    /// Reports an attribute over the active selection. A caret carrying
    /// pending typing attributes reports those; a caret in an empty
    /// paragraph of a non-empty document reports its placeholder. A caret
    /// at the start of a later paragraph reads that paragraph's first run,
    /// the one typed text joins.
    pub fn query_attribute(&self, kind: AttributeKind) -> AttributeQuery {
        if !self.has_selection() {
            if let Some(typing) = &self.typing {
                return AttributeQuery::Value(typing.get(kind));
            }
            let paragraph = &self.document.paragraphs()[self.caret.paragraph];
            if paragraph.is_empty() && !self.document.is_empty() {
                return AttributeQuery::Value(paragraph.runs()[0].attributes().get(kind));
            }
            if self.caret.offset == 0 && self.caret.paragraph > 0 {
                if let Some(attributes) = attributes_at_position(&self.document, self.caret) {
                    return AttributeQuery::Value(attributes.get(kind));
                }
            }
        }
        query_attribute(&self.document, self.selection(), kind)
    }

    /// Writes an attribute over the active selection. At a caret the value
    /// becomes part of the typing attributes used by the next insertion.
    pub fn apply_attribute(&mut self, value: &AttributeValue) -> Result<bool> {
        let selection = self.selection();
        if self.has_selection() {
            let changed = apply_attribute(&mut self.document, selection, value)?;
            if changed {
                self.notify(ChangeKind::Formatted, false);
            }
            return Ok(changed);
        }

        validate_attribute(value)?;
        let placeholder_changed = if self.document.is_empty() {
            apply_attribute(&mut self.document, selection, value)?
        } else {
            self.set_empty_paragraph_attribute(value)
        };
        let base = self
            .typing
            .clone()
            .or_else(|| attributes_at_position(&self.document, self.caret).cloned())
            .unwrap_or_else(|| self.document.defaults().clone());
        self.typing = Some(base.with(value));
        if placeholder_changed {
            self.notify(ChangeKind::Formatted, false);
        }
        debug!(attribute = %value.kind(), %value, "set typing attribute at caret");
        Ok(placeholder_changed)
    }

    pub fn insert_text(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        if self.has_selection() {
            self.delete_selection();
        }
        let typing = self.typing.take();
        let Some(after) = structure::insert_text(&mut self.document, self.caret, text, typing.as_ref())
        else {
            return false;
        };
        self.caret = after;
        self.anchor = None;
        self.notify(ChangeKind::TextEdited, true);
        true
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        self.insert_text(ch.encode_utf8(&mut buf))
    }

    pub fn insert_paragraph_break(&mut self) -> bool {
        if self.has_selection() {
            self.delete_selection();
        }
        let Some(position) = structure::split_paragraph(&mut self.document, self.caret) else {
            return false;
        };
        self.caret = position;
        self.anchor = None;
        self.typing = None;
        self.notify(ChangeKind::TextEdited, true);
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.has_selection() {
            return self.delete_selection();
        }
        let Some(position) = structure::delete_backward(&mut self.document, self.caret) else {
            return false;
        };
        self.caret = position;
        self.typing = None;
        self.notify(ChangeKind::TextEdited, true);
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.has_selection() {
            return self.delete_selection();
        }
        let Some(position) = structure::delete_forward(&mut self.document, self.caret) else {
            return false;
        };
        self.caret = position;
        self.typing = None;
        self.notify(ChangeKind::TextEdited, true);
        true
    }

    pub fn delete_selection(&mut self) -> bool {
        let (start, end) = self.selection_positions();
        self.anchor = None;
        let Some(position) = structure::delete_range(&mut self.document, start, end) else {
            return false;
        };
        self.caret = position;
        self.typing = None;
        self.notify(ChangeKind::TextEdited, true);
        true
    }

    fn set_empty_paragraph_attribute(&mut self, value: &AttributeValue) -> bool {
        let Some(paragraph) = structure::paragraph_mut(&mut self.document, self.caret.paragraph)
        else {
            return false;
        };
        if !paragraph.is_empty() {
            return false;
        }
        let placeholder = &mut paragraph.runs[0];
        let before = placeholder.attributes.clone();
        placeholder.attributes.set(value);
        placeholder.attributes != before
    }

    fn paragraph_len(&self, idx: usize) -> usize {
        self.document.paragraphs().get(idx).map_or(0, |p| p.len())
    }

    fn reset_cursor(&mut self) {
        self.caret = TextPosition::default();
        self.anchor = None;
        self.typing = None;
    }

    fn notify(&mut self, kind: ChangeKind, shifts_selection: bool) {
        debug_assert!(self.document.is_canonical());
        self.changes.push(DocumentChange {
            kind,
            shifts_selection,
        });
    }
}

impl Default for NoteEditor {
    fn default() -> Self {
        Self::new(Document::new())
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;


#[cfg(test)]
#[path = "editor/content_tests.rs"]
mod content_tests;

#[cfg(test)]
#[path = "editor/style_tests.rs"]
mod style_tests;
