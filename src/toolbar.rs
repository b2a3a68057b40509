//! Keeps the formatting toolbar and the document in step.
//!
//! Toolbar state is never stored as independent truth: every refresh is a
//! fresh read of [`NoteEditor::query_attribute`]. While the synchronizer is
//! pushing state into the toolbar or writing an attribute, it is
//! [`SyncState::Suppressed`] and ignores control notifications, which breaks
//! the loop between "control changed" and "selection changed" handlers.

use tracing::{debug, trace, warn};

use crate::document::{AttributeKind, AttributeValue};
use crate::editor::{NoteEditor, attribute_label};
use crate::error::EditorError;

/// What the toolbar controls display.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ToolbarState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// `None` when the selection mixes families or nothing can be read.
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
}

impl ToolbarState {
    pub fn query(editor: &NoteEditor) -> Self {
        Self {
            bold: editor.query_attribute(AttributeKind::Bold).is_on(),
            italic: editor.query_attribute(AttributeKind::Italic).is_on(),
            underline: editor.query_attribute(AttributeKind::Underline).is_on(),
            font_family: editor
                .query_attribute(AttributeKind::FontFamily)
                .font_family()
                .map(str::to_string),
            font_size: editor.query_attribute(AttributeKind::FontSize).font_size(),
        }
    }

    pub fn family_label(&self) -> &str {
        self.font_family.as_deref().unwrap_or("")
    }

    pub fn size_label(&self) -> String {
        self.font_size.map(|size| size.to_string()).unwrap_or_default()
    }
}

/// A user edit of one toolbar control.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlChange {
    Bold(bool),
    Italic(bool),
    Underline(bool),
    FontFamily(String),
    /// Raw text of the font-size box; parsed before use.
    FontSizeText(String),
}

impl ControlChange {
    fn into_value(self) -> Result<AttributeValue, EditorError> {
        match self {
            ControlChange::Bold(on) => Ok(AttributeValue::Bold(on)),
            ControlChange::Italic(on) => Ok(AttributeValue::Italic(on)),
            ControlChange::Underline(on) => Ok(AttributeValue::Underline(on)),
            ControlChange::FontFamily(family) => Ok(AttributeValue::FontFamily(family)),
            ControlChange::FontSizeText(text) => text
                .trim()
                .parse::<f64>()
                .map(AttributeValue::FontSize)
                .map_err(|_| EditorError::MalformedUserInput(text)),
        }
    }
}

/// The toolbar collaborator.
pub trait Toolbar {
    /// Displays `state`. Toolkits that raise change notifications for
    /// programmatic updates return them here.
    fn show(&mut self, state: &ToolbarState) -> Vec<ControlChange>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Suppressed,
}

#[derive(Debug)]
pub enum ControlOutcome {
    Applied,
    Unchanged,
    /// Arrived while the synchronizer was suppressed.
    Suppressed,
    /// Unparsable input; treated as a no-op.
    Ignored,
    /// The engine refused the value; the document is unchanged.
    Rejected(EditorError),
}

#[derive(Debug)]
pub struct SelectionSync {
    state: SyncState,
    suppressed_count: usize,
}

impl Default for SelectionSync {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionSync {
    pub fn new() -> Self {
        Self {
            state: SyncState::Idle,
            suppressed_count: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Number of control notifications dropped while suppressed.
    pub fn suppressed_count(&self) -> usize {
        self.suppressed_count
    }

    /// Re-reads every attribute for the current selection and pushes the
    /// result into the toolbar. Returns false when suppressed.
    pub fn selection_changed(&mut self, editor: &mut NoteEditor, toolbar: &mut dyn Toolbar) -> bool {
        if self.state == SyncState::Suppressed {
            return false;
        }
        let state = ToolbarState::query(editor);
        self.state = SyncState::Suppressed;
        let echoes = toolbar.show(&state);
        for echo in echoes {
            self.control_changed(editor, echo, toolbar);
        }
        self.state = SyncState::Idle;
        true
    }

    /// Applies a user edit of a toolbar control to the selection and then
    /// refreshes the toolbar from the document.
    pub fn control_changed(
        &mut self,
        editor: &mut NoteEditor,
        change: ControlChange,
        toolbar: &mut dyn Toolbar,
    ) -> ControlOutcome {
        if self.state == SyncState::Suppressed {
            trace!(?change, "ignoring toolbar notification while suppressed");
            self.suppressed_count += 1;
            return ControlOutcome::Suppressed;
        }

        let value = match change.into_value() {
            Ok(value) => value,
            Err(err) => {
                debug!(%err, "ignoring malformed toolbar input");
                return ControlOutcome::Ignored;
            }
        };

        self.state = SyncState::Suppressed;
        let result = editor.apply_attribute(&value);
        self.state = SyncState::Idle;

        let outcome = match result {
            Ok(true) => {
                debug!(change = attribute_label(&value).as_str(), "toolbar change applied");
                ControlOutcome::Applied
            }
            Ok(false) => ControlOutcome::Unchanged,
            Err(err) => {
                warn!(%err, "toolbar value rejected");
                ControlOutcome::Rejected(err)
            }
        };
        self.selection_changed(editor, toolbar);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AttributeQuery, Document, Selection};

    /// Echoes every control back, the way toolkits that notify on
    /// programmatic updates do.
    #[derive(Default)]
    struct EchoingToolbar {
        shown: Vec<ToolbarState>,
    }

    impl Toolbar for EchoingToolbar {
        fn show(&mut self, state: &ToolbarState) -> Vec<ControlChange> {
            self.shown.push(state.clone());
            vec![
                ControlChange::Bold(state.bold),
                ControlChange::Italic(state.italic),
                ControlChange::Underline(state.underline),
                ControlChange::FontFamily(state.family_label().to_string()),
                ControlChange::FontSizeText(state.size_label()),
            ]
        }
    }

    fn editor_with(text: &str) -> NoteEditor {
        let mut document = Document::new();
        document.append_paragraph(text);
        NoteEditor::new(document)
    }

    #[test]
    fn selection_change_pushes_queried_state() {
        let mut editor = editor_with("Hello World");
        editor.set_selection(Selection::new(0, 5));
        editor.apply_attribute(&AttributeValue::Bold(true)).unwrap();

        let mut sync = SelectionSync::new();
        let mut toolbar = EchoingToolbar::default();
        editor.set_selection(Selection::new(1, 3));
        assert!(sync.selection_changed(&mut editor, &mut toolbar));

        let shown = toolbar.shown.last().unwrap();
        assert!(shown.bold);
        assert!(!shown.italic);
        assert_eq!(shown.font_family.as_deref(), Some("Segoe UI"));
        assert_eq!(shown.font_size, Some(12.0));
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[test]
    fn echoed_notifications_do_not_touch_mixed_selection() {
        let mut editor = editor_with("ABCD");
        editor.set_selection(Selection::new(0, 2));
        editor.apply_attribute(&AttributeValue::Bold(true)).unwrap();
        editor.set_selection(Selection::new(0, 4));
        let before = editor.document().clone();

        let mut sync = SelectionSync::new();
        let mut toolbar = EchoingToolbar::default();
        sync.selection_changed(&mut editor, &mut toolbar);

        // Mixed renders as unchecked; its echo must not un-bold "AB".
        assert!(!toolbar.shown[0].bold);
        assert_eq!(editor.document(), &before);
        assert_eq!(editor.query_attribute(AttributeKind::Bold), AttributeQuery::Mixed);
        assert_eq!(sync.suppressed_count(), 5);
        assert_eq!(toolbar.shown.len(), 1);
    }

    #[test]
    fn control_change_applies_once_and_refreshes() {
        let mut editor = editor_with("Hello World");
        editor.set_selection(Selection::new(0, 5));
        let mut sync = SelectionSync::new();
        let mut toolbar = EchoingToolbar::default();

        let outcome = sync.control_changed(&mut editor, ControlChange::Italic(true), &mut toolbar);

        assert!(matches!(outcome, ControlOutcome::Applied));
        assert_eq!(toolbar.shown.len(), 1);
        assert!(toolbar.shown[0].italic);
        assert_eq!(sync.suppressed_count(), 5);
        assert_eq!(editor.document().paragraphs()[0].runs().len(), 2);
    }

    #[test]
    fn malformed_font_size_is_a_silent_no_op() {
        let mut editor = editor_with("Hello World");
        editor.set_selection(Selection::new(0, 5));
        editor.take_changes();
        let before = editor.document().clone();
        let mut sync = SelectionSync::new();
        let mut toolbar = EchoingToolbar::default();

        let outcome = sync.control_changed(
            &mut editor,
            ControlChange::FontSizeText("abc".to_string()),
            &mut toolbar,
        );

        assert!(matches!(outcome, ControlOutcome::Ignored));
        assert_eq!(editor.document(), &before);
        assert!(editor.take_changes().is_empty());
        assert!(toolbar.shown.is_empty());
    }

    #[test]
    fn font_size_text_is_parsed_and_applied() {
        let mut editor = editor_with("Hello World");
        editor.set_selection(Selection::new(6, 11));
        let mut sync = SelectionSync::new();
        let mut toolbar = EchoingToolbar::default();

        let outcome = sync.control_changed(
            &mut editor,
            ControlChange::FontSizeText(" 18.5 ".to_string()),
            &mut toolbar,
        );

        assert!(matches!(outcome, ControlOutcome::Applied));
        assert_eq!(toolbar.shown[0].font_size, Some(18.5));
        assert_eq!(toolbar.shown[0].size_label(), "18.5");
    }

    #[test]
    fn non_positive_font_size_is_rejected() {
        let mut editor = editor_with("Hello World");
        editor.set_selection(Selection::new(0, 5));
        let before = editor.document().clone();
        let mut sync = SelectionSync::new();
        let mut toolbar = EchoingToolbar::default();

        let outcome = sync.control_changed(
            &mut editor,
            ControlChange::FontSizeText("0".to_string()),
            &mut toolbar,
        );

        assert!(matches!(
            outcome,
            ControlOutcome::Rejected(EditorError::InvalidAttributeValue { .. })
        ));
        assert_eq!(editor.document(), &before);
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[test]
    fn unset_state_renders_blank_controls() {
        let mut editor = NoteEditor::default();
        let mut sync = SelectionSync::new();
        let mut toolbar = EchoingToolbar::default();

        sync.selection_changed(&mut editor, &mut toolbar);

        let shown = &toolbar.shown[0];
        assert_eq!(shown, &ToolbarState::default());
        assert_eq!(shown.family_label(), "");
        assert_eq!(shown.size_label(), "");
    }
}
