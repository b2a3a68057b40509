use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::document::{Attributes, Paragraph};
use crate::editor::{NoteEditor, TextPosition};
use crate::theme::Theme;

const TAB_WIDTH: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
    /// Screen position of every caret position in the document.
    pub cursor_map: Vec<(TextPosition, CursorVisualPosition)>,
}

/// Lays the editor's document out in lines of at most `width` columns.
pub fn render_document(editor: &NoteEditor, width: usize, theme: &Theme) -> RenderResult {
    let selection = editor
        .has_selection()
        .then(|| editor.selection_positions());
    let mut renderer = Renderer::new(
        width.max(1),
        editor.caret(),
        selection,
        theme.selection_style(),
    );
    for (index, paragraph) in editor.document().paragraphs().iter().enumerate() {
        renderer.render_paragraph(index, paragraph);
    }
    renderer.finish()
}

/// Terminal style of a run. Family and size have no terminal equivalent.
pub fn run_style(attributes: &Attributes) -> Style {
    let mut style = Style::default();
    if attributes.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if attributes.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if attributes.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    style
}

struct Renderer {
    wrap_width: usize,
    caret: TextPosition,
    selection: Option<(TextPosition, TextPosition)>,
    selection_style: Style,
    cursor: Option<CursorVisualPosition>,
    cursor_map: Vec<(TextPosition, CursorVisualPosition)>,
    lines: Vec<Line<'static>>,
    current_line_index: usize,
}

impl Renderer {
    fn new(
        wrap_width: usize,
        caret: TextPosition,
        selection: Option<(TextPosition, TextPosition)>,
        selection_style: Style,
    ) -> Self {
        Self {
            wrap_width,
            caret,
            selection,
            selection_style,
            cursor: None,
            cursor_map: Vec::new(),
            lines: Vec::new(),
            current_line_index: 0,
        }
    }

    fn render_paragraph(&mut self, index: usize, paragraph: &Paragraph) {
        let mut tokenizer = Tokenizer::default();
        let mut offset = 0;
        for run in paragraph.runs() {
            let style = run_style(run.attributes());
            for ch in run.text().chars() {
                let position = TextPosition::new(index, offset);
                let style = if self.is_selected(position) {
                    style.patch(self.selection_style)
                } else {
                    style
                };
                tokenizer.push(ch, style, position);
                offset += 1;
            }
        }
        let fragments = tokenizer.finish(TextPosition::new(index, offset));
        let lines = wrap_fragments(&fragments, self.wrap_width);
        self.consume_lines(lines);
    }

    fn is_selected(&self, position: TextPosition) -> bool {
        self.selection
            .is_some_and(|(start, end)| start <= position && position < end)
    }

    fn consume_lines(&mut self, outputs: Vec<LineOutput>) {
        for output in outputs {
            let spans: Vec<Span<'static>> = output
                .spans
                .into_iter()
                .map(|segment| Span::styled(segment.text, segment.style))
                .collect();
            for event in output.events {
                let visual = CursorVisualPosition {
                    line: self.current_line_index,
                    column: event.column,
                };
                if event.position == self.caret {
                    self.cursor = Some(visual);
                }
                self.cursor_map.push((event.position, visual));
            }
            self.lines.push(Line::from(spans));
            self.current_line_index += 1;
        }
    }

    fn finish(mut self) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        RenderResult {
            total_lines: self.lines.len(),
            lines: self.lines,
            cursor: self.cursor,
            cursor_map: self.cursor_map,
        }
    }
}

#[derive(Clone)]
struct LineSegment {
    text: String,
    style: Style,
}

struct LineOutput {
    spans: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
}

struct LocatedEvent {
    column: u16,
    position: TextPosition,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Word,
    Whitespace,
}

#[derive(Clone)]
struct Fragment {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    events: Vec<TextEvent>,
}

enum FragmentItem {
    Token(Fragment),
    LineBreak,
}

#[derive(Clone, Copy)]
struct TextEvent {
    offset: usize,
    position: TextPosition,
}

/// Splits styled characters into words and whitespace, remembering the
/// column at which each caret position starts.
#[derive(Default)]
struct Tokenizer {
    builder: Option<TokenBuilder>,
    pending_events: Vec<TextEvent>,
    fragments: Vec<FragmentItem>,
}

impl Tokenizer {
    fn push(&mut self, ch: char, style: Style, position: TextPosition) {
        self.pending_events.push(TextEvent {
            offset: 0,
            position,
        });
        match ch {
            '\r' => {}
            '\n' => {
                self.flush();
                self.fragments.push(FragmentItem::LineBreak);
            }
            '\t' => {
                for _ in 0..TAB_WIDTH {
                    self.push_visible(' ', style);
                }
            }
            _ => self.push_visible(ch, style),
        }
    }

    fn push_visible(&mut self, ch: char, style: Style) {
        let kind = if ch.is_whitespace() {
            FragmentKind::Whitespace
        } else {
            FragmentKind::Word
        };
        let continues = self
            .builder
            .as_ref()
            .is_some_and(|existing| existing.kind == kind && existing.style == style);
        if !continues {
            if let Some(existing) = self.builder.take() {
                self.fragments.push(FragmentItem::Token(existing.finish()));
            }
            self.builder = Some(TokenBuilder::new(style, kind));
        }
        if let Some(builder) = self.builder.as_mut() {
            builder.add_events(&mut self.pending_events);
            builder.push_char(ch);
        }
    }

    fn flush(&mut self) {
        if let Some(mut token) = self.builder.take() {
            token.add_events(&mut self.pending_events);
            self.fragments.push(FragmentItem::Token(token.finish()));
        } else if !self.pending_events.is_empty() {
            self.fragments.push(FragmentItem::Token(Fragment {
                text: String::new(),
                style: Style::default(),
                kind: FragmentKind::Word,
                width: 0,
                events: self.pending_events.drain(..).collect(),
            }));
        }
    }

    fn finish(mut self, end: TextPosition) -> Vec<FragmentItem> {
        self.pending_events.push(TextEvent {
            offset: 0,
            position: end,
        });
        self.flush();
        self.fragments
    }
}

struct TokenBuilder {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    events: Vec<TextEvent>,
}

impl TokenBuilder {
    fn new(style: Style, kind: FragmentKind) -> Self {
        Self {
            text: String::new(),
            style,
            kind,
            width: 0,
            events: Vec::new(),
        }
    }

    fn add_events(&mut self, pending: &mut Vec<TextEvent>) {
        for mut event in pending.drain(..) {
            event.offset = self.width;
            self.events.push(event);
        }
    }

    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
        self.width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }

    fn finish(self) -> Fragment {
        Fragment {
            text: self.text,
            style: self.style,
            kind: self.kind,
            width: self.width,
            events: self.events,
        }
    }
}

fn wrap_fragments(fragments: &[FragmentItem], width: usize) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::default();
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        match fragment {
            FragmentItem::LineBreak => {
                builder.consume_pending(&mut pending_whitespace);
                outputs.push(builder.build_line());
                builder = LineBuilder::default();
            }
            FragmentItem::Token(token) => match token.kind {
                FragmentKind::Whitespace => {
                    pending_whitespace.push(token.clone());
                }
                FragmentKind::Word => {
                    let whitespace_width: usize =
                        pending_whitespace.iter().map(|item| item.width).sum();
                    if builder.width > 0
                        && token.width > 0
                        && builder.width + whitespace_width + token.width > width
                    {
                        builder.consume_pending(&mut pending_whitespace);
                        outputs.push(builder.build_line());
                        builder = LineBuilder::default();
                    }
                    builder.consume_pending(&mut pending_whitespace);
                    builder.append_token(token.clone());
                }
            },
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

#[derive(Default)]
struct LineBuilder {
    segments: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
    width: usize,
}

impl LineBuilder {
    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append_token(fragment);
        }
    }

    fn append_token(&mut self, fragment: Fragment) {
        let start = self.width;
        if !fragment.text.is_empty() {
            self.segments.push(LineSegment {
                text: fragment.text,
                style: fragment.style,
            });
            self.width += fragment.width;
        }
        for event in fragment.events {
            self.events.push(LocatedEvent {
                column: (start + event.offset) as u16,
                position: event.position,
            });
        }
    }

    fn build_line(mut self) -> LineOutput {
        if self.segments.is_empty() {
            self.segments.push(LineSegment {
                text: String::new(),
                style: Style::default(),
            });
        }
        self.events.sort_by_key(|event| event.column);
        LineOutput {
            spans: self.segments,
            events: self.events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AttributeValue, Document, Selection};

    fn editor_with(paragraphs: &[&str]) -> NoteEditor {
        let mut document = Document::new();
        for text in paragraphs {
            document.append_paragraph(text);
        }
        NoteEditor::new(document)
    }

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    fn visual_of(result: &RenderResult, position: TextPosition) -> Option<CursorVisualPosition> {
        result
            .cursor_map
            .iter()
            .find(|(p, _)| *p == position)
            .map(|(_, v)| *v)
    }

    #[test]
    fn each_paragraph_starts_a_line() {
        let editor = editor_with(&["first note", "second note"]);
        let result = render_document(&editor, 80, &Theme::default());

        assert_eq!(result.total_lines, 2);
        assert_eq!(line_text(&result.lines[0]), "first note");
        assert_eq!(line_text(&result.lines[1]), "second note");
        assert_eq!(
            visual_of(&result, TextPosition::new(1, 3)),
            Some(CursorVisualPosition { line: 1, column: 3 })
        );
    }

    #[test]
    fn long_paragraph_wraps_at_word_boundary() {
        let editor = editor_with(&["hello world"]);
        let result = render_document(&editor, 8, &Theme::default());

        assert_eq!(result.total_lines, 2);
        assert_eq!(line_text(&result.lines[0]), "hello ");
        assert_eq!(line_text(&result.lines[1]), "world");
        assert_eq!(
            visual_of(&result, TextPosition::new(0, 6)),
            Some(CursorVisualPosition { line: 1, column: 0 })
        );
        assert_eq!(
            visual_of(&result, TextPosition::new(0, 11)),
            Some(CursorVisualPosition { line: 1, column: 5 })
        );
    }

    #[test]
    fn wide_characters_use_display_width() {
        let mut editor = editor_with(&["日本語"]);
        editor.move_to_paragraph_end(false);
        let result = render_document(&editor, 80, &Theme::default());
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 0, column: 6 })
        );
    }

    #[test]
    fn run_attributes_become_modifiers() {
        let mut editor = editor_with(&["plain bold"]);
        editor.set_selection(Selection::new(6, 10));
        editor.apply_attribute(&AttributeValue::Bold(true)).unwrap();
        editor.move_to(TextPosition::default(), false);

        let result = render_document(&editor, 80, &Theme::default());
        let bold_span = result.lines[0]
            .spans
            .iter()
            .find(|span| span.content == "bold")
            .unwrap();
        assert!(bold_span.style.add_modifier.contains(Modifier::BOLD));
        let plain_span = result.lines[0]
            .spans
            .iter()
            .find(|span| span.content == "plain")
            .unwrap();
        assert!(!plain_span.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn selection_is_highlighted() {
        let mut editor = editor_with(&["select me"]);
        editor.set_selection(Selection::new(0, 6));
        let theme = Theme::default();

        let result = render_document(&editor, 80, &theme);
        let selected = &result.lines[0].spans[0];
        assert_eq!(selected.content, "select");
        assert_eq!(selected.style.bg, Some(theme.selection_bg));
        assert!(result.lines[0].spans.iter().any(|span| span.style.bg.is_none()));
    }

    #[test]
    fn embedded_newline_breaks_the_line() {
        let mut editor = NoteEditor::default();
        editor.load_plain_text("one\ntwo");
        let result = render_document(&editor, 80, &Theme::default());

        assert_eq!(result.total_lines, 2);
        assert_eq!(line_text(&result.lines[1]), "two");
        assert_eq!(
            visual_of(&result, TextPosition::new(0, 4)),
            Some(CursorVisualPosition { line: 1, column: 0 })
        );
    }

    #[test]
    fn empty_document_has_cursor_at_origin() {
        let editor = NoteEditor::default();
        let result = render_document(&editor, 80, &Theme::default());
        assert_eq!(result.total_lines, 1);
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 0, column: 0 })
        );
    }
}
