//! The rich-text document model: paragraphs made of formatted runs.
//!
//! A [`Document`] always holds at least one [`Paragraph`], and every paragraph
//! holds at least one [`Run`]. The only run that may be empty is the
//! placeholder of an empty paragraph; it carries the attributes that text
//! typed into that paragraph will receive.

use std::fmt;

pub const DEFAULT_FONT_FAMILY: &str = "Segoe UI";
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

/// The character formatting carried by a run.
#[derive(Clone, Debug, PartialEq)]
pub struct Attributes {
    pub font_family: String,
    pub font_size: f64,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            underline: false,
        }
    }
}

impl Attributes {
    pub fn get(&self, kind: AttributeKind) -> AttributeValue {
        match kind {
            AttributeKind::FontFamily => AttributeValue::FontFamily(self.font_family.clone()),
            AttributeKind::FontSize => AttributeValue::FontSize(self.font_size),
            AttributeKind::Bold => AttributeValue::Bold(self.bold),
            AttributeKind::Italic => AttributeValue::Italic(self.italic),
            AttributeKind::Underline => AttributeValue::Underline(self.underline),
        }
    }

    pub fn set(&mut self, value: &AttributeValue) {
        match value {
            AttributeValue::FontFamily(family) => self.font_family = family.clone(),
            AttributeValue::FontSize(size) => self.font_size = *size,
            AttributeValue::Bold(on) => self.bold = *on,
            AttributeValue::Italic(on) => self.italic = *on,
            AttributeValue::Underline(on) => self.underline = *on,
        }
    }

    pub fn with(mut self, value: &AttributeValue) -> Self {
        self.set(value);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    FontFamily,
    FontSize,
    Bold,
    Italic,
    Underline,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 5] = [
        AttributeKind::FontFamily,
        AttributeKind::FontSize,
        AttributeKind::Bold,
        AttributeKind::Italic,
        AttributeKind::Underline,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AttributeKind::FontFamily => "font family",
            AttributeKind::FontSize => "font size",
            AttributeKind::Bold => "bold",
            AttributeKind::Italic => "italic",
            AttributeKind::Underline => "underline",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single attribute together with the value to read or write.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    FontFamily(String),
    FontSize(f64),
    Bold(bool),
    Italic(bool),
    Underline(bool),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::FontFamily(_) => AttributeKind::FontFamily,
            AttributeValue::FontSize(_) => AttributeKind::FontSize,
            AttributeValue::Bold(_) => AttributeKind::Bold,
            AttributeValue::Italic(_) => AttributeKind::Italic,
            AttributeValue::Underline(_) => AttributeKind::Underline,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bold(on) | AttributeValue::Italic(on) | AttributeValue::Underline(on) => {
                Some(*on)
            }
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::FontFamily(family) => write!(f, "{family}"),
            AttributeValue::FontSize(size) => write!(f, "{size}"),
            AttributeValue::Bold(on) | AttributeValue::Italic(on) | AttributeValue::Underline(on) => {
                write!(f, "{on}")
            }
        }
    }
}

/// Result of asking what value an attribute has across a selection.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeQuery {
    Value(AttributeValue),
    /// The selection spans runs that disagree on the attribute.
    Mixed,
    /// Nothing to inspect: a caret in an empty document.
    Unset,
}

impl AttributeQuery {
    /// True only for a concrete `true` boolean; `Mixed` and `Unset` read as off.
    pub fn is_on(&self) -> bool {
        matches!(self, AttributeQuery::Value(value) if value.as_bool() == Some(true))
    }

    pub fn font_family(&self) -> Option<&str> {
        match self {
            AttributeQuery::Value(AttributeValue::FontFamily(family)) => Some(family),
            _ => None,
        }
    }

    pub fn font_size(&self) -> Option<f64> {
        match self {
            AttributeQuery::Value(AttributeValue::FontSize(size)) => Some(*size),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub(crate) text: String,
    pub(crate) attributes: Attributes,
}

impl Run {
    pub fn new(text: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            text: text.into(),
            attributes,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Paragraph {
    pub(crate) runs: Vec<Run>,
}

impl Paragraph {
    /// An empty paragraph holding a placeholder run.
    pub fn empty(attributes: Attributes) -> Self {
        Self {
            runs: vec![Run::new(String::new(), attributes)],
        }
    }

    pub fn from_text(text: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            runs: vec![Run::new(text, attributes)],
        }
    }

    /// Builds a paragraph from arbitrary runs and brings it into canonical form.
    pub fn from_runs(runs: Vec<Run>, fallback: Attributes) -> Self {
        let mut paragraph = Self { runs };
        paragraph.normalize(fallback);
        paragraph
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.iter().map(Run::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(Run::is_empty)
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Drops empty runs, merges neighbours with identical attributes and keeps
    /// a placeholder run when nothing else is left.
    pub(crate) fn normalize(&mut self, fallback: Attributes) {
        let placeholder = self
            .runs
            .first()
            .map(|run| run.attributes.clone())
            .unwrap_or(fallback);
        crate::editor::prune_and_merge_runs(&mut self.runs);
        if self.runs.is_empty() {
            self.runs.push(Run::new(String::new(), placeholder));
        }
    }

    /// True when no two neighbouring runs share an attribute set and no empty
    /// run sits next to content.
    pub fn is_canonical(&self) -> bool {
        if self.runs.is_empty() {
            return false;
        }
        if self.runs.len() > 1 && self.runs.iter().any(Run::is_empty) {
            return false;
        }
        self.runs
            .windows(2)
            .all(|pair| pair[0].attributes != pair[1].attributes)
    }
}

/// An ordered sequence of paragraphs; the Run Store.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub(crate) paragraphs: Vec<Paragraph>,
    defaults: Attributes,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_defaults(Attributes::default())
    }

    pub fn with_defaults(defaults: Attributes) -> Self {
        Self {
            paragraphs: vec![Paragraph::empty(defaults.clone())],
            defaults,
        }
    }

    /// Replaces the content with the given paragraphs. An empty list leaves a
    /// single empty paragraph behind.
    pub fn with_paragraphs(mut self, paragraphs: Vec<Paragraph>) -> Self {
        self.paragraphs = paragraphs;
        self.ensure_initialized();
        self
    }

    pub fn defaults(&self) -> &Attributes {
        &self.defaults
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    /// A document is empty when it holds one paragraph without text.
    pub fn is_empty(&self) -> bool {
        self.paragraphs.len() == 1 && self.paragraphs[0].is_empty()
    }

    pub fn clear(&mut self) {
        self.paragraphs = vec![Paragraph::empty(self.defaults.clone())];
    }

    /// Appends a paragraph of default-formatted text. An empty document has
    /// its placeholder paragraph replaced instead of being appended to.
    pub fn append_paragraph(&mut self, text: &str) {
        let paragraph = Paragraph::from_text(text, self.defaults.clone());
        if self.is_empty() {
            self.paragraphs[0] = paragraph;
        } else {
            self.paragraphs.push(paragraph);
        }
    }

    /// Loads plain text as one default-formatted paragraph. Carriage-return
    /// line endings are normalized to `\n`.
    pub fn load_plain_text(&mut self, text: &str) {
        self.clear();
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        self.append_paragraph(&normalized);
    }

    /// Concatenates the text of every run, separating paragraphs with `\n`.
    pub fn to_plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Total character count across all runs. Paragraph separators occupy
    /// no offsets.
    pub fn length(&self) -> usize {
        self.paragraphs.iter().map(Paragraph::len).sum()
    }

    pub fn is_canonical(&self) -> bool {
        !self.paragraphs.is_empty() && self.paragraphs.iter().all(Paragraph::is_canonical)
    }

    pub(crate) fn ensure_initialized(&mut self) {
        if self.paragraphs.is_empty() {
            self.paragraphs.push(Paragraph::empty(self.defaults.clone()));
        }
        let defaults = self.defaults.clone();
        for paragraph in &mut self.paragraphs {
            paragraph.normalize(defaults.clone());
        }
    }
}

/// A document-wide `(start, end)` character range; `start == end` is a caret.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    /// Builds a selection from two offsets in any order.
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn is_caret(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }
}
