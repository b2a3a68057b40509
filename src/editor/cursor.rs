//! Range resolution: mapping document-wide character offsets onto runs.

use crate::document::{Document, Run};

use super::content::split_run_at;

/// Identifies a run by paragraph and run index. Only valid until the next
/// structural change of the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunRef {
    pub paragraph: usize,
    pub run: usize,
}

/// A position inside one paragraph, in characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TextPosition {
    pub paragraph: usize,
    pub offset: usize,
}

impl TextPosition {
    pub fn new(paragraph: usize, offset: usize) -> Self {
        Self { paragraph, offset }
    }
}

pub(crate) fn run_ref<'a>(document: &'a Document, run: RunRef) -> Option<&'a Run> {
    document.paragraphs.get(run.paragraph)?.runs.get(run.run)
}

/// Splits runs at `start` and `end` so that run boundaries line up with the
/// range, then returns every run lying within `[start, end)` in order.
///
/// A caret resolves to the run containing the offset, or the run ending at
/// it when the offset sits on a boundary. An offset at the very end of the
/// document resolves to the last run.
pub fn resolve(document: &mut Document, start: usize, end: usize) -> Vec<RunRef> {
    let length = document.length();
    let end = end.min(length);
    let start = start.min(end);

    if start == end {
        return caret_run(document, start).into_iter().collect();
    }

    // Split the end first so the start split cannot shift its indices.
    split_at(document, end);
    split_at(document, start);

    let mut refs = Vec::new();
    let mut pos = 0;
    for (p_idx, paragraph) in document.paragraphs.iter().enumerate() {
        for (r_idx, run) in paragraph.runs.iter().enumerate() {
            let len = run.len();
            if len > 0 && pos >= start && pos + len <= end {
                refs.push(RunRef {
                    paragraph: p_idx,
                    run: r_idx,
                });
            }
            pos += len;
        }
        if pos >= end {
            break;
        }
    }
    refs
}

/// Read-only counterpart of [`resolve`]: every run overlapping
/// `[start, end)`, including runs only partly covered.
pub(crate) fn covered_runs(document: &Document, start: usize, end: usize) -> Vec<RunRef> {
    let mut runs = Vec::new();
    if start >= end {
        return runs;
    }
    let mut pos = 0;
    for (p_idx, paragraph) in document.paragraphs.iter().enumerate() {
        for (r_idx, run) in paragraph.runs.iter().enumerate() {
            let len = run.len();
            let run_end = pos + len;
            if start.max(pos) < end.min(run_end) {
                runs.push(RunRef {
                    paragraph: p_idx,
                    run: r_idx,
                });
            }
            pos = run_end;
        }
        if pos >= end {
            break;
        }
    }
    runs
}

/// The run a caret at `offset` belongs to. Empty placeholder runs are not
/// candidates, so a document without text has no caret run.
pub(crate) fn caret_run(document: &Document, offset: usize) -> Option<RunRef> {
    let mut pos = 0;
    let mut first = None;
    let mut last = None;
    for (p_idx, paragraph) in document.paragraphs.iter().enumerate() {
        for (r_idx, run) in paragraph.runs.iter().enumerate() {
            let len = run.len();
            if len == 0 {
                continue;
            }
            let here = RunRef {
                paragraph: p_idx,
                run: r_idx,
            };
            if first.is_none() {
                first = Some(here);
            }
            if offset > pos && offset <= pos + len {
                return Some(here);
            }
            last = Some(here);
            pos += len;
        }
    }
    if offset == 0 { first } else { last }
}

fn split_at(document: &mut Document, offset: usize) {
    let mut pos = 0;
    for paragraph in &mut document.paragraphs {
        let len = paragraph.len();
        if offset > pos && offset < pos + len {
            split_run_at(&mut paragraph.runs, offset - pos);
            return;
        }
        pos += len;
        if pos >= offset {
            return;
        }
    }
}

/// Converts an in-paragraph position to a document-wide offset.
pub fn position_to_offset(document: &Document, position: TextPosition) -> usize {
    let mut offset = 0;
    for (idx, paragraph) in document.paragraphs.iter().enumerate() {
        let len = paragraph.len();
        if idx == position.paragraph {
            return offset + position.offset.min(len);
        }
        offset += len;
    }
    offset
}

/// Converts a document-wide offset to an in-paragraph position. An offset
/// on a paragraph boundary maps to the end of the earlier paragraph.
pub fn offset_to_position(document: &Document, offset: usize) -> TextPosition {
    let mut start = 0;
    for (idx, paragraph) in document.paragraphs.iter().enumerate() {
        let len = paragraph.len();
        if offset <= start + len {
            return TextPosition::new(idx, offset - start);
        }
        start += len;
    }
    let last = document.paragraphs.len().saturating_sub(1);
    let len = document.paragraphs.get(last).map_or(0, |p| p.len());
    TextPosition::new(last, len)
}

/// Clamps a position to an existing paragraph and offset.
pub(crate) fn clamp_position(document: &Document, position: TextPosition) -> TextPosition {
    let last = document.paragraphs.len().saturating_sub(1);
    let paragraph = position.paragraph.min(last);
    let len = document.paragraphs.get(paragraph).map_or(0, |p| p.len());
    TextPosition::new(paragraph, position.offset.min(len))
}
