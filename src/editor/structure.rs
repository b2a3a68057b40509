//! Positional edits that change the text or paragraph structure.

use crate::document::{Attributes, Document, Paragraph, Run};

use super::content::{attributes_at, insert_text_at, remove_range, split_runs};
use super::cursor::{TextPosition, clamp_position};

pub(crate) fn paragraph_mut(document: &mut Document, idx: usize) -> Option<&mut Paragraph> {
    document.paragraphs.get_mut(idx)
}

/// Attributes text typed at `position` would receive.
pub(crate) fn attributes_at_position(
    document: &Document,
    position: TextPosition,
) -> Option<&Attributes> {
    let paragraph = document.paragraphs.get(position.paragraph)?;
    attributes_at(&paragraph.runs, position.offset)
}

/// Inserts text and returns the position right after it.
pub(crate) fn insert_text(
    document: &mut Document,
    position: TextPosition,
    text: &str,
    attributes: Option<&Attributes>,
) -> Option<TextPosition> {
    let position = clamp_position(document, position);
    let paragraph = paragraph_mut(document, position.paragraph)?;
    insert_text_at(&mut paragraph.runs, position.offset, text, attributes);
    Some(TextPosition::new(
        position.paragraph,
        position.offset + text.chars().count(),
    ))
}

/// Breaks a paragraph in two at `position`; the tail becomes the next
/// paragraph. Returns the start of the new paragraph.
pub(crate) fn split_paragraph(
    document: &mut Document,
    position: TextPosition,
) -> Option<TextPosition> {
    let position = clamp_position(document, position);
    let defaults = document.defaults().clone();
    let paragraph = paragraph_mut(document, position.paragraph)?;
    let boundary = attributes_at(&paragraph.runs, position.offset)
        .cloned()
        .unwrap_or_else(|| defaults.clone());

    let tail = split_runs(&mut paragraph.runs, position.offset);
    if paragraph.runs.is_empty() {
        paragraph.runs.push(Run::new(String::new(), boundary.clone()));
    }
    let new_paragraph = if tail.is_empty() {
        Paragraph::empty(boundary)
    } else {
        Paragraph::from_runs(tail, defaults)
    };
    document
        .paragraphs
        .insert(position.paragraph + 1, new_paragraph);
    Some(TextPosition::new(position.paragraph + 1, 0))
}

/// Deletes everything between two positions, joining the paragraphs at
/// either end. Returns the position where the deleted text used to start.
pub(crate) fn delete_range(
    document: &mut Document,
    start: TextPosition,
    end: TextPosition,
) -> Option<TextPosition> {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    let start = clamp_position(document, start);
    let end = clamp_position(document, end);
    if start == end {
        return None;
    }

    let defaults = document.defaults().clone();
    let placeholder = attributes_at_position(document, start)
        .cloned()
        .unwrap_or_else(|| defaults.clone());

    if start.paragraph == end.paragraph {
        let paragraph = paragraph_mut(document, start.paragraph)?;
        remove_range(&mut paragraph.runs, start.offset, end.offset);
        if paragraph.runs.is_empty() {
            paragraph.runs.push(Run::new(String::new(), placeholder));
        }
        return Some(start);
    }

    let mut tail = {
        let last = paragraph_mut(document, end.paragraph)?;
        split_runs(&mut last.runs, end.offset)
    };
    document.paragraphs.drain(start.paragraph + 1..=end.paragraph);

    let paragraph = paragraph_mut(document, start.paragraph)?;
    split_runs(&mut paragraph.runs, start.offset);
    paragraph.runs.retain(|run| !run.text.is_empty());
    tail.retain(|run| !run.text.is_empty());
    paragraph.runs.append(&mut tail);
    if paragraph.runs.is_empty() {
        paragraph.runs.push(Run::new(String::new(), placeholder));
    } else {
        paragraph.normalize(defaults);
    }
    Some(start)
}

/// Deletes the character before `position`, or joins with the previous
/// paragraph at its start.
pub(crate) fn delete_backward(
    document: &mut Document,
    position: TextPosition,
) -> Option<TextPosition> {
    let position = clamp_position(document, position);
    if position.offset > 0 {
        let start = TextPosition::new(position.paragraph, position.offset - 1);
        return delete_range(document, start, position);
    }
    if position.paragraph == 0 {
        return None;
    }
    let previous = position.paragraph - 1;
    let previous_len = document.paragraphs[previous].len();
    join_with_next(document, previous)?;
    Some(TextPosition::new(previous, previous_len))
}

/// Deletes the character after `position`, or joins the next paragraph.
pub(crate) fn delete_forward(
    document: &mut Document,
    position: TextPosition,
) -> Option<TextPosition> {
    let position = clamp_position(document, position);
    let len = document.paragraphs[position.paragraph].len();
    if position.offset < len {
        let end = TextPosition::new(position.paragraph, position.offset + 1);
        return delete_range(document, position, end);
    }
    join_with_next(document, position.paragraph)?;
    Some(position)
}

fn join_with_next(document: &mut Document, idx: usize) -> Option<()> {
    if idx + 1 >= document.paragraphs.len() {
        return None;
    }
    let defaults = document.defaults().clone();
    let next = document.paragraphs.remove(idx + 1);
    let paragraph = paragraph_mut(document, idx)?;
    let keep_placeholder = paragraph.is_empty() && next.is_empty();
    if keep_placeholder {
        return Some(());
    }
    paragraph.runs.retain(|run| !run.text.is_empty());
    paragraph
        .runs
        .extend(next.runs.into_iter().filter(|run| !run.text.is_empty()));
    paragraph.normalize(defaults);
    Some(())
}
