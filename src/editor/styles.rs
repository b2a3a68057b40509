use tracing::{debug, warn};

use crate::document::{AttributeKind, AttributeQuery, AttributeValue, Document, Selection};
use crate::error::{EditorError, Result};

use super::cursor::{caret_run, covered_runs, resolve, run_ref};

/// Reports the value an attribute has across a selection.
///
/// A caret reads the run it sits in. A range reads every run it covers and
/// reports [`AttributeQuery::Mixed`] when they disagree. Nothing is split.
pub fn query_attribute(
    document: &Document,
    selection: Selection,
    kind: AttributeKind,
) -> AttributeQuery {
    if selection.is_caret() {
        return caret_run(document, selection.start)
            .and_then(|run| run_ref(document, run))
            .map_or(AttributeQuery::Unset, |run| {
                AttributeQuery::Value(run.attributes.get(kind))
            });
    }

    let mut common: Option<AttributeValue> = None;
    for covered in covered_runs(document, selection.start, selection.end) {
        let Some(run) = run_ref(document, covered) else {
            continue;
        };
        let value = run.attributes.get(kind);
        match &common {
            None => common = Some(value),
            Some(existing) if *existing != value => return AttributeQuery::Mixed,
            Some(_) => {}
        }
    }
    common.map_or(AttributeQuery::Unset, AttributeQuery::Value)
}

/// Rejects values an attribute cannot hold.
pub fn validate_attribute(value: &AttributeValue) -> Result<()> {
    match value {
        AttributeValue::FontSize(size) if !size.is_finite() || *size <= 0.0 => {
            Err(EditorError::InvalidAttributeValue {
                attribute: AttributeKind::FontSize,
                value: size.to_string(),
            })
        }
        AttributeValue::FontFamily(family) if family.trim().is_empty() => {
            Err(EditorError::InvalidAttributeValue {
                attribute: AttributeKind::FontFamily,
                value: family.clone(),
            })
        }
        _ => Ok(()),
    }
}

/// Writes an attribute onto every run of a selection, splitting runs at the
/// selection bounds and merging equal neighbours afterwards.
///
/// A caret only rewrites the placeholder run of an empty document; typed
/// text formatting at a caret is the editor session's concern. Invalid
/// values fail the call and leave the document untouched. Returns whether
/// any attribute changed.
pub fn apply_attribute(
    document: &mut Document,
    selection: Selection,
    value: &AttributeValue,
) -> Result<bool> {
    if let Err(err) = validate_attribute(value) {
        warn!(attribute = %value.kind(), %value, "rejected attribute value");
        return Err(err);
    }

    if selection.is_caret() {
        if !document.is_empty() {
            return Ok(false);
        }
        let placeholder = &mut document.paragraphs[0].runs[0];
        let before = placeholder.attributes.clone();
        placeholder.attributes.set(value);
        return Ok(placeholder.attributes != before);
    }

    let refs = resolve(document, selection.start, selection.end);
    let mut changed = false;
    let mut touched: Vec<usize> = Vec::new();
    for run in &refs {
        let Some(paragraph) = document.paragraphs.get_mut(run.paragraph) else {
            continue;
        };
        let Some(target) = paragraph.runs.get_mut(run.run) else {
            continue;
        };
        if target.attributes.get(value.kind()) != *value {
            target.attributes.set(value);
            changed = true;
        }
        if !touched.contains(&run.paragraph) {
            touched.push(run.paragraph);
        }
    }

    let defaults = document.defaults().clone();
    for idx in touched {
        document.paragraphs[idx].normalize(defaults.clone());
    }

    debug!(
        attribute = %value.kind(),
        %value,
        start = selection.start,
        end = selection.end,
        runs = refs.len(),
        changed,
        "applied attribute"
    );
    Ok(changed)
}

pub(crate) fn attribute_label(value: &AttributeValue) -> String {
    match value {
        AttributeValue::FontFamily(family) => format!("Font: {family}"),
        AttributeValue::FontSize(size) => format!("Size: {size}"),
        AttributeValue::Bold(on) => format!("Bold {}", if *on { "on" } else { "off" }),
        AttributeValue::Italic(on) => format!("Italic {}", if *on { "on" } else { "off" }),
        AttributeValue::Underline(on) => {
            format!("Underline {}", if *on { "on" } else { "off" })
        }
    }
}
