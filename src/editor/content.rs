use crate::document::{Attributes, Run};

pub fn char_to_byte_idx(text: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    for (count, (byte_idx, _)) in text.char_indices().enumerate() {
        if count == char_idx {
            return byte_idx;
        }
    }
    text.len()
}

pub(crate) fn split_text(text: &str, offset: usize) -> (String, String) {
    let byte_idx = char_to_byte_idx(text, offset);
    let left = text[..byte_idx].to_string();
    let right = text[byte_idx..].to_string();
    (left, right)
}

/// Removes empty runs and merges neighbours whose attribute sets are equal.
pub(crate) fn prune_and_merge_runs(runs: &mut Vec<Run>) {
    runs.retain(|run| !run.text.is_empty());

    let mut i = 0;
    while i + 1 < runs.len() {
        if runs[i].attributes == runs[i + 1].attributes {
            let right = runs.remove(i + 1);
            runs[i].text.push_str(&right.text);
        } else {
            i += 1;
        }
    }
}

/// Finds the run an in-paragraph offset belongs to, preferring the run that
/// ends at the offset over the one that starts there. Returns the run index
/// and the offset within that run.
pub(crate) fn run_at_offset(runs: &[Run], offset: usize) -> Option<(usize, usize)> {
    if runs.is_empty() {
        return None;
    }
    let mut start = 0;
    for (idx, run) in runs.iter().enumerate() {
        let len = run.len();
        if offset <= start + len && (offset > start || idx == 0) {
            return Some((idx, offset - start));
        }
        start += len;
    }
    let last = runs.len() - 1;
    Some((last, runs[last].len()))
}

/// Splits the run containing `offset` strictly inside its span into two runs
/// with identical attributes. Offsets at run boundaries are left alone.
/// Returns true when a split happened.
pub(crate) fn split_run_at(runs: &mut Vec<Run>, offset: usize) -> bool {
    let mut start = 0;
    for idx in 0..runs.len() {
        let len = runs[idx].len();
        if offset > start && offset < start + len {
            let (left, right) = split_text(&runs[idx].text, offset - start);
            let attributes = runs[idx].attributes.clone();
            runs[idx].text = left;
            runs.insert(idx + 1, Run::new(right, attributes));
            return true;
        }
        start += len;
        if start >= offset {
            break;
        }
    }
    false
}

/// Cuts the run list at `offset`, returning everything after it.
pub(crate) fn split_runs(runs: &mut Vec<Run>, offset: usize) -> Vec<Run> {
    split_run_at(runs, offset);
    let mut start = 0;
    let mut cut = runs.len();
    for (idx, run) in runs.iter().enumerate() {
        if start >= offset {
            cut = idx;
            break;
        }
        start += run.len();
    }
    runs.split_off(cut)
}

/// Inserts text at an in-paragraph offset. The new text takes `attributes`
/// when given, otherwise the attributes of the run it lands in.
pub(crate) fn insert_text_at(
    runs: &mut Vec<Run>,
    offset: usize,
    text: &str,
    attributes: Option<&Attributes>,
) {
    if text.is_empty() {
        return;
    }
    let Some((idx, inner)) = run_at_offset(runs, offset) else {
        let attributes = attributes.cloned().unwrap_or_default();
        runs.push(Run::new(text, attributes));
        return;
    };

    let inherits = attributes.is_none_or(|attrs| *attrs == runs[idx].attributes);
    if inherits {
        let run = &mut runs[idx];
        let byte_idx = char_to_byte_idx(&run.text, inner);
        run.text.insert_str(byte_idx, text);
    } else if let Some(attributes) = attributes {
        let run_len = runs[idx].len();
        let new_run = Run::new(text, attributes.clone());
        if inner == 0 {
            runs.insert(idx, new_run);
        } else if inner >= run_len {
            runs.insert(idx + 1, new_run);
        } else {
            let (left, right) = split_text(&runs[idx].text, inner);
            let tail = Run::new(right, runs[idx].attributes.clone());
            runs[idx].text = left;
            runs.insert(idx + 1, new_run);
            runs.insert(idx + 2, tail);
        }
    }
    prune_and_merge_runs(runs);
}

/// Removes the characters in `[start, end)` of a paragraph's runs.
pub(crate) fn remove_range(runs: &mut Vec<Run>, start: usize, end: usize) -> bool {
    if start >= end {
        return false;
    }
    let mut changed = false;
    let mut run_start = 0;
    for run in runs.iter_mut() {
        let len = run.len();
        let run_end = run_start + len;
        let cut_start = start.max(run_start);
        let cut_end = end.min(run_end);
        if cut_start < cut_end {
            let from = char_to_byte_idx(&run.text, cut_start - run_start);
            let to = char_to_byte_idx(&run.text, cut_end - run_start);
            run.text.drain(from..to);
            changed = true;
        }
        run_start = run_end;
    }
    if changed {
        prune_and_merge_runs(runs);
    }
    changed
}

/// Attributes in effect at an in-paragraph offset, as seen by text typed there.
pub(crate) fn attributes_at(runs: &[Run], offset: usize) -> Option<&Attributes> {
    run_at_offset(runs, offset).map(|(idx, _)| &runs[idx].attributes)
}
