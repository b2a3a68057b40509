use super::*;
use crate::document::{Paragraph, Run};

use super::content::{insert_text_at, prune_and_merge_runs, remove_range, run_at_offset, split_runs};
use super::structure::{delete_backward, delete_forward, delete_range, insert_text, split_paragraph};

fn bold() -> Attributes {
    Attributes::default().with(&AttributeValue::Bold(true))
}

fn runs_of(document: &Document, paragraph: usize) -> Vec<(String, bool)> {
    document.paragraphs()[paragraph]
        .runs()
        .iter()
        .map(|run| (run.text().to_string(), run.attributes().bold))
        .collect()
}

fn styled_document() -> Document {
    let paragraph = Paragraph::from_runs(
        vec![
            Run::new("Hello ", Attributes::default()),
            Run::new("World", bold()),
            Run::new("!", Attributes::default()),
        ],
        Attributes::default(),
    );
    Document::new().with_paragraphs(vec![paragraph])
}

#[test]
fn char_to_byte_idx_handles_multibyte() {
    assert_eq!(char_to_byte_idx("héllo", 0), 0);
    assert_eq!(char_to_byte_idx("héllo", 2), 3);
    assert_eq!(char_to_byte_idx("héllo", 99), 6);
}

#[test]
fn prune_and_merge_drops_empty_runs_and_joins_equal_neighbours() {
    let mut runs = vec![
        Run::new("a", Attributes::default()),
        Run::new("", bold()),
        Run::new("b", Attributes::default()),
        Run::new("c", bold()),
        Run::new("d", bold()),
    ];
    prune_and_merge_runs(&mut runs);
    let texts: Vec<&str> = runs.iter().map(Run::text).collect();
    assert_eq!(texts, vec!["ab", "cd"]);
}

#[test]
fn run_at_offset_prefers_preceding_run() {
    let runs = vec![
        Run::new("abc", Attributes::default()),
        Run::new("de", bold()),
    ];
    assert_eq!(run_at_offset(&runs, 0), Some((0, 0)));
    assert_eq!(run_at_offset(&runs, 3), Some((0, 3)));
    assert_eq!(run_at_offset(&runs, 4), Some((1, 1)));
    assert_eq!(run_at_offset(&runs, 5), Some((1, 2)));
    assert_eq!(run_at_offset(&[], 0), None);
}

#[test]
fn split_runs_cuts_inside_a_run() {
    let mut runs = vec![
        Run::new("abc", Attributes::default()),
        Run::new("de", bold()),
    ];
    let tail = split_runs(&mut runs, 1);
    assert_eq!(runs.iter().map(Run::text).collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(tail.iter().map(Run::text).collect::<Vec<_>>(), vec!["bc", "de"]);
}

#[test]
fn insert_with_same_attributes_extends_run() {
    let mut runs = vec![Run::new("helo", Attributes::default())];
    insert_text_at(&mut runs, 3, "l", None);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].text(), "hello");
}

#[test]
fn insert_with_other_attributes_splits_run() {
    let mut runs = vec![Run::new("ac", Attributes::default())];
    insert_text_at(&mut runs, 1, "b", Some(&bold()));
    let summary: Vec<(&str, bool)> = runs
        .iter()
        .map(|run| (run.text(), run.attributes().bold))
        .collect();
    assert_eq!(summary, vec![("a", false), ("b", true), ("c", false)]);
}

#[test]
fn remove_range_across_runs_merges_survivors() {
    let mut runs = vec![
        Run::new("ab", Attributes::default()),
        Run::new("XY", bold()),
        Run::new("cd", Attributes::default()),
    ];
    assert!(remove_range(&mut runs, 1, 5));
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].text(), "ad");
}

#[test]
fn typing_at_end_of_bold_run_stays_bold() {
    let mut document = styled_document();
    let after = insert_text(&mut document, TextPosition::new(0, 11), " class", None).unwrap();

    assert_eq!(after, TextPosition::new(0, 17));
    assert_eq!(
        runs_of(&document, 0),
        vec![
            ("Hello ".to_string(), false),
            ("World class".to_string(), true),
            ("!".to_string(), false),
        ]
    );
}

#[test]
fn split_paragraph_moves_tail_into_new_paragraph() {
    let mut document = styled_document();
    let position = split_paragraph(&mut document, TextPosition::new(0, 8)).unwrap();

    assert_eq!(position, TextPosition::new(1, 0));
    assert_eq!(
        runs_of(&document, 0),
        vec![("Hello ".to_string(), false), ("Wo".to_string(), true)]
    );
    assert_eq!(
        runs_of(&document, 1),
        vec![("rld".to_string(), true), ("!".to_string(), false)]
    );
    assert!(document.is_canonical());
}

#[test]
fn split_paragraph_at_end_leaves_placeholder_with_boundary_attributes() {
    let mut document = Document::new();
    document.append_paragraph("note");
    apply_attribute(&mut document, Selection::new(0, 4), &AttributeValue::Italic(true)).unwrap();

    split_paragraph(&mut document, TextPosition::new(0, 4)).unwrap();

    assert_eq!(document.paragraphs().len(), 2);
    let placeholder = &document.paragraphs()[1].runs()[0];
    assert!(placeholder.is_empty());
    assert!(placeholder.attributes().italic);
    assert!(document.is_canonical());
}

#[test]
fn delete_range_joins_paragraphs() {
    let mut document = Document::new();
    document.append_paragraph("first line");
    document.append_paragraph("middle");
    document.append_paragraph("last line");

    let position =
        delete_range(&mut document, TextPosition::new(0, 5), TextPosition::new(2, 4)).unwrap();

    assert_eq!(position, TextPosition::new(0, 5));
    assert_eq!(document.to_plain_text(), "first line");
    assert_eq!(document.paragraphs().len(), 1);
    assert_eq!(document.paragraphs()[0].runs().len(), 1);
}

#[test]
fn deleting_everything_keeps_a_placeholder() {
    let mut document = styled_document();
    delete_range(&mut document, TextPosition::new(0, 0), TextPosition::new(0, 12)).unwrap();

    assert!(document.is_empty());
    assert_eq!(document.paragraphs()[0].runs().len(), 1);
    assert!(document.is_canonical());
}

#[test]
fn backspace_at_paragraph_start_joins_previous() {
    let mut document = Document::new();
    document.append_paragraph("ab");
    document.append_paragraph("cd");

    let position = delete_backward(&mut document, TextPosition::new(1, 0)).unwrap();
    assert_eq!(position, TextPosition::new(0, 2));
    assert_eq!(document.to_plain_text(), "abcd");
    assert_eq!(document.paragraphs()[0].runs().len(), 1);
}

#[test]
fn backspace_at_document_start_does_nothing() {
    let mut document = styled_document();
    assert!(delete_backward(&mut document, TextPosition::new(0, 0)).is_none());
}

#[test]
fn delete_forward_removes_next_character() {
    let mut document = styled_document();
    delete_forward(&mut document, TextPosition::new(0, 5)).unwrap();
    assert_eq!(document.to_plain_text(), "HelloWorld!");
}

#[test]
fn delete_forward_at_paragraph_end_joins_next() {
    let mut document = Document::new();
    document.append_paragraph("ab");
    document.append_paragraph("");
    document.append_paragraph("cd");

    delete_forward(&mut document, TextPosition::new(0, 2)).unwrap();
    assert_eq!(document.paragraphs().len(), 2);
    delete_forward(&mut document, TextPosition::new(0, 2)).unwrap();
    assert_eq!(document.to_plain_text(), "abcd");
    assert!(document.is_canonical());
}
