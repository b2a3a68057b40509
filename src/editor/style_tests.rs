use super::*;
use crate::document::{Paragraph, Run};

fn bold() -> Attributes {
    Attributes::default().with(&AttributeValue::Bold(true))
}

fn single_paragraph(text: &str) -> Document {
    let mut document = Document::new();
    document.append_paragraph(text);
    document
}

fn run_summary(document: &Document, paragraph: usize) -> Vec<(String, bool)> {
    document.paragraphs()[paragraph]
        .runs()
        .iter()
        .map(|run| (run.text().to_string(), run.attributes().bold))
        .collect()
}

/// Attributes per character, in document order.
fn attribute_map(document: &Document) -> Vec<(char, Attributes)> {
    document
        .paragraphs()
        .iter()
        .flat_map(|paragraph| paragraph.runs())
        .flat_map(|run| run.text().chars().map(|ch| (ch, run.attributes().clone())))
        .collect()
}

#[test]
fn apply_bold_splits_run_at_selection_end() {
    let mut document = single_paragraph("Hello World");

    assert!(apply_attribute(&mut document, Selection::new(0, 5), &AttributeValue::Bold(true)).unwrap());

    assert_eq!(
        run_summary(&document, 0),
        vec![("Hello".to_string(), true), (" World".to_string(), false)]
    );
}

#[test]
fn apply_bold_does_not_merge_across_plain_gap() {
    let mut document = single_paragraph("Hello World");
    apply_attribute(&mut document, Selection::new(0, 5), &AttributeValue::Bold(true)).unwrap();
    apply_attribute(&mut document, Selection::new(6, 11), &AttributeValue::Bold(true)).unwrap();

    assert_eq!(
        run_summary(&document, 0),
        vec![
            ("Hello".to_string(), true),
            (" ".to_string(), false),
            ("World".to_string(), true),
        ]
    );
    assert!(document.is_canonical());
}

#[test]
fn closing_the_gap_merges_into_one_run() {
    let mut document = single_paragraph("Hello World");
    apply_attribute(&mut document, Selection::new(0, 5), &AttributeValue::Bold(true)).unwrap();
    apply_attribute(&mut document, Selection::new(6, 11), &AttributeValue::Bold(true)).unwrap();
    apply_attribute(&mut document, Selection::new(5, 6), &AttributeValue::Bold(true)).unwrap();

    assert_eq!(run_summary(&document, 0), vec![("Hello World".to_string(), true)]);
}

#[test]
fn query_reports_mixed_across_differing_runs() {
    let paragraph = Paragraph::from_runs(
        vec![Run::new("AB", bold()), Run::new("CD", Attributes::default())],
        Attributes::default(),
    );
    let document = Document::new().with_paragraphs(vec![paragraph]);

    assert_eq!(
        query_attribute(&document, Selection::new(0, 4), AttributeKind::Bold),
        AttributeQuery::Mixed
    );
    assert_eq!(
        query_attribute(&document, Selection::new(0, 2), AttributeKind::Bold),
        AttributeQuery::Value(AttributeValue::Bold(true))
    );
    // Both runs share the font family, so that attribute is uniform.
    assert_eq!(
        query_attribute(&document, Selection::new(0, 4), AttributeKind::FontFamily),
        AttributeQuery::Value(AttributeValue::FontFamily("Segoe UI".to_string()))
    );
}

#[test]
fn query_does_not_split_runs() {
    let document = single_paragraph("Hello World");
    let before = document.clone();
    let _ = query_attribute(&document, Selection::new(2, 7), AttributeKind::Italic);
    assert_eq!(document, before);
}

#[test]
fn caret_query_reads_preceding_run() {
    let paragraph = Paragraph::from_runs(
        vec![Run::new("AB", bold()), Run::new("CD", Attributes::default())],
        Attributes::default(),
    );
    let document = Document::new().with_paragraphs(vec![paragraph]);

    let at = |offset| query_attribute(&document, Selection::caret(offset), AttributeKind::Bold);
    assert!(at(0).is_on());
    assert!(at(1).is_on());
    assert!(at(2).is_on());
    assert!(!at(3).is_on());
    assert!(!at(4).is_on());
}

#[test]
fn caret_query_on_empty_document_is_unset() {
    let document = Document::new();
    assert_eq!(
        query_attribute(&document, Selection::caret(0), AttributeKind::FontSize),
        AttributeQuery::Unset
    );
}

#[test]
fn applying_same_toggle_twice_is_idempotent() {
    let mut once = single_paragraph("The quick brown fox");
    apply_attribute(&mut once, Selection::new(4, 9), &AttributeValue::Italic(true)).unwrap();

    let mut twice = once.clone();
    let changed =
        apply_attribute(&mut twice, Selection::new(4, 9), &AttributeValue::Italic(true)).unwrap();

    assert!(!changed);
    assert_eq!(once, twice);
}

#[test]
fn toggle_on_over_mixed_selection_sets_every_run() {
    let paragraph = Paragraph::from_runs(
        vec![Run::new("AB", bold()), Run::new("CD", Attributes::default())],
        Attributes::default(),
    );
    let mut document = Document::new().with_paragraphs(vec![paragraph]);

    apply_attribute(&mut document, Selection::new(0, 4), &AttributeValue::Bold(true)).unwrap();

    assert_eq!(run_summary(&document, 0), vec![("ABCD".to_string(), true)]);
}

#[test]
fn applying_original_value_back_restores_attributes_per_character() {
    let paragraph = Paragraph::from_runs(
        vec![
            Run::new("alpha ", Attributes::default()),
            Run::new("beta", bold()),
            Run::new(" gamma", Attributes::default()),
        ],
        Attributes::default(),
    );
    let mut document = Document::new().with_paragraphs(vec![paragraph]);
    let original = attribute_map(&document);

    let selection = Selection::new(2, 13);
    apply_attribute(&mut document, selection, &AttributeValue::Underline(true)).unwrap();
    assert_ne!(attribute_map(&document), original);
    apply_attribute(&mut document, selection, &AttributeValue::Underline(false)).unwrap();

    assert_eq!(attribute_map(&document), original);
    assert!(document.is_canonical());
}

#[test]
fn apply_across_paragraphs_touches_both() {
    let mut document = Document::new();
    document.append_paragraph("first");
    document.append_paragraph("second");

    apply_attribute(
        &mut document,
        Selection::new(3, 8),
        &AttributeValue::FontFamily("Courier".to_string()),
    )
    .unwrap();

    let families = |p: usize| -> Vec<(String, String)> {
        document.paragraphs()[p]
            .runs()
            .iter()
            .map(|run| (run.text().to_string(), run.attributes().font_family.clone()))
            .collect()
    };
    assert_eq!(
        families(0),
        vec![
            ("fir".to_string(), "Segoe UI".to_string()),
            ("st".to_string(), "Courier".to_string()),
        ]
    );
    assert_eq!(
        families(1),
        vec![
            ("sec".to_string(), "Courier".to_string()),
            ("ond".to_string(), "Segoe UI".to_string()),
        ]
    );
}

#[test]
fn non_positive_font_size_is_rejected_without_mutation() {
    let mut document = single_paragraph("sized text");
    let before = document.clone();

    for size in [0.0, -4.0, f64::NAN, f64::INFINITY] {
        let result = apply_attribute(&mut document, Selection::new(0, 5), &AttributeValue::FontSize(size));
        assert!(matches!(
            result,
            Err(crate::error::EditorError::InvalidAttributeValue {
                attribute: AttributeKind::FontSize,
                ..
            })
        ));
    }
    assert_eq!(document, before);
}

#[test]
fn blank_font_family_is_rejected() {
    let mut document = single_paragraph("text");
    let result = apply_attribute(
        &mut document,
        Selection::new(0, 4),
        &AttributeValue::FontFamily("  ".to_string()),
    );
    assert!(result.is_err());
}

#[test]
fn caret_apply_only_rewrites_empty_document_placeholder() {
    let mut empty = Document::new();
    assert!(apply_attribute(&mut empty, Selection::caret(0), &AttributeValue::FontSize(20.0)).unwrap());
    assert_eq!(empty.paragraphs()[0].runs()[0].attributes().font_size, 20.0);

    let mut document = single_paragraph("text");
    let before = document.clone();
    assert!(!apply_attribute(&mut document, Selection::caret(2), &AttributeValue::Bold(true)).unwrap());
    assert_eq!(document, before);
}

#[test]
fn attribute_labels_describe_value() {
    assert_eq!(attribute_label(&AttributeValue::Bold(true)), "Bold on");
    assert_eq!(attribute_label(&AttributeValue::FontSize(14.0)), "Size: 14");
}
