use proptest::prelude::*;
use rustc_hash::FxHashSet;

use super::generators::*;
use crate::{
    Document, Element, Options,
    fragment::FragmentKind,
    model::{AttributeValue, DocumentAttributes, inlines_to_source},
    parse_partial,
    preprocessor::Preprocessor,
    substitution::{resubstitute, substitute_with},
};

fn collect_section_ids(elements: &[Element], ids: &mut Vec<String>) {
    for element in elements {
        if let Element::Section(section) = element {
            ids.push(section.id.clone());
        }
        collect_section_ids(element.children(), ids);
    }
}

fn section_ids(document: &Document) -> Vec<String> {
    let mut ids = Vec::new();
    collect_section_ids(&document.elements, &mut ids);
    ids
}

/// The level a section written at `level` ends up at after `offsets`.
fn expected_level(level: isize, offsets: &[String]) -> isize {
    let total = offsets.iter().fold(0, |total, offset| {
        let value: isize = offset.parse().unwrap_or_default();
        if offset.starts_with(['+', '-']) {
            total + value
        } else {
            value
        }
    });
    (level + total).max(0)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn parser_never_panics(input in any_document_string()) {
        let _ = parse_partial(&input, &Options::default());
    }

    #[test]
    fn section_ids_are_unique_and_non_empty(lines in structured_document()) {
        let (document, _) = parse_partial(&lines.join("\n"), &Options::default());
        let ids = section_ids(&document);
        let mut seen = FxHashSet::default();
        for id in &ids {
            prop_assert!(!id.is_empty());
            prop_assert!(seen.insert(id.clone()), "duplicate section id {id} in {ids:?}");
        }
    }

    #[test]
    fn threaded_execution_builds_the_same_document(lines in structured_document()) {
        let input = lines.join("\n");
        let sequential = parse_partial(&input, &Options::default());
        let threaded = parse_partial(&input, &Options::builder().with_threads(1).build());
        prop_assert_eq!(threaded.0, sequential.0);
        prop_assert_eq!(threaded.1.is_some(), sequential.1.is_some());
    }

    #[test]
    fn every_line_becomes_one_fragment(lines in structured_document()) {
        let input = lines.join("\n");
        let fragments = Preprocessor::new(input.clone(), &Options::default()).count();
        prop_assert_eq!(fragments, input.lines().count());
    }

    #[test]
    fn inline_source_round_trips(text in inline_text()) {
        let inlines = substitute_with(&text, &DocumentAttributes::intrinsic())?;
        prop_assert_eq!(inlines_to_source(&inlines), text);
    }

    #[test]
    fn substitution_is_idempotent(text in inline_text()) {
        let attributes = DocumentAttributes::intrinsic();
        let first = substitute_with(&text, &attributes)?;
        let second = resubstitute(&first, &attributes)?;
        prop_assert_eq!(second, first);
    }

    #[test]
    fn defined_attributes_substitute_idempotently(value in attribute_value(), text in inline_text()) {
        let mut attributes = DocumentAttributes::intrinsic();
        attributes.declare("x", AttributeValue::String(value));
        let first = substitute_with(&format!("{text} {{x}} {text}"), &attributes)?;
        let second = resubstitute(&first, &attributes)?;
        prop_assert_eq!(second, first);
    }

    #[test]
    fn level_offsets_compose(offsets in prop::collection::vec(level_offset(), 0..6), level in 1..4usize) {
        let mut input: String = offsets.iter().map(|offset| format!(":leveloffset: {offset}\n")).collect();
        input.push_str(&"=".repeat(level + 1));
        input.push_str(" Heading\n");
        let levels: Vec<u8> = Preprocessor::new(input, &Options::default())
            .filter_map(|fragment| match fragment.payload {
                Ok(FragmentKind::SectionHeader { level, .. }) => Some(level),
                Ok(_) | Err(_) => None,
            })
            .collect();
        let level = isize::try_from(level).unwrap_or_default();
        prop_assert_eq!(levels.len(), 1);
        prop_assert_eq!(levels.first().map(|found| isize::from(*found)), Some(expected_level(level, &offsets)));
    }
}

