//! A staged `AsciiDoc` parser.
//!
//! Source text flows through a fixed chain of stages: a line lexer, a
//! preprocessor resolving `include::` directives and conditionals, an
//! assembler building block elements, a substitution engine turning raw
//! text into inline trees, and an aggregator nesting sections into the
//! final [`Document`]. The stages run on the calling thread or, with
//! [`Execution::Threaded`], on worker threads joined by bounded channels.
//!
//! ```
//! use adocflow_parser::{Element, Options, parse_str};
//!
//! let document = parse_str("= Guide\n\nHello, *world*.", &Options::default())?;
//! let title = document.title_section().map(|section| section.id.as_str());
//! assert_eq!(title, Some("_guide"));
//! assert!(matches!(document.elements.first(), Some(Element::Section(_))));
//! # Ok::<(), adocflow_parser::Error>(())
//! ```
use std::{
    io::Read,
    path::{Path, PathBuf},
};

mod aggregator;
mod assembler;
mod error;
mod fragment;
mod grammar;
mod lexer;
mod model;
mod options;
mod pipeline;
mod preprocessor;
mod substitution;

#[cfg(test)]
mod proptests;

pub use error::{Error, SourceLocation};
pub use model::*;
pub use options::{
    Cancellation, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_INCLUDE_DEPTH, Execution, Options, OptionsBuilder,
};

/// Parse a document read from `reader`.
///
/// The bytes are decoded as UTF-8 unless they start with a UTF-16 byte
/// order mark.
///
/// # Errors
///
/// Returns the first fatal error of any stage. Use [`parse_partial`] to keep
/// the elements built before it.
#[tracing::instrument(skip_all, fields(filename = ?options.filename))]
pub fn parse<R: Read>(mut reader: R, options: &Options) -> Result<Document, Error> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(|error| {
        tracing::error!(error = ?error, "failed to read input");
        error
    })?;
    let name = options
        .filename
        .clone()
        .unwrap_or_else(|| PathBuf::from("<input>"));
    let input = preprocessor::decode(&bytes, None, &name)?;
    finish(pipeline::run(input, options))
}

/// Parse a document held in memory.
///
/// # Errors
///
/// Returns the first fatal error of any stage.
pub fn parse_str(input: &str, options: &Options) -> Result<Document, Error> {
    finish(pipeline::run(input.to_string(), options))
}

/// Parse the file at `path`. Includes resolve relative to its directory and
/// the `docfile` and `docdir` attributes point at it.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read, or the first fatal
/// error of any stage.
#[tracing::instrument(skip(options), fields(path = ?path.as_ref()))]
pub fn parse_file<P: AsRef<Path>>(path: P, options: &Options) -> Result<Document, Error> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|error| {
        tracing::error!(path = ?path, error = ?error, "failed to read file");
        error
    })?;
    let input = preprocessor::decode(&bytes, None, path)?;

    let mut options = options.clone();
    options.filename = Some(path.to_path_buf());
    let docdir = path.parent().map(Path::display).map(|dir| dir.to_string());
    for (name, value) in [
        ("docfile", Some(path.display().to_string())),
        ("docdir", docdir),
    ] {
        if let Some(value) = value
            && !options.document_attributes.contains_key(name)
        {
            options
                .document_attributes
                .insert(name.to_string(), AttributeValue::String(value));
        }
    }
    finish(pipeline::run(input, &options))
}

/// Parse `input`, keeping whatever was built before the first fatal error.
///
/// The document is always returned; the error, if any, says why it may be
/// incomplete.
#[must_use]
pub fn parse_partial(input: &str, options: &Options) -> (Document, Option<Error>) {
    pipeline::run(input.to_string(), options)
}

fn finish((document, error): (Document, Option<Error>)) -> Result<Document, Error> {
    match error {
        Some(error) => Err(error),
        None => Ok(document),
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use rustc_hash::FxHashSet;

    use super::*;

    fn all_sections(elements: &[Element], found: &mut Vec<Section>) {
        for element in elements {
            if let Element::Section(section) = element {
                found.push(section.clone());
            }
            all_sections(element.children(), found);
        }
    }

    fn paragraphs(elements: &[Element]) -> Vec<&Paragraph> {
        elements
            .iter()
            .filter_map(|element| {
                if let Element::Paragraph(paragraph) = element {
                    Some(paragraph)
                } else {
                    None
                }
            })
            .collect()
    }

    #[test]
    fn test_header_with_author_and_toc() -> Result<(), Error> {
        let document = parse_str("= T\nJohn Doe\n:toc:\n\npara", &Options::default())?;
        let attributes = &document.attributes;
        assert!(attributes.contains_key("toc"));
        let Some(AttributeValue::Authors(authors)) = attributes.get("authors") else {
            panic!("expected authors, found {:?}", attributes.get("authors"));
        };
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].full_name, "John Doe");
        for (name, expected) in [
            ("firstname", "John"),
            ("lastname", "Doe"),
            ("author", "John Doe"),
            ("authorinitials", "JD"),
        ] {
            assert_eq!(attributes.get_text(name).as_deref(), Some(expected), "{name}");
        }

        assert_eq!(document.elements.len(), 1);
        let Some(Element::Section(title)) = document.elements.first() else {
            panic!("expected the document title section");
        };
        assert_eq!((title.level, title.id.as_str()), (0, "_t"));
        assert_eq!(title.children.len(), 2);
        assert!(matches!(
            title.children[0],
            Element::TableOfContentsPlaceholder(TableOfContentsPlaceholder { from_macro: false })
        ));
        assert_eq!(paragraphs(&title.children)[0].content, vec![Inline::text("para")]);
        Ok(())
    }

    #[test]
    fn test_attribute_reference_in_paragraph() -> Result<(), Error> {
        let document = parse_str(":x: hi\n\n{x}", &Options::default())?;
        let found = paragraphs(&document.elements);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, vec![Inline::text("hi")]);
        assert_eq!(document.attributes.get_text("x").as_deref(), Some("hi"));
        Ok(())
    }

    #[test]
    fn test_fenced_block_escapes_special_characters() -> Result<(), Error> {
        let document = parse_str("```\n<a>\n```", &Options::default())?;
        assert_eq!(document.elements.len(), 1);
        let Some(Element::DelimitedBlock(block)) = document.elements.first() else {
            panic!("expected a delimited block");
        };
        assert_eq!(block.kind, DelimitedBlockKind::Fenced);
        let BlockContent::Verbatim { lines, .. } = &block.content else {
            panic!("expected verbatim content, found {:?}", block.content);
        };
        assert_eq!(
            lines,
            &vec![vec![Inline::special('<'), Inline::text("a"), Inline::special('>')]]
        );
        Ok(())
    }

    #[test]
    fn test_example_block_holds_a_paragraph() -> Result<(), Error> {
        let document = parse_str("====\nbody\n====", &Options::default())?;
        assert_eq!(document.elements.len(), 1);
        let Some(Element::DelimitedBlock(block)) = document.elements.first() else {
            panic!("expected a delimited block");
        };
        assert_eq!(block.kind, DelimitedBlockKind::Example);
        let BlockContent::Compound { children } = &block.content else {
            panic!("expected compound content, found {:?}", block.content);
        };
        assert_eq!(children.len(), 1);
        assert_eq!(paragraphs(children)[0].content, vec![Inline::text("body")]);
        Ok(())
    }

    #[test]
    fn test_ordered_list() -> Result<(), Error> {
        let document = parse_str(". one\n. two", &Options::default())?;
        assert_eq!(document.elements.len(), 1);
        let Some(Element::List(list)) = document.elements.first() else {
            panic!("expected a list");
        };
        assert_eq!(list.kind, ListKind::Ordered(NumberingStyle::Arabic));
        let texts: Vec<&[Inline]> = list.items.iter().map(|item| item.principal.as_slice()).collect();
        assert_eq!(
            texts,
            vec![[Inline::text("one")].as_slice(), [Inline::text("two")].as_slice()]
        );
        Ok(())
    }

    #[test]
    fn test_curly_single_quotes() -> Result<(), Error> {
        let document = parse_str("'`curly`'", &Options::default())?;
        let found = paragraphs(&document.elements);
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].content,
            vec![Inline::QuotedString(QuotedString {
                kind: QuotedStringKind::SingleQuote,
                elements: vec![Inline::text("curly")],
            })]
        );
        Ok(())
    }

    #[test]
    fn test_empty_input() -> Result<(), Error> {
        let document = parse_str("", &Options::default())?;
        assert!(document.elements.is_empty());
        assert!(document.footnotes.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_from_reader_with_utf16_bom() -> Result<(), Error> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "= Wide\n\ntext".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let document = parse(bytes.as_slice(), &Options::default())?;
        assert_eq!(document.title_section().map(|section| section.id.as_str()), Some("_wide"));
        Ok(())
    }

    #[test]
    fn test_parse_rejects_invalid_utf8() {
        let result = parse([0xC3_u8, 0x28].as_slice(), &Options::default());
        assert!(matches!(result, Err(Error::UnrecognizedEncodingInFile(_))));
    }

    #[test]
    fn test_parse_file_with_includes() -> Result<(), Error> {
        let path = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/include/main.adoc"));
        let document = parse_file(&path, &Options::default())?;

        let docdir = path.parent().map(|dir| dir.display().to_string());
        assert_eq!(document.attributes.get_text("docdir"), docdir);
        assert_eq!(document.attributes.get_text("author").as_deref(), Some("Jane Roe"));

        let mut sections = Vec::new();
        all_sections(&document.elements, &mut sections);
        let outline: Vec<(u8, &str)> = sections
            .iter()
            .map(|section| (section.level, section.id.as_str()))
            .collect();
        assert_eq!(
            outline,
            vec![
                (0, "_main_document"),
                (1, "_chapter_one"),
                (2, "_nested_section"),
                (3, "_grandchild_section"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_parse_file_missing() {
        let result = parse_file("does/not/exist.adoc", &Options::default());
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_parse_partial_keeps_earlier_elements() {
        let (document, error) = parse_partial("kept\n\ninclude::missing.adoc[]\n\nlost", &Options::default());
        assert!(matches!(error, Some(Error::UnresolvedInclude(..))));
        assert_eq!(paragraphs(&document.elements).len(), 1);
        assert_eq!(paragraphs(&document.elements)[0].content, vec![Inline::text("kept")]);
    }

    #[test]
    fn test_footnotes_are_collected() -> Result<(), Error> {
        let document = parse_str(
            "One.footnote:[First.] Two.footnote:second[Second.]\n\nAgain.footnote:second[]",
            &Options::default(),
        )?;
        let numbers: Vec<(u32, Option<&str>)> = document
            .footnotes
            .iter()
            .map(|footnote| (footnote.number, footnote.id.as_deref()))
            .collect();
        assert_eq!(numbers, vec![(1, None), (2, Some("second"))]);
        Ok(())
    }

    #[test]
    fn test_locked_attribute_wins() -> Result<(), Error> {
        let options = Options::builder()
            .with_attribute("product", "Locked")
            .with_soft_attribute("edition", "Soft")
            .build();
        let document = parse_str(":product: Mine\n:edition: Mine\n\n{product} {edition}", &options)?;
        assert_eq!(
            paragraphs(&document.elements)[0].content,
            vec![Inline::text("Locked Mine")]
        );
        Ok(())
    }

    #[test]
    fn test_document_serializes_to_json() -> Result<(), Box<dyn std::error::Error>> {
        let document = parse_str("= T\n\n*hi*", &Options::default())?;
        let value = serde_json::to_value(&document)?;
        assert_eq!(value["elements"][0]["name"], "section");
        assert_eq!(value["elements"][0]["id"], "_t");
        assert_eq!(value["elements"][0]["children"][0]["name"], "paragraph");
        Ok(())
    }

    #[rstest]
    fn test_fixture_documents(#[files("fixtures/documents/*.adoc")] path: PathBuf) -> Result<(), Error> {
        let sequential = parse_file(&path, &Options::default())?;
        let threaded = parse_file(&path, &Options::builder().with_threads(2).build())?;
        assert_eq!(threaded, sequential);

        let mut sections = Vec::new();
        all_sections(&sequential.elements, &mut sections);
        let mut ids = FxHashSet::default();
        for section in &sections {
            assert!(!section.id.is_empty());
            assert!(ids.insert(section.id.clone()), "duplicate id {}", section.id);
        }
        Ok(())
    }
}
