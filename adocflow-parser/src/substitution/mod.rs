//! Inline substitution: turns the raw text the assembler collected into
//! inline nodes, and keeps the document attribute map current as
//! declarations stream past in document order.
//!
//! Every pass rewrites a [`flatten::Flat`] text in place. Nodes a pass
//! produces are spliced into the text as placeholders, so later passes only
//! ever see the characters that are still plain text.
use rustc_hash::FxHashMap;

use crate::{
    Error, Options,
    assembler::Assembled,
    model::{
        AttributeValue, Attributes, BlockContent, DocumentAttributes, Element, Footnote, Inline, NORMAL, SUBS,
        SubstitutionKind, SubstitutionList, VERBATIM, inlines_to_plain_text,
    },
    pipeline::Stage,
};

mod attributes;
mod callouts;
mod flatten;
mod footnotes;
mod macros;
mod passthrough;
mod post_replacements;
mod quotes;
mod replacements;
mod specialchars;

use callouts::CalloutCounter;
use flatten::Flat;
use footnotes::FootnoteTracker;

pub(super) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// What the passes of one substitution can see and update.
struct Scope<'a> {
    attributes: &'a DocumentAttributes,
    macros: &'a FxHashMap<String, String>,
    footnotes: &'a mut FootnoteTracker,
    callouts: CalloutCounter,
    hardbreaks: bool,
    /// The special characters pass already ran, so text spliced in later
    /// must arrive escaped.
    special_characters: bool,
    /// Set by a pass that cannot continue; checked after every pass.
    error: Option<Error>,
}

impl<'a> Scope<'a> {
    fn new(
        attributes: &'a DocumentAttributes,
        macros: &'a FxHashMap<String, String>,
        footnotes: &'a mut FootnoteTracker,
    ) -> Self {
        Self {
            attributes,
            macros,
            footnotes,
            callouts: CalloutCounter::default(),
            hardbreaks: false,
            special_characters: false,
            error: None,
        }
    }

    fn fail(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

type Pass = fn(&mut Flat, &mut Scope<'_>);

fn pass_for(kind: SubstitutionKind) -> Pass {
    match kind {
        SubstitutionKind::InlinePassthrough => passthrough::apply,
        SubstitutionKind::SpecialCharacters => specialchars::apply,
        SubstitutionKind::Attributes => attributes::apply,
        SubstitutionKind::Quotes => quotes::apply,
        SubstitutionKind::Replacements => replacements::apply,
        SubstitutionKind::Macros => macros::apply,
        SubstitutionKind::PostReplacements => post_replacements::apply,
        SubstitutionKind::Callouts => callouts::apply,
    }
}

fn run_passes(mut flat: Flat, kinds: &[SubstitutionKind], scope: &mut Scope<'_>) -> Result<Vec<Inline>, Error> {
    // Nested runs (passthrough content) must not leak their state outward.
    let outer = std::mem::replace(&mut scope.special_characters, false);
    let mut result = Ok(());
    for kind in kinds {
        pass_for(*kind)(&mut flat, scope);
        if let Some(error) = scope.error.take() {
            result = Err(error);
            break;
        }
    }
    scope.special_characters = outer;
    result.map(|()| flat.to_inlines())
}

fn substitute_text(text: &str, kinds: &[SubstitutionKind], scope: &mut Scope<'_>) -> Result<Vec<Inline>, Error> {
    run_passes(Flat::new(text), kinds, scope)
}

/// Run `kinds` again over content that was already substituted. Only the
/// remaining plain text is touched.
#[cfg(test)]
fn substitute_inlines(
    inlines: &[Inline],
    kinds: &[SubstitutionKind],
    scope: &mut Scope<'_>,
) -> Result<Vec<Inline>, Error> {
    run_passes(Flat::from_inlines(inlines), kinds, scope)
}

/// What the engine hands to the aggregator.
#[derive(Debug)]
pub(crate) enum Event {
    Element(Element),
    /// The input is exhausted: the attribute map as it stands at the end of
    /// the document, and every footnote in order.
    End {
        attributes: DocumentAttributes,
        footnotes: Vec<Footnote>,
    },
}

#[derive(Debug)]
pub(crate) struct SubstitutionEngine {
    attributes: DocumentAttributes,
    macros: FxHashMap<String, String>,
    footnotes: FootnoteTracker,
}

impl SubstitutionEngine {
    pub(crate) fn new(options: &Options) -> Self {
        Self {
            attributes: options.initial_attributes(),
            macros: options.macros.clone(),
            footnotes: FootnoteTracker::default(),
        }
    }

    fn substitute(&mut self, text: &str, kinds: &[SubstitutionKind], hardbreaks: bool) -> Result<Vec<Inline>, Error> {
        let mut scope = Scope::new(&self.attributes, &self.macros, &mut self.footnotes);
        scope.hardbreaks = hardbreaks;
        substitute_text(text, kinds, &mut scope)
    }

    /// Substitute the lines of a verbatim block one at a time. Callout
    /// numbering carries over from line to line.
    fn substitute_lines(&mut self, raw: &[String], kinds: &[SubstitutionKind]) -> Result<Vec<Vec<Inline>>, Error> {
        let mut scope = Scope::new(&self.attributes, &self.macros, &mut self.footnotes);
        raw.iter()
            .map(|line| substitute_text(line, kinds, &mut scope))
            .collect()
    }

    fn title(&mut self, attributes: &Attributes) -> Result<Vec<Inline>, Error> {
        match attributes.title() {
            Some(title) => self.substitute(title, NORMAL, false),
            None => Ok(Vec::new()),
        }
    }

    /// The passes for an element: its `subs` attribute compiled against
    /// `defaults`, and written back in expanded form when it was given.
    fn passes(attributes: &mut Attributes, defaults: &[SubstitutionKind]) -> Result<SubstitutionList, Error> {
        let Some(spec) = attributes.get_str(SUBS).map(ToString::to_string) else {
            return Ok(SubstitutionList::new(defaults));
        };
        let list = SubstitutionList::compile(&spec, defaults)?;
        attributes.insert(SUBS, AttributeValue::String(list.to_attribute_text()));
        Ok(list)
    }

    fn hardbreaks(&self, attributes: &Attributes) -> bool {
        attributes.has_option("hardbreaks") || self.attributes.contains_key("hardbreaks-option")
    }

    #[tracing::instrument(level = "trace", skip_all, fields(line = ?element.line()))]
    fn element(&mut self, element: &mut Element) -> Result<(), Error> {
        match element {
            Element::Paragraph(paragraph) => {
                paragraph.title = self.title(&paragraph.attributes)?;
                let defaults = if paragraph.attributes.style() == Some("literal") {
                    VERBATIM
                } else {
                    NORMAL
                };
                let passes = Self::passes(&mut paragraph.attributes, defaults)?;
                let hardbreaks = self.hardbreaks(&paragraph.attributes);
                paragraph.content = self.substitute(&paragraph.lines.join("\n"), passes.as_slice(), hardbreaks)?;
            }
            Element::DelimitedBlock(block) => {
                block.title = self.title(&block.attributes)?;
                match &mut block.content {
                    BlockContent::Compound { children } => {
                        for child in children {
                            self.element(child)?;
                        }
                    }
                    BlockContent::Verbatim { raw, lines } => {
                        let passes = Self::passes(&mut block.attributes, VERBATIM)?;
                        *lines = self.substitute_lines(raw, passes.as_slice())?;
                    }
                    BlockContent::Raw { .. } => {}
                }
            }
            Element::Section(section) => {
                section.title = self.substitute(&section.title_raw, NORMAL, false)?;
                if section.level == 0 && !self.attributes.contains_key("doctitle") {
                    let doctitle = inlines_to_plain_text(&section.title);
                    self.attributes.insert("doctitle".to_string(), AttributeValue::String(doctitle));
                }
                for child in &mut section.children {
                    self.element(child)?;
                }
            }
            Element::DiscreteHeading(heading) => {
                heading.title = self.substitute(&heading.title_raw, NORMAL, false)?;
            }
            Element::List(list) | Element::LabeledList(list) => {
                list.title = self.title(&list.attributes)?;
                for item in &mut list.items {
                    if let Some(term) = &item.term_raw {
                        item.term = self.substitute(term, NORMAL, false)?;
                    }
                    item.principal = self.substitute(&item.principal_raw.join("\n"), NORMAL, false)?;
                    for child in &mut item.children {
                        self.element(child)?;
                    }
                }
            }
            Element::Table(table) => {
                table.title = self.title(&table.attributes)?;
                for row in table.all_rows_mut() {
                    for cell in &mut row.cells {
                        cell.content = self.substitute(&cell.raw, NORMAL, false)?;
                    }
                }
            }
            Element::ImageBlock(image) => {
                image.title = self.title(&image.attributes)?;
                image.target = self.attributes.resolve_lenient(&image.target);
            }
            Element::AttributeDeclaration(declaration) => {
                if let AttributeValue::String(text) = &declaration.value {
                    declaration.value = AttributeValue::String(self.attributes.resolve_lenient(text));
                }
                self.attributes
                    .declare(&declaration.attribute_name, declaration.value.clone());
            }
            Element::AttributeReset(reset) => {
                self.attributes.reset(&reset.attribute_name);
            }
            Element::Preamble(preamble) => {
                for child in &mut preamble.children {
                    self.element(child)?;
                }
            }
            Element::AttributeCluster(_)
            | Element::BlankLine(_)
            | Element::Comment(_)
            | Element::TableOfContentsPlaceholder(_)
            | Element::ThematicBreak(_)
            | Element::PageBreak(_) => {}
        }
        Ok(())
    }
}

impl Stage for SubstitutionEngine {
    type Input = Assembled;
    type Output = Result<Event, Error>;

    fn accept(&mut self, input: Assembled, output: &mut Vec<Self::Output>) {
        let event = input.and_then(|mut element| {
            self.element(&mut element)?;
            Ok(Event::Element(element))
        });
        output.push(event);
    }

    fn finish(&mut self, output: &mut Vec<Self::Output>) {
        output.push(Ok(Event::End {
            attributes: self.attributes.clone(),
            footnotes: self.footnotes.take(),
        }));
    }
}

/// Substitute `text` with the default passes against `attributes`.
#[cfg(test)]
pub(crate) fn substitute_with(text: &str, attributes: &DocumentAttributes) -> Result<Vec<Inline>, Error> {
    let macros = FxHashMap::default();
    let mut footnotes = FootnoteTracker::default();
    let mut scope = Scope::new(attributes, &macros, &mut footnotes);
    substitute_text(text, NORMAL, &mut scope)
}

/// Run the default passes again over already substituted content.
#[cfg(test)]
pub(crate) fn resubstitute(inlines: &[Inline], attributes: &DocumentAttributes) -> Result<Vec<Inline>, Error> {
    let macros = FxHashMap::default();
    let mut footnotes = FootnoteTracker::default();
    let mut scope = Scope::new(attributes, &macros, &mut footnotes);
    substitute_inlines(inlines, NORMAL, &mut scope)
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        assembler::Assembler,
        model::{Callout, LineBreak, QuotedText, QuotedTextKind},
        preprocessor::Preprocessor,
    };

    pub(crate) fn run(text: &str, kinds: &[SubstitutionKind]) -> Result<Vec<Inline>, Error> {
        run_with(text, kinds, &DocumentAttributes::intrinsic())
    }

    pub(crate) fn run_with(
        text: &str,
        kinds: &[SubstitutionKind],
        attributes: &DocumentAttributes,
    ) -> Result<Vec<Inline>, Error> {
        let macros = FxHashMap::default();
        let mut footnotes = FootnoteTracker::default();
        let mut scope = Scope::new(attributes, &macros, &mut footnotes);
        substitute_text(text, kinds, &mut scope)
    }

    /// Elements and the final attributes and footnotes for `input`.
    fn substitute_document(
        input: &str,
        options: &Options,
    ) -> Result<(Vec<Element>, DocumentAttributes, Vec<Footnote>), Error> {
        let mut assembler = Assembler::new();
        let mut assembled = Vec::new();
        for fragment in Preprocessor::new(input.to_string(), options) {
            assembler.accept(fragment, &mut assembled);
        }
        assembler.finish(&mut assembled);

        let mut engine = SubstitutionEngine::new(options);
        let mut events = Vec::new();
        for element in assembled {
            engine.accept(element, &mut events);
        }
        engine.finish(&mut events);

        let mut elements = Vec::new();
        for event in events {
            match event? {
                Event::Element(element) => elements.push(element),
                Event::End { attributes, footnotes } => return Ok((elements, attributes, footnotes)),
            }
        }
        panic!("no end event");
    }

    fn paragraphs(elements: &[Element]) -> Vec<&crate::model::Paragraph> {
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
    fn test_declarations_apply_in_document_order() -> Result<(), Error> {
        let input = ":a: one\n\n{a} {b}\n\n:b: two\n:a: three\n:c: {a}-{b}\n\n{a} {b} {c}";
        let (elements, attributes, _) = substitute_document(input, &Options::default())?;
        let texts: Vec<String> = paragraphs(&elements)
            .iter()
            .map(|paragraph| inlines_to_plain_text(&paragraph.content))
            .collect();
        assert_eq!(texts, vec!["one {b}", "three two three-two"]);
        assert_eq!(attributes.get_text("c").as_deref(), Some("three-two"));
        Ok(())
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_locked_attributes_ignore_declarations() -> Result<(), Error> {
        let options = Options::builder().with_attribute("a", "locked").build();
        let (elements, _, _) = substitute_document(":a: changed\n\n{a}", &options)?;
        let paragraph = paragraphs(&elements);
        assert_eq!(
            paragraph.first().map(|paragraph| paragraph.content.clone()),
            Some(vec![Inline::text("locked")])
        );
        assert!(logs_contain("attribute is locked by configuration"));
        Ok(())
    }

    #[test]
    fn test_subs_attribute_is_compiled_and_recorded() -> Result<(), Error> {
        let (elements, _, _) = substitute_document("[subs=-quotes]\n*not bold* here", &Options::default())?;
        let paragraph = paragraphs(&elements);
        let Some(paragraph) = paragraph.first() else {
            panic!("expected a paragraph");
        };
        assert_eq!(paragraph.content, vec![Inline::text("*not bold* here")]);
        assert_eq!(
            paragraph.attributes.get_str(SUBS),
            Some("inline_passthrough,specialcharacters,attributes,replacements,macros,post_replacements")
        );
        Ok(())
    }

    #[test]
    fn test_unknown_subs_fail() {
        let result = substitute_document("[subs=sparkles]\ntext", &Options::default());
        assert!(matches!(result, Err(Error::UnsupportedSubstitution(_))));
    }

    #[test]
    fn test_verbatim_lines_share_callout_numbers() -> Result<(), Error> {
        let (elements, _, _) = substitute_document("----\nputs a <.>\nputs b <.>\n----", &Options::default())?;
        let Some(Element::DelimitedBlock(block)) = elements.first() else {
            panic!("expected a block, found {elements:?}");
        };
        let BlockContent::Verbatim { lines, .. } = &block.content else {
            panic!("expected verbatim content");
        };
        assert_eq!(
            lines,
            &vec![
                vec![
                    Inline::text("puts a "),
                    Inline::Callout(Callout { number: 1, source: "<.>".into() })
                ],
                vec![
                    Inline::text("puts b "),
                    Inline::Callout(Callout { number: 2, source: "<.>".into() })
                ],
            ]
        );
        Ok(())
    }

    #[test]
    fn test_literal_paragraph_keeps_markup() -> Result<(), Error> {
        let (elements, _, _) = substitute_document("  *not bold* x", &Options::default())?;
        let paragraph = paragraphs(&elements);
        assert_eq!(
            paragraph.first().map(|paragraph| paragraph.content.clone()),
            Some(vec![Inline::text("*not bold* x")])
        );
        Ok(())
    }

    #[test]
    fn test_titles_and_doctitle() -> Result<(), Error> {
        let (elements, attributes, _) = substitute_document("= The *Doc*\n\n.A title\nSome text", &Options::default())?;
        let Some(Element::Section(section)) = elements.first() else {
            panic!("expected the document title, found {elements:?}");
        };
        assert!(matches!(section.title.get(1), Some(Inline::QuotedText(_))));
        assert_eq!(attributes.get_text("doctitle").as_deref(), Some("The Doc"));
        let paragraph = paragraphs(&elements);
        assert_eq!(
            paragraph.first().map(|paragraph| paragraph.title.clone()),
            Some(vec![Inline::text("A title")])
        );
        Ok(())
    }

    #[test]
    fn test_footnotes_are_collected_at_the_end() -> Result<(), Error> {
        let (_, _, footnotes) =
            substitute_document("A.footnote:[one]\n\nB.footnote:[two]", &Options::default())?;
        let numbers: Vec<u32> = footnotes.iter().map(|footnote| footnote.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(footnotes.get(1).map(|footnote| footnote.content.clone()), Some(vec![Inline::text("two")]));
        Ok(())
    }

    #[test]
    fn test_list_items_and_table_cells() -> Result<(), Error> {
        let (elements, _, _) = substitute_document("* *a*\n* b\n\n|===\n|x |_y_\n|===", &Options::default())?;
        let Some(Element::List(list)) = elements.first() else {
            panic!("expected a list, found {elements:?}");
        };
        assert!(matches!(
            list.items.first().and_then(|item| item.principal.first()),
            Some(Inline::QuotedText(QuotedText { kind: QuotedTextKind::Bold, .. }))
        ));
        let Some(Element::Table(table)) = elements.iter().find(|element| matches!(element, Element::Table(_))) else {
            panic!("expected a table, found {elements:?}");
        };
        let cells: Vec<&Vec<Inline>> = table
            .rows
            .iter()
            .chain(table.header.iter())
            .flat_map(|row| row.cells.iter().map(|cell| &cell.content))
            .collect();
        assert!(cells.iter().any(|content| matches!(
            content.first(),
            Some(Inline::QuotedText(QuotedText { kind: QuotedTextKind::Italic, .. }))
        )));
        Ok(())
    }

    #[test]
    fn test_hardbreaks_option() -> Result<(), Error> {
        let (elements, _, _) = substitute_document("[%hardbreaks]\none\ntwo", &Options::default())?;
        let paragraph = paragraphs(&elements);
        let Some(paragraph) = paragraph.first() else {
            panic!("expected a paragraph");
        };
        assert_eq!(
            paragraph.content,
            vec![
                Inline::text("one"),
                Inline::LineBreak(LineBreak { source: String::new() }),
                Inline::text("\ntwo"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_resubstitution_changes_nothing() -> Result<(), Error> {
        let attributes = DocumentAttributes::intrinsic();
        let first = substitute_with("*a* <b> it's {nope} https://x.org[x]", &attributes)?;
        assert_eq!(resubstitute(&first, &attributes)?, first);
        Ok(())
    }
}
