//! Builds the document tree out of the flat element stream: nests sections
//! by level, assigns section ids, wraps the preamble and places the table of
//! contents.
use rustc_hash::FxHashSet;

use crate::{
    Options,
    model::{
        AttributeValue, Document, DocumentAttributes, Element, ElementReferences, Footnote, Preamble, Section,
        TableOfContentsPlaceholder, inlines_to_plain_text,
    },
    substitution::Event,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Header {
    /// Only attribute entries and comments so far.
    Pending,
    /// Right after the document title: attribute entries belong to the header.
    Open,
    Closed,
}

#[derive(Debug)]
pub(crate) struct Aggregator {
    /// The attribute map as the header leaves it; only read for ids and the
    /// table of contents.
    attributes: DocumentAttributes,
    elements: Vec<Element>,
    open: Vec<Section>,
    ids: FxHashSet<String>,
    references: ElementReferences,
    header: Header,
    toc: Option<String>,
    toc_macro_placed: bool,
    end: Option<(DocumentAttributes, Vec<Footnote>)>,
}

/// Lowercased ASCII words of `title` joined by `separator`.
fn slug(title: &str, separator: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

impl Aggregator {
    pub(crate) fn new(options: &Options) -> Self {
        Self {
            attributes: options.initial_attributes(),
            elements: Vec::new(),
            open: Vec::new(),
            ids: FxHashSet::default(),
            references: ElementReferences::new(),
            header: Header::Pending,
            toc: None,
            toc_macro_placed: false,
            end: None,
        }
    }

    pub(crate) fn accept(&mut self, event: Event) {
        match event {
            Event::Element(element) => self.push(element),
            Event::End { attributes, footnotes } => self.end = Some((attributes, footnotes)),
        }
    }

    fn push(&mut self, element: Element) {
        match element {
            Element::AttributeDeclaration(declaration) => {
                self.track(&declaration.attribute_name, Some(&declaration.value));
                if self.header == Header::Open {
                    tracing::trace!(attribute = %declaration.attribute_name, "attribute entry belongs to the header");
                    return;
                }
                self.append(Element::AttributeDeclaration(declaration));
            }
            Element::AttributeReset(reset) => {
                self.track(&reset.attribute_name, None);
                if self.header == Header::Open {
                    return;
                }
                self.append(Element::AttributeReset(reset));
            }
            Element::Comment(comment) => self.append(Element::Comment(comment)),
            Element::Section(section) => self.section(section),
            Element::TableOfContentsPlaceholder(placeholder) => {
                self.close_header();
                if self.toc.as_deref() == Some("macro") && !self.toc_macro_placed {
                    self.toc_macro_placed = true;
                    self.append(Element::TableOfContentsPlaceholder(placeholder));
                } else {
                    tracing::debug!("ignoring toc::[] macro, toc is not set to macro or was already placed");
                }
            }
            other @ (Element::Paragraph(_)
            | Element::DelimitedBlock(_)
            | Element::DiscreteHeading(_)
            | Element::List(_)
            | Element::LabeledList(_)
            | Element::Table(_)
            | Element::ImageBlock(_)
            | Element::AttributeCluster(_)
            | Element::BlankLine(_)
            | Element::Preamble(_)
            | Element::ThematicBreak(_)
            | Element::PageBreak(_)) => {
                self.close_header();
                self.register_block_ids(&other);
                self.append(other);
            }
        }
    }

    /// Follow attribute entries that affect ids and the table of contents.
    fn track(&mut self, name: &str, value: Option<&AttributeValue>) {
        if self.attributes.is_locked(name) {
            return;
        }
        match value {
            Some(value) => self.attributes.insert(name.to_string(), value.clone()),
            None => {
                self.attributes.reset(name);
            }
        }
    }

    fn close_header(&mut self) {
        if self.header != Header::Closed {
            self.toc = self.attributes.get_text("toc");
            self.header = Header::Closed;
        }
    }

    fn append(&mut self, element: Element) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(element),
            None => self.elements.push(element),
        }
    }

    fn close_section(&mut self) {
        if let Some(section) = self.open.pop() {
            self.append(Element::Section(section));
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(level = section.level, line = section.line))]
    fn section(&mut self, mut section: Section) {
        let document_title = self.header == Header::Pending && section.level == 0;
        if !document_title {
            self.close_header();
        }

        section.id = self.section_id(&section);
        self.references.insert(section.id.clone(), section.title.clone());

        while self.open.last().is_some_and(|open| open.level >= section.level) {
            self.close_section();
        }
        if let Some(parent) = self.open.last()
            && section.level > parent.level + 1
        {
            tracing::debug!(
                parent = parent.level,
                level = section.level,
                "section skips a level, nesting it under the closest open section"
            );
        }
        self.open.push(section);
        if document_title {
            self.header = Header::Open;
        }
    }

    fn section_id(&mut self, section: &Section) -> String {
        if section.id.is_empty() {
            let prefix = self.attributes.get_text("idprefix").unwrap_or_default();
            let separator = self.attributes.get_text("idseparator").unwrap_or_default();
            let mut base = format!("{prefix}{}", slug(&inlines_to_plain_text(&section.title), &separator));
            if base.is_empty() {
                base = "section".to_string();
            }
            return self.unique(&base);
        }
        let id = self.unique(&section.id);
        if id != section.id {
            tracing::warn!(id = %section.id, renamed = %id, "duplicate section id");
        }
        id
    }

    fn unique(&mut self, base: &str) -> String {
        let mut id = base.to_string();
        let mut suffix = 2;
        while self.ids.contains(&id) {
            id = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.ids.insert(id.clone());
        id
    }

    /// Blocks with an explicit id can be the target of a cross reference.
    fn register_block_ids(&mut self, element: &Element) {
        if let Some(id) = element.attributes().and_then(|attributes| attributes.id()) {
            if self.ids.insert(id.to_string()) {
                self.references.insert(id.to_string(), element.title().to_vec());
            } else {
                tracing::warn!(%id, line = ?element.line(), "duplicate block id, keeping the first");
            }
        }
        let nested = match element {
            Element::List(list) | Element::LabeledList(list) => {
                list.items.iter().flat_map(|item| item.children.iter()).collect()
            }
            Element::Paragraph(_)
            | Element::DelimitedBlock(_)
            | Element::Section(_)
            | Element::DiscreteHeading(_)
            | Element::Table(_)
            | Element::ImageBlock(_)
            | Element::AttributeDeclaration(_)
            | Element::AttributeReset(_)
            | Element::AttributeCluster(_)
            | Element::BlankLine(_)
            | Element::Comment(_)
            | Element::TableOfContentsPlaceholder(_)
            | Element::Preamble(_)
            | Element::ThematicBreak(_)
            | Element::PageBreak(_) => element.children().iter().collect::<Vec<_>>(),
        };
        for child in nested {
            self.register_block_ids(child);
        }
    }

    /// Close everything still open and build the document.
    pub(crate) fn finish(mut self) -> Document {
        self.close_header();
        while !self.open.is_empty() {
            self.close_section();
        }
        let (attributes, footnotes) = self
            .end
            .take()
            .unwrap_or_else(|| (self.attributes.clone(), Vec::new()));

        let mut elements = std::mem::take(&mut self.elements);
        if let Some(Element::Section(title)) = elements.first_mut()
            && title.level == 0
        {
            wrap_preamble(&mut title.children);
        }
        self.place_toc(&mut elements);

        Document {
            attributes,
            element_references: self.references,
            elements,
            footnotes,
        }
    }

    fn place_toc(&self, elements: &mut Vec<Element>) {
        let Some(toc) = self.toc.as_deref() else {
            return;
        };
        if toc == "macro" {
            if !self.toc_macro_placed {
                tracing::warn!("toc is set to macro but the document has no toc::[] macro");
            }
            return;
        }
        if let Some(Element::Section(title)) = elements.first_mut()
            && title.level == 0
        {
            insert_toc(&mut title.children);
        } else {
            insert_toc(elements);
        }
    }
}

/// After the preamble, or else before the first section.
fn insert_toc(body: &mut Vec<Element>) {
    let at = if matches!(body.first(), Some(Element::Preamble(_))) {
        1
    } else {
        body.iter()
            .position(|element| matches!(element, Element::Section(_)))
            .unwrap_or(0)
    };
    body.insert(
        at,
        Element::TableOfContentsPlaceholder(TableOfContentsPlaceholder { from_macro: false }),
    );
}

/// Content between the document title and the first section, when there is one.
fn wrap_preamble(children: &mut Vec<Element>) {
    let Some(first_section) = children
        .iter()
        .position(|element| matches!(element, Element::Section(_)))
    else {
        return;
    };
    if first_section == 0 {
        return;
    }
    let content: Vec<Element> = children.drain(..first_section).collect();
    children.insert(0, Element::Preamble(Preamble { children: content }));
}
