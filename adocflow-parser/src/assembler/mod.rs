//! Groups fragments into blocks: paragraphs, delimited blocks, lists and
//! tables. Section headers are emitted flat; the aggregator nests them.
//!
//! Open containers (delimited blocks, lists, list items) live in an
//! [`arena::Arena`] and are referenced from a stack by index. A finished
//! top-level element is emitted as soon as the stack is empty again.
use crate::{
    Error,
    fragment::{BlockDelimiter, DelimiterKind, Fragment, FragmentKind, ListMarker},
    model::{
        AdmonitionKind, AttributeCluster, AttributeDeclaration, AttributeReset, AttributeValue, Attributes, BlankLine,
        BlockContent, Break, Comment, DelimitedBlock, DelimitedBlockKind, DiscreteHeading, Element, ImageBlock,
        LANGUAGE, LITERAL_BLOCK_TYPE, LITERAL_INDENT, List, ListItem, ListKind, Paragraph, STYLE, Section,
        TableOfContentsPlaceholder,
    },
    pipeline::Stage,
};

mod arena;
mod table;

use arena::{Arena, Node, NodeId};

pub(crate) type Assembled = Result<Element, Error>;

#[derive(Debug)]
enum Container {
    Block { kind: DelimiterKind, length: usize },
    /// Items continue a list only when their marker has the same signature.
    List { signature: String },
    Item,
}

#[derive(Debug)]
struct Open {
    id: NodeId,
    container: Container,
}

fn list_signature(marker: &ListMarker) -> String {
    match marker.kind {
        ListKind::Ordered(style) if !marker.marker.starts_with('.') => format!("{style:?}"),
        ListKind::Callout => "<>".to_string(),
        ListKind::Unordered | ListKind::Ordered(_) | ListKind::Labeled => marker.marker.clone(),
    }
}

fn common_indent(lines: &[String]) -> usize {
    lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0)
}

fn strip_indent(lines: Vec<String>, indent: usize) -> Vec<String> {
    lines
        .into_iter()
        .map(|line| line.get(indent..).unwrap_or_default().to_string())
        .collect()
}

/// `[quote, attribution, citetitle]` and `[verse, ...]`.
fn insert_attribution(attributes: &mut Attributes) {
    for (index, name) in [(1, "attribution"), (2, "citetitle")] {
        if let Some(value) = attributes.positional(index).map(ToString::to_string) {
            attributes.insert(name, AttributeValue::String(value));
        }
    }
}

fn verbatim_block(
    kind: DelimitedBlockKind,
    delimiter_length: usize,
    attributes: Attributes,
    lines: Vec<String>,
    line: u32,
) -> Element {
    let content = if kind == DelimitedBlockKind::Comment {
        BlockContent::Raw { lines }
    } else {
        BlockContent::Verbatim {
            raw: lines,
            lines: Vec::new(),
        }
    };
    Element::DelimitedBlock(DelimitedBlock {
        kind,
        delimiter_length,
        attributes,
        title: Vec::new(),
        content,
        line,
    })
}

#[derive(Debug)]
struct OpenParagraph {
    attributes: Attributes,
    admonition: Option<AdmonitionKind>,
    lines: Vec<String>,
    line: u32,
}

impl OpenParagraph {
    fn into_element(self) -> Element {
        let Self {
            mut attributes,
            admonition,
            mut lines,
            line,
        } = self;
        let style = attributes.style().map(ToString::to_string);
        let admonition = admonition.or_else(|| style.as_deref().and_then(AdmonitionKind::from_label));
        let indented = lines
            .first()
            .is_some_and(|first| first.starts_with([' ', '\t']));

        match style.as_deref() {
            Some("literal") => {
                attributes.insert(LITERAL_BLOCK_TYPE, AttributeValue::String("style".into()));
                let indent = common_indent(&lines);
                if indent > 0 {
                    attributes.insert(LITERAL_INDENT, AttributeValue::String(indent.to_string()));
                    lines = strip_indent(lines, indent);
                }
            }
            Some(style @ ("source" | "listing")) => {
                let kind = if style == "source" {
                    DelimitedBlockKind::Source
                } else {
                    DelimitedBlockKind::Listing
                };
                if let Some(language) = attributes.positional(1).map(ToString::to_string) {
                    attributes.insert(LANGUAGE, AttributeValue::String(language));
                }
                return verbatim_block(kind, 0, attributes, lines, line);
            }
            Some("quote" | "verse") => insert_attribution(&mut attributes),
            None if indented => {
                attributes.insert(STYLE, AttributeValue::String("literal".into()));
                attributes.insert(LITERAL_BLOCK_TYPE, AttributeValue::String("indented".into()));
                let indent = common_indent(&lines);
                lines = strip_indent(lines, indent);
            }
            Some(_) | None => {}
        }

        Element::Paragraph(Paragraph {
            attributes,
            title: Vec::new(),
            admonition,
            lines,
            content: Vec::new(),
            line,
        })
    }
}

/// Content of a verbatim block (listing, literal, fenced, passthrough,
/// comment or table) collected until the matching delimiter.
#[derive(Debug)]
struct OpenVerbatim {
    delimiter: BlockDelimiter,
    attributes: Attributes,
    lines: Vec<String>,
    line: u32,
}

impl OpenVerbatim {
    fn closes(&self, delimiter: &BlockDelimiter) -> bool {
        self.delimiter.kind == delimiter.kind && self.delimiter.length == delimiter.length
    }

    fn into_element(self) -> Element {
        let Self {
            delimiter,
            mut attributes,
            lines,
            line,
        } = self;
        let kind = match delimiter.kind {
            DelimiterKind::Table(format) => {
                return Element::Table(table::build(format, attributes, &lines, line));
            }
            DelimiterKind::Listing if attributes.style() == Some("source") => {
                if let Some(language) = attributes.positional(1).map(ToString::to_string) {
                    attributes.insert(LANGUAGE, AttributeValue::String(language));
                }
                DelimitedBlockKind::Source
            }
            DelimiterKind::Listing => DelimitedBlockKind::Listing,
            DelimiterKind::Fenced => {
                if let Some(language) = delimiter.language {
                    attributes.insert(LANGUAGE, AttributeValue::String(language));
                }
                DelimitedBlockKind::Fenced
            }
            DelimiterKind::Literal => DelimitedBlockKind::Literal,
            DelimiterKind::Passthrough => DelimitedBlockKind::Passthrough,
            DelimiterKind::Comment => DelimitedBlockKind::Comment,
            DelimiterKind::Example
            | DelimiterKind::Open
            | DelimiterKind::Quote
            | DelimiterKind::Sidebar => {
                tracing::error!(?delimiter, "compound delimiter collected as verbatim content");
                DelimitedBlockKind::Listing
            }
        };
        verbatim_block(kind, delimiter.length, attributes, lines, line)
    }
}

fn compound_block(delimiter: &BlockDelimiter, mut attributes: Attributes, line: u32) -> Element {
    let kind = match delimiter.kind {
        DelimiterKind::Example => DelimitedBlockKind::Example,
        DelimiterKind::Quote => {
            insert_attribution(&mut attributes);
            DelimitedBlockKind::Quote
        }
        DelimiterKind::Sidebar => DelimitedBlockKind::Sidebar,
        DelimiterKind::Open
        | DelimiterKind::Comment
        | DelimiterKind::Fenced
        | DelimiterKind::Listing
        | DelimiterKind::Literal
        | DelimiterKind::Passthrough
        | DelimiterKind::Table(_) => DelimitedBlockKind::Open,
    };
    Element::DelimitedBlock(DelimitedBlock {
        kind,
        delimiter_length: delimiter.length,
        attributes,
        title: Vec::new(),
        content: BlockContent::Compound {
            children: Vec::new(),
        },
        line,
    })
}

fn is_blank_line(node: &Node) -> bool {
    matches!(node, Node::Element(Element::BlankLine(_)))
}

#[derive(Debug, Default)]
pub(crate) struct Assembler {
    arena: Arena,
    stack: Vec<Open>,
    paragraph: Option<OpenParagraph>,
    verbatim: Option<OpenVerbatim>,
    /// Attributes from clusters waiting for the block they belong to.
    pending: Attributes,
    pending_line: u32,
    /// A `+` was seen: the next block belongs to the current list item.
    continuation: bool,
    /// Lines of prose still extend the current list item's text.
    item_text_open: bool,
    /// Comment lines met inside a paragraph, placed after it.
    deferred_comments: Vec<Element>,
}

impl Assembler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn in_list(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Open {
                container: Container::Item,
                ..
            })
        )
    }

    fn take_pending(&mut self) -> Attributes {
        std::mem::take(&mut self.pending)
    }

    fn drop_pending(&mut self) {
        if !self.pending.is_empty() {
            tracing::warn!(line = self.pending_line, "attribute list is not followed by a block, dropping it");
            self.pending = Attributes::new();
        }
    }

    /// Attach a finished element to the innermost open container, or emit it.
    fn place(&mut self, element: Element, output: &mut Vec<Assembled>) {
        match self.stack.last() {
            Some(open) => {
                let id = self.arena.alloc(Node::Element(element));
                self.arena.attach(open.id, id);
            }
            None => output.push(Ok(element)),
        }
    }

    fn open(&mut self, node: Node, container: Container) {
        let id = self.arena.alloc(node);
        if let Some(parent) = self.stack.last() {
            self.arena.attach(parent.id, id);
        }
        tracing::trace!(?container, depth = self.stack.len(), "container opened");
        self.stack.push(Open { id, container });
    }

    fn pop(&mut self, output: &mut Vec<Assembled>) {
        let Some(open) = self.stack.pop() else {
            return;
        };
        if matches!(open.container, Container::Item) {
            self.arena.trim_trailing_children(open.id, is_blank_line);
        }
        tracing::trace!(container = ?open.container, depth = self.stack.len(), "container closed");
        if self.stack.is_empty() {
            match self.arena.build(open.id) {
                Some(Node::Element(element)) => output.push(Ok(element)),
                Some(Node::Item(item)) => output.push(Err(Error::InternalInvariant {
                    line: item.line,
                    message: "list item outside of a list".to_string(),
                })),
                None => {}
            }
            self.arena.clear();
        }
    }

    fn close_paragraph(&mut self, output: &mut Vec<Assembled>) {
        if let Some(paragraph) = self.paragraph.take() {
            let element = paragraph.into_element();
            self.place(element, output);
        }
        for comment in std::mem::take(&mut self.deferred_comments) {
            self.place(comment, output);
        }
    }

    fn close_lists(&mut self, output: &mut Vec<Assembled>) {
        while matches!(
            self.stack.last(),
            Some(Open {
                container: Container::List { .. } | Container::Item,
                ..
            })
        ) {
            self.pop(output);
        }
    }

    /// Prepare for content that is not a list item: it belongs to the current
    /// item after a continuation, otherwise it ends the open lists.
    fn leave_lists(&mut self, output: &mut Vec<Assembled>) {
        self.item_text_open = false;
        if !self.in_list() {
            self.continuation = false;
            return;
        }
        if std::mem::take(&mut self.continuation) {
            return;
        }
        self.close_lists(output);
    }

    /// Place a block-level leaf, closing whatever it ends first.
    fn block(&mut self, element: Element, output: &mut Vec<Assembled>) {
        self.close_paragraph(output);
        self.leave_lists(output);
        self.place(element, output);
    }

    /// A single-line block that takes the pending attributes, or prose when
    /// it interrupts running text.
    fn leaf(
        &mut self,
        line: u32,
        source: String,
        output: &mut Vec<Assembled>,
        build: impl FnOnce(Attributes) -> Element,
    ) {
        if self.in_running_text() {
            self.text(line, source, None, output);
            return;
        }
        let element = build(self.take_pending());
        self.block(element, output);
    }

    fn text(&mut self, line: u32, text: String, admonition: Option<AdmonitionKind>, output: &mut Vec<Assembled>) {
        if let Some(paragraph) = self.paragraph.as_mut() {
            paragraph.lines.push(text);
            return;
        }
        if self.item_text_open
            && let Some(Open {
                id,
                container: Container::Item,
            }) = self.stack.last()
            && let Some(Node::Item(item)) = self.arena.node_mut(*id)
        {
            item.principal_raw.push(text.trim().to_string());
            return;
        }
        self.leave_lists(output);
        let attributes = self.take_pending();
        self.paragraph = Some(OpenParagraph {
            attributes,
            admonition,
            lines: vec![text],
            line,
        });
    }

    /// Whether a structural line has to be read as prose because it
    /// interrupts running text.
    /// Example blocks keep the attribute lines written inside them.
    fn in_example_block(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Open {
                container: Container::Block {
                    kind: DelimiterKind::Example,
                    ..
                },
                ..
            })
        )
    }

    fn in_running_text(&self) -> bool {
        self.paragraph.is_some() || (self.item_text_open && !self.continuation)
    }

    fn delimiter(&mut self, line: u32, delimiter: BlockDelimiter, output: &mut Vec<Assembled>) {
        self.close_paragraph(output);
        let closing = self.stack.iter().rposition(|open| {
            matches!(
                open.container,
                Container::Block { kind, length } if kind == delimiter.kind && length == delimiter.length
            )
        });
        if let Some(position) = closing {
            self.drop_pending();
            while self.stack.len() > position {
                self.pop(output);
            }
            return;
        }

        self.leave_lists(output);
        let attributes = self.take_pending();
        if delimiter.kind.is_verbatim() {
            self.verbatim = Some(OpenVerbatim {
                delimiter,
                attributes,
                lines: Vec::new(),
                line,
            });
        } else {
            let element = compound_block(&delimiter, attributes, line);
            self.open(
                Node::Element(element),
                Container::Block {
                    kind: delimiter.kind,
                    length: delimiter.length,
                },
            );
        }
    }

    fn list_item(&mut self, line: u32, marker: ListMarker, output: &mut Vec<Assembled>) {
        self.close_paragraph(output);
        self.continuation = false;
        let signature = list_signature(&marker);

        // Only the lists above the innermost delimited block can be continued.
        let scope = self
            .stack
            .iter()
            .rposition(|open| matches!(open.container, Container::Block { .. }))
            .map_or(0, |index| index + 1);
        let existing = self
            .stack
            .iter()
            .enumerate()
            .skip(scope)
            .rev()
            .find_map(|(index, open)| {
                matches!(&open.container, Container::List { signature: open_signature } if *open_signature == signature)
                    .then_some(index)
            });

        match existing {
            Some(index) => {
                while self.stack.len() > index + 1 {
                    self.pop(output);
                }
            }
            None => {
                let list = List {
                    kind: marker.kind,
                    attributes: self.take_pending(),
                    title: Vec::new(),
                    items: Vec::new(),
                    line,
                };
                let element = if marker.kind == ListKind::Labeled {
                    Element::LabeledList(list)
                } else {
                    Element::List(list)
                };
                self.open(Node::Element(element), Container::List { signature });
            }
        }

        let item = ListItem {
            level: marker.level,
            marker: marker.marker,
            check_style: marker.check_style,
            term_raw: marker.term,
            term: Vec::new(),
            principal_raw: Some(marker.text)
                .filter(|text| !text.is_empty())
                .into_iter()
                .collect(),
            principal: Vec::new(),
            attributes: self.take_pending(),
            children: Vec::new(),
            line,
        };
        self.open(Node::Item(item), Container::Item);
        self.item_text_open = true;
    }

    fn accept_verbatim(&mut self, source: String, kind: FragmentKind, output: &mut Vec<Assembled>) {
        if let FragmentKind::BlockDelimiter(delimiter) = &kind
            && self.verbatim.as_ref().is_some_and(|open| open.closes(delimiter))
        {
            if let Some(open) = self.verbatim.take() {
                let element = open.into_element();
                self.place(element, output);
            }
            return;
        }
        let Some(open) = self.verbatim.as_mut() else {
            return;
        };
        if let FragmentKind::RawLine(text) = kind {
            open.lines.push(text);
        } else if kind == FragmentKind::BlankLine {
            open.lines.push(String::new());
        } else {
            open.lines.push(source);
        }
    }
}

impl Stage for Assembler {
    type Input = Fragment;
    type Output = Assembled;

    #[allow(clippy::too_many_lines)]
    fn accept(&mut self, fragment: Fragment, output: &mut Vec<Assembled>) {
        let Fragment { line, source, payload } = fragment;
        let kind = match payload {
            Ok(kind) => kind,
            Err(error) => {
                output.push(Err(error));
                return;
            }
        };
        if self.verbatim.is_some() {
            self.accept_verbatim(source, kind, output);
            return;
        }

        match kind {
            FragmentKind::BlankLine => {
                self.close_paragraph(output);
                self.item_text_open = false;
                self.drop_pending();
                if self.in_list() {
                    self.place(Element::BlankLine(BlankLine { line }), output);
                }
            }
            FragmentKind::InlineElements(text) | FragmentKind::RawLine(text) => {
                self.text(line, text, None, output);
            }
            FragmentKind::Admonition { kind, text } => {
                if self.in_running_text() {
                    self.text(line, source, None, output);
                } else {
                    self.text(line, text, Some(kind), output);
                }
            }
            FragmentKind::AttributeCluster(attributes) => {
                if self.in_running_text() {
                    self.text(line, source, None, output);
                } else {
                    if self.in_example_block() {
                        let cluster = AttributeCluster {
                            attributes: attributes.clone(),
                            line,
                        };
                        self.place(Element::AttributeCluster(cluster), output);
                    }
                    if self.pending.is_empty() {
                        self.pending_line = line;
                    }
                    self.pending.merge(attributes);
                }
            }
            FragmentKind::BlockDelimiter(delimiter) => self.delimiter(line, delimiter, output),
            FragmentKind::ListElementMarker(marker) => self.list_item(line, marker, output),
            FragmentKind::ListContinuation => {
                if self.in_list() {
                    self.close_paragraph(output);
                    self.continuation = true;
                    self.item_text_open = false;
                } else {
                    let error = Error::Assembly {
                        line,
                        message: "list continuation outside of a list item".to_string(),
                    };
                    self.text(line, source, None, output);
                    output.push(Err(error));
                }
            }
            FragmentKind::SectionHeader { level, title } => {
                let in_block = self
                    .stack
                    .iter()
                    .any(|open| matches!(open.container, Container::Block { .. }));
                if in_block || self.in_running_text() {
                    self.text(line, source, None, output);
                    return;
                }
                self.close_paragraph(output);
                while !self.stack.is_empty() {
                    self.pop(output);
                }
                self.item_text_open = false;
                self.continuation = false;
                let attributes = self.take_pending();
                if matches!(attributes.style(), Some("discrete" | "float")) {
                    self.place(
                        Element::DiscreteHeading(DiscreteHeading {
                            level,
                            title_raw: title,
                            title: Vec::new(),
                            attributes,
                            line,
                        }),
                        output,
                    );
                } else {
                    output.push(Ok(Element::Section(Section {
                        level,
                        id: attributes.id().unwrap_or_default().to_string(),
                        title_raw: title,
                        title: Vec::new(),
                        attributes,
                        children: Vec::new(),
                        line,
                    })));
                }
            }
            FragmentKind::SingleLineComment(text) => {
                let comment = Element::Comment(Comment { text, line });
                if self.paragraph.is_some() {
                    self.deferred_comments.push(comment);
                } else if self.item_text_open && !self.continuation {
                    self.place(comment, output);
                } else {
                    self.block(comment, output);
                }
            }
            FragmentKind::AttributeDeclaration { name, value } => {
                let value = value.map_or(AttributeValue::None, AttributeValue::String);
                self.block(
                    Element::AttributeDeclaration(AttributeDeclaration {
                        attribute_name: name,
                        value,
                        line,
                    }),
                    output,
                );
            }
            FragmentKind::AttributeReset { name } => self.block(
                Element::AttributeReset(AttributeReset {
                    attribute_name: name,
                    line,
                }),
                output,
            ),
            FragmentKind::DocumentAuthorsLine(authors) => self.block(
                Element::AttributeDeclaration(AttributeDeclaration {
                    attribute_name: "authors".to_string(),
                    value: AttributeValue::Authors(authors),
                    line,
                }),
                output,
            ),
            FragmentKind::DocumentRevisionLine(revision) => self.block(
                Element::AttributeDeclaration(AttributeDeclaration {
                    attribute_name: "revision".to_string(),
                    value: AttributeValue::Revision(revision),
                    line,
                }),
                output,
            ),
            FragmentKind::ImageBlock { target, attributes } => {
                if self.in_running_text() {
                    self.text(line, source, None, output);
                    return;
                }
                let mut merged = self.take_pending();
                merged.merge(attributes);
                self.block(
                    Element::ImageBlock(ImageBlock {
                        target,
                        attributes: merged,
                        title: Vec::new(),
                        line,
                    }),
                    output,
                );
            }
            FragmentKind::ThematicBreak => {
                self.leaf(line, source, output, |attributes| Element::ThematicBreak(Break { attributes, line }));
            }
            FragmentKind::PageBreak => {
                self.leaf(line, source, output, |attributes| Element::PageBreak(Break { attributes, line }));
            }
            FragmentKind::TableOfContentsMacro => self.leaf(line, source, output, |_| {
                Element::TableOfContentsPlaceholder(TableOfContentsPlaceholder { from_macro: true })
            }),
            FragmentKind::FileInclusion { .. }
            | FragmentKind::ConditionalDirective(_)
            | FragmentKind::EndifDirective(_) => {
                tracing::error!(line, %source, "preprocessor directive reached the assembler");
                output.push(Err(Error::InternalInvariant {
                    line,
                    message: format!("unexpected preprocessor directive `{source}`"),
                }));
            }
        }
    }

    fn finish(&mut self, output: &mut Vec<Assembled>) {
        if let Some(open) = self.verbatim.take() {
            tracing::debug!(line = open.line, "block without a closing delimiter ends with the input");
            let element = open.into_element();
            self.place(element, output);
        }
        self.close_paragraph(output);
        self.drop_pending();
        while !self.stack.is_empty() {
            self.pop(output);
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        Options,
        model::{CheckStyle, NumberingStyle, TableFormat},
        preprocessor::Preprocessor,
    };

    fn assemble(input: &str) -> Vec<Element> {
        let mut assembler = Assembler::new();
        let mut output = Vec::new();
        for fragment in Preprocessor::new(input.to_string(), &Options::default()) {
            assembler.accept(fragment, &mut output);
        }
        assembler.finish(&mut output);
        output
            .into_iter()
            .filter_map(|result| match result {
                Ok(element) => Some(element),
                Err(error) if !error.is_fatal() => None,
                Err(error) => panic!("unexpected error: {error}"),
            })
            .collect()
    }

    fn paragraph_lines(element: &Element) -> Vec<&str> {
        match element {
            Element::Paragraph(paragraph) => paragraph.lines.iter().map(String::as_str).collect(),
            other => panic!("expected a paragraph, found {other:?}"),
        }
    }

    fn compound_children(element: &Element) -> &[Element] {
        match element {
            Element::DelimitedBlock(DelimitedBlock {
                content: BlockContent::Compound { children },
                ..
            }) => children,
            other => panic!("expected a compound block, found {other:?}"),
        }
    }

    fn verbatim_lines(element: &Element) -> (DelimitedBlockKind, Vec<&str>) {
        match element {
            Element::DelimitedBlock(DelimitedBlock {
                kind,
                content: BlockContent::Verbatim { raw, .. },
                ..
            }) => (*kind, raw.iter().map(String::as_str).collect()),
            other => panic!("expected a verbatim block, found {other:?}"),
        }
    }

    fn list(element: &Element) -> &List {
        match element {
            Element::List(list) | Element::LabeledList(list) => list,
            other => panic!("expected a list, found {other:?}"),
        }
    }

    #[test]
    fn test_paragraph_lines_are_joined() {
        let elements = assemble("first line\nsecond line\n\nnext paragraph");
        assert_eq!(elements.len(), 2);
        assert_eq!(paragraph_lines(&elements[0]), vec!["first line", "second line"]);
        assert_eq!(paragraph_lines(&elements[1]), vec!["next paragraph"]);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_attribute_cluster_attaches_or_is_dropped() {
        let elements = assemble("[.lead]\nattached\n\n[.lost]\n\nplain");
        let [Element::Paragraph(attached), Element::Paragraph(plain)] = elements.as_slice() else {
            panic!("expected two paragraphs, found {elements:?}");
        };
        assert_eq!(attached.attributes.roles(), ["lead".to_string()]);
        assert!(plain.attributes.is_empty());
        assert!(logs_contain("attribute list is not followed by a block"));
    }

    #[test]
    fn test_example_block_contains_paragraph() {
        let elements = assemble("====\nbody\n====");
        assert_eq!(elements.len(), 1);
        let children = compound_children(&elements[0]);
        assert_eq!(children.len(), 1);
        assert_eq!(paragraph_lines(&children[0]), vec!["body"]);
    }

    #[test]
    fn test_nested_blocks_close_in_order() {
        let elements = assemble("====\n****\ninner\n****\nouter\n====");
        let children = compound_children(&elements[0]);
        assert_eq!(children.len(), 2);
        assert_eq!(paragraph_lines(&compound_children(&children[0])[0]), vec!["inner"]);
        assert_eq!(paragraph_lines(&children[1]), vec!["outer"]);
    }

    #[test]
    fn test_example_block_keeps_attribute_lines() {
        let elements = assemble("====\n[role]\n\n====");
        let children = compound_children(&elements[0]);
        let [Element::AttributeCluster(cluster)] = children else {
            panic!("expected the attribute line as a child, found {children:?}");
        };
        assert_eq!(cluster.line, 2);
        assert_eq!(cluster.attributes.style(), Some("role"));

        let elements = assemble("====\n[.lead]\nbody\n====");
        let [Element::AttributeCluster(_), Element::Paragraph(body)] = compound_children(&elements[0]) else {
            panic!("expected the attribute line and the paragraph");
        };
        assert_eq!(body.attributes.roles(), ["lead".to_string()]);
    }

    #[test]
    fn test_other_blocks_only_attach_attribute_lines() {
        let elements = assemble("****\n[.lead]\nbody\n****");
        let [Element::Paragraph(body)] = compound_children(&elements[0]) else {
            panic!("expected a single paragraph");
        };
        assert_eq!(body.attributes.roles(), ["lead".to_string()]);
    }

    #[test]
    fn test_unclosed_block_extends_to_end() {
        let elements = assemble("====\nbody\n\nmore");
        assert_eq!(elements.len(), 1);
        assert_eq!(compound_children(&elements[0]).len(), 2);

        let elements = assemble("----\ncode");
        assert_eq!(verbatim_lines(&elements[0]), (DelimitedBlockKind::Listing, vec!["code"]));
    }

    #[test]
    fn test_ordered_list() {
        let elements = assemble(". one\n. two");
        assert_eq!(elements.len(), 1);
        let list = list(&elements[0]);
        assert_eq!(list.kind, ListKind::Ordered(NumberingStyle::Arabic));
        let texts: Vec<&[String]> = list.items.iter().map(|item| item.principal_raw.as_slice()).collect();
        assert_eq!(texts, vec![&["one".to_string()][..], &["two".to_string()][..]]);
    }

    #[test]
    fn test_nested_and_sibling_lists() {
        let elements = assemble("* a\n** a.1\n** a.2\n* b\n\nbetween\n\n- other");
        assert_eq!(elements.len(), 3);
        let outer = list(&elements[0]);
        assert_eq!(outer.items.len(), 2);
        let nested = list(&outer.items[0].children[0]);
        assert_eq!(nested.items.len(), 2);
        assert_eq!(list(&elements[2]).items.len(), 1);
    }

    #[test]
    fn test_blank_lines_between_items_keep_the_list() {
        let elements = assemble("* a\n\n* b\n\nafter");
        assert_eq!(elements.len(), 2);
        let list = list(&elements[0]);
        assert_eq!(list.items.len(), 2);
        assert!(list.items.iter().all(|item| item.children.is_empty()));
    }

    #[test]
    fn test_item_text_continues_on_following_lines() {
        let elements = assemble("* [x] done\n  and more\n* [ ] todo");
        let list = list(&elements[0]);
        assert_eq!(list.items[0].principal_raw, vec!["done", "and more"]);
        assert_eq!(list.items[0].check_style, Some(CheckStyle::Checked));
        assert_eq!(list.items[1].check_style, Some(CheckStyle::Unchecked));
    }

    #[test]
    fn test_list_continuation_attaches_block() {
        let elements = assemble("* item\n+\n----\ncode\n----\n* next");
        assert_eq!(elements.len(), 1);
        let list = list(&elements[0]);
        assert_eq!(list.items.len(), 2);
        assert_eq!(
            verbatim_lines(&list.items[0].children[0]),
            (DelimitedBlockKind::Listing, vec!["code"])
        );
    }

    #[test]
    fn test_block_without_continuation_ends_list() {
        let elements = assemble("* item\n----\ncode\n----");
        assert_eq!(elements.len(), 2);
        assert!(list(&elements[0]).items[0].children.is_empty());
    }

    #[test]
    fn test_misplaced_continuation_is_text() {
        let mut assembler = Assembler::new();
        let mut output = Vec::new();
        for fragment in Preprocessor::new("+\ntext".to_string(), &Options::default()) {
            assembler.accept(fragment, &mut output);
        }
        assembler.finish(&mut output);
        assert!(matches!(output.first(), Some(Err(Error::Assembly { line: 1, .. }))));
        let elements = assemble("+\ntext");
        assert_eq!(paragraph_lines(&elements[0]), vec!["+", "text"]);
    }

    #[test]
    fn test_labeled_list() {
        let elements = assemble("CPU:: The brain\nRAM::\n  Short-term memory");
        let Element::LabeledList(list) = &elements[0] else {
            panic!("expected a labeled list");
        };
        assert_eq!(list.items[0].term_raw.as_deref(), Some("CPU"));
        assert_eq!(list.items[1].principal_raw, vec!["Short-term memory"]);
    }

    #[test]
    fn test_sections_are_flat_and_blocks_keep_headers_as_text() {
        let elements = assemble("== One\n\n====\n== Not a section\n====\n\n=== Two");
        let [Element::Section(one), Element::DelimitedBlock(_), Element::Section(two)] = elements.as_slice() else {
            panic!("unexpected elements {elements:?}");
        };
        assert_eq!((one.level, one.title_raw.as_str()), (1, "One"));
        assert_eq!((two.level, two.title_raw.as_str()), (2, "Two"));
        assert_eq!(
            paragraph_lines(&compound_children(&elements[1])[0]),
            vec!["== Not a section"]
        );
    }

    #[test]
    fn test_discrete_heading() {
        let elements = assemble("[discrete]\n== Floating");
        assert!(matches!(&elements[0], Element::DiscreteHeading(heading) if heading.title_raw == "Floating"));
    }

    #[test]
    fn test_source_and_fenced_blocks() {
        let elements = assemble("[source,ruby]\n----\nputs 1\n----\n\n```rust\nfn main() {}\n```");
        let Element::DelimitedBlock(source) = &elements[0] else {
            panic!("expected a source block");
        };
        assert_eq!(source.kind, DelimitedBlockKind::Source);
        assert_eq!(source.attributes.get_str(LANGUAGE), Some("ruby"));
        let Element::DelimitedBlock(fenced) = &elements[1] else {
            panic!("expected a fenced block");
        };
        assert_eq!(fenced.kind, DelimitedBlockKind::Fenced);
        assert_eq!(fenced.attributes.get_str(LANGUAGE), Some("rust"));
    }

    #[test]
    fn test_literal_paragraphs() {
        let elements = assemble("  indented\n  text\n\n[literal]\n    styled");
        let [Element::Paragraph(indented), Element::Paragraph(styled)] = elements.as_slice() else {
            panic!("expected two paragraphs");
        };
        assert_eq!(indented.attributes.style(), Some("literal"));
        assert_eq!(indented.attributes.get_str(LITERAL_BLOCK_TYPE), Some("indented"));
        assert_eq!(indented.lines, vec!["indented", "text"]);
        assert_eq!(styled.attributes.get_str(LITERAL_BLOCK_TYPE), Some("style"));
        assert_eq!(styled.attributes.get_str(LITERAL_INDENT), Some("4"));
        assert_eq!(styled.lines, vec!["styled"]);
    }

    #[test]
    fn test_admonition_paragraphs() {
        let elements = assemble("NOTE: Remember this.\n\n[TIP]\nAnd this.");
        assert!(matches!(&elements[0], Element::Paragraph(p) if p.admonition == Some(AdmonitionKind::Note)));
        assert!(matches!(&elements[1], Element::Paragraph(p) if p.admonition == Some(AdmonitionKind::Tip)));
    }

    #[test]
    fn test_table_block() {
        let elements = assemble(".Scores\n|===\n| Name | Score\n\n| Ada | 10\n|===");
        let Element::Table(table) = &elements[0] else {
            panic!("expected a table");
        };
        assert_eq!(table.format, TableFormat::Psv);
        assert!(table.header.is_some());
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.attributes.title(), Some("Scores"));
    }

    #[test]
    fn test_comment_inside_paragraph_does_not_split_it() {
        let elements = assemble("one\n// note\ntwo");
        assert_eq!(elements.len(), 2);
        assert_eq!(paragraph_lines(&elements[0]), vec!["one", "two"]);
        assert!(matches!(&elements[1], Element::Comment(comment) if comment.text.trim() == "note"));
    }

    #[test]
    fn test_header_lines_become_declarations() {
        let elements = assemble("= Title\nJohn Doe\n:toc:\n\npara");
        let names: Vec<&str> = elements
            .iter()
            .filter_map(|element| {
                if let Element::AttributeDeclaration(declaration) = element {
                    Some(declaration.attribute_name.as_str())
                } else {
                    None
                }
            })
            .collect();
        assert_eq!(names, vec!["authors", "toc"]);
    }
}
