use serde::Serialize;

use super::{AttributeValue, Attributes, Inline, List, Table};

/// A structural element of the document tree.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Element {
    Paragraph(Paragraph),
    DelimitedBlock(DelimitedBlock),
    Section(Section),
    DiscreteHeading(DiscreteHeading),
    List(List),
    LabeledList(List),
    Table(Table),
    ImageBlock(ImageBlock),
    AttributeDeclaration(AttributeDeclaration),
    AttributeReset(AttributeReset),
    /// A `[...]` line kept inside a block whose contents preserve them. The
    /// same attributes also attach to the block that follows it.
    AttributeCluster(AttributeCluster),
    BlankLine(BlankLine),
    Comment(Comment),
    TableOfContentsPlaceholder(TableOfContentsPlaceholder),
    Preamble(Preamble),
    ThematicBreak(Break),
    PageBreak(Break),
}

impl Element {
    /// The element's own attributes, for elements that carry them.
    #[must_use]
    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            Self::Paragraph(Paragraph { attributes, .. })
            | Self::DelimitedBlock(DelimitedBlock { attributes, .. })
            | Self::Section(Section { attributes, .. })
            | Self::DiscreteHeading(DiscreteHeading { attributes, .. })
            | Self::List(List { attributes, .. })
            | Self::LabeledList(List { attributes, .. })
            | Self::Table(Table { attributes, .. })
            | Self::ImageBlock(ImageBlock { attributes, .. })
            | Self::ThematicBreak(Break { attributes, .. })
            | Self::PageBreak(Break { attributes, .. }) => Some(attributes),
            Self::AttributeDeclaration(_)
            | Self::AttributeReset(_)
            | Self::AttributeCluster(_)
            | Self::BlankLine(_)
            | Self::Comment(_)
            | Self::TableOfContentsPlaceholder(_)
            | Self::Preamble(_) => None,
        }
    }

    /// The substituted title of the element, if it has one.
    #[must_use]
    pub fn title(&self) -> &[Inline] {
        match self {
            Self::Paragraph(Paragraph { title, .. })
            | Self::DelimitedBlock(DelimitedBlock { title, .. })
            | Self::Section(Section { title, .. })
            | Self::DiscreteHeading(DiscreteHeading { title, .. })
            | Self::List(List { title, .. })
            | Self::LabeledList(List { title, .. })
            | Self::Table(Table { title, .. })
            | Self::ImageBlock(ImageBlock { title, .. }) => title,
            Self::AttributeDeclaration(_)
            | Self::AttributeReset(_)
            | Self::AttributeCluster(_)
            | Self::BlankLine(_)
            | Self::Comment(_)
            | Self::TableOfContentsPlaceholder(_)
            | Self::Preamble(_)
            | Self::ThematicBreak(_)
            | Self::PageBreak(_) => &[],
        }
    }

    /// Nested elements of container elements.
    #[must_use]
    pub fn children(&self) -> &[Element] {
        match self {
            Self::Section(section) => &section.children,
            Self::Preamble(preamble) => &preamble.children,
            Self::DelimitedBlock(DelimitedBlock {
                content: BlockContent::Compound { children },
                ..
            }) => children,
            Self::Paragraph(_)
            | Self::DelimitedBlock(_)
            | Self::DiscreteHeading(_)
            | Self::List(_)
            | Self::LabeledList(_)
            | Self::Table(_)
            | Self::ImageBlock(_)
            | Self::AttributeDeclaration(_)
            | Self::AttributeReset(_)
            | Self::AttributeCluster(_)
            | Self::BlankLine(_)
            | Self::Comment(_)
            | Self::TableOfContentsPlaceholder(_)
            | Self::ThematicBreak(_)
            | Self::PageBreak(_) => &[],
        }
    }

    /// The source line the element started on, when known.
    #[must_use]
    pub fn line(&self) -> Option<u32> {
        match self {
            Self::Paragraph(Paragraph { line, .. })
            | Self::DelimitedBlock(DelimitedBlock { line, .. })
            | Self::Section(Section { line, .. })
            | Self::DiscreteHeading(DiscreteHeading { line, .. })
            | Self::List(List { line, .. })
            | Self::LabeledList(List { line, .. })
            | Self::Table(Table { line, .. })
            | Self::ImageBlock(ImageBlock { line, .. })
            | Self::AttributeDeclaration(AttributeDeclaration { line, .. })
            | Self::AttributeReset(AttributeReset { line, .. })
            | Self::AttributeCluster(AttributeCluster { line, .. })
            | Self::BlankLine(BlankLine { line })
            | Self::Comment(Comment { line, .. })
            | Self::ThematicBreak(Break { line, .. })
            | Self::PageBreak(Break { line, .. }) => Some(*line),
            Self::TableOfContentsPlaceholder(_) | Self::Preamble(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdmonitionKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AdmonitionKind {
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "NOTE" => Some(Self::Note),
            "TIP" => Some(Self::Tip),
            "IMPORTANT" => Some(Self::Important),
            "WARNING" => Some(Self::Warning),
            "CAUTION" => Some(Self::Caution),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Paragraph {
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub title: Vec<Inline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admonition: Option<AdmonitionKind>,
    /// Raw source lines, kept after substitution.
    #[serde(skip)]
    pub lines: Vec<String>,
    pub content: Vec<Inline>,
    pub line: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DelimitedBlockKind {
    Example,
    Listing,
    Source,
    Literal,
    Quote,
    Sidebar,
    Passthrough,
    Comment,
    Fenced,
    Open,
}

impl DelimitedBlockKind {
    /// Whether content lines are kept verbatim rather than parsed as blocks.
    #[must_use]
    pub fn is_verbatim(self) -> bool {
        matches!(
            self,
            Self::Listing
                | Self::Source
                | Self::Literal
                | Self::Passthrough
                | Self::Comment
                | Self::Fenced
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockContent {
    /// Parsed child elements.
    Compound { children: Vec<Element> },
    /// Raw lines with their substituted counterparts, one per line.
    Verbatim {
        #[serde(skip)]
        raw: Vec<String>,
        lines: Vec<Vec<Inline>>,
    },
    /// Comment block content, never substituted.
    Raw { lines: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DelimitedBlock {
    pub kind: DelimitedBlockKind,
    pub delimiter_length: usize,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub title: Vec<Inline>,
    pub content: BlockContent,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Section {
    pub level: u8,
    pub id: String,
    #[serde(skip)]
    pub title_raw: String,
    pub title: Vec<Inline>,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
    pub line: u32,
}

/// A heading styled `[discrete]`: it does not open a section.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiscreteHeading {
    pub level: u8,
    #[serde(skip)]
    pub title_raw: String,
    pub title: Vec<Inline>,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageBlock {
    pub target: String,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub title: Vec<Inline>,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeDeclaration {
    pub attribute_name: String,
    pub value: AttributeValue,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeReset {
    pub attribute_name: String,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlankLine {
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeCluster {
    pub attributes: Attributes,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comment {
    pub text: String,
    pub line: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TableOfContentsPlaceholder {
    /// Placed by a `toc::[]` macro rather than generated.
    pub from_macro: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Preamble {
    pub children: Vec<Element>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Break {
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub line: u32,
}
