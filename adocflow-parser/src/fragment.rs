//! The unit of data flowing from the lexer through the preprocessor into the
//! assembler: one classified source line.
use crate::{
    Error,
    model::{AdmonitionKind, Attributes, Author, CheckStyle, ListKind, ListLevel, Revision},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DelimiterKind {
    Comment,
    Example,
    Fenced,
    Listing,
    Literal,
    Open,
    Passthrough,
    Quote,
    Sidebar,
    Table(TableDelimiter),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TableDelimiter {
    Pipe,
    Comma,
    Colon,
}

impl DelimiterKind {
    /// Content between these delimiters is passed through as raw lines.
    pub(crate) fn is_verbatim(self) -> bool {
        matches!(
            self,
            Self::Comment
                | Self::Fenced
                | Self::Listing
                | Self::Literal
                | Self::Passthrough
                | Self::Table(_)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BlockDelimiter {
    pub(crate) kind: DelimiterKind,
    pub(crate) length: usize,
    /// Language following an opening ```` ``` ```` fence.
    pub(crate) language: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ListMarker {
    pub(crate) kind: ListKind,
    pub(crate) level: ListLevel,
    /// The marker as written: `**`, `.`, `3.`, `::`, `<1>`.
    pub(crate) marker: String,
    pub(crate) check_style: Option<CheckStyle>,
    /// Term of a labeled list item.
    pub(crate) term: Option<String>,
    pub(crate) text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FragmentKind {
    /// A line kept verbatim: verbatim block content or non-AsciiDoc includes.
    RawLine(String),
    BlankLine,
    BlockDelimiter(BlockDelimiter),
    AttributeCluster(Attributes),
    AttributeDeclaration { name: String, value: Option<String> },
    AttributeReset { name: String },
    SectionHeader { level: u8, title: String },
    DocumentAuthorsLine(Vec<Author>),
    DocumentRevisionLine(Revision),
    SingleLineComment(String),
    FileInclusion { target: String, attributes: String },
    ConditionalDirective(String),
    EndifDirective(String),
    /// A line of prose, substituted later.
    InlineElements(String),
    Admonition { kind: AdmonitionKind, text: String },
    ListElementMarker(ListMarker),
    ListContinuation,
    ImageBlock { target: String, attributes: Attributes },
    ThematicBreak,
    PageBreak,
    TableOfContentsMacro,
}

/// One classified source line.
#[derive(Debug)]
pub(crate) struct Fragment {
    /// Line number in the post-inclusion source, starting at 1.
    pub(crate) line: u32,
    /// The original text of the line.
    pub(crate) source: String,
    pub(crate) payload: Result<FragmentKind, Error>,
}

impl Fragment {
    pub(crate) fn new(line: u32, source: impl Into<String>, kind: FragmentKind) -> Self {
        Self {
            line,
            source: source.into(),
            payload: Ok(kind),
        }
    }

    pub(crate) fn error(line: u32, source: impl Into<String>, error: Error) -> Self {
        Self {
            line,
            source: source.into(),
            payload: Err(error),
        }
    }
}
