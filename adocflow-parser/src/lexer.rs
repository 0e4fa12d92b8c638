//! Splits source text into lines and classifies each one.
//!
//! The grammar in [`crate::grammar`] is context free; this module adds the
//! rules that depend on what came before: verbatim block content, the author
//! and revision lines of the header, and attribute entries that appear in the
//! middle of a paragraph.
use crate::{
    fragment::{DelimiterKind, FragmentKind},
    grammar::{classify, parse_authors, parse_revision},
};

/// Characters reserved for inline placeholders; the lexer replaces them with U+FFFD.
pub(crate) fn is_reserved_char(c: char) -> bool {
    ('\u{FDD0}'..='\u{FDDF}').contains(&c)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Previous {
    #[default]
    Start,
    Blank,
    Prose,
    Structural,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum HeaderState {
    #[default]
    AwaitingTitle,
    AfterTitle,
    AfterAuthors,
    Done,
}

/// State that carries over into an included file.
#[derive(Clone, Debug, Default)]
pub(crate) struct LexerContext {
    verbatim: Option<(DelimiterKind, usize)>,
    previous: Previous,
    header: HeaderState,
}

#[derive(Debug)]
pub(crate) struct Lexer {
    input: String,
    position: usize,
    context: LexerContext,
    /// Every line is passed through untouched (non-AsciiDoc includes).
    raw: bool,
    /// Inside a conditional region that evaluated false.
    skipping: bool,
}

impl Lexer {
    pub(crate) fn new(input: String) -> Self {
        Self {
            input,
            position: 0,
            context: LexerContext::default(),
            raw: false,
            skipping: false,
        }
    }

    /// A lexer for an included AsciiDoc file, continuing the state of `parent`.
    pub(crate) fn child(input: String, parent: &Lexer) -> Self {
        let mut context = parent.context.clone();
        context.header = HeaderState::Done;
        Self {
            context,
            ..Self::new(input)
        }
    }

    /// A lexer that yields every non-blank line as [`FragmentKind::RawLine`].
    pub(crate) fn raw(input: String) -> Self {
        Self {
            raw: true,
            ..Self::new(input)
        }
    }

    pub(crate) fn set_skipping(&mut self, skipping: bool) {
        self.skipping = skipping;
    }

    fn next_line(&mut self) -> Option<String> {
        let rest = self.input.get(self.position..).filter(|rest| !rest.is_empty())?;
        let (line, advance) = match rest.find('\n') {
            Some(index) => (rest.get(..index).unwrap_or_default(), index + 1),
            None => (rest, rest.len()),
        };
        let line: String = line
            .strip_suffix('\r')
            .unwrap_or(line)
            .trim_end()
            .chars()
            .map(|c| if is_reserved_char(c) { char::REPLACEMENT_CHARACTER } else { c })
            .collect();
        self.position += advance;
        Some(line)
    }

    fn lex(&mut self, line: &str) -> FragmentKind {
        if self.raw {
            return if line.trim().is_empty() {
                FragmentKind::BlankLine
            } else {
                FragmentKind::RawLine(line.to_string())
            };
        }

        let kind = classify(line);

        if self.skipping {
            return if matches!(
                kind,
                FragmentKind::ConditionalDirective(_) | FragmentKind::EndifDirective(_)
            ) {
                kind
            } else {
                FragmentKind::RawLine(line.to_string())
            };
        }

        if let Some((open_kind, open_length)) = self.context.verbatim {
            return self.lex_verbatim(line, kind, open_kind, open_length);
        }

        let kind = self.apply_context(line, kind);
        self.context.previous = match &kind {
            FragmentKind::BlankLine => Previous::Blank,
            FragmentKind::InlineElements(_)
            | FragmentKind::Admonition { .. }
            | FragmentKind::ListElementMarker(_)
            | FragmentKind::RawLine(_) => Previous::Prose,
            FragmentKind::BlockDelimiter(_)
            | FragmentKind::AttributeCluster(_)
            | FragmentKind::AttributeDeclaration { .. }
            | FragmentKind::AttributeReset { .. }
            | FragmentKind::SectionHeader { .. }
            | FragmentKind::DocumentAuthorsLine(_)
            | FragmentKind::DocumentRevisionLine(_)
            | FragmentKind::SingleLineComment(_)
            | FragmentKind::FileInclusion { .. }
            | FragmentKind::ConditionalDirective(_)
            | FragmentKind::EndifDirective(_)
            | FragmentKind::ListContinuation
            | FragmentKind::ImageBlock { .. }
            | FragmentKind::ThematicBreak
            | FragmentKind::PageBreak
            | FragmentKind::TableOfContentsMacro => Previous::Structural,
        };
        if let FragmentKind::BlockDelimiter(delimiter) = &kind
            && delimiter.kind.is_verbatim()
        {
            self.context.verbatim = Some((delimiter.kind, delimiter.length));
        }
        kind
    }

    fn lex_verbatim(
        &mut self,
        line: &str,
        kind: FragmentKind,
        open_kind: DelimiterKind,
        open_length: usize,
    ) -> FragmentKind {
        if let FragmentKind::BlockDelimiter(delimiter) = &kind
            && delimiter.kind == open_kind
            && delimiter.length == open_length
        {
            self.context.verbatim = None;
            self.context.previous = Previous::Structural;
            return kind;
        }
        let directive = matches!(
            kind,
            FragmentKind::FileInclusion { .. }
                | FragmentKind::ConditionalDirective(_)
                | FragmentKind::EndifDirective(_)
        );
        if directive && open_kind != DelimiterKind::Comment {
            kind
        } else if line.is_empty() {
            FragmentKind::BlankLine
        } else {
            FragmentKind::RawLine(line.to_string())
        }
    }

    fn apply_context(&mut self, line: &str, kind: FragmentKind) -> FragmentKind {
        let kind = match kind {
            FragmentKind::AttributeDeclaration { .. } | FragmentKind::AttributeReset { .. }
                if self.context.previous == Previous::Prose =>
            {
                FragmentKind::InlineElements(line.to_string())
            }
            other => other,
        };

        match (self.context.header, &kind) {
            (_, FragmentKind::SingleLineComment(_)) | (HeaderState::Done, _) => kind,
            (HeaderState::AwaitingTitle, FragmentKind::SectionHeader { level: 0, .. }) => {
                self.context.header = HeaderState::AfterTitle;
                kind
            }
            (
                HeaderState::AwaitingTitle,
                FragmentKind::BlankLine
                | FragmentKind::AttributeDeclaration { .. }
                | FragmentKind::AttributeReset { .. }
                | FragmentKind::AttributeCluster(_)
                | FragmentKind::ConditionalDirective(_)
                | FragmentKind::EndifDirective(_)
                | FragmentKind::FileInclusion { .. },
            ) => kind,
            (HeaderState::AfterTitle, FragmentKind::InlineElements(text)) => {
                if let Some(authors) = parse_authors(text) {
                    self.context.header = HeaderState::AfterAuthors;
                    FragmentKind::DocumentAuthorsLine(authors)
                } else {
                    self.context.header = HeaderState::Done;
                    kind
                }
            }
            (HeaderState::AfterAuthors, FragmentKind::InlineElements(text)) => {
                self.context.header = HeaderState::Done;
                parse_revision(text).map_or(kind, FragmentKind::DocumentRevisionLine)
            }
            (
                HeaderState::AwaitingTitle | HeaderState::AfterTitle | HeaderState::AfterAuthors,
                _,
            ) => {
                self.context.header = HeaderState::Done;
                kind
            }
        }
    }
}

impl Iterator for Lexer {
    /// The source line and its classification.
    type Item = (String, FragmentKind);

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.next_line()?;
        let kind = self.lex(&line);
        Some((line, kind))
    }
}
