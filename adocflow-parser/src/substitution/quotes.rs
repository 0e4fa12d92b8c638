//! Inline formatting marks (`*bold*`, `__italic__`, `` `mono` ``, `#mark#`,
//! `^super^`, `~sub~`) and curly quote spans (`` "`text`" ``, `` '`text`' ``).
use super::{
    Scope,
    flatten::{CLOSE, Flat, OPEN},
    is_word_char,
};
use crate::{
    grammar::parse_attribute_list,
    model::{Attributes, Inline, QuoteForm, QuotedString, QuotedStringKind, QuotedText, QuotedTextKind},
};

#[derive(Clone, Copy, Debug)]
enum Quote {
    /// Single marker, bounded by non-word characters on the outside and
    /// non-space characters on the inside.
    Constrained(QuotedTextKind),
    /// Doubled marker, allowed anywhere.
    Unconstrained(QuotedTextKind),
    /// Single marker with no whitespace inside: superscript and subscript.
    Tight(QuotedTextKind),
    Curly(QuotedStringKind),
}

/// Passes in order. Curly quotes go before monospace since they are
/// delimited with backticks.
const RULES: &[Quote] = &[
    Quote::Unconstrained(QuotedTextKind::Bold),
    Quote::Constrained(QuotedTextKind::Bold),
    Quote::Curly(QuotedStringKind::DoubleQuote),
    Quote::Curly(QuotedStringKind::SingleQuote),
    Quote::Unconstrained(QuotedTextKind::Monospace),
    Quote::Constrained(QuotedTextKind::Monospace),
    Quote::Unconstrained(QuotedTextKind::Italic),
    Quote::Constrained(QuotedTextKind::Italic),
    Quote::Unconstrained(QuotedTextKind::Marked),
    Quote::Constrained(QuotedTextKind::Marked),
    Quote::Tight(QuotedTextKind::Superscript),
    Quote::Tight(QuotedTextKind::Subscript),
];

#[derive(Debug)]
struct Span {
    start: usize,
    content: std::ops::Range<usize>,
    end: usize,
    prefix: Option<String>,
}

/// Container markers inside the content must nest properly.
fn is_balanced(chars: &[char]) -> bool {
    let mut depth = 0usize;
    for c in chars {
        match *c {
            OPEN => depth += 1,
            CLOSE => match depth.checked_sub(1) {
                Some(next) => depth = next,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

fn is_space(chars: &[char], index: usize) -> bool {
    chars.get(index).is_none_or(|c| c.is_whitespace())
}

/// A `[...]` attribute prefix ending right before `at`: its start and text.
fn prefix_before(chars: &[char], at: usize) -> Option<(usize, String)> {
    if at == 0 || chars.get(at - 1) != Some(&']') {
        return None;
    }
    let open = (0..at - 1)
        .rev()
        .take_while(|&index| chars.get(index).is_some_and(|c| !matches!(c, ']' | '\n')))
        .find(|&index| chars.get(index) == Some(&'['))?;
    let text: String = chars.get(open..at)?.iter().collect();
    Some((open, text))
}

/// Whether the character before `index` allows a constrained mark to open.
fn opens_after(chars: &[char], index: usize) -> bool {
    index == 0
        || chars
            .get(index - 1)
            .is_some_and(|c| !is_word_char(*c) && !matches!(c, ';' | ':' | '}'))
}

fn matches_at(chars: &[char], at: usize, pattern: &[char]) -> bool {
    pattern
        .iter()
        .enumerate()
        .all(|(offset, expected)| chars.get(at + offset) == Some(expected))
}

fn find_span(chars: &[char], at: usize, quote: Quote) -> Option<Span> {
    let (open, close): (Vec<char>, Vec<char>) = match quote {
        Quote::Constrained(kind) | Quote::Tight(kind) => (vec![kind.marker()], vec![kind.marker()]),
        Quote::Unconstrained(kind) => (vec![kind.marker(); 2], vec![kind.marker(); 2]),
        Quote::Curly(QuotedStringKind::DoubleQuote) => (vec!['"', '`'], vec!['`', '"']),
        Quote::Curly(QuotedStringKind::SingleQuote) => (vec!['\'', '`'], vec!['`', '\'']),
    };
    if !matches_at(chars, at, &open) {
        return None;
    }

    let prefix = match quote {
        Quote::Curly(_) => None,
        Quote::Constrained(_) | Quote::Unconstrained(_) | Quote::Tight(_) => prefix_before(chars, at),
    };
    let start = prefix.as_ref().map_or(at, |(open, _)| *open);
    if matches!(quote, Quote::Constrained(_) | Quote::Curly(_)) && !opens_after(chars, start) {
        return None;
    }

    let content_start = at + open.len();
    if is_space(chars, content_start) {
        return None;
    }
    let close_at = (content_start..chars.len()).find(|&index| {
        if !matches_at(chars, index, &close) {
            return false;
        }
        match quote {
            Quote::Unconstrained(_) | Quote::Tight(_) => index > content_start,
            Quote::Constrained(_) | Quote::Curly(_) => {
                index > content_start
                    && !is_space(chars, index - 1)
                    && chars
                        .get(index + close.len())
                        .is_none_or(|c| !is_word_char(*c))
            }
        }
    })?;

    let content = chars.get(content_start..close_at)?;
    if matches!(quote, Quote::Tight(_)) && content.iter().any(|c| c.is_whitespace()) {
        return None;
    }
    if !is_balanced(content) {
        return None;
    }
    Some(Span {
        start,
        content: content_start..close_at,
        end: close_at + close.len(),
        prefix: prefix.map(|(_, text)| text),
    })
}

fn node(quote: Quote, prefix: Option<String>) -> Inline {
    let attributes = prefix
        .as_deref()
        .and_then(|prefix| prefix.strip_prefix('[')?.strip_suffix(']'))
        .and_then(parse_attribute_list)
        .unwrap_or_else(Attributes::new);
    match quote {
        Quote::Constrained(kind) | Quote::Tight(kind) => Inline::QuotedText(QuotedText {
            kind,
            form: QuoteForm::Constrained,
            elements: Vec::new(),
            attributes,
            prefix,
        }),
        Quote::Unconstrained(kind) => Inline::QuotedText(QuotedText {
            kind,
            form: QuoteForm::Unconstrained,
            elements: Vec::new(),
            attributes,
            prefix,
        }),
        Quote::Curly(kind) => Inline::QuotedString(QuotedString {
            kind,
            elements: Vec::new(),
        }),
    }
}

fn apply_rule(flat: &mut Flat, quote: Quote) {
    let mut at = 0;
    while at < flat.chars.len() {
        let Some(span) = find_span(&flat.chars, at, quote) else {
            at += 1;
            continue;
        };
        let content = flat.chars.get(span.content.clone()).map(<[char]>::to_vec).unwrap_or_default();
        let replacement = flat.container(node(quote, span.prefix), &content);
        let width = replacement.len();
        flat.chars.splice(span.start..span.end, replacement);
        at = span.start + width;
    }
}

pub(super) fn apply(flat: &mut Flat, _scope: &mut Scope<'_>) {
    for quote in RULES {
        apply_rule(flat, *quote);
    }
}
