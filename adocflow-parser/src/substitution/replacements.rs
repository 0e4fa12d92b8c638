//! Typographic replacements: `(C)`, `(R)`, `(TM)`, `--`, `...`, arrows and
//! in-word apostrophes.
use super::{
    Scope,
    flatten::{Flat, special_char},
    is_word_char,
};
use crate::model::{Inline, Replacement, ReplacementKind};

/// Sources in matching order; longer forms first where they overlap.
const RULES: &[(&str, ReplacementKind)] = &[
    ("(C)", ReplacementKind::Copyright),
    ("(R)", ReplacementKind::Registered),
    ("(TM)", ReplacementKind::Trademark),
    ("...", ReplacementKind::Ellipsis),
    ("->", ReplacementKind::RightArrow),
    ("=>", ReplacementKind::RightDoubleArrow),
    ("<-", ReplacementKind::LeftArrow),
    ("<=", ReplacementKind::LeftDoubleArrow),
    ("--", ReplacementKind::EmDash),
    ("`'", ReplacementKind::Apostrophe),
    ("'", ReplacementKind::Apostrophe),
];

/// Whether `source` is written at `at`, accepting an escaped `<`, `>` or `&`
/// in place of the raw character.
fn written_at(chars: &[char], at: usize, source: &str) -> bool {
    source.chars().enumerate().all(|(offset, expected)| {
        chars
            .get(at + offset)
            .is_some_and(|c| *c == expected || special_char(*c) == Some(expected))
    })
}

/// Context conditions of the forms that are not replaced everywhere.
fn applies(chars: &[char], at: usize, source: &str, kind: ReplacementKind) -> bool {
    let before = at.checked_sub(1).and_then(|index| chars.get(index)).copied();
    let after = chars.get(at + source.chars().count()).copied();
    match kind {
        // `word--word` or a dash standing alone between spaces.
        ReplacementKind::EmDash => {
            let word_on_both_sides = before.is_some_and(is_word_char) && after.is_some_and(is_word_char);
            let spaced =
                before.is_none_or(char::is_whitespace) && after.is_none_or(char::is_whitespace);
            word_on_both_sides || spaced
        }
        // `it's`, and the closing form of an unmatched curly quote.
        ReplacementKind::Apostrophe if source == "'" => {
            before.is_some_and(char::is_alphanumeric) && after.is_some_and(char::is_alphabetic)
        }
        ReplacementKind::Apostrophe => after.is_none_or(|c| !is_word_char(c)),
        ReplacementKind::Copyright
        | ReplacementKind::Registered
        | ReplacementKind::Trademark
        | ReplacementKind::Ellipsis
        | ReplacementKind::RightArrow
        | ReplacementKind::RightDoubleArrow
        | ReplacementKind::LeftArrow
        | ReplacementKind::LeftDoubleArrow => true,
    }
}

pub(super) fn apply(flat: &mut Flat, _scope: &mut Scope<'_>) {
    let mut at = 0;
    while at < flat.chars.len() {
        let found = RULES.iter().find(|(source, kind)| {
            written_at(&flat.chars, at, source) && applies(&flat.chars, at, source, *kind)
        });
        let Some((source, kind)) = found else {
            at += 1;
            continue;
        };
        let width = source.chars().count();
        let marker = flat.leaf(Inline::Replacement(Replacement {
            kind: *kind,
            source: (*source).to_string(),
        }));
        let marker_width = marker.len();
        flat.chars.splice(at..at + width, marker);
        at += marker_width;
    }
}
