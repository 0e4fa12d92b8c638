//! `+text+`, `++text++`, `+++text+++` and `pass:SUBS[text]`: content that
//! later passes must not touch.
use super::{Scope, flatten::Flat, is_word_char, substitute_text};
use crate::model::{
    Inline, InlinePassthrough, NONE, PassthroughKind, SubstitutionKind, SubstitutionList,
};

struct Found {
    end: usize,
    kind: PassthroughKind,
    content: String,
}

fn text_of(chars: &[char]) -> String {
    chars.iter().collect()
}

fn starts_with(chars: &[char], at: usize, pattern: &str) -> bool {
    pattern
        .chars()
        .enumerate()
        .all(|(offset, expected)| chars.get(at + offset) == Some(&expected))
}

/// Position of the next occurrence of `pattern` at or after `from`.
fn find(chars: &[char], from: usize, pattern: &str) -> Option<usize> {
    (from..chars.len()).find(|&at| starts_with(chars, at, pattern))
}

/// `+++`, `++` or a constrained `+` span starting at `at`.
fn plus_span(chars: &[char], at: usize) -> Option<Found> {
    if starts_with(chars, at, "+++") {
        let close = find(chars, at + 3, "+++")?;
        return Some(Found {
            end: close + 3,
            kind: PassthroughKind::TriplePlus,
            content: text_of(chars.get(at + 3..close)?),
        });
    }
    if starts_with(chars, at, "++") {
        let close = find(chars, at + 2, "++")?;
        if close == at + 2 {
            return None;
        }
        return Some(Found {
            end: close + 2,
            kind: PassthroughKind::DoublePlus,
            content: text_of(chars.get(at + 2..close)?),
        });
    }

    let before_ok = at == 0 || chars.get(at - 1).is_some_and(|c| !is_word_char(*c));
    let first = chars.get(at + 1)?;
    if !before_ok || first.is_whitespace() || *first == '+' {
        return None;
    }
    let close = (at + 1..chars.len()).find(|&index| {
        chars.get(index) == Some(&'+')
            && index > at + 1
            && chars.get(index - 1).is_some_and(|c| !c.is_whitespace())
            && chars.get(index + 1).is_none_or(|c| !is_word_char(*c))
    })?;
    Some(Found {
        end: close + 1,
        kind: PassthroughKind::SinglePlus,
        content: text_of(chars.get(at + 1..close)?),
    })
}

/// `pass:SUBS[text]` starting at `at`.
fn pass_macro(chars: &[char], at: usize) -> Option<Found> {
    if !starts_with(chars, at, "pass:") {
        return None;
    }
    let subs_start = at + 5;
    let open = (subs_start..chars.len())
        .take_while(|&index| {
            chars
                .get(index)
                .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, ',' | '+' | '-' | '_' | '['))
        })
        .find(|&index| chars.get(index) == Some(&'['))?;
    let mut close = open + 1;
    loop {
        match chars.get(close)? {
            '\\' if chars.get(close + 1) == Some(&']') => close += 2,
            ']' => break,
            _ => close += 1,
        }
    }
    Some(Found {
        end: close + 1,
        kind: PassthroughKind::Macro {
            subs: text_of(chars.get(subs_start..open)?),
        },
        content: text_of(chars.get(open + 1..close)?).replace("\\]", "]"),
    })
}

pub(super) fn apply(flat: &mut Flat, scope: &mut Scope<'_>) {
    let mut at = 0;
    while at < flat.chars.len() {
        let candidate = match flat.chars.get(at) {
            Some('+') => plus_span(&flat.chars, at),
            Some('p') if at == 0 || flat.chars.get(at - 1).is_some_and(|c| !is_word_char(*c)) => {
                pass_macro(&flat.chars, at)
            }
            Some(_) | None => None,
        };
        let Some(found) = candidate else {
            at += 1;
            continue;
        };

        let subs: SubstitutionList = match &found.kind {
            PassthroughKind::TriplePlus | PassthroughKind::Escape => SubstitutionList::new(NONE),
            PassthroughKind::SinglePlus | PassthroughKind::DoublePlus => {
                SubstitutionList::new(&[SubstitutionKind::SpecialCharacters])
            }
            PassthroughKind::Macro { subs } => match SubstitutionList::compile(subs, NONE) {
                Ok(list) => list,
                Err(error) => {
                    tracing::error!(%subs, ?error, "invalid substitutions in pass macro");
                    scope.fail(error);
                    return;
                }
            },
        };
        let elements = match substitute_text(&found.content, subs.as_slice(), scope) {
            Ok(elements) => elements,
            Err(error) => {
                scope.fail(error);
                return;
            }
        };
        let source = text_of(flat.chars.get(at..found.end).unwrap_or_default());
        let marker = flat.leaf(Inline::Passthrough(InlinePassthrough {
            kind: found.kind,
            elements,
            source,
        }));
        let width = marker.len();
        flat.chars.splice(at..found.end, marker);
        at += width;
    }
}
