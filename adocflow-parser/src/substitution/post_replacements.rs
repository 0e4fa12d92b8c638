//! Forced line breaks.
use super::{
    Scope,
    flatten::{Flat, NODE},
};
use crate::model::{Inline, LineBreak};

fn line_break(flat: &mut Flat, source: &str) -> Vec<char> {
    flat.leaf(Inline::LineBreak(LineBreak {
        source: source.to_string(),
    }))
}

pub(super) fn apply(flat: &mut Flat, scope: &mut Scope<'_>) {
    let chars = std::mem::take(&mut flat.chars);
    let mut out = Vec::with_capacity(chars.len());
    let mut at = 0;
    while let Some(&c) = chars.get(at) {
        let line_ends = |index: usize| chars.get(index).is_none_or(|c| *c == '\n');
        if c == ' ' && chars.get(at + 1) == Some(&'+') && line_ends(at + 2) && at > 0 {
            out.extend(line_break(flat, " +"));
            at += 2;
            continue;
        }
        if c == '\n' && scope.hardbreaks && !ends_with_break(flat, &out) {
            out.extend(line_break(flat, ""));
        }
        out.push(c);
        at += 1;
    }
    flat.chars = out;
}

/// Whether the text so far already ends with a line break node.
fn ends_with_break(flat: &Flat, out: &[char]) -> bool {
    let start = out
        .iter()
        .rposition(|c| *c == NODE)
        .unwrap_or(out.len());
    let Some(tail) = out.get(start..) else {
        return false;
    };
    if tail.len() < 2 {
        return false;
    }
    matches!(flat.inlines_of(tail).as_slice(), [Inline::LineBreak(_)])
}
