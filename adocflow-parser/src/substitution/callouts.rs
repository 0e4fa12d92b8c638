//! `<N>` and `<.>` markers at the end of verbatim lines.
use super::{
    Scope,
    flatten::{Flat, GREATER_THAN, LESS_THAN},
};
use crate::model::{Callout, Inline};

/// Numbering state shared by the lines of one block.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct CalloutCounter {
    last: u32,
}

impl CalloutCounter {
    fn number(&mut self, body: &str) -> Option<u32> {
        let number = if body == "." {
            self.last + 1
        } else {
            body.parse().ok()?
        };
        self.last = number;
        Some(number)
    }
}

fn is_open(c: char) -> bool {
    c == '<' || c == LESS_THAN
}

fn is_close(c: char) -> bool {
    c == '>' || c == GREATER_THAN
}

/// The ranges of the callouts ending `line`, left to right. Each must follow
/// whitespace.
fn trailing_callouts(line: &[char]) -> Vec<(usize, usize, String)> {
    let mut found = Vec::new();
    let mut end = line.len();
    while end > 0 && line.get(end - 1).is_some_and(|c| c.is_whitespace()) {
        end -= 1;
    }
    loop {
        if end == 0 || !line.get(end - 1).copied().is_some_and(is_close) {
            break;
        }
        let mut open = end - 1;
        while open > 0 && line.get(open - 1).is_some_and(|c| c.is_ascii_digit() || *c == '.') {
            open -= 1;
        }
        let body: String = line.get(open..end - 1).unwrap_or_default().iter().collect();
        let valid_body = body == "." || (!body.is_empty() && body.chars().all(|c| c.is_ascii_digit()));
        if !valid_body || open == 0 || !line.get(open - 1).copied().is_some_and(is_open) {
            break;
        }
        let start = open - 1;
        if start > 0 && !line.get(start - 1).is_some_and(|c| c.is_whitespace()) {
            break;
        }
        found.push((start, end, body));
        end = start;
        while end > 0 && line.get(end - 1).is_some_and(|c| c.is_whitespace()) {
            end -= 1;
        }
    }
    found.reverse();
    found
}

pub(super) fn apply(flat: &mut Flat, scope: &mut Scope<'_>) {
    let chars = std::mem::take(&mut flat.chars);
    let mut out = Vec::with_capacity(chars.len());
    for (index, line) in chars.split(|c| *c == '\n').enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let mut copied = 0;
        for (start, end, body) in trailing_callouts(line) {
            let Some(number) = scope.callouts.number(&body) else {
                continue;
            };
            out.extend_from_slice(line.get(copied..start).unwrap_or_default());
            let source = format!("<{body}>");
            out.extend(flat.leaf(Inline::Callout(Callout { number, source })));
            copied = end;
        }
        out.extend_from_slice(line.get(copied..).unwrap_or_default());
    }
    flat.chars = out;
}
