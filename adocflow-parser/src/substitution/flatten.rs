//! The working form every pass reads and rewrites: the inline text as a
//! `Vec<char>` where already-produced nodes are spliced in as reserved
//! noncharacters (U+FDD0..U+FDDF). The lexer scrubs those code points from
//! the input, so they can never be confused with document text.
use crate::model::{Inline, inlines_to_source};

/// Marks a finished node; followed by its index.
pub(super) const NODE: char = '\u{FDD0}';
pub(super) const LESS_THAN: char = '\u{FDD1}';
pub(super) const GREATER_THAN: char = '\u{FDD2}';
pub(super) const AMPERSAND: char = '\u{FDD3}';
/// Opens a node whose children are the text up to the matching [`CLOSE`];
/// followed by its index.
pub(super) const OPEN: char = '\u{FDD4}';
pub(super) const CLOSE: char = '\u{FDD5}';
const FIRST_DIGIT: u32 = 0xFDD6;

pub(super) fn is_placeholder(c: char) -> bool {
    ('\u{FDD0}'..='\u{FDDF}').contains(&c)
}

fn digit_value(c: char) -> Option<usize> {
    let value = u32::from(c).checked_sub(FIRST_DIGIT)?;
    (value < 10).then(|| usize::try_from(value).unwrap_or_default())
}

fn push_index(out: &mut Vec<char>, index: usize) {
    for digit in index.to_string().bytes() {
        let value = FIRST_DIGIT + u32::from(digit - b'0');
        out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
}

/// The special character a placeholder stands for.
pub(super) fn special_char(c: char) -> Option<char> {
    match c {
        LESS_THAN => Some('<'),
        GREATER_THAN => Some('>'),
        AMPERSAND => Some('&'),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub(super) struct Flat {
    pub(super) chars: Vec<char>,
    nodes: Vec<Inline>,
}

impl Flat {
    pub(super) fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            nodes: Vec::new(),
        }
    }

    /// Re-enter substituted content: text stays text, every other node
    /// becomes opaque.
    #[cfg(test)]
    pub(super) fn from_inlines(inlines: &[Inline]) -> Self {
        let mut flat = Self::default();
        for inline in inlines {
            if let Inline::StringElement(text) = inline {
                flat.chars.extend(text.chars());
            } else {
                let marker = flat.leaf(inline.clone());
                flat.chars.extend(marker);
            }
        }
        flat
    }

    /// Register a finished node and return the characters that stand for it.
    pub(super) fn leaf(&mut self, node: Inline) -> Vec<char> {
        let mut marker = vec![NODE];
        push_index(&mut marker, self.nodes.len());
        self.nodes.push(node);
        marker
    }

    /// Register a node whose children are `content` and return the characters
    /// that stand for it, content included.
    pub(super) fn container(&mut self, node: Inline, content: &[char]) -> Vec<char> {
        let mut marker = vec![OPEN];
        push_index(&mut marker, self.nodes.len());
        self.nodes.push(node);
        marker.extend_from_slice(content);
        marker.push(CLOSE);
        marker
    }

    pub(super) fn to_inlines(&self) -> Vec<Inline> {
        self.inlines_of(&self.chars)
    }

    /// The source text `chars` was produced from.
    pub(super) fn source_of(&self, chars: &[char]) -> String {
        inlines_to_source(&self.inlines_of(chars))
    }

    /// Build the inline nodes for a run of characters of this text.
    ///
    /// Unbalanced container markers do not fail: a stray close is ignored and
    /// an unclosed container ends with the run.
    pub(super) fn inlines_of(&self, chars: &[char]) -> Vec<Inline> {
        let mut stack: Vec<(Option<Inline>, Vec<Inline>)> = vec![(None, Vec::new())];
        let mut text = String::new();
        let mut iter = chars.iter().copied().peekable();

        while let Some(c) = iter.next() {
            match c {
                NODE | OPEN => {
                    let mut index = None;
                    while let Some(value) = iter.peek().copied().and_then(digit_value) {
                        index = Some(index.unwrap_or(0) * 10 + value);
                        iter.next();
                    }
                    let node = index.and_then(|index| self.nodes.get(index)).cloned();
                    flush(&mut text, &mut stack);
                    if c == OPEN {
                        stack.push((node, Vec::new()));
                    } else if let Some(node) = node
                        && let Some((_, children)) = stack.last_mut()
                    {
                        children.push(node);
                    }
                }
                CLOSE => {
                    flush(&mut text, &mut stack);
                    if stack.len() > 1 {
                        close(&mut stack);
                    }
                }
                LESS_THAN | GREATER_THAN | AMPERSAND => {
                    flush(&mut text, &mut stack);
                    if let Some((_, children)) = stack.last_mut() {
                        children.push(Inline::special(special_char(c).unwrap_or(c)));
                    }
                }
                c if is_placeholder(c) => {
                    tracing::trace!(?c, "stray placeholder digit dropped");
                }
                c => text.push(c),
            }
        }
        flush(&mut text, &mut stack);
        while stack.len() > 1 {
            close(&mut stack);
        }
        stack.pop().map(|(_, children)| children).unwrap_or_default()
    }
}

fn flush(text: &mut String, stack: &mut [(Option<Inline>, Vec<Inline>)]) {
    if text.is_empty() {
        return;
    }
    if let Some((_, children)) = stack.last_mut() {
        children.push(Inline::StringElement(std::mem::take(text)));
    }
}

fn close(stack: &mut Vec<(Option<Inline>, Vec<Inline>)>) {
    let Some((node, children)) = stack.pop() else {
        return;
    };
    let Some((_, parent)) = stack.last_mut() else {
        return;
    };
    match node {
        Some(mut node) => {
            if let Some(slot) = node.children_mut() {
                *slot = children;
            }
            parent.push(node);
        }
        None => parent.extend(children),
    }
}
