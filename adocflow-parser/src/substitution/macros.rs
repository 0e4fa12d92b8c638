//! Inline macros: links and autolinks, images, icons, keyboard and button
//! macros, cross references, anchors, footnotes and user-defined macros.
use super::{Scope, flatten::Flat};
use crate::{
    grammar::parse_macro_attributes,
    model::{
        AttributeValue, Attributes, Button, CrossReference, FootnoteReference, Icon, Inline, InlineAnchor,
        InlineImage, InlineLink, Keyboard, LinkKind, UserMacro,
    },
};

#[derive(Debug)]
enum Macro<'a> {
    Keyboard(&'a str),
    Button(&'a str),
    Icon { target: &'a str, attributes: &'a str },
    Image { target: &'a str, attributes: &'a str },
    Link { kind: LinkKind, target: &'a str, text: Option<&'a str> },
    CrossReference { target: &'a str, text: Option<&'a str> },
    Anchor { id: &'a str, reftext: Option<&'a str> },
    Footnote { id: Option<&'a str>, text: &'a str },
    User { name: &'a str, target: &'a str, attributes: &'a str },
}

peg::parser! {
    grammar inline_macro() for str {
        /// A macro at the start of the input and the number of bytes it spans.
        pub(super) rule at() -> (Macro<'input>, usize)
            = m:inline_macro() end:position!() [_]* { (m, end) }

        rule inline_macro() -> Macro<'input>
            = "kbd:" keys:bracket() { Macro::Keyboard(keys) }
            / "btn:" label:bracket() { Macro::Button(label) }
            / "icon:" target:target() attributes:bracket() { Macro::Icon { target, attributes } }
            / "image:" !":" target:target() attributes:bracket() { Macro::Image { target, attributes } }
            / "link:" target:target() text:bracket() {
                Macro::Link { kind: LinkKind::Link, target, text: Some(text) }
            }
            / "mailto:" target:target() text:bracket() {
                Macro::Link { kind: LinkKind::Mailto, target, text: Some(text) }
            }
            / target:$(scheme() "://" target()) text:bracket()? {
                Macro::Link { kind: LinkKind::Url, target, text }
            }
            / "xref:" target:target() text:bracket() {
                Macro::CrossReference { target, text: Some(text).filter(|text| !text.is_empty()) }
            }
            / less() less() target:$(id_char()+) text:("," _ text:$((!(greater() greater()) [_])+) { text })?
              greater() greater() {
                Macro::CrossReference { target, text }
            }
            / "[[" id:$(id_start() id_char()*) reftext:("," _ text:$((!"]]" [_])+) { text })? "]]" {
                Macro::Anchor { id, reftext }
            }
            / "anchor:" id:$(id_start() id_char()*) reftext:bracket() {
                Macro::Anchor { id, reftext: Some(reftext).filter(|text| !text.is_empty()) }
            }
            / "footnote:" id:$(id_char()*) text:bracket() {
                Macro::Footnote { id: Some(id).filter(|id| !id.is_empty()), text }
            }
            / "footnoteref:[" id:$(id_char()+) text:("," _ text:$(("\\]" / !"]" [_])*) { text })? "]" {
                Macro::Footnote { id: Some(id), text: text.unwrap_or_default() }
            }
            / name:$(['a'..='z' | 'A'..='Z'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-']*) ":"
              target:$(target()?) attributes:bracket() {
                Macro::User { name, target, attributes }
            }

        rule scheme() = "https" / "http" / "ftp" / "irc"
        rule target() -> &'input str
            = $((!['[' | ' ' | '\t' | '\n' | '\u{FDD0}'..='\u{FDD2}' | '\u{FDD4}'..='\u{FDDF}'] [_])+)
        rule bracket() -> &'input str = "[" text:$(("\\]" / !"]" [_])*) "]" { text }
        rule id_start() = ['a'..='z' | 'A'..='Z' | '_' | ':']
        rule id_char() = ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' | '.' | ':']
        rule less() = "<" / "\u{FDD1}"
        rule greater() = ">" / "\u{FDD2}"
        rule _ = [' ' | '\t']*
    }
}

fn chars(text: &str) -> Vec<char> {
    text.chars().collect()
}

/// Source text of a macro part that was already substituted.
fn plain(flat: &Flat, text: &str) -> String {
    flat.source_of(&chars(text))
}

/// Trailing punctuation that ends a sentence rather than a bare URL.
const URL_TRAILERS: &[char] = &['.', ',', ';', ':', '!', '?', ')'];

/// The node a macro produces and how many characters of the text it spans.
fn expand(flat: &mut Flat, scope: &mut Scope<'_>, found: Macro<'_>, matched: &[char]) -> Option<(Vec<char>, usize)> {
    let mut width = matched.len();

    let marker = match found {
        Macro::Keyboard(keys) => {
            let keys = plain(flat, keys);
            let separator = if keys.contains('+') { '+' } else { ',' };
            let keys = keys
                .split(separator)
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(ToString::to_string)
                .collect();
            let source = flat.source_of(matched);
            flat.leaf(Inline::Keyboard(Keyboard { keys, source }))
        }
        Macro::Button(label) => {
            let label = plain(flat, label);
            let source = flat.source_of(matched);
            flat.leaf(Inline::Button(Button { label, source }))
        }
        Macro::Icon { target, attributes } => {
            let target = plain(flat, target);
            let attributes = parse_macro_attributes(&plain(flat, attributes)).unwrap_or_default();
            let source = flat.source_of(matched);
            flat.leaf(Inline::Icon(Icon { target, attributes, source }))
        }
        Macro::Image { target, attributes } => {
            let target = plain(flat, target);
            let mut attributes = parse_macro_attributes(&plain(flat, attributes)).unwrap_or_default();
            if let Some(alt) = attributes.positional(0).map(ToString::to_string) {
                attributes.insert("alt", AttributeValue::String(alt));
            }
            let source = flat.source_of(matched);
            flat.leaf(Inline::InlineImage(InlineImage { target, attributes, source }))
        }
        Macro::Link { kind, target, text } => {
            let mut target = plain(flat, target);
            if text.is_none() {
                while let Some(stripped) = target.strip_suffix(URL_TRAILERS) {
                    target = stripped.to_string();
                    width -= 1;
                }
            }
            let source = flat.source_of(matched.get(..width)?);
            let node = Inline::InlineLink(InlineLink {
                kind,
                target,
                text: Vec::new(),
                attributes: Attributes::new(),
                source,
            });
            match text.filter(|text| !text.is_empty()) {
                Some(text) => flat.container(node, &chars(text)),
                None => flat.leaf(node),
            }
        }
        Macro::CrossReference { target, text } => {
            let source = flat.source_of(matched);
            let node = Inline::CrossReference(CrossReference {
                target: target.to_string(),
                text: Vec::new(),
                source,
            });
            match text {
                Some(text) => flat.container(node, &chars(text)),
                None => flat.leaf(node),
            }
        }
        Macro::Anchor { id, reftext } => {
            let reftext = reftext.map(|text| plain(flat, text));
            let source = flat.source_of(matched);
            flat.leaf(Inline::InlineAnchor(InlineAnchor {
                id: id.to_string(),
                reftext,
                source,
            }))
        }
        Macro::Footnote { id, text } => {
            let number = if text.is_empty() {
                let Some(number) = id.and_then(|id| scope.footnotes.lookup(id)) else {
                    tracing::warn!(id = ?id, "reference to an undefined footnote, keeping it as text");
                    return None;
                };
                number
            } else {
                let content = flat.inlines_of(&chars(text));
                scope.footnotes.define(id, content)
            };
            let source = flat.source_of(matched);
            flat.leaf(Inline::FootnoteReference(FootnoteReference {
                number,
                id: id.map(ToString::to_string),
                source,
            }))
        }
        Macro::User { name, target, attributes } => {
            let template = scope.macros.get(name)?;
            let target = plain(flat, target);
            let attributes = parse_macro_attributes(&plain(flat, attributes)).unwrap_or_default();
            let mut expansion = template.replace("{target}", &target);
            for (key, value) in attributes.iter() {
                expansion = expansion.replace(&format!("{{{key}}}"), &value.to_text());
            }
            let source = flat.source_of(matched);
            flat.leaf(Inline::UserMacro(UserMacro {
                name: name.to_string(),
                target,
                attributes,
                expansion,
                source,
            }))
        }
    };
    Some((marker, width))
}

pub(super) fn apply(flat: &mut Flat, scope: &mut Scope<'_>) {
    let mut at = 0;
    while at < flat.chars.len() {
        let opens = at == 0 || flat.chars.get(at - 1).is_some_and(|c| !c.is_alphanumeric());
        if !opens {
            at += 1;
            continue;
        }
        let rest: String = flat.chars.get(at..).unwrap_or_default().iter().collect();
        let Ok((found, bytes)) = inline_macro::at(&rest) else {
            at += 1;
            continue;
        };
        let matched_width = rest.get(..bytes).map_or(0, |matched| matched.chars().count());
        let matched = flat.chars.get(at..at + matched_width).map(<[char]>::to_vec).unwrap_or_default();
        match expand(flat, scope, found, &matched) {
            Some((marker, width)) => {
                let marker_width = marker.len();
                flat.chars.splice(at..at + width, marker);
                at += marker_width;
            }
            None => at += 1,
        }
    }
}
