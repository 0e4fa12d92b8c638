use serde::Serialize;

use super::Attributes;

/// A node of substituted inline content.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "name", content = "value", rename_all = "snake_case")]
pub enum Inline {
    StringElement(String),
    SpecialCharacter(SpecialCharacter),
    QuotedText(QuotedText),
    QuotedString(QuotedString),
    Replacement(Replacement),
    AttributeReference(AttributeReference),
    Passthrough(InlinePassthrough),
    InlineLink(InlineLink),
    InlineImage(InlineImage),
    Icon(Icon),
    Keyboard(Keyboard),
    Button(Button),
    FootnoteReference(FootnoteReference),
    CrossReference(CrossReference),
    InlineAnchor(InlineAnchor),
    UserMacro(UserMacro),
    Callout(Callout),
    LineBreak(LineBreak),
}

impl Inline {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::StringElement(text.into())
    }

    /// One of `<`, `>` or `&`.
    #[must_use]
    pub fn special(character: char) -> Self {
        Self::SpecialCharacter(SpecialCharacter {
            name: character.to_string(),
        })
    }

    /// The nested inline content of container nodes.
    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<Inline>> {
        match self {
            Self::QuotedText(quoted) => Some(&mut quoted.elements),
            Self::QuotedString(quoted) => Some(&mut quoted.elements),
            Self::InlineLink(link) => Some(&mut link.text),
            Self::CrossReference(xref) => Some(&mut xref.text),
            Self::StringElement(_)
            | Self::SpecialCharacter(_)
            | Self::Replacement(_)
            | Self::AttributeReference(_)
            | Self::Passthrough(_)
            | Self::InlineImage(_)
            | Self::Icon(_)
            | Self::Keyboard(_)
            | Self::Button(_)
            | Self::FootnoteReference(_)
            | Self::InlineAnchor(_)
            | Self::UserMacro(_)
            | Self::Callout(_)
            | Self::LineBreak(_) => None,
        }
    }

    /// Reconstruct the raw source this node was produced from.
    #[must_use]
    pub fn to_source(&self) -> String {
        match self {
            Self::StringElement(text) => text.clone(),
            Self::SpecialCharacter(special) => special.name.clone(),
            Self::QuotedText(quoted) => {
                let marker = quoted.kind.marker();
                let delimiter = match quoted.form {
                    QuoteForm::Constrained => marker.to_string(),
                    QuoteForm::Unconstrained => format!("{marker}{marker}"),
                };
                format!(
                    "{}{delimiter}{}{delimiter}",
                    quoted.prefix.as_deref().unwrap_or_default(),
                    inlines_to_source(&quoted.elements)
                )
            }
            Self::QuotedString(quoted) => {
                let (open, close) = match quoted.kind {
                    QuotedStringKind::DoubleQuote => ("\"`", "`\""),
                    QuotedStringKind::SingleQuote => ("'`", "`'"),
                };
                format!("{open}{}{close}", inlines_to_source(&quoted.elements))
            }
            Self::Replacement(replacement) => replacement.source.clone(),
            Self::AttributeReference(reference) => format!("{{{}}}", reference.name),
            Self::Passthrough(passthrough) => passthrough.source.clone(),
            Self::InlineLink(InlineLink { source, .. })
            | Self::InlineImage(InlineImage { source, .. })
            | Self::Icon(Icon { source, .. })
            | Self::Keyboard(Keyboard { source, .. })
            | Self::Button(Button { source, .. })
            | Self::FootnoteReference(FootnoteReference { source, .. })
            | Self::CrossReference(CrossReference { source, .. })
            | Self::InlineAnchor(InlineAnchor { source, .. })
            | Self::UserMacro(UserMacro { source, .. })
            | Self::Callout(Callout { source, .. })
            | Self::LineBreak(LineBreak { source }) => source.clone(),
        }
    }

    /// The text a reader would see, without markup.
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::StringElement(text) => text.clone(),
            Self::SpecialCharacter(special) => special.name.clone(),
            Self::QuotedText(QuotedText { elements, .. })
            | Self::QuotedString(QuotedString { elements, .. })
            | Self::Passthrough(InlinePassthrough { elements, .. }) => inlines_to_plain_text(elements),
            Self::Replacement(replacement) => replacement.kind.rendered().to_string(),
            Self::AttributeReference(reference) => format!("{{{}}}", reference.name),
            Self::InlineLink(link) => {
                if link.text.is_empty() {
                    link.target.clone()
                } else {
                    inlines_to_plain_text(&link.text)
                }
            }
            Self::CrossReference(xref) => {
                if xref.text.is_empty() {
                    format!("[{}]", xref.target)
                } else {
                    inlines_to_plain_text(&xref.text)
                }
            }
            Self::InlineImage(image) => image
                .attributes
                .positional(0)
                .map_or_else(String::new, ToString::to_string),
            Self::Keyboard(keyboard) => keyboard.keys.join("+"),
            Self::Button(button) => button.label.clone(),
            Self::Icon(_)
            | Self::FootnoteReference(_)
            | Self::InlineAnchor(_)
            | Self::UserMacro(_)
            | Self::Callout(_)
            | Self::LineBreak(_) => String::new(),
        }
    }
}

/// Reconstruct raw source from a sequence of inline nodes.
#[must_use]
pub fn inlines_to_source(inlines: &[Inline]) -> String {
    inlines.iter().map(Inline::to_source).collect()
}

/// Render a sequence of inline nodes as plain text.
#[must_use]
pub fn inlines_to_plain_text(inlines: &[Inline]) -> String {
    inlines.iter().map(Inline::to_plain_text).collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpecialCharacter {
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotedTextKind {
    Bold,
    Italic,
    Monospace,
    Marked,
    Superscript,
    Subscript,
}

impl QuotedTextKind {
    #[must_use]
    pub fn marker(self) -> char {
        match self {
            Self::Bold => '*',
            Self::Italic => '_',
            Self::Monospace => '`',
            Self::Marked => '#',
            Self::Superscript => '^',
            Self::Subscript => '~',
        }
    }

    #[must_use]
    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '*' => Some(Self::Bold),
            '_' => Some(Self::Italic),
            '`' => Some(Self::Monospace),
            '#' => Some(Self::Marked),
            '^' => Some(Self::Superscript),
            '~' => Some(Self::Subscript),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteForm {
    Constrained,
    Unconstrained,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuotedText {
    pub kind: QuotedTextKind,
    pub form: QuoteForm,
    pub elements: Vec<Inline>,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    /// The raw `[...]` attribute prefix, kept for source reconstruction.
    #[serde(skip)]
    pub prefix: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotedStringKind {
    SingleQuote,
    DoubleQuote,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuotedString {
    pub kind: QuotedStringKind,
    pub elements: Vec<Inline>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementKind {
    Copyright,
    Registered,
    Trademark,
    EmDash,
    Ellipsis,
    RightArrow,
    RightDoubleArrow,
    LeftArrow,
    LeftDoubleArrow,
    Apostrophe,
}

impl ReplacementKind {
    #[must_use]
    pub fn rendered(self) -> &'static str {
        match self {
            Self::Copyright => "\u{a9}",
            Self::Registered => "\u{ae}",
            Self::Trademark => "\u{2122}",
            Self::EmDash => "\u{2014}",
            Self::Ellipsis => "\u{2026}",
            Self::RightArrow => "\u{2192}",
            Self::RightDoubleArrow => "\u{21d2}",
            Self::LeftArrow => "\u{2190}",
            Self::LeftDoubleArrow => "\u{21d0}",
            Self::Apostrophe => "\u{2019}",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Replacement {
    pub kind: ReplacementKind,
    pub source: String,
}

/// A `{name}` reference left in place because the attribute was not defined.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeReference {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassthroughKind {
    /// `+text+`
    SinglePlus,
    /// `++text++`
    DoublePlus,
    /// `+++text+++`
    TriplePlus,
    /// `pass:SUBS[text]`
    Macro { subs: String },
    /// `\{name}`
    Escape,
}

/// Content protected from further substitution.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InlinePassthrough {
    pub kind: PassthroughKind,
    pub elements: Vec<Inline>,
    pub source: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// A bare or bracketed URL with a scheme.
    Url,
    /// `link:target[text]`
    Link,
    /// `mailto:address[text]`
    Mailto,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InlineLink {
    pub kind: LinkKind,
    pub target: String,
    pub text: Vec<Inline>,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip)]
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InlineImage {
    pub target: String,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip)]
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Icon {
    pub target: String,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip)]
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Keyboard {
    pub keys: Vec<String>,
    #[serde(skip)]
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Button {
    pub label: String,
    #[serde(skip)]
    pub source: String,
}

/// The in-text marker of a footnote; the content lives in [`super::Document::footnotes`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FootnoteReference {
    pub number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip)]
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CrossReference {
    pub target: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub text: Vec<Inline>,
    #[serde(skip)]
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InlineAnchor {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reftext: Option<String>,
    #[serde(skip)]
    pub source: String,
}

/// An expansion of a macro registered through [`crate::OptionsBuilder::with_macro`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserMacro {
    pub name: String,
    pub target: String,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub expansion: String,
    #[serde(skip)]
    pub source: String,
}

/// A forced line break: a trailing ` +`, or any line end under `hardbreaks`.
///
/// The newline itself stays in the surrounding text.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineBreak {
    #[serde(skip)]
    pub source: String,
}

/// A `<N>` marker at the end of a verbatim line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Callout {
    pub number: u32,
    #[serde(skip)]
    pub source: String,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_source_of_nested_quotes() {
        let inlines = vec![
            Inline::text("a "),
            Inline::QuotedText(QuotedText {
                kind: QuotedTextKind::Bold,
                form: QuoteForm::Constrained,
                elements: vec![
                    Inline::text("b "),
                    Inline::QuotedText(QuotedText {
                        kind: QuotedTextKind::Italic,
                        form: QuoteForm::Unconstrained,
                        elements: vec![Inline::text("c")],
                        attributes: Attributes::new(),
                        prefix: None,
                    }),
                ],
                attributes: Attributes::new(),
                prefix: Some("[.x]".into()),
            }),
            Inline::special('&'),
        ];
        assert_eq!(inlines_to_source(&inlines), "a [.x]*b __c__*&");
        assert_eq!(inlines_to_plain_text(&inlines), "a b c&");
    }

    #[test]
    fn test_plain_text_of_replacements() {
        let inlines = vec![
            Inline::Replacement(Replacement {
                kind: ReplacementKind::Copyright,
                source: "(C)".into(),
            }),
            Inline::text(" 2024"),
        ];
        assert_eq!(inlines_to_plain_text(&inlines), "\u{a9} 2024");
        assert_eq!(inlines_to_source(&inlines), "(C) 2024");
    }
}
