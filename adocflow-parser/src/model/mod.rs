//! The data model produced by the pipeline.
use std::collections::BTreeMap;

use serde::Serialize;

mod attributes;
mod blocks;
mod document_attributes;
mod inlines;
mod lists;
mod substitution;
mod tables;

pub use attributes::*;
pub use blocks::*;
pub use document_attributes::DocumentAttributes;
pub(crate) use document_attributes::is_attribute_name;
pub use inlines::*;
pub use lists::*;
pub use substitution::*;
pub use tables::*;

/// Identifier of an element to the inline content it is referred to by.
pub type ElementReferences = BTreeMap<String, Vec<Inline>>;

/// The root of a parsed document.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Document {
    /// The attribute map as it stood at the end of the document.
    pub attributes: DocumentAttributes,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub element_references: ElementReferences,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<Element>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub footnotes: Vec<Footnote>,
}

impl Document {
    /// The title of the element `id` refers to, for resolving cross
    /// references without walking the tree.
    #[must_use]
    pub fn reference(&self, id: &str) -> Option<&[Inline]> {
        self.element_references.get(id).map(Vec::as_slice)
    }

    /// The level-0 section holding the document title, if the document has one.
    #[must_use]
    pub fn title_section(&self) -> Option<&Section> {
        self.elements.iter().find_map(|element| match element {
            Element::Section(section) if section.level == 0 => Some(section),
            Element::Paragraph(_)
            | Element::DelimitedBlock(_)
            | Element::Section(_)
            | Element::DiscreteHeading(_)
            | Element::List(_)
            | Element::LabeledList(_)
            | Element::Table(_)
            | Element::ImageBlock(_)
            | Element::AttributeDeclaration(_)
            | Element::AttributeReset(_)
            | Element::AttributeCluster(_)
            | Element::BlankLine(_)
            | Element::Comment(_)
            | Element::TableOfContentsPlaceholder(_)
            | Element::Preamble(_)
            | Element::ThematicBreak(_)
            | Element::PageBreak(_) => None,
        })
    }
}

/// An author parsed from the line following the document title.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Author {
    pub full_name: String,
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "middlename")]
    pub middle_name: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty", rename = "lastname")]
    pub last_name: String,
    pub initials: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Author {
    /// Build an author from whitespace-separated name parts.
    ///
    /// One part is a first name only, two are first and last, and with three
    /// or more the second is the middle name and the rest form the last name.
    /// Underscores within a part stand for spaces.
    #[must_use]
    pub fn from_name_parts(parts: &[&str], email: Option<String>) -> Self {
        let parts: Vec<String> = parts.iter().map(|part| part.replace('_', " ")).collect();
        let (first_name, middle_name, last_name) = match parts.as_slice() {
            [] => (String::new(), None, String::new()),
            [first] => (first.clone(), None, String::new()),
            [first, last] => (first.clone(), None, last.clone()),
            [first, middle, rest @ ..] => (first.clone(), Some(middle.clone()), rest.join(" ")),
        };
        let initials = generate_initials(&first_name, middle_name.as_deref(), &last_name);
        Self {
            full_name: parts.join(" "),
            first_name,
            middle_name,
            last_name,
            initials,
            email,
        }
    }
}

/// Generate initials from first, optional middle, and last name parts
pub(crate) fn generate_initials(first: &str, middle: Option<&str>, last: &str) -> String {
    [Some(first), middle, Some(last)]
        .into_iter()
        .flatten()
        .filter_map(|part| part.chars().next())
        .collect()
}

/// The revision line following the author line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Revision {
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

/// A footnote collected from the body, numbered in document order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Footnote {
    pub number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: Vec<Inline>,
}
