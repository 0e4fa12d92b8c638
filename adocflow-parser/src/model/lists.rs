//! List types.

use serde::Serialize;

use super::{Attributes, Element, Inline};

pub type ListLevel = u8;

/// Numbering of an ordered list, chosen by nesting depth unless the marker
/// is explicit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingStyle {
    Arabic,
    LowerAlpha,
    LowerRoman,
    UpperAlpha,
    UpperRoman,
}

impl NumberingStyle {
    /// The default style for an implicit ordered list at `level` (1-based).
    #[must_use]
    pub fn for_level(level: ListLevel) -> Self {
        match level.saturating_sub(1) % 5 {
            0 => Self::Arabic,
            1 => Self::LowerAlpha,
            2 => Self::LowerRoman,
            3 => Self::UpperAlpha,
            _ => Self::UpperRoman,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Unordered,
    Ordered(NumberingStyle),
    Labeled,
    Callout,
}

impl ListKind {
    /// Two markers belong to the same list when their kinds agree, ignoring
    /// the numbering style of ordered lists.
    #[must_use]
    pub fn same_family(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Unordered, Self::Unordered)
                | (Self::Ordered(_), Self::Ordered(_))
                | (Self::Labeled, Self::Labeled)
                | (Self::Callout, Self::Callout)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStyle {
    Checked,
    Unchecked,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct List {
    pub kind: ListKind,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub title: Vec<Inline>,
    pub items: Vec<ListItem>,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListItem {
    pub level: ListLevel,
    pub marker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_style: Option<CheckStyle>,
    /// Raw term of a labeled list item.
    #[serde(skip)]
    pub term_raw: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub term: Vec<Inline>,
    /// Raw text following the marker, one entry per source line.
    #[serde(skip)]
    pub principal_raw: Vec<String>,
    pub principal: Vec<Inline>,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
    pub line: u32,
}
