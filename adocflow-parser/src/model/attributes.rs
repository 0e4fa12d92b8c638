use std::borrow::Cow;

use serde::{
    Serialize,
    ser::{SerializeMap, Serializer},
};

use super::{Author, Revision};

pub const ID: &str = "id";
pub const TITLE: &str = "title";
pub const STYLE: &str = "style";
pub const ROLES: &str = "roles";
pub const OPTIONS: &str = "options";
pub const POSITIONAL: &str = "positional";
pub const REFTEXT: &str = "reftext";
pub const SUBS: &str = "subs";
pub const LANGUAGE: &str = "language";
pub const CHECK_STYLE: &str = "check_style";
pub const LITERAL_BLOCK_TYPE: &str = "literal_block_type";
pub const LITERAL_INDENT: &str = "literal_indent";
pub const CONTINUATION: &str = "continuation";

/// An `AttributeName` represents the name of an attribute.
pub type AttributeName = String;

/// The value of a document or element attribute.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Set, without a value (`:sectnums:`).
    #[default]
    None,
    String(String),
    List(Vec<String>),
    Authors(Vec<Author>),
    Revision(Revision),
}

impl AttributeValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            Self::None | Self::List(_) | Self::Authors(_) | Self::Revision(_) => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(values) => Some(values),
            Self::None | Self::String(_) | Self::Authors(_) | Self::Revision(_) => None,
        }
    }

    /// The value as it is substituted into text by an attribute reference.
    #[must_use]
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::None => Cow::Borrowed(""),
            Self::String(value) => Cow::Borrowed(value),
            Self::List(values) => Cow::Owned(values.join(",")),
            Self::Authors(authors) => Cow::Owned(
                authors
                    .iter()
                    .map(|author| author.full_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Self::Revision(revision) => Cow::Borrowed(&revision.number),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<()> for AttributeValue {
    fn from((): ()) -> Self {
        Self::None
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Element attributes, kept in declaration order.
///
/// Positional attributes live under the `positional` key as a list. The
/// first positional's shorthand (`style#id.role%option`) is expanded into
/// `style`, `id`, `roles` and `options` when the attribute list is parsed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes(Vec<(AttributeName, AttributeValue)>);

impl Serialize for Attributes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            state.serialize_entry(key, value)?;
        }
        state.end()
    }
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0
            .iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    /// Insert or replace a value, keeping the original position of the key.
    pub fn insert(
        &mut self,
        name: impl Into<AttributeName>,
        value: AttributeValue,
    ) -> Option<AttributeValue> {
        let name = name.into();
        if let Some((_, existing)) = self.0.iter_mut().find(|(key, _)| *key == name) {
            return Some(std::mem::replace(existing, value));
        }
        self.0.push((name, value));
        None
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        let index = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(index).1)
    }

    /// Append `item` to the list stored under `name` unless it is already there.
    pub fn push_to_list(&mut self, name: &str, item: impl Into<String>) {
        let item = item.into();
        match self.0.iter_mut().find(|(key, _)| key == name) {
            Some((_, AttributeValue::List(items))) => {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
            Some((_, slot)) => *slot = AttributeValue::List(vec![item]),
            None => self.0.push((name.to_string(), AttributeValue::List(vec![item]))),
        }
    }

    /// Merge `other` into `self`.
    ///
    /// Lists are unioned, scalar values from `other` replace existing ones,
    /// and new keys are appended.
    pub fn merge(&mut self, other: Attributes) {
        for (name, value) in other.0 {
            let existing = self.0.iter_mut().find(|(key, _)| *key == name);
            match (existing, value) {
                (Some((_, AttributeValue::List(current))), AttributeValue::List(incoming)) => {
                    for item in incoming {
                        if !current.contains(&item) {
                            current.push(item);
                        }
                    }
                }
                (Some((_, current)), value) => *current = value,
                (None, value) => self.0.push((name, value)),
            }
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get_str(ID).filter(|id| !id.is_empty())
    }

    #[must_use]
    pub fn style(&self) -> Option<&str> {
        self.get_str(STYLE).filter(|style| !style.is_empty())
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.get_str(TITLE)
    }

    #[must_use]
    pub fn roles(&self) -> &[String] {
        self.get(ROLES).and_then(AttributeValue::as_list).unwrap_or_default()
    }

    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.get(OPTIONS)
            .and_then(AttributeValue::as_list)
            .is_some_and(|options| options.iter().any(|o| o == option))
            || self.contains_key(&format!("{option}-option"))
    }

    /// The positional attribute at `index` (zero-based), if present and non-empty.
    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.get(POSITIONAL)
            .and_then(AttributeValue::as_list)
            .and_then(|values| values.get(index))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

impl FromIterator<(AttributeName, AttributeValue)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (AttributeName, AttributeValue)>>(iter: T) -> Self {
        let mut attributes = Self::new();
        for (name, value) in iter {
            attributes.insert(name, value);
        }
        attributes
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_merge_replaces_scalars_and_unions_lists() {
        let mut first = Attributes::new();
        first.insert(STYLE, "source".into());
        first.push_to_list(ROLES, "a");

        let mut second = Attributes::new();
        second.insert(STYLE, "listing".into());
        second.push_to_list(ROLES, "a");
        second.push_to_list(ROLES, "b");
        second.insert(ID, "x".into());

        first.merge(second);
        assert_eq!(first.style(), Some("listing"));
        assert_eq!(first.roles(), ["a".to_string(), "b".to_string()]);
        assert_eq!(first.id(), Some("x"));
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_insert_keeps_position() {
        let mut attributes = Attributes::new();
        attributes.insert("a", "1".into());
        attributes.insert("b", "2".into());
        attributes.insert("a", "3".into());
        let keys: Vec<_> = attributes.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(attributes.get_str("a"), Some("3"));
    }

    #[test]
    fn test_options_lookup() {
        let mut attributes = Attributes::new();
        attributes.push_to_list(OPTIONS, "header");
        attributes.insert("autowidth-option", AttributeValue::None);
        assert!(attributes.has_option("header"));
        assert!(attributes.has_option("autowidth"));
        assert!(!attributes.has_option("footer"));
    }

    #[test]
    fn test_text_of_values() {
        assert_eq!(AttributeValue::None.to_text(), "");
        assert_eq!(
            AttributeValue::List(vec!["a".into(), "b".into()]).to_text(),
            "a,b"
        );
    }
}
