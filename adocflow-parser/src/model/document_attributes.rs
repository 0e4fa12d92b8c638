use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{
    Serialize,
    ser::{SerializeMap, Serializer},
};

use super::{AttributeName, AttributeValue, Author, Revision};

/// Attributes every document starts with, before any seeding or declaration.
const INTRINSIC_ATTRIBUTES: &[(&str, &str)] = &[
    ("empty", ""),
    ("sp", " "),
    ("nbsp", "\u{a0}"),
    ("zwsp", "\u{200b}"),
    ("wj", "\u{2060}"),
    ("apos", "'"),
    ("quot", "\""),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("ldquo", "\u{201c}"),
    ("rdquo", "\u{201d}"),
    ("deg", "\u{b0}"),
    ("plus", "+"),
    ("brvbar", "\u{a6}"),
    ("vbar", "|"),
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("startsb", "["),
    ("endsb", "]"),
    ("caret", "^"),
    ("asterisk", "*"),
    ("tilde", "~"),
    ("backslash", "\\"),
    ("backtick", "`"),
    ("two-colons", "::"),
    ("two-semicolons", ";;"),
    ("cpp", "C++"),
    ("cxx", "C++"),
    ("pp", "++"),
    ("idprefix", "_"),
    ("idseparator", "_"),
    ("attribute-missing", "skip"),
    ("toc-title", "Table of Contents"),
];

/// The document-wide attribute map.
///
/// Attributes seeded through [`crate::Options`] without a trailing `@` are
/// locked: declarations and resets in the document are ignored with a warning.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentAttributes {
    values: FxHashMap<AttributeName, AttributeValue>,
    locked: FxHashSet<AttributeName>,
}

impl Serialize for DocumentAttributes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Sorted so that serialized output is stable.
        let sorted: BTreeMap<_, _> = self.values.iter().collect();
        let mut state = serializer.serialize_map(Some(sorted.len()))?;
        for (key, value) in sorted {
            state.serialize_entry(key, value)?;
        }
        state.end()
    }
}

impl DocumentAttributes {
    /// A map holding only the intrinsic attributes (`empty`, `sp`, `lt`, ...).
    #[must_use]
    pub fn intrinsic() -> Self {
        let mut attributes = Self::default();
        for (name, value) in INTRINSIC_ATTRIBUTES {
            attributes.insert((*name).to_string(), AttributeValue::String((*value).to_string()));
        }
        attributes.insert("sectids".to_string(), AttributeValue::None);
        attributes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterate in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        let sorted: BTreeMap<_, _> = self.values.iter().collect();
        sorted.into_iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Insert a value, bypassing locks.
    pub fn insert(&mut self, name: AttributeName, value: AttributeValue) {
        self.values.insert(name, value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    /// The text an attribute reference to `name` expands to.
    #[must_use]
    pub fn get_text(&self, name: &str) -> Option<String> {
        self.values.get(name).map(|value| value.to_text().into_owned())
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[must_use]
    pub fn is_locked(&self, name: &str) -> bool {
        self.locked.contains(name)
    }

    /// Seed an attribute from configuration.
    ///
    /// A trailing `@` on the name or on a string value marks a soft default;
    /// anything else is locked against changes from the document.
    pub fn seed(&mut self, name: AttributeName, value: AttributeValue) {
        if let Some(stripped) = name.strip_suffix('@') {
            self.seed_soft(stripped.to_string(), value);
            return;
        }
        if let AttributeValue::String(text) = &value
            && let Some(stripped) = text.strip_suffix('@')
        {
            self.seed_soft(name, AttributeValue::String(stripped.to_string()));
            return;
        }
        self.locked.insert(name.clone());
        self.values.insert(name, value);
    }

    pub fn seed_soft(&mut self, name: AttributeName, value: AttributeValue) {
        self.locked.remove(&name);
        self.values.insert(name, value);
    }

    /// Copy every value and lock from `other` over this map.
    pub fn overlay(&mut self, other: &DocumentAttributes) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
        self.locked.extend(other.locked.iter().cloned());
    }

    /// Apply a declaration from the document. Returns `false` when the
    /// attribute is locked and the declaration was ignored.
    pub fn declare(&mut self, name: &str, value: AttributeValue) -> bool {
        if self.is_locked(name) {
            tracing::warn!(attribute = %name, "attribute is locked by configuration, ignoring declaration");
            return false;
        }
        match &value {
            AttributeValue::Authors(authors) => self.insert_author_attributes(authors),
            AttributeValue::Revision(revision) => self.insert_revision_attributes(revision),
            AttributeValue::None | AttributeValue::String(_) | AttributeValue::List(_) => {}
        }
        self.values.insert(name.to_string(), value);
        true
    }

    /// Apply an unset from the document (`:name!:`). Returns `false` when locked.
    pub fn reset(&mut self, name: &str) -> bool {
        if self.is_locked(name) {
            tracing::warn!(attribute = %name, "attribute is locked by configuration, ignoring unset");
            return false;
        }
        self.values.remove(name);
        true
    }

    /// Replace every `{name}` reference to a defined attribute; unknown
    /// references are kept verbatim.
    #[must_use]
    pub fn resolve_lenient(&self, text: &str) -> String {
        self.resolve_with(text, |_| None)
    }

    /// Replace every `{name}` reference, failing with the name of the first
    /// reference that is not defined.
    pub fn resolve_strict(&self, text: &str) -> Result<String, String> {
        let mut missing = None;
        let resolved = self.resolve_with(text, |name| {
            if missing.is_none() {
                missing = Some(name.to_string());
            }
            None
        });
        match missing {
            Some(name) => Err(name),
            None => Ok(resolved),
        }
    }

    fn resolve_with(&self, text: &str, mut on_missing: impl FnMut(&str) -> Option<String>) -> String {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find('{') {
            let (before, from_brace) = rest.split_at(start);
            result.push_str(before);
            let Some(end) = from_brace.find('}') else {
                result.push_str(from_brace);
                return result;
            };
            let name = from_brace.get(1..end).unwrap_or_default();
            if is_attribute_name(name) {
                match self.get_text(name).or_else(|| on_missing(name)) {
                    Some(value) => result.push_str(&value),
                    None => result.push_str(from_brace.get(..=end).unwrap_or_default()),
                }
                rest = from_brace.get(end + 1..).unwrap_or_default();
            } else {
                result.push('{');
                rest = from_brace.get(1..).unwrap_or_default();
            }
        }
        result.push_str(rest);
        result
    }

    fn insert_author_attributes(&mut self, authors: &[Author]) {
        for (index, author) in authors.iter().enumerate() {
            let suffix = format!("_{}", index + 1);
            let mut entries = vec![
                ("author", author.full_name.clone()),
                ("firstname", author.first_name.clone()),
                ("authorinitials", author.initials.clone()),
            ];
            if let Some(middle) = &author.middle_name {
                entries.push(("middlename", middle.clone()));
            }
            if !author.last_name.is_empty() {
                entries.push(("lastname", author.last_name.clone()));
            }
            if let Some(email) = &author.email {
                entries.push(("email", email.clone()));
            }
            for (key, value) in entries {
                if index == 0 {
                    self.insert_unless_locked(key, value.clone());
                }
                self.insert_unless_locked(&format!("{key}{suffix}"), value);
            }
        }
        self.insert_unless_locked("authorcount", authors.len().to_string());
    }

    fn insert_revision_attributes(&mut self, revision: &Revision) {
        let entries = [
            ("revnumber", Some(&revision.number).filter(|n| !n.is_empty())),
            ("revdate", revision.date.as_ref()),
            ("revremark", revision.remark.as_ref()),
        ];
        for (key, value) in entries {
            let Some(value) = value else { continue };
            if self.contains_key(key) {
                tracing::warn!(
                    attribute = key,
                    "revision line value ignored, attribute already set through an attribute entry"
                );
            } else {
                self.values
                    .insert(key.to_string(), AttributeValue::String(value.clone()));
            }
        }
    }

    fn insert_unless_locked(&mut self, name: &str, value: String) {
        if !self.is_locked(name) {
            self.values
                .insert(name.to_string(), AttributeValue::String(value));
        }
    }
}

/// Whether `name` is a valid attribute name: a letter or underscore followed
/// by word characters or hyphens.
pub(crate) fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}
