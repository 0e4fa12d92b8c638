//! `peg` grammars for the line-level syntax.
mod attributes;
mod header;
mod line;

pub(crate) use attributes::{RawAttribute, parse_attribute_list, parse_entries, parse_macro_attributes};
pub(crate) use header::{parse_authors, parse_revision};
pub(crate) use line::classify;
