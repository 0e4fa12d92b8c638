//! `include::target[leveloffset=...,lines=...,tag(s)=...,indent=...,encoding=...,opts=optional]`
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

use super::{LevelOffset, tag::Filter};
use crate::{
    error::{Error, SourceLocation},
    grammar::{RawAttribute, parse_entries},
    model::DocumentAttributes,
};

/// Extensions whose content is lexed as `AsciiDoc`; anything else is included verbatim.
const ASCIIDOC_EXTENSIONS: [&str; 5] = ["adoc", "asciidoc", "ad", "asc", "txt"];

const BYTE_ORDER_MARKS: [(&[u8], &Encoding); 3] = [
    (&[0xEF, 0xBB, 0xBF], UTF_8),
    (&[0xFF, 0xFE], UTF_16LE),
    (&[0xFE, 0xFF], UTF_16BE),
];

/// One entry of `lines=`: a single line or an inclusive range, 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LinesRange {
    Single(usize),
    /// `None` as the end runs to the last line (`5..-1` or `5..`).
    Range(usize, Option<usize>),
}

impl FromStr for LinesRange {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let malformed = || Error::MalformedLineRange(value.to_string());
        match value.split_once("..") {
            Some((start, end)) => {
                let start = start.trim().parse().map_err(|_| malformed())?;
                let end = match end.trim() {
                    "" | "-1" => None,
                    end => Some(end.parse().map_err(|_| malformed())?),
                };
                Ok(Self::Range(start, end))
            }
            None => value.parse().map(Self::Single).map_err(|_| malformed()),
        }
    }
}

impl LinesRange {
    /// Parse a `;`- or `,`-separated list of ranges.
    pub(crate) fn parse_list(value: &str) -> Result<Vec<Self>, Error> {
        value
            .split([';', ','])
            .filter(|range| !range.trim().is_empty())
            .map(Self::from_str)
            .collect()
    }

    /// Zero-based indices selected out of `total` lines.
    fn indices(self, total: usize) -> std::ops::Range<usize> {
        let (start, end) = match self {
            Self::Single(line) => (line, line),
            Self::Range(start, end) => (start, end.unwrap_or(total)),
        };
        if start == 0 {
            tracing::warn!(?self, "line numbers start at 1, ignoring range");
            return 0..0;
        }
        let first = (start - 1).min(total);
        first..end.min(total).max(first)
    }
}

/// Keep the lines selected by any of `ranges`, in file order.
fn select_lines(lines: Vec<String>, ranges: &[LinesRange]) -> Vec<String> {
    let total = lines.len();
    let mut selected = vec![false; total];
    for range in ranges {
        for index in range.indices(total) {
            if let Some(slot) = selected.get_mut(index) {
                *slot = true;
            }
        }
    }
    lines
        .into_iter()
        .zip(selected)
        .filter_map(|(line, keep)| keep.then_some(line))
        .collect()
}

/// Strip the common leading whitespace and indent by `width` spaces.
fn reindent(lines: Vec<String>, width: usize) -> Vec<String> {
    let common = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    let padding = " ".repeat(width);
    lines
        .into_iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{padding}{}", line.get(common..).unwrap_or_default())
            }
        })
        .collect()
}

/// Decode `bytes` with the requested encoding, or from a byte order mark,
/// or as UTF-8.
pub(crate) fn decode(bytes: &[u8], encoding: Option<&str>, path: &Path) -> Result<String, Error> {
    if let Some(label) = encoding {
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| Error::UnknownEncoding(label.to_string()))?;
        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            tracing::warn!(path = ?path.display(), encoding = %label, "include decoded with replacement characters");
        }
        return Ok(text.into_owned());
    }
    for (mark, encoding) in BYTE_ORDER_MARKS {
        if let Some(content) = bytes.strip_prefix(mark) {
            let (text, had_errors) = encoding.decode_without_bom_handling(content);
            if had_errors {
                tracing::warn!(path = ?path.display(), encoding = encoding.name(), "include decoded with replacement characters");
            }
            return Ok(text.into_owned());
        }
    }
    match UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => Ok(text.into_owned()),
        None => {
            tracing::error!(path = ?path.display(), "include is not valid UTF-8 and has no byte order mark");
            Err(Error::UnrecognizedEncodingInFile(path.display().to_string()))
        }
    }
}

/// A parsed include directive, target resolved against the including file.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Include {
    pub(crate) path: PathBuf,
    pub(crate) level_offset: Option<LevelOffset>,
    lines: Vec<LinesRange>,
    tags: Vec<Filter>,
    indent: Option<usize>,
    encoding: Option<String>,
    optional: bool,
}

/// What reading an include produced.
#[derive(Debug)]
pub(crate) enum Content {
    AsciiDoc(String),
    Verbatim(String),
    /// An optional include whose file does not exist.
    Missing,
}

impl Include {
    #[tracing::instrument(level = "trace", skip(attributes, location))]
    pub(crate) fn parse(
        target: &str,
        options: &str,
        base_dir: &Path,
        attributes: &DocumentAttributes,
        location: &SourceLocation,
    ) -> Result<Self, Error> {
        let unresolved = |message: String| Error::UnresolvedInclude(Box::new(location.clone()), message);

        let target = attributes.resolve_strict(target).map_err(|name| {
            tracing::error!(%target, attribute = %name, "include target references an undefined attribute");
            unresolved(format!("attribute `{name}` in include target `{target}` is not defined"))
        })?;
        let target = PathBuf::from(target);
        let mut include = Self {
            path: if target.is_absolute() {
                target
            } else {
                base_dir.join(target)
            },
            ..Self::default()
        };

        let entries = parse_entries(options)
            .ok_or_else(|| unresolved(format!("malformed include options `{options}`")))?;
        for entry in entries {
            let (key, value) = match entry {
                RawAttribute::Named(key, value) => (key, value),
                RawAttribute::Positional(value) => {
                    tracing::warn!(%value, "ignoring positional attribute on include directive");
                    continue;
                }
            };
            match key.as_str() {
                "leveloffset" => include.level_offset = Some(value.parse()?),
                "lines" => include.lines.extend(LinesRange::parse_list(&value)?),
                "tag" | "tags" => include.tags.extend(Filter::parse_list(&value)),
                "indent" => {
                    include.indent = Some(value.trim().parse().map_err(|_| {
                        unresolved(format!("indent must be a non-negative number, found `{value}`"))
                    })?);
                }
                "encoding" => include.encoding = Some(value),
                "opts" | "options" => {
                    include.optional = value.split(',').any(|opt| opt.trim() == "optional");
                }
                unknown => tracing::warn!(key = %unknown, "unknown include attribute, ignoring"),
            }
        }
        Ok(include)
    }

    /// Read and filter the target.
    #[tracing::instrument(level = "debug", skip_all, fields(path = ?self.path.display()))]
    pub(crate) fn read(&self, location: &SourceLocation) -> Result<Content, Error> {
        if !self.path.is_file() {
            if self.optional {
                tracing::info!(path = ?self.path.display(), "optional include not found, skipping");
                return Ok(Content::Missing);
            }
            tracing::error!(path = ?self.path.display(), "include target not found");
            return Err(Error::UnresolvedInclude(
                Box::new(location.clone()),
                format!("file not found: {}", self.path.display()),
            ));
        }
        let bytes = std::fs::read(&self.path)?;
        let text = decode(&bytes, self.encoding.as_deref(), &self.path)?;
        let mut lines: Vec<String> = text.lines().map(ToString::to_string).collect();

        if !self.lines.is_empty() {
            lines = select_lines(lines, &self.lines);
        }
        if !self.tags.is_empty() {
            lines = super::tag::apply_tag_filters(&lines, &self.tags).map_err(|tag| {
                tracing::error!(path = ?self.path.display(), %tag, "tag not found in include");
                Error::UnresolvedInclude(
                    Box::new(location.clone()),
                    format!("tag `{tag}` not found in {}", self.path.display()),
                )
            })?;
        }
        if let Some(width) = self.indent {
            lines = reindent(lines, width);
        }

        let content = lines.join("\n");
        tracing::debug!(lines = lines.len(), "include resolved");
        Ok(if self.is_asciidoc() {
            Content::AsciiDoc(content)
        } else {
            Content::Verbatim(content)
        })
    }

    fn is_asciidoc(&self) -> bool {
        self.path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| ASCIIDOC_EXTENSIONS.contains(&extension))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn strings(lines: &[&str]) -> Vec<String> {
        lines.iter().map(ToString::to_string).collect()
    }

    fn parse(target: &str, options: &str) -> Result<Include, Error> {
        let mut attributes = DocumentAttributes::default();
        attributes.insert("chapters".into(), "chapters".into());
        Include::parse(
            target,
            options,
            Path::new("/docs"),
            &attributes,
            &SourceLocation::new(Some(PathBuf::from("/docs/main.adoc")), 3),
        )
    }

    #[rstest]
    #[case("7", LinesRange::Single(7))]
    #[case("2..4", LinesRange::Range(2, Some(4)))]
    #[case("5..-1", LinesRange::Range(5, None))]
    #[case("5..", LinesRange::Range(5, None))]
    fn test_lines_range(#[case] input: &str, #[case] expected: LinesRange) -> Result<(), Error> {
        assert_eq!(input.parse::<LinesRange>()?, expected);
        Ok(())
    }

    #[test]
    fn test_malformed_lines_range() {
        assert!(matches!(
            LinesRange::parse_list("1..x"),
            Err(Error::MalformedLineRange(range)) if range == "1..x"
        ));
    }

    #[test]
    fn test_select_lines_in_file_order() -> Result<(), Error> {
        let lines = strings(&["1", "2", "3", "4", "5", "6"]);
        let selected = select_lines(lines, &LinesRange::parse_list("5..-1;1,2..3")?);
        assert_eq!(selected, vec!["1", "2", "3", "5", "6"]);
        Ok(())
    }

    #[test]
    fn test_out_of_range_lines_are_ignored() -> Result<(), Error> {
        let selected = select_lines(strings(&["a", "b"]), &LinesRange::parse_list("2..10;9")?);
        assert_eq!(selected, vec!["b"]);
        Ok(())
    }

    #[test]
    fn test_reindent() {
        let lines = reindent(strings(&["    fn main() {", "", "        body", "    }"]), 2);
        assert_eq!(lines, vec!["  fn main() {", "", "      body", "  }"]);
    }

    #[test]
    fn test_parse_options() -> Result<(), Error> {
        let include = parse(
            "{chapters}/one.adoc",
            "leveloffset=+1,lines=\"1..3;7\",tags=intro;!draft,indent=0,opts=optional",
        )?;
        assert_eq!(include.path, PathBuf::from("/docs/chapters/one.adoc"));
        assert_eq!(include.level_offset, Some(LevelOffset::Relative(1)));
        assert_eq!(
            include.lines,
            vec![LinesRange::Range(1, Some(3)), LinesRange::Single(7)]
        );
        assert_eq!(
            include.tags,
            vec![Filter::Include("intro".into()), Filter::Exclude("draft".into())]
        );
        assert_eq!(include.indent, Some(0));
        assert!(include.optional);
        Ok(())
    }

    #[test]
    fn test_undefined_attribute_in_target() {
        let result = parse("{nope}/one.adoc", "");
        assert!(matches!(
            result,
            Err(Error::UnresolvedInclude(location, message))
                if location.line == 3 && message.contains("nope")
        ));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_unknown_option_is_ignored() -> Result<(), Error> {
        let include = parse("one.adoc", "foo=bar")?;
        assert_eq!(include.path, PathBuf::from("/docs/one.adoc"));
        assert!(logs_contain("unknown include attribute"));
        Ok(())
    }

    #[test]
    fn test_missing_file() -> Result<(), Error> {
        let location = SourceLocation::new(None, 1);
        let include = parse("does-not-exist.adoc", "")?;
        assert!(matches!(
            include.read(&location),
            Err(Error::UnresolvedInclude(..))
        ));
        let optional = parse("does-not-exist.adoc", "opts=optional")?;
        assert!(matches!(optional.read(&location)?, Content::Missing));
        Ok(())
    }

    #[test]
    fn test_decoding() -> Result<(), Error> {
        let path = Path::new("x.adoc");
        assert_eq!(decode(b"\xEF\xBB\xBFhello", None, path)?, "hello");
        assert_eq!(decode(b"\xFF\xFEh\x00i\x00", None, path)?, "hi");
        assert_eq!(decode(b"caf\xE9", Some("latin1"), path)?, "café");
        assert!(matches!(
            decode(b"caf\xE9", None, path),
            Err(Error::UnrecognizedEncodingInFile(_))
        ));
        assert!(matches!(
            decode(b"x", Some("klingon"), path),
            Err(Error::UnknownEncoding(_))
        ));
        Ok(())
    }
}
