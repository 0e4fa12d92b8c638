use std::{fmt, path::PathBuf};

use serde::Serialize;

/// Where in the (post-inclusion) source an error originated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: Option<PathBuf>,
    pub line: u32,
}

impl SourceLocation {
    #[must_use]
    pub fn new(file: Option<PathBuf>, line: u32) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", file.display(), self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unresolved include at {0}: {1}")]
    UnresolvedInclude(Box<SourceLocation>, String),

    #[error("unsupported substitution: {0}")]
    UnsupportedSubstitution(String),

    #[error("malformed line range: {0}")]
    MalformedLineRange(String),

    #[error("invalid level offset: {0}")]
    InvalidLevelOffset(String),

    #[error("invalid conditional directive at {0}: {1}")]
    InvalidConditionalDirective(Box<SourceLocation>, String),

    #[error("ifeval directive at {0} compares values of different types")]
    InvalidIfEvalDirectiveMismatchedTypes(Box<SourceLocation>),

    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("unrecognized encoding in file: {0}")]
    UnrecognizedEncodingInFile(String),

    #[error("assembly error at line {line}: {message}")]
    Assembly { line: u32, message: String },

    #[error("internal invariant violated at line {line}: {message}")]
    InternalInvariant { line: u32, message: String },

    #[error("parsing was cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn unresolved_include(
        file: Option<PathBuf>,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::UnresolvedInclude(Box::new(SourceLocation::new(file, line)), message.into())
    }

    pub(crate) fn invalid_conditional(
        file: Option<PathBuf>,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidConditionalDirective(
            Box::new(SourceLocation::new(file, line)),
            message.into(),
        )
    }

    /// Whether this error aborts the parse.
    ///
    /// Assembly errors are recoverable: the offending fragment is kept as raw
    /// text and parsing continues.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Assembly { .. })
    }

    /// Extract location information from this error if available.
    #[must_use]
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            Self::UnresolvedInclude(location, ..)
            | Self::InvalidConditionalDirective(location, ..)
            | Self::InvalidIfEvalDirectiveMismatchedTypes(location) => Some(location.as_ref().clone()),
            Self::Assembly { line, .. } | Self::InternalInvariant { line, .. } => {
                Some(SourceLocation::new(None, *line))
            }
            Self::Io(_)
            | Self::UnsupportedSubstitution(_)
            | Self::MalformedLineRange(_)
            | Self::InvalidLevelOffset(_)
            | Self::UnknownEncoding(_)
            | Self::UnrecognizedEncodingInFile(_)
            | Self::Cancelled => None,
        }
    }

    /// Get advice for this error if available.
    #[must_use]
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::UnresolvedInclude(..) => Some(
                "Check that the include target exists relative to the including file, or add `opts=optional`",
            ),
            Self::UnsupportedSubstitution(..) => Some(
                "Use either a plain list (`subs=quotes,macros`) or only incremental entries (`subs=+quotes,-macros`), not both",
            ),
            Self::MalformedLineRange(..) => Some(
                "Line ranges look like `lines=1..5`, `lines=7`, `lines=3..-1` and are separated by `;` or `,`",
            ),
            Self::InvalidIfEvalDirectiveMismatchedTypes(_) => Some(
                "ifeval expressions must compare values of the same type (both numbers or both strings)",
            ),
            Self::InvalidConditionalDirective(..) => {
                Some("Every `ifdef`, `ifndef` and `ifeval` block needs a matching `endif::[]`")
            }
            Self::Io(_)
            | Self::InvalidLevelOffset(_)
            | Self::UnknownEncoding(_)
            | Self::UnrecognizedEncodingInFile(_)
            | Self::Assembly { .. }
            | Self::InternalInvariant { .. }
            | Self::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_include_display() {
        let error = Error::unresolved_include(Some(PathBuf::from("main.adoc")), 3, "no such file: x.adoc");
        assert_eq!(
            format!("{error}"),
            "unresolved include at main.adoc:3: no such file: x.adoc"
        );
        assert!(error.is_fatal());
        assert_eq!(
            error.location(),
            Some(SourceLocation::new(Some(PathBuf::from("main.adoc")), 3))
        );
    }

    #[test]
    fn test_assembly_error_is_not_fatal() {
        let error = Error::Assembly {
            line: 7,
            message: "list continuation outside of a list".to_string(),
        };
        assert!(!error.is_fatal());
        assert_eq!(error.location(), Some(SourceLocation::new(None, 7)));
        assert_eq!(
            format!("{error}"),
            "assembly error at line 7: list continuation outside of a list"
        );
    }

    #[test]
    fn test_location_display_without_file() {
        assert_eq!(format!("{}", SourceLocation::new(None, 12)), "line 12");
    }

    #[test]
    fn test_advice() {
        assert!(Error::UnsupportedSubstitution("x".into()).advice().is_some());
        assert!(Error::Cancelled.advice().is_none());
    }
}
