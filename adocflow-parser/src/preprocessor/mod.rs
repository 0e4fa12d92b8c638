//! Expands `include::` directives, evaluates conditionals and tracks level
//! offsets, turning the lexer output of the main document and every file it
//! pulls in into a single ordered fragment stream.
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{
    Options,
    error::{Error, SourceLocation},
    fragment::{Fragment, FragmentKind},
    lexer::Lexer,
    model::{AttributeValue, DocumentAttributes},
};

mod conditional;
mod include;
mod tag;

use conditional::{Conditional, Endif};
pub(crate) use include::decode;
use include::{Content, Include};

const LEVEL_OFFSET: &str = "leveloffset";
const MAX_INCLUDE_DEPTH: &str = "max-include-depth";

/// A `leveloffset` value: `+N`/`-N` is relative, a bare `N` is absolute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LevelOffset {
    Relative(isize),
    Absolute(isize),
}

impl FromStr for LevelOffset {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let offset = value
            .parse::<isize>()
            .map_err(|_| Error::InvalidLevelOffset(value.to_string()))?;
        Ok(if value.starts_with(['+', '-']) {
            Self::Relative(offset)
        } else {
            Self::Absolute(offset)
        })
    }
}

/// The offsets in effect, outermost first. An absolute offset clears
/// everything before it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct LevelOffsets(Vec<LevelOffset>);

impl LevelOffsets {
    fn push(&mut self, offset: LevelOffset) {
        if matches!(offset, LevelOffset::Absolute(_)) {
            self.0.clear();
        }
        self.0.push(offset);
    }

    fn total(&self) -> isize {
        self.0.iter().fold(0, |total, offset| match offset {
            LevelOffset::Relative(delta) => total + delta,
            LevelOffset::Absolute(value) => *value,
        })
    }

    fn apply(&self, level: u8) -> u8 {
        let level = (isize::from(level) + self.total()).max(0);
        u8::try_from(level).unwrap_or(u8::MAX)
    }
}

/// State an included file inherits from the file including it. Changes made
/// inside the include never flow back.
#[derive(Clone, Debug)]
struct Context {
    attributes: DocumentAttributes,
    offsets: LevelOffsets,
}

#[derive(Debug)]
struct OpenConditional {
    conditional: Conditional,
    active: bool,
    line: u32,
}

/// One file being read.
#[derive(Debug)]
struct Frame {
    lexer: Lexer,
    file: Option<PathBuf>,
    base_dir: PathBuf,
    context: Context,
    conditionals: Vec<OpenConditional>,
    /// Line number within this file.
    line: u32,
}

impl Frame {
    fn is_skipping(&self) -> bool {
        self.conditionals.iter().any(|open| !open.active)
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.line)
    }

    fn sync_lexer(&mut self) {
        let skipping = self.is_skipping();
        self.lexer.set_skipping(skipping);
    }

    /// Pull the continuation lines of an attribute value ending in ` \`.
    /// A ` + \` ending keeps the line break.
    fn continue_value(&mut self, first: &str) -> (String, u32) {
        let mut value = String::new();
        let mut pending = first.to_string();
        let mut consumed = 0;
        loop {
            let (text, separator) = if let Some(text) = pending.strip_suffix(" + \\") {
                (text, '\n')
            } else if let Some(text) = pending.strip_suffix(" \\") {
                (text, ' ')
            } else {
                value.push_str(&pending);
                break;
            };
            value.push_str(text.trim_end());
            value.push(separator);
            let Some((source, _)) = self.lexer.next() else {
                break;
            };
            consumed += 1;
            self.line += 1;
            pending = source.trim().to_string();
        }
        (value.trim_end().to_string(), consumed)
    }
}

/// Iterator over the post-inclusion fragment stream.
///
/// Fragment line numbers count the lines of the document as if every include
/// directive had been replaced by the lines it pulls in. After the first
/// fatal error no more fragments are produced.
#[derive(Debug)]
pub(crate) struct Preprocessor {
    frames: Vec<Frame>,
    line: u32,
    max_include_depth: usize,
    finished: bool,
}

impl Preprocessor {
    pub(crate) fn new(input: String, options: &Options) -> Self {
        let frame = Frame {
            lexer: Lexer::new(input),
            file: options.filename.clone(),
            base_dir: options.base_dir(),
            context: Context {
                attributes: options.initial_attributes(),
                offsets: LevelOffsets::default(),
            },
            conditionals: Vec::new(),
            line: 0,
        };
        Self {
            frames: vec![frame],
            line: 0,
            max_include_depth: options.max_include_depth,
            finished: false,
        }
    }

    fn process(&mut self, source: String, kind: FragmentKind) -> Option<Fragment> {
        let line = self.line;
        let frame = self.frames.last_mut()?;
        match kind {
            FragmentKind::ConditionalDirective(directive) => self.open_conditional(&source, &directive),
            FragmentKind::EndifDirective(directive) => self.close_conditional(&source, &directive),
            _ if frame.is_skipping() => None,
            FragmentKind::FileInclusion { target, attributes } => {
                self.include(source, &target, &attributes)
            }
            FragmentKind::AttributeDeclaration { name, value } => {
                let value = match value {
                    Some(value) if value.ends_with(" \\") => {
                        let (joined, consumed) = frame.continue_value(&value);
                        self.line += consumed;
                        Some(joined)
                    }
                    other => other,
                };
                if name == LEVEL_OFFSET
                    && let Some(value) = &value
                {
                    match value.parse() {
                        Ok(offset) => frame.context.offsets.push(offset),
                        Err(error) => return Some(Fragment::error(line, source, error)),
                    }
                }
                let resolved = value
                    .as_deref()
                    .map(|value| frame.context.attributes.resolve_lenient(value));
                frame.context.attributes.declare(
                    &name,
                    resolved.map_or(AttributeValue::None, AttributeValue::String),
                );
                Some(Fragment::new(
                    line,
                    source,
                    FragmentKind::AttributeDeclaration { name, value },
                ))
            }
            FragmentKind::AttributeReset { name } => {
                if name == LEVEL_OFFSET {
                    frame.context.offsets.push(LevelOffset::Absolute(0));
                }
                frame.context.attributes.reset(&name);
                Some(Fragment::new(line, source, FragmentKind::AttributeReset { name }))
            }
            FragmentKind::DocumentAuthorsLine(authors) => {
                frame
                    .context
                    .attributes
                    .declare("authors", AttributeValue::Authors(authors.clone()));
                Some(Fragment::new(line, source, FragmentKind::DocumentAuthorsLine(authors)))
            }
            FragmentKind::DocumentRevisionLine(revision) => {
                frame
                    .context
                    .attributes
                    .declare("revision", AttributeValue::Revision(revision.clone()));
                Some(Fragment::new(line, source, FragmentKind::DocumentRevisionLine(revision)))
            }
            FragmentKind::SectionHeader { level, title } => {
                let level = frame.context.offsets.apply(level);
                Some(Fragment::new(line, source, FragmentKind::SectionHeader { level, title }))
            }
            kind @ (FragmentKind::RawLine(_)
            | FragmentKind::BlankLine
            | FragmentKind::BlockDelimiter(_)
            | FragmentKind::AttributeCluster(_)
            | FragmentKind::SingleLineComment(_)
            | FragmentKind::InlineElements(_)
            | FragmentKind::Admonition { .. }
            | FragmentKind::ListElementMarker(_)
            | FragmentKind::ListContinuation
            | FragmentKind::ImageBlock { .. }
            | FragmentKind::ThematicBreak
            | FragmentKind::PageBreak
            | FragmentKind::TableOfContentsMacro) => Some(Fragment::new(line, source, kind)),
        }
    }

    fn open_conditional(&mut self, source: &str, directive: &str) -> Option<Fragment> {
        let line = self.line;
        let frame = self.frames.last_mut()?;
        let file = frame.file.clone();

        if frame.is_skipping() {
            // Only tracked so that its endif is matched; never evaluated.
            if let Ok(conditional) = Conditional::parse(directive, file.as_deref(), frame.line)
                && conditional.inline().is_none()
            {
                frame.conditionals.push(OpenConditional {
                    conditional,
                    active: false,
                    line: frame.line,
                });
            }
            return None;
        }

        let evaluated = Conditional::parse(directive, file.as_deref(), frame.line).and_then(|conditional| {
            let active = conditional.evaluate(&frame.context.attributes, file.as_deref(), frame.line)?;
            Ok((conditional, active))
        });
        let (conditional, active) = match evaluated {
            Ok(evaluated) => evaluated,
            Err(error) => return Some(Fragment::error(line, source, error)),
        };
        tracing::trace!(%directive, active, "conditional directive");

        if let Some(text) = conditional.inline() {
            return active.then(|| {
                Fragment::new(line, source, FragmentKind::InlineElements(text.to_string()))
            });
        }
        frame.conditionals.push(OpenConditional {
            conditional,
            active,
            line: frame.line,
        });
        frame.sync_lexer();
        None
    }

    fn close_conditional(&mut self, source: &str, directive: &str) -> Option<Fragment> {
        let line = self.line;
        let frame = self.frames.last_mut()?;
        let file = frame.file.clone();
        let endif = match Endif::parse(directive, file.as_deref(), frame.line) {
            Ok(endif) => endif,
            Err(_) if frame.is_skipping() => return None,
            Err(error) => return Some(Fragment::error(line, source, error)),
        };
        let Some(open) = frame.conditionals.last() else {
            tracing::warn!(line = frame.line, file = ?file, "endif without a matching conditional, ignoring");
            return None;
        };
        if !open.conditional.is_closed_by(&endif) {
            tracing::error!(%directive, opened_at = open.line, "endif does not match the open conditional");
            return Some(Fragment::error(
                line,
                source,
                Error::invalid_conditional(
                    file,
                    frame.line,
                    format!("`{directive}` does not close the conditional opened at line {}", open.line),
                ),
            ));
        }
        frame.conditionals.pop();
        frame.sync_lexer();
        None
    }

    fn include(&mut self, source: String, target: &str, options: &str) -> Option<Fragment> {
        let line = self.line;
        let depth = self.frames.len();
        let frame = self.frames.last_mut()?;
        let max_depth = frame
            .context
            .attributes
            .get_text(MAX_INCLUDE_DEPTH)
            .and_then(|depth| depth.parse().ok())
            .unwrap_or(self.max_include_depth);
        if depth > max_depth {
            tracing::warn!(%target, max_depth, "maximum include depth reached, keeping the directive as text");
            let text = source.clone();
            return Some(Fragment::new(line, source, FragmentKind::InlineElements(text)));
        }

        let location = frame.location();
        let resolved = Include::parse(
            target,
            options,
            &frame.base_dir,
            &frame.context.attributes,
            &location,
        )
        .and_then(|include| include.read(&location).map(|content| (include, content)));
        let (include, content) = match resolved {
            Ok(resolved) => resolved,
            Err(error) => return Some(Fragment::error(line, source, error)),
        };

        // The directive line is replaced by the included lines.
        self.line = self.line.saturating_sub(1);
        let lexer = match content {
            Content::AsciiDoc(text) => Lexer::child(text, &frame.lexer),
            Content::Verbatim(text) => Lexer::raw(text),
            Content::Missing => return None,
        };
        let mut context = frame.context.clone();
        if let Some(offset) = include.level_offset {
            context.offsets.push(offset);
        }
        let base_dir = include
            .path
            .parent()
            .map_or_else(|| frame.base_dir.clone(), Path::to_path_buf);
        tracing::debug!(path = ?include.path.display(), depth, "entering include");
        self.frames.push(Frame {
            lexer,
            file: Some(include.path),
            base_dir,
            context,
            conditionals: Vec::new(),
            line: 0,
        });
        None
    }
}

impl Iterator for Preprocessor {
    type Item = Fragment;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let Some(frame) = self.frames.last_mut() else {
                self.finished = true;
                break;
            };
            let Some((source, kind)) = frame.lexer.next() else {
                for open in &frame.conditionals {
                    tracing::warn!(file = ?frame.file, line = open.line, "conditional directive is never closed");
                }
                self.frames.pop();
                continue;
            };
            frame.line += 1;
            self.line += 1;
            if let Some(fragment) = self.process(source, kind) {
                if fragment.payload.is_err() {
                    self.finished = true;
                }
                return Some(fragment);
            }
        }
        None
    }
}
