use serde::Serialize;

use crate::Error;

/// A single substitution pass.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionKind {
    InlinePassthrough,
    SpecialCharacters,
    Attributes,
    Quotes,
    Replacements,
    Macros,
    PostReplacements,
    Callouts,
}

impl SubstitutionKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::InlinePassthrough => "inline_passthrough",
            Self::SpecialCharacters => "specialcharacters",
            Self::Attributes => "attributes",
            Self::Quotes => "quotes",
            Self::Replacements => "replacements",
            Self::Macros => "macros",
            Self::PostReplacements => "post_replacements",
            Self::Callouts => "callouts",
        }
    }

    /// Expand a substitution name, alias or group into the passes it stands for.
    #[must_use]
    pub fn expand(token: &str) -> Option<&'static [SubstitutionKind]> {
        let kinds: &'static [SubstitutionKind] = match token {
            "inline_passthrough" => &[Self::InlinePassthrough],
            "specialcharacters" | "specialchars" | "c" => &[Self::SpecialCharacters],
            "attributes" | "a" => &[Self::Attributes],
            "quotes" | "q" => &[Self::Quotes],
            "replacements" | "r" => &[Self::Replacements],
            "macros" | "m" => &[Self::Macros],
            "post_replacements" | "p" => &[Self::PostReplacements],
            "callouts" => &[Self::Callouts],
            "normal" | "n" => NORMAL,
            "verbatim" | "v" => VERBATIM,
            "none" => NONE,
            _ => return None,
        };
        Some(kinds)
    }
}

pub const NORMAL: &[SubstitutionKind] = &[
    SubstitutionKind::InlinePassthrough,
    SubstitutionKind::SpecialCharacters,
    SubstitutionKind::Attributes,
    SubstitutionKind::Quotes,
    SubstitutionKind::Replacements,
    SubstitutionKind::Macros,
    SubstitutionKind::PostReplacements,
];
pub const VERBATIM: &[SubstitutionKind] = &[
    SubstitutionKind::SpecialCharacters,
    SubstitutionKind::Callouts,
];
pub const NONE: &[SubstitutionKind] = &[];

/// An ordered, duplicate-free list of substitution passes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubstitutionList(Vec<SubstitutionKind>);

impl SubstitutionList {
    #[must_use]
    pub fn new(kinds: &[SubstitutionKind]) -> Self {
        let mut list = Self::default();
        for kind in kinds {
            list.append(*kind);
        }
        list
    }

    /// Compile a `subs` attribute value against the element's defaults.
    ///
    /// The value is either a plain list (`quotes,macros`) replacing the
    /// defaults, or incremental entries only: `+x` prepends, `x+` appends and
    /// `-x` removes. Mixing the two forms is an error.
    pub fn compile(spec: &str, defaults: &[SubstitutionKind]) -> Result<Self, Error> {
        let tokens: Vec<&str> = spec
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect();
        let incremental = tokens
            .iter()
            .filter(|token| token.starts_with('+') || token.starts_with('-') || token.ends_with('+'))
            .count();
        if incremental > 0 && incremental < tokens.len() {
            return Err(Error::UnsupportedSubstitution(format!(
                "'{spec}' mixes incremental and absolute substitutions"
            )));
        }

        let lookup = |name: &str| {
            SubstitutionKind::expand(name)
                .ok_or_else(|| Error::UnsupportedSubstitution(format!("unknown substitution '{name}'")))
        };

        if incremental == 0 {
            let mut list = Self::default();
            for token in &tokens {
                for kind in lookup(token)? {
                    list.append(*kind);
                }
            }
            if list.contains(SubstitutionKind::Macros) {
                list.prepend(SubstitutionKind::InlinePassthrough);
            }
            return Ok(list);
        }

        let mut list = Self::new(defaults);
        for token in &tokens {
            if let Some(name) = token.strip_prefix('+') {
                for kind in lookup(name)?.iter().rev() {
                    list.prepend(*kind);
                }
            } else if let Some(name) = token.strip_prefix('-') {
                for kind in lookup(name)? {
                    list.0.retain(|existing| existing != kind);
                }
            } else if let Some(name) = token.strip_suffix('+') {
                for kind in lookup(name)? {
                    list.append(*kind);
                }
            }
        }
        Ok(list)
    }

    fn append(&mut self, kind: SubstitutionKind) {
        if !self.0.contains(&kind) {
            self.0.push(kind);
        }
    }

    fn prepend(&mut self, kind: SubstitutionKind) {
        self.0.retain(|existing| *existing != kind);
        self.0.insert(0, kind);
    }

    #[must_use]
    pub fn contains(&self, kind: SubstitutionKind) -> bool {
        self.0.contains(&kind)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[SubstitutionKind] {
        &self.0
    }

    /// The list as recorded in an element's `subs` attribute.
    #[must_use]
    pub fn to_attribute_text(&self) -> String {
        self.0
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(",")
    }
}
