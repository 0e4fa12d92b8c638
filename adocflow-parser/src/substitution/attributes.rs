//! `{name}` references, resolved against the attribute map as it stands at
//! the element being substituted.
use super::{
    Scope,
    flatten::{Flat, is_placeholder},
    specialchars,
};
use crate::model::{AttributeReference, Inline, InlinePassthrough, PassthroughKind, is_attribute_name};

/// What to do with a reference to an attribute that is not set, from the
/// `attribute-missing` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Missing {
    Skip,
    Drop,
    DropLine,
    Warn,
}

impl Missing {
    fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("drop") => Self::Drop,
            Some("drop-line") => Self::DropLine,
            Some("warn") => Self::Warn,
            Some(_) | None => Self::Skip,
        }
    }
}

/// The attribute name of a `{name}` reference starting at `at`, and the
/// index of its closing brace.
fn reference_at(chars: &[char], at: usize) -> Option<(String, usize)> {
    if chars.get(at) != Some(&'{') {
        return None;
    }
    let close = (at + 1..chars.len())
        .take_while(|&index| chars.get(index).is_some_and(|c| *c != '\n' && *c != '{'))
        .find(|&index| chars.get(index) == Some(&'}'))?;
    let name: String = chars.get(at + 1..close)?.iter().collect();
    is_attribute_name(&name).then_some((name, close))
}

/// The characters standing for the value of a resolved reference. The value
/// gets the escaping the text around it already had, and any reference it
/// still holds was unresolved when it was declared, so it stays opaque.
fn splice_value(flat: &mut Flat, value: &str, escape: bool) -> Vec<char> {
    let chars: Vec<char> = value.chars().collect();
    let mut out = Vec::with_capacity(chars.len());
    let mut at = 0;
    while let Some(&c) = chars.get(at) {
        if let Some((name, close)) = reference_at(&chars, at) {
            out.extend(flat.leaf(Inline::AttributeReference(AttributeReference { name })));
            at = close + 1;
            continue;
        }
        out.push(if is_placeholder(c) {
            char::REPLACEMENT_CHARACTER
        } else if escape {
            specialchars::escape(c)
        } else {
            c
        });
        at += 1;
    }
    out
}

pub(super) fn apply(flat: &mut Flat, scope: &mut Scope<'_>) {
    let missing = Missing::from_attribute(scope.attributes.get_text("attribute-missing").as_deref());
    let chars = std::mem::take(&mut flat.chars);
    let mut out = Vec::with_capacity(chars.len());
    let mut line_start = 0;
    let mut drop_line = false;
    let mut at = 0;

    while let Some(&c) = chars.get(at) {
        if c == '\\'
            && let Some((name, close)) = reference_at(&chars, at + 1)
        {
            let marker = flat.leaf(Inline::Passthrough(InlinePassthrough {
                kind: PassthroughKind::Escape,
                elements: vec![Inline::StringElement(format!("{{{name}}}"))],
                source: format!("\\{{{name}}}"),
            }));
            out.extend(marker);
            at = close + 1;
            continue;
        }

        if let Some((name, close)) = reference_at(&chars, at) {
            match scope.attributes.get_text(&name) {
                Some(value) => {
                    let spliced = splice_value(flat, &value, scope.special_characters);
                    out.extend(spliced);
                }
                None => match missing {
                    Missing::Drop => {
                        tracing::debug!(attribute = %name, "dropping reference to missing attribute");
                    }
                    Missing::DropLine => {
                        tracing::debug!(attribute = %name, "dropping line with reference to missing attribute");
                        drop_line = true;
                    }
                    Missing::Skip | Missing::Warn => {
                        if missing == Missing::Warn {
                            tracing::warn!(attribute = %name, "skipping reference to missing attribute");
                        }
                        out.extend(flat.leaf(Inline::AttributeReference(AttributeReference { name })));
                    }
                },
            }
            at = close + 1;
            continue;
        }

        if c == '\n' {
            if drop_line {
                out.truncate(line_start);
                drop_line = false;
            } else {
                out.push(c);
            }
            line_start = out.len();
        } else {
            out.push(c);
        }
        at += 1;
    }
    if drop_line {
        out.truncate(line_start);
        // The newline that ended the previous line now ends the text.
        if out.last() == Some(&'\n') {
            out.pop();
        }
    }
    flat.chars = out;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{
        Error,
        model::{
            AttributeValue, DocumentAttributes, NORMAL, QuotedText, QuotedTextKind, SubstitutionKind, inlines_to_source,
        },
        substitution::{resubstitute, tests::run_with},
    };

    fn attributes(entries: &[(&str, &str)]) -> DocumentAttributes {
        let mut attributes = DocumentAttributes::intrinsic();
        for (name, value) in entries {
            attributes.declare(name, AttributeValue::String((*value).to_string()));
        }
        attributes
    }

    #[test]
    fn test_defined_references_resolve() -> Result<(), Error> {
        let inlines = run_with("{x} and {y}", NORMAL, &attributes(&[("x", "hi"), ("y", "there")]))?;
        assert_eq!(inlines, vec![Inline::text("hi and there")]);
        Ok(())
    }

    #[test]
    fn test_intrinsic_attributes() -> Result<(), Error> {
        let inlines = run_with("C{pp} a{sp}b", NORMAL, &attributes(&[]))?;
        assert_eq!(inlines, vec![Inline::text("C++ a b")]);
        Ok(())
    }

    #[test]
    fn test_missing_reference_is_kept() -> Result<(), Error> {
        let inlines = run_with("say {nope}", NORMAL, &attributes(&[]))?;
        assert_eq!(
            inlines,
            vec![
                Inline::text("say "),
                Inline::AttributeReference(AttributeReference { name: "nope".into() })
            ]
        );
        assert_eq!(inlines_to_source(&inlines), "say {nope}");
        Ok(())
    }

    #[rstest]
    #[case("drop", "a  b\nkeep")]
    #[case("drop-line", "keep")]
    fn test_missing_policies(#[case] policy: &str, #[case] expected: &str) -> Result<(), Error> {
        let inlines = run_with(
            "a {nope} b\nkeep",
            NORMAL,
            &attributes(&[("attribute-missing", policy)]),
        )?;
        assert_eq!(inlines, vec![Inline::text(expected)]);
        Ok(())
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_missing_policy_warn() -> Result<(), Error> {
        run_with("{nope}", NORMAL, &attributes(&[("attribute-missing", "warn")]))?;
        assert!(logs_contain("skipping reference to missing attribute"));
        Ok(())
    }

    #[test]
    fn test_escaped_reference_stays_literal() -> Result<(), Error> {
        let inlines = run_with("\\{x} is {x}", NORMAL, &attributes(&[("x", "set")]))?;
        assert_eq!(inlines_to_source(&inlines), "\\{x} is set");
        let Some(Inline::Passthrough(escape)) = inlines.first() else {
            panic!("expected an escape, found {inlines:?}");
        };
        assert_eq!(escape.elements, vec![Inline::text("{x}")]);
        Ok(())
    }

    #[test]
    fn test_values_are_escaped_like_the_surrounding_text() -> Result<(), Error> {
        let attributes = attributes(&[("x", "a<b & *c*")]);
        let first = run_with("{x}", NORMAL, &attributes)?;
        assert_eq!(
            first.get(..5),
            Some(
                &[
                    Inline::text("a"),
                    Inline::special('<'),
                    Inline::text("b "),
                    Inline::special('&'),
                    Inline::text(" "),
                ][..]
            )
        );
        assert!(matches!(
            first.get(5),
            Some(Inline::QuotedText(QuotedText { kind: QuotedTextKind::Bold, .. }))
        ));
        assert_eq!(resubstitute(&first, &attributes)?, first);
        Ok(())
    }

    #[test]
    fn test_values_stay_plain_without_special_characters() -> Result<(), Error> {
        let inlines = run_with("{x}", &[SubstitutionKind::Attributes], &attributes(&[("x", "<&>")]))?;
        assert_eq!(inlines, vec![Inline::text("<&>")]);
        Ok(())
    }

    #[test]
    fn test_unresolved_reference_inside_a_value_stays_a_reference() -> Result<(), Error> {
        let attributes = attributes(&[("x", "see {later}")]);
        let first = run_with("{x}", NORMAL, &attributes)?;
        assert_eq!(
            first,
            vec![
                Inline::text("see "),
                Inline::AttributeReference(AttributeReference { name: "later".into() }),
            ]
        );
        assert_eq!(resubstitute(&first, &attributes)?, first);
        Ok(())
    }

    #[test]
    fn test_braces_that_are_not_references() -> Result<(), Error> {
        let inlines = run_with("{not a ref} {}", NORMAL, &attributes(&[]))?;
        assert_eq!(inlines, vec![Inline::text("{not a ref} {}")]);
        Ok(())
    }
}
