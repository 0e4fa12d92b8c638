//! `ifdef`, `ifndef`, `ifeval` and `endif` directives.
use std::path::Path;

use crate::{
    error::{Error, SourceLocation},
    model::DocumentAttributes,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Combinator {
    /// `ifdef::a,b[]`: any of the names.
    Any,
    /// `ifdef::a+b[]` (or a single name): all of the names.
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Operator {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Conditional {
    Defined {
        names: Vec<String>,
        combinator: Combinator,
        negated: bool,
        /// Content of the single-line form `ifdef::name[text]`.
        inline: Option<String>,
    },
    Eval {
        left: String,
        operator: Operator,
        right: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Endif {
    pub(crate) name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, PartialOrd)]
enum Operand {
    Text(String),
    Number(f64),
    Boolean(bool),
}

fn split_names(names: &str) -> Option<(Vec<String>, Combinator)> {
    let (separator, combinator) = if names.contains(',') {
        (',', Combinator::Any)
    } else {
        ('+', Combinator::All)
    };
    let names: Vec<String> = names
        .split(separator)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect();
    (!names.is_empty()).then_some((names, combinator))
}

peg::parser! {
    grammar directive_parser() for str {
        pub(crate) rule conditional() -> Conditional
            = defined() / eval()

        pub(crate) rule endif() -> Endif
            = "endif::" name:$([^'[']*) "[" [^']']* "]" ![_] {
                Endif { name: Some(name.trim()).filter(|n| !n.is_empty()).map(ToString::to_string) }
            }

        rule defined() -> Conditional
            = negated:("ifdef::" { false } / "ifndef::" { true })
              names:$([^'[']+) "[" inline:$((!("]" ![_]) [_])*) "]" ![_] {?
                let (names, combinator) = split_names(names).ok_or("attribute names")?;
                Ok(Conditional::Defined {
                    names,
                    combinator,
                    negated,
                    inline: Some(inline).filter(|text| !text.is_empty()).map(ToString::to_string),
                })
            }

        rule eval() -> Conditional
            = "ifeval::[" left:operand() operator:operator() right:$((!("]" ![_]) [_])+) "]" ![_] {
                Conditional::Eval {
                    left: left.trim().to_string(),
                    operator,
                    right: right.trim().to_string(),
                }
            }

        rule operand() -> &'input str
            = $((!operator() !"]" [_])+)

        rule operator() -> Operator
            = "==" { Operator::Equal }
            / "!=" { Operator::NotEqual }
            / "<=" { Operator::LessThanOrEqual }
            / ">=" { Operator::GreaterThanOrEqual }
            / "<" { Operator::LessThan }
            / ">" { Operator::GreaterThan }
    }
}

impl Conditional {
    #[tracing::instrument(level = "trace", skip(file))]
    pub(crate) fn parse(directive: &str, file: Option<&Path>, line: u32) -> Result<Self, Error> {
        directive_parser::conditional(directive).map_err(|error| {
            tracing::error!(%directive, ?error, "failed to parse conditional directive");
            Error::invalid_conditional(
                file.map(Path::to_path_buf),
                line,
                format!("malformed directive `{directive}`"),
            )
        })
    }

    /// Content of a single-line `ifdef`/`ifndef`.
    pub(crate) fn inline(&self) -> Option<&str> {
        match self {
            Self::Defined { inline, .. } => inline.as_deref(),
            Self::Eval { .. } => None,
        }
    }

    pub(crate) fn evaluate(
        &self,
        attributes: &DocumentAttributes,
        file: Option<&Path>,
        line: u32,
    ) -> Result<bool, Error> {
        match self {
            Self::Defined {
                names,
                combinator,
                negated,
                ..
            } => {
                let defined = match combinator {
                    Combinator::Any => names.iter().any(|name| attributes.contains_key(name)),
                    Combinator::All => names.iter().all(|name| attributes.contains_key(name)),
                };
                Ok(defined != *negated)
            }
            Self::Eval {
                left,
                operator,
                right,
            } => {
                let left = Operand::from_expression(left, attributes);
                let right = Operand::from_expression(right, attributes);
                if std::mem::discriminant(&left) != std::mem::discriminant(&right) {
                    tracing::error!(?left, ?right, line, "cannot compare values of different types in ifeval");
                    return Err(Error::InvalidIfEvalDirectiveMismatchedTypes(Box::new(
                        SourceLocation::new(file.map(Path::to_path_buf), line),
                    )));
                }
                Ok(match operator {
                    Operator::Equal => left == right,
                    Operator::NotEqual => left != right,
                    Operator::LessThan => left < right,
                    Operator::GreaterThan => left > right,
                    Operator::LessThanOrEqual => left <= right,
                    Operator::GreaterThanOrEqual => left >= right,
                })
            }
        }
    }

    /// Whether `endif` closes this conditional.
    pub(crate) fn is_closed_by(&self, endif: &Endif) -> bool {
        match (&endif.name, self) {
            (None, _) => true,
            (Some(name), Self::Defined { names, .. }) => names.contains(name),
            (Some(_), Self::Eval { .. }) => false,
        }
    }
}

impl Endif {
    pub(crate) fn parse(directive: &str, file: Option<&Path>, line: u32) -> Result<Self, Error> {
        directive_parser::endif(directive).map_err(|error| {
            tracing::error!(%directive, ?error, "failed to parse endif directive");
            Error::invalid_conditional(
                file.map(Path::to_path_buf),
                line,
                format!("malformed directive `{directive}`"),
            )
        })
    }
}

impl Operand {
    /// Resolve attribute references, then read the operand as a quoted
    /// string, a boolean, a number or an arithmetic expression, falling back
    /// to bare text.
    fn from_expression(expression: &str, attributes: &DocumentAttributes) -> Self {
        let resolved = attributes.resolve_lenient(expression);
        let resolved = resolved.trim();
        for quote in ['"', '\''] {
            if let Some(inner) = resolved
                .strip_prefix(quote)
                .and_then(|rest| rest.strip_suffix(quote))
            {
                return Self::Text(inner.to_string());
            }
        }
        resolved
            .parse::<bool>()
            .map(Self::Boolean)
            .or_else(|_| resolved.parse::<f64>().map(Self::Number))
            .or_else(|_| evalexpr::eval_float(resolved).map(Self::Number))
            .or_else(|_| {
                #[allow(clippy::cast_precision_loss)]
                evalexpr::eval_int(resolved).map(|value| Self::Number(value as f64))
            })
            .unwrap_or_else(|_| Self::Text(resolved.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::model::AttributeValue;

    fn attributes() -> DocumentAttributes {
        let mut attributes = DocumentAttributes::default();
        attributes.insert("a".into(), AttributeValue::None);
        attributes.insert("b".into(), AttributeValue::String("2".into()));
        attributes.insert("backend".into(), AttributeValue::String("html5".into()));
        attributes
    }

    fn evaluate(directive: &str) -> Result<bool, Error> {
        Conditional::parse(directive, None, 1)?.evaluate(&attributes(), None, 1)
    }

    #[rstest]
    #[case("ifdef::a[]", true)]
    #[case("ifdef::missing[]", false)]
    #[case("ifdef::a,missing[]", true)]
    #[case("ifdef::a+missing[]", false)]
    #[case("ifdef::a+b[]", true)]
    #[case("ifndef::a[]", false)]
    #[case("ifndef::missing[]", true)]
    #[case("ifndef::a+missing[]", true)]
    #[case("ifeval::[1 + 1 == 2]", true)]
    #[case("ifeval::[{b} > 1]", true)]
    #[case("ifeval::[{b} <= 1]", false)]
    #[case("ifeval::[\"{backend}\" == \"html5\"]", true)]
    #[case("ifeval::['{backend}' != 'pdf']", true)]
    fn test_evaluation(#[case] directive: &str, #[case] expected: bool) -> Result<(), Error> {
        assert_eq!(evaluate(directive)?, expected);
        Ok(())
    }

    #[test]
    fn test_single_line_form() -> Result<(), Error> {
        let conditional = Conditional::parse("ifdef::a[Shown when a is set]", None, 1)?;
        assert_eq!(conditional.inline(), Some("Shown when a is set"));
        assert!(Conditional::parse("ifdef::a[]", None, 1)?.inline().is_none());
        Ok(())
    }

    #[test]
    fn test_mismatched_types_are_rejected() {
        let result = evaluate("ifeval::[1 == \"one\"]");
        assert!(matches!(
            result,
            Err(Error::InvalidIfEvalDirectiveMismatchedTypes(location)) if location.line == 1
        ));
    }

    #[test]
    fn test_malformed_directive() {
        assert!(matches!(
            Conditional::parse("ifeval::[no operator]", None, 4),
            Err(Error::InvalidConditionalDirective(location, _)) if location.line == 4
        ));
    }

    #[test]
    fn test_endif_matching() -> Result<(), Error> {
        let conditional = Conditional::parse("ifdef::a,b[]", None, 1)?;
        assert!(conditional.is_closed_by(&Endif::parse("endif::[]", None, 2)?));
        assert!(conditional.is_closed_by(&Endif::parse("endif::b[]", None, 2)?));
        assert!(!conditional.is_closed_by(&Endif::parse("endif::c[]", None, 2)?));
        let eval = Conditional::parse("ifeval::[1 < 2]", None, 1)?;
        assert!(!eval.is_closed_by(&Endif::parse("endif::a[]", None, 2)?));
        Ok(())
    }
}
