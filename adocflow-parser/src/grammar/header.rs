use crate::model::{Author, Revision};

peg::parser! {
    pub(crate) grammar header_parser() for str {
        /// `First [Middle] Last [<email>]`, several authors separated by `;`.
        pub(crate) rule authors() -> Vec<Author>
            = _ authors:(author() ++ (_ ";" _)) _ ";"? _ ![_] { authors }

        rule author() -> Author
            = names:(name_part() ++ ([' ' | '\t']+)) email:email()? {
                Author::from_name_parts(&names, email.map(ToString::to_string))
            }

        rule email() -> &'input str
            = _ "<" email:$([^'>']+) ">" { email }

        rule name_part() -> &'input str
            = $((!['<' | ';' | ',' | ':' | ' ' | '\t'] [_])+)

        /// `v1.2, 2024-05-01: Remark`; only the number is required.
        pub(crate) rule revision() -> Revision
            = "v"? number:$(digits() ++ ".") date:revision_date()? remark:revision_remark()? _ ![_] {
                Revision {
                    number: number.to_string(),
                    date: date.map(|d| d.trim().to_string()),
                    remark: remark.map(|r| r.trim().to_string()),
                }
            }

        rule revision_date() -> &'input str
            = _ "," _ date:$([^':']+) { date }

        rule revision_remark() -> &'input str
            = _ ":" _ remark:$([_]+) { remark }

        rule digits() = ['0'..='9']+

        rule _ = [' ' | '\t']*
    }
}

pub(crate) fn parse_authors(line: &str) -> Option<Vec<Author>> {
    header_parser::authors(line).ok()
}

pub(crate) fn parse_revision(line: &str) -> Option<Revision> {
    header_parser::revision(line).ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_single_author() {
        let authors = parse_authors("John Doe");
        assert_eq!(
            authors,
            Some(vec![Author::from_name_parts(&["John", "Doe"], None)])
        );
    }

    #[test]
    fn test_multiple_authors_with_email() {
        let Some(authors) = parse_authors("Jane Q Public <jane@example.com>; Bob Smith") else {
            panic!("expected authors");
        };
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].middle_name.as_deref(), Some("Q"));
        assert_eq!(authors[0].email.as_deref(), Some("jane@example.com"));
        assert_eq!(authors[1].full_name, "Bob Smith");
    }

    #[test]
    fn test_sentences_with_punctuation_are_not_authors() {
        assert_eq!(parse_authors("Hello, world"), None);
        assert_eq!(parse_authors("Note: this"), None);
    }

    #[test]
    fn test_revision_line() {
        assert_eq!(
            parse_revision("v2.9, 2024-01-01: Initial release"),
            Some(Revision {
                number: "2.9".into(),
                date: Some("2024-01-01".into()),
                remark: Some("Initial release".into()),
            })
        );
        assert_eq!(
            parse_revision("1.0"),
            Some(Revision {
                number: "1.0".into(),
                date: None,
                remark: None,
            })
        );
        assert_eq!(parse_revision("just text"), None);
    }
}
