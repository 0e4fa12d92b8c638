use crate::model::{self, AttributeValue, Attributes};

/// One entry of a bracketed attribute list, before interpretation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RawAttribute {
    Named(String, String),
    Positional(String),
}

peg::parser! {
    pub(crate) grammar attribute_list() for str {
        pub(crate) rule entries() -> Vec<RawAttribute>
            = _ entries:(entry() ** ("," _)) _ ![_] { entries }

        rule entry() -> RawAttribute
            = name:name() _ "=" _ value:value() { RawAttribute::Named(name.to_string(), value) }
            / value:value() { RawAttribute::Positional(value) }

        rule value() -> String
            = "\"" v:$(("\\\"" / [^'"'])*) "\"" _ &("," / ![_]) { v.replace("\\\"", "\"") }
            / "'" v:$([^'\'']*) "'" _ &("," / ![_]) { v.to_string() }
            / v:$([^',']+) { v.trim().to_string() }
            / &("," / ![_]) { String::new() }

        rule name() -> &'input str
            = $(['a'..='z' | 'A'..='Z' | '0'..='9' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-']*)

        rule _ = [' ' | '\t']*
    }
}

/// Split the content of `[...]` into raw entries. Empty content yields no entries.
pub(crate) fn parse_entries(content: &str) -> Option<Vec<RawAttribute>> {
    if content.trim().is_empty() {
        return Some(Vec::new());
    }
    match attribute_list::entries(content) {
        Ok(entries) => Some(entries),
        Err(error) => {
            tracing::trace!(%content, ?error, "not an attribute list");
            None
        }
    }
}

/// Parse a block or inline attribute list, expanding the first positional's
/// `style#id.role%option` shorthand.
pub(crate) fn parse_attribute_list(content: &str) -> Option<Attributes> {
    parse_entries(content).map(|entries| interpret(entries, true))
}

/// Parse a macro attribute list: positionals are kept as written.
pub(crate) fn parse_macro_attributes(content: &str) -> Option<Attributes> {
    parse_entries(content).map(|entries| interpret(entries, false))
}

fn interpret(entries: Vec<RawAttribute>, shorthand: bool) -> Attributes {
    let mut attributes = Attributes::new();
    let mut positionals = Vec::new();
    for entry in entries {
        match entry {
            RawAttribute::Positional(value) => {
                if shorthand && positionals.is_empty() && is_shorthand(&value) {
                    let style = expand_shorthand(&value, &mut attributes);
                    positionals.push(style);
                } else {
                    positionals.push(value);
                }
            }
            RawAttribute::Named(name, value) => match name.as_str() {
                "role" | "roles" => {
                    for role in value.split_whitespace() {
                        attributes.push_to_list(model::ROLES, role);
                    }
                }
                "opts" | "options" => {
                    for option in value.split(',').map(str::trim).filter(|o| !o.is_empty()) {
                        attributes.push_to_list(model::OPTIONS, option);
                    }
                }
                _ => {
                    attributes.insert(name, AttributeValue::String(value));
                }
            },
        }
    }
    if shorthand
        && let Some(style) = positionals.first().filter(|style| !style.is_empty())
    {
        attributes.insert(model::STYLE, AttributeValue::String(style.clone()));
    }
    if !positionals.is_empty() {
        attributes.insert(model::POSITIONAL, AttributeValue::List(positionals));
    }
    attributes
}

fn is_shorthand(value: &str) -> bool {
    !value.is_empty() && !value.contains(char::is_whitespace) && !value.contains(['"', '\''])
}

/// Expand `style#id.role%option` into `attributes`, returning the style part.
fn expand_shorthand(value: &str, attributes: &mut Attributes) -> String {
    let mut style = String::new();
    let mut current: Option<(char, String)> = None;
    let flush = |segment: Option<(char, String)>, attributes: &mut Attributes| {
        if let Some((marker, text)) = segment
            && !text.is_empty()
        {
            match marker {
                '#' => {
                    attributes.insert(model::ID, AttributeValue::String(text));
                }
                '.' => attributes.push_to_list(model::ROLES, text),
                _ => attributes.push_to_list(model::OPTIONS, text),
            }
        }
    };
    for c in value.chars() {
        if matches!(c, '#' | '.' | '%') {
            flush(current.take(), attributes);
            current = Some((c, String::new()));
        } else if let Some((_, text)) = current.as_mut() {
            text.push(c);
        } else {
            style.push(c);
        }
    }
    flush(current, attributes);
    style
}
