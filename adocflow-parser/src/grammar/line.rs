use crate::{
    fragment::{BlockDelimiter, DelimiterKind, FragmentKind, ListMarker, TableDelimiter},
    grammar::{parse_attribute_list, parse_macro_attributes},
    model::{self, AdmonitionKind, AttributeValue, Attributes, CheckStyle, ListKind, NumberingStyle},
};

fn block_delimiter(kind: DelimiterKind, run: &str) -> BlockDelimiter {
    BlockDelimiter {
        kind,
        length: run.chars().count(),
        language: None,
    }
}

fn marker(kind: ListKind, level: usize, marker: &str, text: &str) -> ListMarker {
    ListMarker {
        kind,
        level: u8::try_from(level).unwrap_or(u8::MAX),
        marker: marker.to_string(),
        check_style: None,
        term: None,
        text: text.trim().to_string(),
    }
}

fn ordered(style: NumberingStyle, level: usize, marker_text: &str, text: &str) -> ListMarker {
    marker(ListKind::Ordered(style), level, marker_text, text)
}

peg::parser! {
    /// Context-free classification of a single line. The lexer layers the
    /// context-dependent rules (verbatim blocks, header lines, declarations
    /// in running prose) on top.
    pub(crate) grammar line_parser() for str {
        pub(crate) rule line() -> FragmentKind
            = blank()
            / d:delimiter() end() { FragmentKind::BlockDelimiter(d) }
            / comment()
            / section_header()
            / breaks()
            / attribute_entry()
            / anchor()
            / attribute_cluster()
            / block_title()
            / include_directive()
            / image_block()
            / toc_macro()
            / conditional()
            / escaped_directive()
            / list_continuation()
            / admonition()
            / m:list_marker() { FragmentKind::ListElementMarker(m) }
            / text:$([_]*) { FragmentKind::InlineElements(text.to_string()) }

        rule end() = ![_]
        rule space() = [' ' | '\t']+
        rule ws() = [' ' | '\t']*
        rule bracket_content() -> &'input str = $((!("]" end()) [_])*)

        rule blank() -> FragmentKind
            = ws() end() { FragmentKind::BlankLine }

        pub(crate) rule delimiter() -> BlockDelimiter
            = run:$("/"*<4,>) { block_delimiter(DelimiterKind::Comment, run) }
            / run:$("="*<4,>) { block_delimiter(DelimiterKind::Example, run) }
            / run:$("-"*<4,>) { block_delimiter(DelimiterKind::Listing, run) }
            / run:$("."*<4,>) { block_delimiter(DelimiterKind::Literal, run) }
            / run:$("+"*<4,>) { block_delimiter(DelimiterKind::Passthrough, run) }
            / run:$("_"*<4,>) { block_delimiter(DelimiterKind::Quote, run) }
            / run:$("*"*<4,>) { block_delimiter(DelimiterKind::Sidebar, run) }
            / run:$("--") &end() { block_delimiter(DelimiterKind::Open, run) }
            / run:$("```") language:$([^'`']*) {
                BlockDelimiter {
                    language: Some(language.trim().to_string()).filter(|l| !l.is_empty()),
                    ..block_delimiter(DelimiterKind::Fenced, run)
                }
            }
            / run:$("|" "="*<3,>) { block_delimiter(DelimiterKind::Table(TableDelimiter::Pipe), run) }
            / run:$("," "="*<3,>) { block_delimiter(DelimiterKind::Table(TableDelimiter::Comma), run) }
            / run:$(":" "="*<3,>) { block_delimiter(DelimiterKind::Table(TableDelimiter::Colon), run) }

        rule comment() -> FragmentKind
            = "//" text:$([_]*) { FragmentKind::SingleLineComment(text.to_string()) }

        rule section_header() -> FragmentKind
            = marks:$("="*<1,6>) space() title:$([_]+) {?
                let level = u8::try_from(marks.len().saturating_sub(1)).map_err(|_| "section level")?;
                Ok(FragmentKind::SectionHeader { level, title: title.trim().to_string() })
            }

        rule breaks() -> FragmentKind
            = "'''" "'"* end() { FragmentKind::ThematicBreak }
            / "<<<" end() { FragmentKind::PageBreak }

        rule attribute_name() -> &'input str
            = $(['a'..='z' | 'A'..='Z' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-']*)

        rule attribute_entry() -> FragmentKind
            = ":!" name:attribute_name() ":" end() {
                FragmentKind::AttributeReset { name: name.to_string() }
            }
            / ":" name:attribute_name() "!:" end() {
                FragmentKind::AttributeReset { name: name.to_string() }
            }
            / ":" name:attribute_name() ":" value:(space() v:$([_]*) { v })? end() {
                FragmentKind::AttributeDeclaration {
                    name: name.to_string(),
                    value: value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
                }
            }

        rule anchor() -> FragmentKind
            = "[[" id:$(['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' | '.' | ':']+)
              reftext:("," ws() r:$((!"]]" [_])+) { r })? "]]" end() {
                let mut attributes = Attributes::new();
                attributes.insert(model::ID, AttributeValue::String(id.to_string()));
                if let Some(reftext) = reftext {
                    attributes.insert(model::REFTEXT, AttributeValue::String(reftext.trim().to_string()));
                }
                FragmentKind::AttributeCluster(attributes)
            }

        rule attribute_cluster() -> FragmentKind
            = "[" !"[" content:bracket_content() "]" end() {?
                parse_attribute_list(content)
                    .map(FragmentKind::AttributeCluster)
                    .ok_or("attribute list")
            }

        rule block_title() -> FragmentKind
            = "." !['.' | ' ' | '\t'] title:$([_]+) {
                let mut attributes = Attributes::new();
                attributes.insert(model::TITLE, AttributeValue::String(title.to_string()));
                FragmentKind::AttributeCluster(attributes)
            }

        rule include_directive() -> FragmentKind
            = "include::" target:$((!"[" [_])+) "[" attributes:bracket_content() "]" end() {
                FragmentKind::FileInclusion {
                    target: target.to_string(),
                    attributes: attributes.to_string(),
                }
            }

        rule image_block() -> FragmentKind
            = "image::" target:$((!['[' | ' ' | '\t'] [_])+) "[" content:bracket_content() "]" end() {?
                let mut attributes = parse_macro_attributes(content).ok_or("image attributes")?;
                if let Some(alt) = attributes.positional(0).map(ToString::to_string) {
                    attributes.insert("alt", AttributeValue::String(alt));
                }
                Ok(FragmentKind::ImageBlock { target: target.to_string(), attributes })
            }

        rule toc_macro() -> FragmentKind
            = "toc::[" bracket_content() "]" end() { FragmentKind::TableOfContentsMacro }

        rule conditional() -> FragmentKind
            = directive:$(("ifdef::" / "ifndef::" / "ifeval::") [^'[']* "[" bracket_content() "]") end() {
                FragmentKind::ConditionalDirective(directive.to_string())
            }
            / directive:$("endif::" [^'[']* "[" bracket_content() "]") end() {
                FragmentKind::EndifDirective(directive.to_string())
            }

        rule escaped_directive() -> FragmentKind
            = "\\" rest:$(("include::" / "ifdef::" / "ifndef::" / "ifeval::" / "endif::") [_]*) {
                FragmentKind::InlineElements(rest.to_string())
            }

        rule list_continuation() -> FragmentKind
            = "+" end() { FragmentKind::ListContinuation }

        rule admonition() -> FragmentKind
            = label:$("NOTE" / "TIP" / "IMPORTANT" / "WARNING" / "CAUTION") ":" space() text:$([_]+) {?
                AdmonitionKind::from_label(label)
                    .map(|kind| FragmentKind::Admonition { kind, text: text.to_string() })
                    .ok_or("admonition label")
            }

        rule checkbox() -> CheckStyle
            = "[" mark:$([' ' | 'x' | 'X' | '*']) "]" space() {
                if mark == " " { CheckStyle::Unchecked } else { CheckStyle::Checked }
            }

        rule label_delimiter() -> &'input str
            = $("::::" / ":::" / "::" / ";;")

        pub(crate) rule list_marker() -> ListMarker
            = ws() m:$("*"*<1,5> / "-") space() check:checkbox()? text:$([_]+) {
                let level = if m == "-" { 1 } else { m.len() };
                ListMarker { check_style: check, ..marker(ListKind::Unordered, level, m, text) }
            }
            / ws() m:$("."*<1,5>) space() text:$([_]+) {
                ordered(NumberingStyle::for_level(u8::try_from(m.len()).unwrap_or(1)), m.len(), m, text)
            }
            / ws() m:$(['0'..='9']+ ".") space() text:$([_]+) { ordered(NumberingStyle::Arabic, 1, m, text) }
            / ws() m:$(['a'..='z'] ".") space() text:$([_]+) { ordered(NumberingStyle::LowerAlpha, 2, m, text) }
            / ws() m:$(['i' | 'v' | 'x']+ ")") space() text:$([_]+) { ordered(NumberingStyle::LowerRoman, 3, m, text) }
            / ws() m:$(['A'..='Z'] ".") space() text:$([_]+) { ordered(NumberingStyle::UpperAlpha, 4, m, text) }
            / ws() m:$(['I' | 'V' | 'X']+ ")") space() text:$([_]+) { ordered(NumberingStyle::UpperRoman, 5, m, text) }
            / m:$("<" (['0'..='9']+ / ".") ">") space() text:$([_]+) { marker(ListKind::Callout, 1, m, text) }
            / term:$(![' ' | '\t'] (!(label_delimiter() ([' ' | '\t'] / end())) [_])+)
              d:label_delimiter() &([' ' | '\t'] / end()) ws() text:$([_]*) {
                let level = if d == ";;" { 4 } else { d.len().saturating_sub(1) };
                ListMarker {
                    term: Some(term.trim().to_string()),
                    ..marker(ListKind::Labeled, level, d, text)
                }
            }
    }
}

/// Classify a line without context. Never fails: anything unrecognised is prose.
pub(crate) fn classify(line: &str) -> FragmentKind {
    line_parser::line(line).unwrap_or_else(|error| {
        tracing::trace!(%line, ?error, "line did not classify, treating as prose");
        FragmentKind::InlineElements(line.to_string())
    })
}
