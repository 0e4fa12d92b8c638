//! Input generators for the property tests.
#![allow(clippy::expect_used)]
use proptest::prelude::*;

/// Any string at all, including control characters and the noncharacters
/// the substitution engine uses internally.
pub fn any_document_string() -> impl Strategy<Value = String> {
    prop::string::string_regex("(.|\n)*").expect("Failed to create any string strategy")
}

/// Lines that never start a directive, so that the preprocessor passes
/// each one through unchanged.
pub fn plain_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("= Title".to_string()),
        Just("== Section".to_string()),
        Just("=== Subsection".to_string()),
        Just("* item".to_string()),
        Just("** nested item".to_string()),
        Just(". step".to_string()),
        Just("term:: definition".to_string()),
        Just("+".to_string()),
        Just("----".to_string()),
        Just("====".to_string()),
        Just("|===".to_string()),
        Just("| cell | cell".to_string()),
        Just("// comment".to_string()),
        Just(":name: value".to_string()),
        Just(":name!:".to_string()),
        Just("[role]".to_string()),
        Just("[[anchor]]".to_string()),
        Just(".Block title".to_string()),
        Just("NOTE: careful".to_string()),
        Just("'''".to_string()),
        Just("<<<".to_string()),
        Just("image::pic.png[]".to_string()),
        Just("toc::[]".to_string()),
        Just("<1> callout".to_string()),
        prop::string::string_regex("[a-zA-Z0-9 .,!?*_`#<>&-]{1,40}").expect("Failed to create text line"),
    ]
}

/// Documents made of [`plain_line`]s.
pub fn structured_document() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(plain_line(), 0..40)
}

/// Inline text built from markup whose source form survives substitution.
pub fn inline_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            prop::string::string_regex("[a-z]{1,8}").expect("Failed to create word"),
            Just("*bold*".to_string()),
            Just("_italic_".to_string()),
            Just("`mono`".to_string()),
            Just("#marked#".to_string()),
            Just("'`curly`'".to_string()),
            Just("<".to_string()),
            Just(">".to_string()),
            Just("&".to_string()),
            Just("{undefined}".to_string()),
            Just("(C)".to_string()),
            Just("it's".to_string()),
            Just("--".to_string()),
        ],
        1..12,
    )
    .prop_map(|tokens| tokens.join(" "))
}

/// An attribute value mixing words, markup and special characters.
pub fn attribute_value() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            prop::string::string_regex("[a-z]{1,6}").expect("Failed to create word"),
            Just("<".to_string()),
            Just(">".to_string()),
            Just("&".to_string()),
            Just("*b*".to_string()),
            Just("_i_".to_string()),
            Just("`m`".to_string()),
            Just("(C)".to_string()),
            Just("{undefined}".to_string()),
        ],
        1..6,
    )
    .prop_map(|tokens| tokens.join(" "))
}

/// A `leveloffset` entry value: relative (`+N`/`-N`) or absolute (`N`).
pub fn level_offset() -> impl Strategy<Value = String> {
    prop_oneof![
        (0..3isize).prop_map(|n| format!("+{n}")),
        (0..3isize).prop_map(|n| format!("-{n}")),
        (0..6isize).prop_map(|n| n.to_string()),
    ]
}
