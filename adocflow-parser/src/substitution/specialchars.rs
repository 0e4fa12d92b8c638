use super::{
    Scope,
    flatten::{AMPERSAND, Flat, GREATER_THAN, LESS_THAN},
};

pub(super) fn escape(c: char) -> char {
    match c {
        '<' => LESS_THAN,
        '>' => GREATER_THAN,
        '&' => AMPERSAND,
        other => other,
    }
}

pub(super) fn apply(flat: &mut Flat, scope: &mut Scope<'_>) {
    for c in &mut flat.chars {
        *c = escape(*c);
    }
    scope.special_characters = true;
}
