//! Tagged-region selection for `include::file[tag=...]` / `tags=...`.
use rustc_hash::{FxHashMap, FxHashSet};

/// One entry of a `tag=` / `tags=` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Filter {
    /// `name`: lines of the named region.
    Include(String),
    /// `!name`: drop lines of the named region.
    Exclude(String),
    /// `*`: lines of every tagged region.
    Wildcard,
    /// `!*`: drop lines of every tagged region.
    ExcludeTagged,
    /// `**`: every line.
    DoubleWildcard,
}

impl Filter {
    pub(crate) fn parse(tag: &str) -> Self {
        match tag.trim() {
            "**" => Self::DoubleWildcard,
            "*" => Self::Wildcard,
            "!*" => Self::ExcludeTagged,
            other => match other.strip_prefix('!') {
                Some(name) => Self::Exclude(name.to_string()),
                None => Self::Include(other.to_string()),
            },
        }
    }

    /// Parse a `;`- or `,`-separated list of filters.
    pub(crate) fn parse_list(value: &str) -> Vec<Self> {
        value
            .split([';', ','])
            .filter(|tag| !tag.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Directive {
    Start,
    End,
}

/// Lines of one tagged region: `start` is the first line after `tag::`,
/// `end` the line holding `end::` (exclusive).
#[derive(Debug, PartialEq, Eq)]
struct Region {
    name: String,
    start: usize,
    end: usize,
}

/// Find `tag::name[]` or `end::name[]` in a line, typically behind a comment marker.
fn extract_tag_directive(line: &str) -> Option<(Directive, &str)> {
    for (directive, keyword) in [(Directive::Start, "tag::"), (Directive::End, "end::")] {
        let Some(position) = line.find(keyword) else {
            continue;
        };
        let preceded_by_word = line
            .get(..position)
            .and_then(|before| before.chars().last())
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if preceded_by_word {
            continue;
        }
        let after = line.get(position + keyword.len()..).unwrap_or_default();
        if let Some(bracket) = after.find("[]") {
            let name = after.get(..bracket).unwrap_or_default();
            if !name.is_empty() && !name.chars().any(|c| c.is_whitespace() || c == '[' || c == ']') {
                return Some((directive, name));
            }
        }
    }
    None
}

fn find_tag_regions(lines: &[String]) -> Vec<Region> {
    let mut regions = Vec::new();
    let mut open: FxHashMap<&str, usize> = FxHashMap::default();

    for (index, line) in lines.iter().enumerate() {
        match extract_tag_directive(line) {
            Some((Directive::Start, name)) => {
                open.insert(name, index + 1);
            }
            Some((Directive::End, name)) => match open.remove(name) {
                Some(start) => regions.push(Region {
                    name: name.to_string(),
                    start,
                    end: index,
                }),
                None => tracing::warn!(tag = %name, line = index + 1, "end of a tag that was never opened"),
            },
            None => {}
        }
    }

    // An unclosed region keeps every line up to the end of the file.
    for (name, start) in open {
        tracing::warn!(tag = %name, "unclosed tag region, including lines to the end of the file");
        regions.push(Region {
            name: name.to_string(),
            start,
            end: lines.len(),
        });
    }
    regions
}

fn region_lines<'a>(regions: &'a [Region], name: &'a str) -> impl Iterator<Item = usize> + 'a {
    regions
        .iter()
        .filter(move |region| region.name == name)
        .flat_map(|region| region.start..region.end)
}

/// Select lines according to `filters`.
///
/// The selection starts from every line when no filter selects anything
/// positively (or `**` is present), otherwise from nothing; positive filters
/// add region lines and negative filters remove them. Tag directive lines are
/// never selected. Fails with the name of the first requested tag that does
/// not exist in the file.
pub(crate) fn apply_tag_filters(lines: &[String], filters: &[Filter]) -> Result<Vec<String>, String> {
    let regions = find_tag_regions(lines);
    let tagged: FxHashSet<usize> = regions
        .iter()
        .flat_map(|region| region.start..region.end)
        .collect();

    let select_all = filters.iter().all(|filter| {
        matches!(filter, Filter::Exclude(_) | Filter::ExcludeTagged | Filter::DoubleWildcard)
    });
    let mut selected: FxHashSet<usize> = if select_all {
        (0..lines.len()).collect()
    } else {
        FxHashSet::default()
    };

    for filter in filters {
        match filter {
            Filter::Include(name) => {
                if !regions.iter().any(|region| &region.name == name) {
                    return Err(name.clone());
                }
                selected.extend(region_lines(&regions, name));
            }
            Filter::Wildcard => selected.extend(tagged.iter().copied()),
            Filter::DoubleWildcard => selected.extend(0..lines.len()),
            Filter::Exclude(_) | Filter::ExcludeTagged => {}
        }
    }
    for filter in filters {
        match filter {
            Filter::Exclude(name) => {
                for index in region_lines(&regions, name) {
                    selected.remove(&index);
                }
            }
            Filter::ExcludeTagged => selected.retain(|index| !tagged.contains(index)),
            Filter::Include(_) | Filter::Wildcard | Filter::DoubleWildcard => {}
        }
    }

    Ok(lines
        .iter()
        .enumerate()
        .filter(|(index, line)| selected.contains(index) && extract_tag_directive(line).is_none())
        .map(|(_, line)| line.clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn source() -> Vec<String> {
        [
            "untagged 1",
            "// tag::a[]",
            "a 1",
            "// tag::b[]",
            "a+b",
            "// end::b[]",
            "// end::a[]",
            "untagged 2",
            "# tag::c[]",
            "c 1",
            "# end::c[]",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!(
            Filter::parse_list("**;!*, a,!b"),
            vec![
                Filter::DoubleWildcard,
                Filter::ExcludeTagged,
                Filter::Include("a".into()),
                Filter::Exclude("b".into())
            ]
        );
    }

    #[test]
    fn test_single_tag_with_nesting() -> Result<(), String> {
        let lines = apply_tag_filters(&source(), &[Filter::Include("a".into())])?;
        assert_eq!(lines, vec!["a 1", "a+b"]);
        Ok(())
    }

    #[test]
    fn test_exclude_nested_region() -> Result<(), String> {
        let lines = apply_tag_filters(
            &source(),
            &[Filter::Include("a".into()), Filter::Exclude("b".into())],
        )?;
        assert_eq!(lines, vec!["a 1"]);
        Ok(())
    }

    #[test]
    fn test_untagged_lines_only() -> Result<(), String> {
        let lines = apply_tag_filters(&source(), &Filter::parse_list("**;!*"))?;
        assert_eq!(lines, vec!["untagged 1", "untagged 2"]);
        Ok(())
    }

    #[test]
    fn test_wildcard_selects_all_tagged() -> Result<(), String> {
        let lines = apply_tag_filters(&source(), &[Filter::Wildcard])?;
        assert_eq!(lines, vec!["a 1", "a+b", "c 1"]);
        Ok(())
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        assert_eq!(
            apply_tag_filters(&source(), &[Filter::Include("nope".into())]),
            Err("nope".to_string())
        );
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_unclosed_region_runs_to_end() -> Result<(), String> {
        let lines: Vec<String> = ["// tag::open[]", "x", "y"].into_iter().map(String::from).collect();
        let selected = apply_tag_filters(&lines, &[Filter::Include("open".into())])?;
        assert_eq!(selected, vec!["x", "y"]);
        assert!(logs_contain("unclosed tag region"));
        Ok(())
    }
}
