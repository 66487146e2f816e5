//! Placeholder extraction and strict substitution.
//!
//! Templates use single-brace `{name}` placeholders. Rendering requires the
//! supplied variable names to equal the placeholder set exactly; the values
//! are inserted literally and never re-rendered.

use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::hash::BuildHasher;
use std::sync::LazyLock;

use crate::{Error, Result};

/// Creates a compile-time verified regex wrapped in [`LazyLock`].
macro_rules! lazy_regex {
    ($pattern:expr) => {
        LazyLock::new(|| Regex::new($pattern).unwrap_or_else(|_| unreachable!()))
    };
}

/// Regex pattern for placeholders: `{variable_name}`.
static PLACEHOLDER_PATTERN: LazyLock<Regex> = lazy_regex!(r"\{([A-Za-z_][A-Za-z0-9_]*)\}");

/// Returns the set of placeholder names in `template`.
///
/// Duplicates collapse; the set is ordered by name.
///
/// # Examples
///
/// ```rust
/// use promptree::placeholders;
///
/// let names = placeholders("Hi {name}, meet {other} and {name}");
/// assert_eq!(names.into_iter().collect::<Vec<_>>(), ["name", "other"]);
/// ```
#[must_use]
pub fn placeholders(template: &str) -> BTreeSet<String> {
    PLACEHOLDER_PATTERN
        .captures_iter(template)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Checks that `variables` supplies exactly the placeholders of `template`.
///
/// # Errors
///
/// Returns [`Error::VariableMismatch`] naming every missing and every extra
/// variable when the sets differ.
pub fn check_variables<S: BuildHasher>(
    template: &str,
    variables: &HashMap<String, String, S>,
) -> Result<()> {
    let expected = placeholders(template);
    let missing: Vec<String> = expected
        .iter()
        .filter(|name| !variables.contains_key(name.as_str()))
        .cloned()
        .collect();
    let mut extra: Vec<String> = variables
        .keys()
        .filter(|name| !expected.contains(name.as_str()))
        .cloned()
        .collect();
    extra.sort();

    if missing.is_empty() && extra.is_empty() {
        Ok(())
    } else {
        Err(Error::VariableMismatch { missing, extra })
    }
}

/// Renders `template` with `variables`.
///
/// # Errors
///
/// Returns [`Error::VariableMismatch`] if the variable names are not exactly
/// the placeholder set.
///
/// # Examples
///
/// ```rust
/// use promptree::render;
/// use std::collections::HashMap;
///
/// let vars = HashMap::from([("name".to_string(), "World".to_string())]);
/// assert_eq!(render("Hello {name}", &vars).unwrap(), "Hello World");
/// ```
pub fn render<S: BuildHasher>(template: &str, variables: &HashMap<String, String, S>) -> Result<String> {
    check_variables(template, variables)?;

    let rendered = PLACEHOLDER_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            caps.get(1)
                .and_then(|m| variables.get(m.as_str()))
                .map_or_else(|| caps[0].to_string(), String::clone)
        })
        .into_owned();

    Ok(rendered)
}

/// Parses `name=value` pairs as given on the command line.
///
/// Only the first `=` splits; values may contain further `=` characters.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for a pair with no `=` or an empty name.
pub fn parse_variable_pairs<I, S>(pairs: I) -> Result<HashMap<String, String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut variables = HashMap::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let Some((name, value)) = pair.split_once('=') else {
            return Err(Error::InvalidInput(format!(
                "variable '{pair}' must be given as NAME=VALUE"
            )));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput(format!(
                "variable '{pair}' has an empty name"
            )));
        }
        variables.insert(name.to_string(), value.to_string());
    }
    Ok(variables)
}
