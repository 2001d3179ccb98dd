use regex::{Captures, Regex};
use std::sync::LazyLock;

static ENV_REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("environment reference regex is valid")
});

/// Substitutes every `${VAR}` reference in the value with the value returned by `lookup`, or with
/// an empty string if the variable isn't defined.
pub fn expand_env<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_REFERENCE_REGEX
        .replace_all(value, |captures: &Captures| {
            lookup(&captures[1]).unwrap_or_default()
        })
        .into_owned()
}

/// Reads variables from the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
