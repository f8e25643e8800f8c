//! Environment variable interpolation for config files.
//!
//! Supports the following syntax:
//! - `${VAR}` - substitute with env var value, error if missing
//! - `${VAR:-default}` - use default if VAR is unset or empty
//! - `$$` - escape sequence for literal `$`

use regex::Regex;
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$                           # Escape sequence $$
        |
        \$\{                           # Opening ${
            ([A-Za-z_][A-Za-z0-9_]*)   # Variable name (capture group 1)
            (?:                        # Optional default value group
                :-                     # :- separator
                ([^}]*)                # Default value (capture group 2)
            )?
        \}                             # Closing }
        ",
    )
    .expect("Invalid regex pattern")
});

/// Result of environment variable interpolation.
#[derive(Debug)]
pub struct InterpolationResult {
    /// The interpolated text.
    pub text: String,
    /// Any errors encountered during interpolation.
    pub errors: Vec<String>,
}

impl InterpolationResult {
    /// Returns true if there were no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Interpolate environment variables in the given text.
///
/// Errors are accumulated so the user sees all missing variables at once.
pub fn interpolate(input: &str) -> InterpolationResult {
    let mut errors = Vec::new();

    let text = ENV_VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            if caps.get(0).map(|m| m.as_str()) == Some("$$") {
                return "$".to_string();
            }

            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let default = caps.get(2).map(|m| m.as_str());

            match env::var(name) {
                Ok(value) if !value.is_empty() => value,
                _ => match default {
                    Some(default) => default.to_string(),
                    None => {
                        errors.push(format!("Missing environment variable: {name}"));
                        String::new()
                    }
                },
            }
        })
        .into_owned();

    InterpolationResult { text, errors }
}
