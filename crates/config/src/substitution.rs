//! Environment variable substitution for configuration files

use regex::Regex;
use std::env;
use tracing::{debug, warn};

/// Substitute `${VAR_NAME}` placeholders with environment variable values.
///
/// Only the braced form is recognized; a bare `$WORD` passes through
/// untouched so URLs and shell-ish strings survive. Unset variables keep
/// their placeholder, and [`has_unresolved_env_vars`] lets the validator
/// flag them later.
pub fn substitute_env_vars(content: &str) -> String {
    let re = Regex::new(r"\$\{(\w+)\}").expect("placeholder regex is valid");
    let mut result = content.to_string();

    for caps in re.captures_iter(content) {
        let var_name = &caps[1];
        let placeholder = &caps[0];

        match env::var(var_name) {
            Ok(value) => {
                debug!(var = var_name, "Substituting environment variable");
                result = result.replace(placeholder, &value);
            }
            Err(_) => {
                warn!(var = var_name, "Environment variable not set, keeping placeholder");
            }
        }
    }

    result
}

/// Check whether a string still contains `${VAR_NAME}` placeholders
pub fn has_unresolved_env_vars(content: &str) -> bool {
    let re = Regex::new(r"\$\{(\w+)\}").expect("placeholder regex is valid");
    re.is_match(content)
}
