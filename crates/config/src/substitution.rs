use anyhow::{Context, Result};
use regex::Regex;
use std::env;
use tracing::{debug, warn};

const ENV_VAR_PATTERN: &str = r"\$\{(\w+)\}|\$(\w+)";

/// Substitute environment variables in the format ${VAR_NAME} or $VAR_NAME
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(ENV_VAR_PATTERN).context("Invalid environment variable pattern")?;
    let mut result = content.to_string();
    let mut missing_vars = Vec::new();

    for caps in re.captures_iter(content) {
        let Some(var_name) = caps.get(1).or(caps.get(2)).map(|m| m.as_str()) else {
            continue;
        };
        let placeholder = &caps[0];

        match env::var(var_name) {
            Ok(value) => {
                debug!("Substituting environment variable: {}", var_name);
                result = result.replace(placeholder, &value);
            }
            Err(_) => {
                warn!("Environment variable '{}' not set", var_name);
                // Placeholder stays; the validator reports it.
                missing_vars.push(var_name.to_string());
            }
        }
    }

    if !missing_vars.is_empty() {
        debug!(
            "Environment variables not set (may use defaults or fail validation): {:?}",
            missing_vars
        );
    }

    Ok(result)
}

/// Check if a string contains unresolved environment variable placeholders
pub fn has_unresolved_env_vars(content: &str) -> bool {
    Regex::new(ENV_VAR_PATTERN)
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_set_variable() {
        env::set_var("HEDGEIQ_TEST_SUBST_ID", "client-42");
        let out = substitute_env_vars("client_id: ${HEDGEIQ_TEST_SUBST_ID}\nother: $HEDGEIQ_TEST_SUBST_ID").unwrap();
        assert_eq!(out, "client_id: client-42\nother: client-42");
    }

    #[test]
    fn test_unset_variable_keeps_placeholder() {
        env::remove_var("HEDGEIQ_TEST_SUBST_MISSING");
        let out = substitute_env_vars("secret: ${HEDGEIQ_TEST_SUBST_MISSING}").unwrap();
        assert_eq!(out, "secret: ${HEDGEIQ_TEST_SUBST_MISSING}");
        assert!(has_unresolved_env_vars(&out));
        assert!(!has_unresolved_env_vars("secret: plain"));
    }
}
