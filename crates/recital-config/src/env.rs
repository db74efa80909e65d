use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Matches `{{ env.VAR }}` and `{{ env.VAR | default("fallback") }}`
fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([a-zA-Z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("must be valid regex")
    })
}

/// Expand `{{ env.VAR }}` placeholders in raw TOML text
///
/// A placeholder may carry a fallback, `{{ env.VAR | default("x") }}`, used
/// when the variable is unset. Comment lines are copied through untouched so
/// that disabled settings never require their variables to exist.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut lines = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_owned());
        } else {
            lines.push(expand_line(line)?);
        }
    }

    let mut output = lines.join("\n");
    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

fn expand_line(line: &str) -> Result<String, String> {
    let mut expanded = String::with_capacity(line.len());
    let mut cursor = 0;

    for captures in placeholder().captures_iter(line) {
        let Some(whole) = captures.get(0) else { continue };
        expanded.push_str(&line[cursor..whole.start()]);
        expanded.push_str(&resolve(&captures)?);
        cursor = whole.end();
    }

    expanded.push_str(&line[cursor..]);
    Ok(expanded)
}

fn resolve(captures: &Captures<'_>) -> Result<String, String> {
    let key = captures.get(1).map_or("", |m| m.as_str());
    let fallback = captures.get(2).map(|m| m.as_str());

    let Some(var_name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
        return Err(format!("only variables scoped with 'env.' are supported: `{key}`"));
    };

    match (std::env::var(var_name), fallback) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(fallback)) => Ok(fallback.to_owned()),
        (Err(_), None) => Err(format!("environment variable not found: `{var_name}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let input = "voice = \"pt-BR-FranciscaNeural\"";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn expands_api_key() {
        temp_env::with_var("RECITAL_TEST_KEY", Some("secret"), || {
            let result = expand_env("api_key = \"{{ env.RECITAL_TEST_KEY }}\"").unwrap();
            assert_eq!(result, "api_key = \"secret\"");
        });
    }

    #[test]
    fn expands_several_lines() {
        let vars = [("RECITAL_REGION", Some("brazilsouth")), ("RECITAL_VOICE", Some("pt-BR-AntonioNeural"))];
        temp_env::with_vars(vars, || {
            let result = expand_env("region = \"{{ env.RECITAL_REGION }}\"\nvoice = \"{{env.RECITAL_VOICE}}\"\n").unwrap();
            assert_eq!(result, "region = \"brazilsouth\"\nvoice = \"pt-BR-AntonioNeural\"\n");
        });
    }

    #[test]
    fn missing_variable_is_an_error() {
        temp_env::with_var_unset("RECITAL_MISSING", || {
            let err = expand_env("api_key = \"{{ env.RECITAL_MISSING }}\"").unwrap_err();
            assert!(err.contains("RECITAL_MISSING"));
        });
    }

    #[test]
    fn rejects_other_scopes() {
        let err = expand_env("key = \"{{ vault.KEY }}\"").unwrap_err();
        assert!(err.contains("only variables scoped with 'env.'"));

        let err = expand_env("key = \"{{ env.A.B }}\"").unwrap_err();
        assert!(err.contains("only variables scoped with 'env.'"));
    }

    #[test]
    fn comment_lines_are_not_expanded() {
        temp_env::with_var_unset("RECITAL_MISSING", || {
            let input = "  # api_key = \"{{ env.RECITAL_MISSING }}\"\nvoice = \"x\"";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }

    #[test]
    fn fallback_applies_only_when_unset() {
        temp_env::with_var_unset("RECITAL_OPTIONAL", || {
            let result = expand_env("dir = \"{{ env.RECITAL_OPTIONAL | default(\"audio_cache\") }}\"").unwrap();
            assert_eq!(result, "dir = \"audio_cache\"");
        });

        temp_env::with_var("RECITAL_OPTIONAL", Some("/var/cache/recital"), || {
            let result = expand_env("dir = \"{{ env.RECITAL_OPTIONAL | default(\"audio_cache\") }}\"").unwrap();
            assert_eq!(result, "dir = \"/var/cache/recital\"");
        });
    }

    #[test]
    fn empty_fallback_is_allowed() {
        temp_env::with_var_unset("RECITAL_OPTIONAL", || {
            let result = expand_env("base_url = \"{{ env.RECITAL_OPTIONAL | default(\"\") }}\"").unwrap();
            assert_eq!(result, "base_url = \"\"");
        });
    }
}
