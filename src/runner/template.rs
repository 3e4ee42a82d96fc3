//! Template rendering for commands, environment values and paths
//!
//! Uses `${name}` markers. Lookup order: the supplied namespace (bound
//! task arguments plus ambient variables), then process environment
//! variables. Unknown markers are left untouched so shell-level
//! `${VAR}` usage still reaches the interpreter.

use std::collections::BTreeMap;
use std::env;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{TemplateError, TemplateResult};

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

/// Render `s` against `vars`.
///
/// Strings containing no `${` marker are returned unchanged without any
/// regex work (fast path). Nested values are expanded up to a fixed
/// depth; exceeding it reports recursive interpolation.
pub fn render(s: &str, vars: &BTreeMap<String, String>) -> TemplateResult<String> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let re = marker_re();
    let mut result = s.to_string();

    for _ in 0..16 {
        let mut changed = false;
        result = re
            .replace_all(&result, |caps: &regex::Captures| {
                let name = &caps[1];
                if let Some(value) = vars.get(name) {
                    changed = true;
                    return value.clone();
                }
                if let Ok(value) = env::var(name) {
                    changed = true;
                    return value;
                }
                // Unknown marker: keep verbatim for the shell
                caps[0].to_string()
            })
            .to_string();

        if !changed {
            return Ok(result);
        }
    }

    // Still substituting after the depth limit means values expand into
    // each other without terminating.
    if re.is_match(&result) {
        return Err(TemplateError::RecursiveInterpolation);
    }
    Ok(result)
}

/// Render every value of a map (keys pass through)
pub fn render_map(
    map: &BTreeMap<String, String>,
    vars: &BTreeMap<String, String>,
) -> TemplateResult<BTreeMap<String, String>> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), render(v, vars)?)))
        .collect()
}

/// Render each string of a list
pub fn render_list(
    list: &[String],
    vars: &BTreeMap<String, String>,
) -> TemplateResult<Vec<String>> {
    list.iter().map(|s| render(s, vars)).collect()
}
