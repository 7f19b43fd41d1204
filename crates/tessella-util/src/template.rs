//! String templating.
//!
//! Substitutes `{key}` placeholders from a JSON map. A placeholder with no
//! matching key is a hard error: silently dropping user-visible text is
//! worse than a visible failure.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

use crate::merge::JsonMap;

static TEMPLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{ *([\w_ -]+) *\}").expect("template pattern is valid"));

/// Errors from [`template`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// The template referenced a key absent from the data map.
    #[error("no value provided for variable {{{0}}}")]
    MissingValue(String),
}

/// Substitutes `{key}` placeholders in `input` with values from `data`.
///
/// String values render bare, every other JSON value renders via its JSON
/// text form. Text outside placeholders passes through untouched.
///
/// # Example
///
/// ```
/// use tessella_util::template;
///
/// let mut data = serde_json::Map::new();
/// data.insert("z".to_string(), serde_json::json!(12));
/// assert_eq!(template("tiles/{z}.png", &data).unwrap(), "tiles/12.png");
/// ```
pub fn template(input: &str, data: &JsonMap) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for caps in TEMPLATE_RE.captures_iter(input) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let key = key.as_str().trim();
        let value = data
            .get(key)
            .ok_or_else(|| TemplateError::MissingValue(key.to_string()))?;
        out.push_str(&input[last..whole.start()]);
        out.push_str(&render(value));
        last = whole.end();
    }
    out.push_str(&input[last..]);
    Ok(out)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
