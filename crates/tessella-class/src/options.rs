//! Options loading.
//!
//! Default options are plain JSON maps, but templates are commonly
//! configured from TOML files; this module converts TOML text into an
//! options map that merges like any other payload.

use thiserror::Error;

use tessella_util::JsonMap;

/// Errors from parsing options text.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("invalid options TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("options value not representable as JSON: {0}")]
    Convert(#[from] serde_json::Error),
}

/// Parses a TOML table into an options map.
pub fn options_from_toml(text: &str) -> Result<JsonMap, OptionsError> {
    let table: toml::Table = toml::from_str(text)?;
    let mut map = JsonMap::new();
    for (key, value) in table {
        map.insert(key, serde_json::to_value(value)?);
    }
    Ok(map)
}
