//! JSON Schema for the Wallstore configuration file.

use schemars::schema_for;

use crate::config::WallstoreConfig;

/// Renders the configuration JSON Schema as pretty-printed JSON.
#[must_use]
pub fn print_schema() -> String {
    let schema = schema_for!(WallstoreConfig);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_describes_wallpaper_section() {
        let schema: serde_json::Value = serde_json::from_str(&print_schema()).unwrap();
        let text = schema.to_string();

        assert!(text.contains("wallpaper"));
        assert!(text.contains("scanDepth"));
        assert!(text.contains("debounceMs"));
    }
}
