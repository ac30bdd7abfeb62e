//! Shared configuration types.
//!
//! The CLI reads `threadline.toml` into these types; missing sections and
//! keys fall back to defaults.

use crate::layout::LayoutConfig;
use serde::{Deserialize, Serialize};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "threadline.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadlineConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let config: ThreadlineConfig =
            serde_json::from_str(r#"{"layout":{"vertical_spacing":40.0}}"#).unwrap();
        assert_eq!(config.layout.vertical_spacing, 40.0);
        assert_eq!(
            config.layout.horizontal_spacing,
            LayoutConfig::default().horizontal_spacing
        );

        let empty: ThreadlineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, ThreadlineConfig::default());
    }
}
