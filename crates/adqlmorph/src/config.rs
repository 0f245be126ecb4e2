//! Dialect configuration
//!
//! Names of the database functions the rewrite rules emit, and whether the
//! spatial-index pass runs at all.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectConfig {
    /// Run the spatial-index pass before the general morph
    pub spatial_index: bool,
    /// Great-circle distance between two points
    pub distance_function: String,
    /// Great-circle distance between two (ra, dec) pairs in degrees
    pub distance_function_deg: String,
    pub centroid_function: String,
    /// Index cone join: `(ra, dec, ra_center, dec_center, radius)`
    pub index_join_function: String,
    /// Index polygon query: `(ra, dec, ARRAY[...])`
    pub index_poly_function: String,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self {
            spatial_index: true,
            distance_function: "celDistPP".into(),
            distance_function_deg: "celDistDD".into(),
            centroid_function: "center".into(),
            index_join_function: "q3c_join".into(),
            index_poly_function: "q3c_poly_query".into(),
        }
    }
}

impl DialectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spatial_index(mut self, enabled: bool) -> Self {
        self.spatial_index = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: DialectConfig =
            serde_json::from_str(r#"{"spatial_index": false, "centroid_function": "@@"}"#)
                .unwrap();
        assert!(!config.spatial_index);
        assert_eq!(config.centroid_function, "@@");
        assert_eq!(config.index_join_function, "q3c_join");
    }
}
