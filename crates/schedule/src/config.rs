//! Configuration for schedule analysis.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default capacity of a sub-graph.
pub const DEFAULT_MAX_SUB_GRAPH_SIZE: usize = 10;

/// Options recognised by the analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    /// Largest number of nodes a sub-graph may hold.
    #[serde(default = "default_max_sub_graph_size")]
    pub max_sub_graph_size: usize,

    /// Forward a tag snapshot to the progress renderer after each phase.
    #[serde(default)]
    pub plot_progress: bool,

    /// Coalesce components smaller than this into shared components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_component_size: Option<usize>,

    /// Skip sub-graph partitioning and schedule the graph as one sub-graph.
    #[serde(default)]
    pub single_partition: bool,

    /// Worker threads for the solver's executor (defaults to all cores).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

fn default_max_sub_graph_size() -> usize {
    DEFAULT_MAX_SUB_GRAPH_SIZE
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            max_sub_graph_size: DEFAULT_MAX_SUB_GRAPH_SIZE,
            plot_progress: false,
            min_component_size: None,
            single_partition: false,
            threads: None,
        }
    }
}

impl ScheduleConfig {
    /// Parse a configuration from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the sub-graph capacity.
    #[must_use]
    pub fn with_max_sub_graph_size(mut self, max_sub_graph_size: usize) -> Self {
        self.max_sub_graph_size = max_sub_graph_size;
        self
    }

    /// Enable small-component coalescing.
    #[must_use]
    pub fn with_min_component_size(mut self, min_component_size: usize) -> Self {
        self.min_component_size = Some(min_component_size);
        self
    }

    /// Schedule the whole graph as a single sub-graph.
    #[must_use]
    pub fn with_single_partition(mut self, single_partition: bool) -> Self {
        self.single_partition = single_partition;
        self
    }

    /// Size the solver's executor pool.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Check that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a zero capacity, a zero minimum
    /// component size or a zero thread count.
    pub fn validate(&self) -> Result<()> {
        if self.max_sub_graph_size == 0 {
            return Err(Error::invalid_config("maxSubGraphSize must be positive"));
        }
        if self.min_component_size == Some(0) {
            return Err(Error::invalid_config("minComponentSize must be positive"));
        }
        if self.threads == Some(0) {
            return Err(Error::invalid_config("threads must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScheduleConfig::default();
        assert_eq!(config.max_sub_graph_size, 10);
        assert!(!config.plot_progress);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_camel_case() {
        let config =
            ScheduleConfig::from_json_str(r#"{"maxSubGraphSize": 3, "plotProgress": true}"#)
                .unwrap();
        assert_eq!(config.max_sub_graph_size, 3);
        assert!(config.plot_progress);
        assert_eq!(config.min_component_size, None);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = ScheduleConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ScheduleConfig::default());
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let result = ScheduleConfig::from_json_str(r#"{"maxSubGraphSize": 0}"#);
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_round_trip_skips_unset_options() {
        let json = serde_json::to_string(&ScheduleConfig::default()).unwrap();
        assert!(!json.contains("minComponentSize"));
        assert!(json.contains("maxSubGraphSize"));
    }
}
