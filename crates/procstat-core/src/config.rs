//! Report configuration.

use crate::select::SelectionConfig;

/// Default location of the dygraphs bundle, relative to the report.
pub const DEFAULT_CHART_SCRIPT: &str = "dygraph-combined.js";

/// Settings the report pipeline needs from its caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// URL of the charting script loaded by the document.
    pub chart_script: String,
    /// Name shown as the report author.
    pub user: String,
    pub selection: SelectionConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            chart_script: DEFAULT_CHART_SCRIPT.to_string(),
            user: "unknown".to_string(),
            selection: SelectionConfig::default(),
        }
    }
}

impl ReportConfig {
    /// Defaults, with the author taken from `$USER`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(user) = std::env::var("USER")
            && !user.is_empty()
        {
            config.user = user;
        }
        config
    }
}
