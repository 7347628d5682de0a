use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::InsightsError;
use crate::insights::Settings;
use crate::pull_request::StaleThreadPolicy;

const FILE_STEM: &str = "pr-insights";

/// Configuration file structure for pr-insights.
///
/// Lets a repository pin its analysis settings instead of repeating them as task
/// inputs. Values given on the command line or through the agent environment
/// take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Long running validation and health analysis
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// How the service comment is maintained
    #[serde(default)]
    pub comment: CommentConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnalysisConfig {
    /// Percentile of target branch durations a task has to exceed
    #[serde(default = "default_percentile")]
    pub percentile: f64,

    /// Number of target branch runs to fetch
    #[serde(default = "default_pipelines_to_query")]
    pub pipelines_to_query: usize,

    /// Complete target branch runs considered for branch health
    #[serde(default = "default_health_window")]
    pub health_window: usize,

    /// Tasks shorter than this are never reported
    #[serde(default)]
    pub minimum_duration_seconds: u64,

    /// Overruns smaller than this are never reported
    #[serde(default)]
    pub minimum_regression_seconds: u64,

    /// Timeline record types that take part in the analysis
    #[serde(default = "default_task_types")]
    pub task_types: Vec<String>,

    #[serde(default = "default_true")]
    pub long_running_analysis: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommentConfig {
    /// Append a success row to an existing failure table once a run passes again
    #[serde(default)]
    pub report_recovery: bool,

    /// What happens to threads of earlier iterations
    #[serde(default)]
    pub stale_threads: StaleThreadPolicy,

    /// Link shown instead of the pipeline definition page
    pub status_link: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            percentile: default_percentile(),
            pipelines_to_query: default_pipelines_to_query(),
            health_window: default_health_window(),
            minimum_duration_seconds: 0,
            minimum_regression_seconds: 0,
            task_types: default_task_types(),
            long_running_analysis: true,
        }
    }
}

fn default_percentile() -> f64 {
    1.0
}

fn default_pipelines_to_query() -> usize {
    10
}

fn default_health_window() -> usize {
    3
}

fn default_task_types() -> Vec<String> {
    vec!["task".to_string()]
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./pr-insights.toml
    /// 3. ./pr-insights.json
    /// 4. ./pr-insights.yaml
    /// 5. ./pr-insights.yml
    /// 6. `<user config dir>/pr-insights/config.toml`
    ///
    /// Returns default configuration if no file is found. A specified path that
    /// does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        for candidate in Self::candidates() {
            if candidate.exists() {
                log::debug!("using configuration file {}", candidate.display());
                return Self::load_from_path(&candidate);
            }
        }

        Ok(Self::default())
    }

    fn candidates() -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = ["toml", "json", "yaml", "yml"]
            .iter()
            .map(|ext| PathBuf::from(format!("{FILE_STEM}.{ext}")))
            .collect();
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join(FILE_STEM).join("config.toml"));
        }
        candidates
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Validated analysis settings.
    pub fn settings(&self) -> crate::error::Result<Settings> {
        let analysis = &self.analysis;
        if !(analysis.percentile > 0.0 && analysis.percentile <= 100.0) {
            return Err(InsightsError::Config(format!(
                "percentile must be within (0, 100], got {}",
                analysis.percentile
            )));
        }
        if analysis.pipelines_to_query == 0 {
            return Err(InsightsError::Config(
                "pipelines-to-query must be at least 1".to_string(),
            ));
        }

        Ok(Settings {
            percentile: analysis.percentile,
            pipelines_to_query: analysis.pipelines_to_query,
            health_window: analysis.health_window,
            minimum_duration_ms: seconds_to_ms(analysis.minimum_duration_seconds),
            minimum_regression_ms: seconds_to_ms(analysis.minimum_regression_seconds),
            task_types: analysis
                .task_types
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            long_running_analysis: analysis.long_running_analysis,
            report_recovery: self.comment.report_recovery,
            stale_threads: self.comment.stale_threads,
            status_link: self
                .comment
                .status_link
                .clone()
                .filter(|link| !link.trim().is_empty()),
        })
    }
}

fn seconds_to_ms(seconds: u64) -> i64 {
    i64::try_from(seconds.saturating_mul(1000)).unwrap_or(i64::MAX)
}
