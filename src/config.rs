use callkit::RetryConfig;
use cronkit::{CronError, CronSchedule};
use goalkit::{Goal, GoalBook, GoalSource, ResolveError, SubGoal};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file name, looked up in the working directory first
pub const CONFIG_FILE: &str = "config.toml";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Source(#[from] ResolveError),

    #[error("[app] cron_string is required to run as a service")]
    MissingCron,

    #[error("invalid [app] cron_string: {0}")]
    Cron(#[from] CronError),

    #[error("a [salesforce] table is required because goal '{0}' reads a report")]
    MissingSalesforce(String),

    #[error(
        "[salesforce] needs either username, client_id and private_key_file, or access_token and instance_url"
    )]
    IncompleteSalesforce,
}

/// Find the config file to load
///
/// An explicit path wins. Otherwise `./config.toml` is used if it exists,
/// then `<config dir>/goalsync/config.toml`.
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return expand(&path.to_string_lossy());
    }

    let local = PathBuf::from(".").join(CONFIG_FILE);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|dir| dir.join("goalsync").join(CONFIG_FILE))
        .filter(|p| p.exists())
        .unwrap_or(local)
}

/// Expand `~` and environment variables in a path
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or_else(|_| shellexpand::tilde(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// File Format
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub asana: AsanaConfig,
    #[serde(default)]
    pub salesforce: Option<SalesforceConfig>,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub goals: BTreeMap<String, GoalEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cron_string: Option<String>,
    /// Top-level goal ids, synced in this order
    pub goals: Vec<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

#[derive(Debug, Deserialize)]
pub struct AsanaConfig {
    pub access_token: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesforceConfig {
    pub username: Option<String>,
    pub client_id: Option<String>,
    pub private_key_file: Option<String>,
    pub login_url: Option<String>,
    pub api_version: Option<String>,
    pub access_token: Option<String>,
    pub instance_url: Option<String>,
}

/// How to authenticate against the report service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SalesforceAuth {
    Jwt {
        username: String,
        client_id: String,
        private_key_file: PathBuf,
    },
    Token {
        access_token: String,
        instance_url: String,
    },
}

impl SalesforceConfig {
    pub fn auth(&self) -> Result<SalesforceAuth, ConfigError> {
        match self {
            Self {
                username: Some(username),
                client_id: Some(client_id),
                private_key_file: Some(key),
                ..
            } => Ok(SalesforceAuth::Jwt {
                username: username.clone(),
                client_id: client_id.clone(),
                private_key_file: expand(key),
            }),
            Self {
                access_token: Some(access_token),
                instance_url: Some(instance_url),
                ..
            } => Ok(SalesforceAuth::Token {
                access_token: access_token.clone(),
                instance_url: instance_url.clone(),
            }),
            _ => Err(ConfigError::IncompleteSalesforce),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RetrySection {
    pub max_attempts: Option<u32>,
    pub backoff_base_ms: Option<u64>,
}

impl RetrySection {
    pub fn to_config(&self) -> RetryConfig {
        let defaults = RetryConfig::default();
        RetryConfig::new(
            self.max_attempts.unwrap_or(defaults.max_attempts),
            self.backoff_base_ms
                .map_or(defaults.backoff_base, Duration::from_millis),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Fixed,
    #[serde(alias = "salesforce_report")]
    Report,
    Composite,
    #[serde(alias = "asana")]
    Readback,
}

/// A number, or a string holding one
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Value(f64),
    Text(String),
}

impl Number {
    fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GoalEntry {
    /// Goal store id
    pub goal_id: String,
    pub source: SourceKind,
    #[serde(default)]
    pub value: Option<Number>,
    #[serde(default, alias = "sf_report_id")]
    pub report_id: Option<String>,
    #[serde(default, alias = "sf_metric")]
    pub metric: Option<String>,
    #[serde(default)]
    pub subgoals: Vec<String>,
    #[serde(default)]
    pub weights: Vec<f64>,
}

impl GoalEntry {
    /// Build the engine's goal, checking the source parameters
    pub fn to_goal(&self, id: &str) -> Result<Goal, ResolveError> {
        let malformed = |reason: String| ResolveError::MalformedSource {
            goal: id.to_string(),
            reason,
        };

        let source = match self.source {
            SourceKind::Fixed => {
                let raw = self
                    .value
                    .as_ref()
                    .ok_or_else(|| malformed("fixed source needs a value".to_string()))?;
                let value = raw
                    .to_f64()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| malformed(format!("value {raw:?} is not a number")))?;
                GoalSource::Fixed { value }
            }
            SourceKind::Report => match (&self.report_id, &self.metric) {
                (Some(report_id), Some(metric)) => GoalSource::Report {
                    report_id: report_id.clone(),
                    metric: metric.clone(),
                },
                _ => return Err(malformed("report source needs report_id and metric".to_string())),
            },
            SourceKind::Composite => {
                if self.subgoals.is_empty() {
                    return Err(malformed("composite source needs subgoals".to_string()));
                }
                if self.subgoals.len() != self.weights.len() {
                    return Err(malformed(format!(
                        "{} subgoals but {} weights",
                        self.subgoals.len(),
                        self.weights.len()
                    )));
                }
                if let Some(w) = self.weights.iter().find(|w| !w.is_finite()) {
                    return Err(malformed(format!("weight {w} is not finite")));
                }
                GoalSource::Composite {
                    parts: self
                        .subgoals
                        .iter()
                        .zip(&self.weights)
                        .map(|(goal, weight)| SubGoal::new(goal.clone(), *weight))
                        .collect(),
                }
            }
            SourceKind::Readback => GoalSource::Readback,
        };

        Ok(Goal::new(id, self.goal_id.clone(), source))
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load and parse a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// All configured goals plus the top-level list
    ///
    /// Dangling references are not an error here; the engine reports them
    /// as unknown goals, and `--check` lists them.
    pub fn goal_book(&self) -> Result<GoalBook, ConfigError> {
        let mut book = GoalBook::new();
        for (id, entry) in &self.goals {
            book.insert(entry.to_goal(id)?);
        }
        for id in &self.app.goals {
            book.add_root(id.clone());
        }
        Ok(book)
    }

    /// The report service settings, if any goal needs them
    pub fn salesforce_auth(&self) -> Result<Option<SalesforceAuth>, ConfigError> {
        let Some(report_goal) = self
            .goals
            .iter()
            .find(|(_, g)| g.source == SourceKind::Report)
            .map(|(id, _)| id)
        else {
            return Ok(None);
        };

        self.salesforce
            .as_ref()
            .ok_or_else(|| ConfigError::MissingSalesforce(report_goal.clone()))?
            .auth()
            .map(Some)
    }

    pub fn schedule(&self) -> Result<CronSchedule, ConfigError> {
        let expr = self.app.cron_string.as_deref().ok_or(ConfigError::MissingCron)?;
        Ok(CronSchedule::parse(expr)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.app.poll_interval_secs.max(1))
    }
}
