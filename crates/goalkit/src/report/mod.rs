//! Report service access.
//!
//! A report is a remote object holding an ordered list of aggregate
//! api-names (`reportMetadata.aggregates`) and a parallel list of values
//! for the grand-total cell (`factMap["T!T"].aggregates`). A metric is
//! looked up by api-name and paired with the value at the same index.

pub mod jwt;
pub mod salesforce;

use crate::error::{ReportError, ResolveError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub use salesforce::{Authenticator, Credential, JwtBearer, SalesforceReports, StaticCredential};

/// Key of the grand-total cell in a report's fact map.
const GRAND_TOTAL: &str = "T!T";

/// A fetched report.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub report_id: String,
    /// Aggregate api-names, e.g. `s!AMOUNT`.
    pub metric_names: Vec<String>,
    /// Grand-total values, index-aligned with `metric_names`.
    pub metric_values: Vec<Value>,
}

impl Report {
    pub fn new(report_id: impl Into<String>, names: Vec<String>, values: Vec<Value>) -> Self {
        Self {
            report_id: report_id.into(),
            metric_names: names,
            metric_values: values,
        }
    }

    /// Parse the report service's JSON representation.
    pub fn from_json(report_id: &str, json: &Value) -> Result<Self, ResolveError> {
        let malformed = |reason: &str| ResolveError::MalformedReport {
            report_id: report_id.to_string(),
            reason: reason.to_string(),
        };

        let names = json
            .pointer("/reportMetadata/aggregates")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("missing reportMetadata.aggregates"))?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| malformed("aggregate names must be strings"))?;

        let values = json
            .get("factMap")
            .and_then(|m| m.get(GRAND_TOTAL))
            .and_then(|cell| cell.get("aggregates"))
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("missing factMap grand total aggregates"))?
            .iter()
            .map(|agg| agg.get("value").cloned().unwrap_or(Value::Null))
            .collect();

        Ok(Self::new(report_id, names, values))
    }

    /// Value of the first aggregate named `name`.
    ///
    /// Pairs beyond the shorter of the two lists are ignored.
    pub fn metric(&self, name: &str) -> Result<f64, ResolveError> {
        let value = self
            .metric_names
            .iter()
            .zip(&self.metric_values)
            .find(|(api_name, _)| *api_name == name)
            .map(|(_, value)| value)
            .ok_or_else(|| ResolveError::MetricNotFound(name.to_string()))?;

        numeric(value).ok_or_else(|| ResolveError::MalformedReport {
            report_id: self.report_id.clone(),
            reason: format!("metric {name} is not numeric: {value}"),
        })
    }
}

/// Numbers pass through; numeric strings are parsed.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Fetches reports by id.
pub trait ReportSource: Send + Sync {
    fn fetch_report(&self, report_id: &str) -> Result<Report, ReportError>;
}

/// A report source for configurations with no report goals.
///
/// Every fetch fails with a credential error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReports;

impl ReportSource for NoReports {
    fn fetch_report(&self, report_id: &str) -> Result<Report, ReportError> {
        Err(ResolveError::Credential(format!(
            "report {report_id} requested but no report service is configured"
        ))
        .into())
    }
}

/// In-memory report source for testing.
#[derive(Debug, Clone, Default)]
pub struct MockReports {
    reports: Arc<Mutex<HashMap<String, Report>>>,
    fetches: Arc<Mutex<Vec<String>>>,
}

impl MockReports {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a report with a single aggregate.
    #[must_use]
    pub fn with_metric(self, report_id: &str, metric: &str, value: f64) -> Self {
        {
            let mut reports = self.reports.lock().unwrap();
            let report = reports
                .entry(report_id.to_string())
                .or_insert_with(|| Report::new(report_id, Vec::new(), Vec::new()));
            report.metric_names.push(metric.to_string());
            report.metric_values.push(Value::from(value));
        }
        self
    }

    /// Report ids fetched so far, in order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

impl ReportSource for MockReports {
    fn fetch_report(&self, report_id: &str) -> Result<Report, ReportError> {
        self.fetches.lock().unwrap().push(report_id.to_string());
        self.reports
            .lock()
            .unwrap()
            .get(report_id)
            .cloned()
            .ok_or_else(|| callkit::CallError::http(404, "The requested resource does not exist").into())
    }
}
