//! Read-only operator view of a node.
//!
//! The view is a projection of [`Node`] onto the public schema, enriched
//! with normalized resource figures, readiness and per sub-node instance
//! counts. It is rebuilt on demand and never stored.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DefaultOnNull, NoneAsEmptyString, Same};

use crate::error::{Error, Result};

use super::document::Desire;
use super::keys::*;
use super::node::Node;
use super::quantity::{cpu_millis, memory_bytes};
use super::types::{AppInfo, AppStats, CoreInfo, InstanceStats, NodeInfo, NodeStats, SyncMode};

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(rename = "createTime", default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub accelerator: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportView>,
    #[serde(default)]
    pub desire: Desire,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sys_apps: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub cluster: bool,
    #[serde(default)]
    pub ready: bool,
    /// Always present on the wire; an unset mode is the empty string.
    #[serde_as(
        serialize_as = "NoneAsEmptyString",
        deserialize_as = "DefaultOnNull<NoneAsEmptyString>"
    )]
    #[serde(default)]
    pub mode: Option<SyncMode>,
}

/// The report as operators see it. Entries cleared to `null` read as empty.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde_as(deserialize_as = "DefaultOnNull<Vec<DefaultOnNull>>")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apps: Vec<AppInfo>,
    #[serde_as(deserialize_as = "DefaultOnNull<Vec<DefaultOnNull>>")]
    #[serde(rename = "sysapps", default, skip_serializing_if = "Vec::is_empty")]
    pub sys_apps: Vec<AppInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core: Option<CoreInfo>,
    #[serde_as(deserialize_as = "DefaultOnNull<Vec<DefaultOnNull>>")]
    #[serde(rename = "appstats", default, skip_serializing_if = "Vec::is_empty")]
    pub app_stats: Vec<AppStats>,
    #[serde_as(deserialize_as = "DefaultOnNull<Vec<DefaultOnNull>>")]
    #[serde(rename = "sysappstats", default, skip_serializing_if = "Vec::is_empty")]
    pub sys_app_stats: Vec<AppStats>,
    #[serde_as(deserialize_as = "DefaultOnNull<HashMap<Same, DefaultOnNull>>")]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub node: HashMap<String, NodeInfo>,
    #[serde_as(deserialize_as = "DefaultOnNull<HashMap<Same, DefaultOnNull>>")]
    #[serde(rename = "nodestats", default, skip_serializing_if = "HashMap::is_empty")]
    pub node_stats: HashMap<String, NodeStats>,
    /// Running instances per sub-node hostname.
    #[serde(rename = "nodeinsnum", default, skip_serializing_if = "HashMap::is_empty")]
    pub node_instance_count: HashMap<String, usize>,
}

impl NodeView {
    /// Build the view of an already cluster-shaped node.
    pub(crate) fn build(node: &Node, timeout: Duration, now: DateTime<Utc>) -> Result<Self> {
        let mut view = Self::project(node)?;
        view.populate_node_stats(timeout, now)?;

        let ready = view.ready;
        if let Some(report) = view.report.as_mut() {
            report.translate_instance_quantities()?;
            if !ready {
                report.reset_app_statuses();
            }
            report.count_instances();
        }
        Ok(view)
    }

    /// Keep only the fields of the public schema.
    fn project(node: &Node) -> Result<Self> {
        let value = serde_json::to_value(node).map_err(|e| Error::serialization("project node", e))?;
        serde_json::from_value(value).map_err(|e| Error::decode("node view", e))
    }

    fn populate_node_stats(&mut self, timeout: Duration, now: DateTime<Utc>) -> Result<()> {
        let gpu = self.accelerator == NV_ACCELERATOR;
        let Some(report) = self.report.as_mut() else {
            return Ok(());
        };

        for stats in report.node_stats.values_mut() {
            stats.percent = HashMap::new();
            let memory = resource_percent(stats, RESOURCE_MEMORY, memory_bytes)?;
            stats.percent.insert(RESOURCE_MEMORY.to_string(), memory);
            let cpu = resource_percent(stats, RESOURCE_CPU, cpu_millis)?;
            stats.percent.insert(RESOURCE_CPU.to_string(), cpu);
            if gpu {
                populate_gpu_stats(stats);
            }
        }

        if let Some(time) = report.time {
            self.ready = is_fresh(time, timeout, now);
        }
        Ok(())
    }
}

impl ReportView {
    fn instances_mut(&mut self) -> impl Iterator<Item = &mut InstanceStats> {
        self.sys_app_stats
            .iter_mut()
            .chain(self.app_stats.iter_mut())
            .flat_map(|stats| stats.instances.iter_mut())
    }

    /// Normalize cpu and memory usage of every instance in place.
    fn translate_instance_quantities(&mut self) -> Result<()> {
        for instance in self.instances_mut() {
            normalize_entry(&mut instance.usage, RESOURCE_CPU, cpu_millis)?;
            normalize_entry(&mut instance.usage, RESOURCE_MEMORY, memory_bytes)?;
        }
        Ok(())
    }

    /// A stale node's last known statuses are not trusted.
    fn reset_app_statuses(&mut self) {
        for stats in self.sys_app_stats.iter_mut().chain(self.app_stats.iter_mut()) {
            stats.status.clear();
        }
    }

    fn count_instances(&mut self) {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for instance in self
            .app_stats
            .iter()
            .chain(self.sys_app_stats.iter())
            .flat_map(|stats| stats.instances.iter())
        {
            *counts.entry(instance.node.clone()).or_insert(0) += 1;
        }
        self.node_instance_count = counts;
    }
}

/// Whether a report taken at `time` is still within `timeout` at `now`.
fn is_fresh(time: DateTime<Utc>, timeout: Duration, now: DateTime<Utc>) -> bool {
    match chrono::Duration::from_std(timeout)
        .ok()
        .and_then(|timeout| time.checked_add_signed(timeout))
    {
        Some(deadline) => now < deadline,
        // Past the representable range: the deadline is never reached.
        None => true,
    }
}

/// Normalize `resource` in both capacity and usage and return usage/capacity.
fn resource_percent(
    stats: &mut NodeStats,
    resource: &str,
    normalize: fn(&str) -> Result<i64>,
) -> Result<String> {
    let total = normalize_entry(&mut stats.capacity, resource, normalize)?;
    let used = normalize_entry(&mut stats.usage, resource, normalize)?;
    Ok(match (total, used) {
        (Some(total), Some(used)) if total != 0 => format_decimal(used as f64 / total as f64),
        _ => "0".to_string(),
    })
}

/// Replace a raw quantity with its integer form, returning the integer.
fn normalize_entry(
    resources: &mut HashMap<String, String>,
    resource: &str,
    normalize: fn(&str) -> Result<i64>,
) -> Result<Option<i64>> {
    let Some(raw) = resources.get_mut(resource) else {
        return Ok(None);
    };
    let value = normalize(raw)?;
    *raw = value.to_string();
    Ok(Some(value))
}

fn populate_gpu_stats(stats: &mut NodeStats) {
    let Some(Value::Object(extension)) = stats.extension.as_ref() else {
        return;
    };
    let field = |key: &str| extension.get(key).and_then(Value::as_f64).map(format_decimal);
    let used = field(KEY_GPU_USED_MEMORY);
    let total = field(KEY_GPU_TOTAL_MEMORY);
    let percent = field(KEY_GPU_PERCENT);

    if let Some(used) = used {
        stats.usage.insert(RESOURCE_GPU.to_string(), used);
    }
    if let Some(total) = total {
        stats.capacity.insert(RESOURCE_GPU.to_string(), total);
    }
    if let Some(percent) = percent {
        stats.percent.insert(RESOURCE_GPU.to_string(), percent);
    }
}

/// Shortest decimal form, never in exponent notation ("0.5", "1", "0.0001").
fn format_decimal(value: f64) -> String {
    format!("{value}")
}
