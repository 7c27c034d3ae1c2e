//! Node: one managed device or cluster, with its reported and desired documents.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnNull, NoneAsEmptyString};
use tracing::warn;

use crate::error::{Error, Result};

use super::document::{is_empty_document, Desire, Report};
use super::keys::{KEY_NODE, KEY_NODE_STATS, ROLE_MASTER};
use super::node_view::NodeView;
use super::types::{NodeInfo, NodeStats, SyncMode};

/// One managed device or cluster.
///
/// Fields read `null` as empty, matching how documents look after a merge
/// carried deletion markers into them.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(rename = "createTime", default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub accelerator: String,
    #[serde_as(deserialize_as = "DefaultOnNull<NoneAsEmptyString>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SyncMode>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cluster: bool,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(rename = "attr", default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "is_empty_document")]
    pub report: Report,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "is_empty_document")]
    pub desire: Desire,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sys_apps: Vec<String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Node {
    /// Build the operator view against the current time.
    ///
    /// A report still in the pre-cluster layout is rewritten in place first;
    /// see [`Node::compatible_single_node`].
    pub fn view(&mut self, timeout: Duration) -> Result<NodeView> {
        self.view_at(timeout, Utc::now())
    }

    /// Build the operator view against an explicit clock.
    pub fn view_at(&mut self, timeout: Duration, now: DateTime<Utc>) -> Result<NodeView> {
        self.compatible_single_node()?;
        NodeView::build(self, timeout, now)
    }

    /// Rewrite a single-node report into the cluster layout, keyed by hostname.
    ///
    /// Returns whether the report was rewritten. Running it again on the
    /// same node is a no-op.
    pub fn compatible_single_node(&mut self) -> Result<bool> {
        match self.translated_report()? {
            Some(report) => {
                self.report = report;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The cluster-layout copy of the report, or `None` when the report is
    /// already in that layout (or has no node entry).
    ///
    /// A node entry that does not decode as a hostname map is taken to be a
    /// single legacy record. Hostname entries may be `null`. That record is assumed to be the master; this is
    /// a compatibility heuristic, not knowledge of the node's real role.
    pub fn translated_report(&self) -> Result<Option<Report>> {
        let raw = match self.report.get(KEY_NODE) {
            None | Some(Value::Null) => return Ok(None),
            Some(raw) => raw,
        };
        if serde_json::from_value::<HashMap<String, Option<NodeInfo>>>(raw.clone()).is_ok() {
            return Ok(None);
        }

        warn!(
            node = %self.name,
            "failed to translate node to cluster node view, treating it as a single master"
        );
        let mut info: NodeInfo = serde_json::from_value(raw.clone())
            .map_err(|e| Error::decode("report.node", e))?;
        info.role = ROLE_MASTER.to_string();
        let hostname = info.hostname.clone();

        let mut report = self.report.clone();
        report.insert(KEY_NODE.to_string(), keyed(&hostname, &info)?);

        if let Some(raw_stats) = self.report.get(KEY_NODE_STATS) {
            let stats: NodeStats = match raw_stats {
                Value::Null => NodeStats::default(),
                raw_stats => serde_json::from_value(raw_stats.clone())
                    .map_err(|e| Error::decode("report.nodestats", e))?,
            };
            report.insert(KEY_NODE_STATS.to_string(), keyed(&hostname, &stats)?);
        }

        Ok(Some(report))
    }
}

fn keyed<T: Serialize>(hostname: &str, value: &T) -> Result<Value> {
    let value =
        serde_json::to_value(value).map_err(|e| Error::serialization("translate single node", e))?;
    let mut map = Map::new();
    map.insert(hostname.to_string(), value);
    Ok(Value::Object(map))
}
