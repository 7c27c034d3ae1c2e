use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DefaultOnNull, DeserializeFromStr, SerializeDisplay};

/// How a node synchronizes with the control plane.
///
/// Modes this crate does not know are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum SyncMode {
    Cloud,
    Local,
    Other(String),
}

impl SyncMode {
    pub fn as_str(&self) -> &str {
        match self {
            SyncMode::Cloud => "cloud",
            SyncMode::Local => "local",
            SyncMode::Other(mode) => mode,
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "cloud" => SyncMode::Cloud,
            "local" => SyncMode::Local,
            other => SyncMode::Other(other.to_string()),
        })
    }
}

/// Static identity of one sub-node.
///
/// Every field reads `null` as empty, so a partially cleared record still
/// decodes.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arch: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(rename = "kernelVer", default, skip_serializing_if = "String::is_empty")]
    pub kernel_version: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub os: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(rename = "containerRuntime", default)]
    pub container_runtime: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(rename = "machineID", default)]
    pub machine_id: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(rename = "bootID", default)]
    pub boot_id: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(rename = "systemUUID", default)]
    pub system_uuid: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(rename = "osImage", default)]
    pub os_image: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
}

/// Dynamic telemetry of one sub-node.
///
/// `usage` and `capacity` map a resource name to a quantity string. Raw
/// reports carry Kubernetes quantities ("500m", "2Gi"); views carry the
/// normalized integers.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub usage: HashMap<String, String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub capacity: HashMap<String, String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub percent: HashMap<String, String>,
    /// Accelerator specific counters, opaque to everything but the view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<Value>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// Build information of the edge core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub go_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bin_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub git_revision: String,
}

/// Runtime status of one application and its instances.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppStats {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cause: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<InstanceStats>,
}

/// One running instance of an application, pinned to a sub-node.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStats {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_name: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub usage: HashMap<String, String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cause: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    /// Hostname of the sub-node the instance runs on.
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(rename = "node", alias = "nodename", default)]
    pub node: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_info_uses_wire_names() {
        let info: NodeInfo = serde_json::from_value(json!({
            "hostname": "edge-1",
            "kernelVer": "6.1.0",
            "machineID": "m-1",
            "systemUUID": "u-1"
        }))
        .unwrap();
        assert_eq!(info.kernel_version, "6.1.0");
        assert_eq!(info.machine_id, "m-1");
        assert_eq!(info.system_uuid, "u-1");

        let encoded = serde_json::to_value(&info).unwrap();
        assert_eq!(encoded["kernelVer"], "6.1.0");
        assert!(encoded.get("role").is_none());
    }

    #[test]
    fn instance_accepts_legacy_node_key() {
        let ins: InstanceStats =
            serde_json::from_value(json!({"name": "i", "nodename": "n1"})).unwrap();
        assert_eq!(ins.node, "n1");
    }

    #[test]
    fn sync_mode_is_lowercase() {
        assert_eq!(serde_json::to_value(SyncMode::Local).unwrap(), json!("local"));
    }

    #[test]
    fn unknown_sync_mode_is_kept_verbatim() {
        let mode: SyncMode = serde_json::from_value(json!("edge-only")).unwrap();
        assert_eq!(mode, SyncMode::Other("edge-only".to_string()));
        assert_eq!(serde_json::to_value(&mode).unwrap(), json!("edge-only"));
        assert_eq!(
            serde_json::from_value::<SyncMode>(json!("cloud")).unwrap(),
            SyncMode::Cloud
        );
    }

    #[test]
    fn null_fields_decode_as_empty() {
        let info: NodeInfo =
            serde_json::from_value(json!({"hostname": "n1", "address": null, "role": null}))
                .unwrap();
        assert_eq!(info.hostname, "n1");
        assert!(info.address.is_empty());

        let stats: NodeStats =
            serde_json::from_value(json!({"capacity": {"cpu": "2"}, "usage": null})).unwrap();
        assert!(stats.usage.is_empty());
        assert_eq!(stats.capacity["cpu"], "2");

        let app: AppStats = serde_json::from_value(json!({
            "name": "web",
            "status": null,
            "instances": [{"name": "web-0", "usage": null, "node": null}]
        }))
        .unwrap();
        assert!(app.status.is_empty());
        assert!(app.instances[0].usage.is_empty());
        assert!(app.instances[0].node.is_empty());
    }
}
