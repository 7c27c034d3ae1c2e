//! Report, Desire and Delta: the untyped documents kept per node.
//!
//! Each wraps a JSON object. Well-known keys are read through typed
//! accessors that fail with [`Error::Decode`] on a shape mismatch instead
//! of casting blindly.

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::keys::*;
use super::reconcile;
use super::types::{AppInfo, AppStats, DeviceInfo};

/// Behaviour shared by every node document.
pub trait Document: Sized {
    /// Name used in error context, e.g. `report.apps`.
    const KIND: &'static str;

    fn fields(&self) -> &Map<String, Value>;
    fn fields_mut(&mut self) -> &mut Map<String, Value>;
    fn from_fields(fields: Map<String, Value>) -> Self;
    fn into_fields(self) -> Map<String, Value>;

    /// Merge newly received data into this document without dropping
    /// unrelated siblings.
    fn merge(&mut self, incoming: Self) -> Result<()> {
        reconcile::merge(self.fields_mut(), incoming.into_fields())
    }

    /// Apply a merge patch and return the evolved document.
    fn patch(&self, delta: &Delta) -> Self {
        Self::from_fields(reconcile::apply_merge_patch(self.fields(), delta.fields()))
    }

    fn app_infos(&self, is_sys: bool) -> Result<Vec<AppInfo>> {
        self.decode_field(if is_sys { KEY_SYS_APPS } else { KEY_APPS })
    }

    fn set_app_infos(&mut self, is_sys: bool, apps: &[AppInfo]) -> Result<()> {
        self.encode_list(if is_sys { KEY_SYS_APPS } else { KEY_APPS }, apps)
    }

    fn app_stats(&self, is_sys: bool) -> Result<Vec<AppStats>> {
        self.decode_field(if is_sys { KEY_SYS_APP_STATS } else { KEY_APP_STATS })
    }

    fn set_app_stats(&mut self, is_sys: bool, stats: &[AppStats]) -> Result<()> {
        self.encode_list(if is_sys { KEY_SYS_APP_STATS } else { KEY_APP_STATS }, stats)
    }

    fn device_infos(&self) -> Result<Vec<DeviceInfo>> {
        self.decode_field(KEY_DEVICES)
    }

    fn set_device_infos(&mut self, devices: &[DeviceInfo]) -> Result<()> {
        self.encode_list(KEY_DEVICES, devices)
    }

    /// Free-form node properties, e.g. [`PROP_CORE_FREQUENCY`].
    fn node_props(&self) -> Result<Map<String, Value>> {
        self.decode_field(KEY_NODE_PROPS)
    }

    fn set_node_props(&mut self, props: Map<String, Value>) {
        self.fields_mut()
            .insert(KEY_NODE_PROPS.to_string(), Value::Object(props));
    }

    /// Decode the value stored under `key`. Absent and `null` decode as empty.
    fn decode_field<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.fields().get(key) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::decode(format!("{}.{}", Self::KIND, key), e)),
        }
    }

    fn encode_list<T: Serialize>(&mut self, key: &str, items: &[T]) -> Result<()> {
        let value =
            serde_json::to_value(items).map_err(|e| Error::serialization("encode document", e))?;
        self.fields_mut().insert(key.to_string(), value);
        Ok(())
    }
}

macro_rules! document {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Map<String, Value>);

        impl Document for $name {
            const KIND: &'static str = $kind;

            fn fields(&self) -> &Map<String, Value> {
                &self.0
            }

            fn fields_mut(&mut self) -> &mut Map<String, Value> {
                &mut self.0
            }

            fn from_fields(fields: Map<String, Value>) -> Self {
                Self(fields)
            }

            fn into_fields(self) -> Map<String, Value> {
                self.0
            }
        }

        impl Deref for $name {
            type Target = Map<String, Value>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl From<Map<String, Value>> for $name {
            fn from(fields: Map<String, Value>) -> Self {
                Self(fields)
            }
        }
    };
}

document!(
    /// What a device last told the control plane.
    Report,
    "report"
);

document!(
    /// What the control plane wants a device to run.
    Desire,
    "desire"
);

document!(
    /// A sparse RFC 7396 overlay between two documents.
    Delta,
    "delta"
);

impl Report {
    /// Timestamp of the report, if the device sent one.
    pub fn time(&self) -> Result<Option<DateTime<Utc>>> {
        match self.0.get(KEY_TIME) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| Error::decode("report.time", e)),
        }
    }
}

impl Desire {
    /// Delta that brings `reported` to this desire, without deletion markers.
    pub fn diff(&self, reported: &Report) -> Delta {
        let mut delta = reconcile::create_merge_patch(reported.fields(), self.fields());
        reconcile::strip_nulls(&mut delta);
        Delta(delta)
    }

    /// Delta that brings `reported` to this desire, keeping `null` for keys
    /// the desire no longer has.
    pub fn diff_with_nil(&self, reported: &Report) -> Delta {
        Delta(reconcile::create_merge_patch(reported.fields(), self.fields()))
    }
}

pub(crate) fn is_empty_document<D: Document>(document: &D) -> bool {
    document.fields().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(value: Value) -> Report {
        serde_json::from_value(value).unwrap()
    }

    fn desire(value: Value) -> Desire {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn diff_drops_deletions_diff_with_nil_keeps_them() {
        let reported = report(json!({"apps": [{"name": "a"}], "stale": {"x": 1}, "v": 1}));
        let desired = desire(json!({"apps": [{"name": "a"}], "v": 2}));

        let plain = desired.diff(&reported);
        assert_eq!(serde_json::to_value(&plain).unwrap(), json!({"v": 2}));

        let with_nil = desired.diff_with_nil(&reported);
        assert_eq!(
            serde_json::to_value(&with_nil).unwrap(),
            json!({"v": 2, "stale": null})
        );
    }

    #[test]
    fn patch_returns_new_document() {
        let reported = report(json!({"a": {"b": 1, "c": 2}, "d": 3}));
        let delta: Delta = serde_json::from_value(json!({"a": {"c": null}, "e": 4})).unwrap();

        let patched = reported.patch(&delta);

        assert_eq!(
            serde_json::to_value(&patched).unwrap(),
            json!({"a": {"b": 1}, "d": 3, "e": 4})
        );
        assert_eq!(reported["a"]["c"], json!(2));
    }

    #[test]
    fn round_trip_through_diff_and_patch() {
        let reported = report(json!({
            KEY_NODE_PROPS: {PROP_CORE_FREQUENCY: "20", "old": "x"},
            "apps": [{"name": "a", "version": "1"}]
        }));
        let desired = desire(json!({
            KEY_NODE_PROPS: {PROP_CORE_FREQUENCY: "30", PROP_CORE_API_PORT: "30050"},
            "apps": [{"name": "a", "version": "2"}],
            "devices": [{"name": "d1"}]
        }));

        let delta = desired.diff_with_nil(&reported);
        let patched = Desire::from_fields(reported.patch(&delta).into_fields());
        assert_eq!(patched, desired);

        // Without deletion markers every desired leaf still lands.
        let partial = reported.patch(&desired.diff(&reported));
        for (key, value) in desired.iter() {
            assert_eq!(partial.get(key), Some(value), "key {key}");
        }
        assert_eq!(partial[KEY_NODE_PROPS]["old"], json!("x"));
    }

    #[test]
    fn merge_reported_data() {
        let mut current = report(json!({"node": {"n1": {"arch": "amd64"}}, "apps": []}));
        current
            .merge(report(json!({"node": {"n1": {"os": "linux"}}})))
            .unwrap();
        assert_eq!(current["node"]["n1"], json!({"arch": "amd64", "os": "linux"}));
        assert_eq!(current["apps"], json!([]));
    }

    #[test]
    fn typed_app_accessors() {
        let mut desired = Desire::default();
        assert!(desired.app_infos(false).unwrap().is_empty());

        let apps = vec![AppInfo {
            name: "core".to_string(),
            version: "v2".to_string(),
        }];
        desired.set_app_infos(true, &apps).unwrap();
        assert_eq!(desired.app_infos(true).unwrap(), apps);
        assert!(desired.app_infos(false).unwrap().is_empty());
    }

    #[test]
    fn typed_accessor_rejects_wrong_shape() {
        let reported = report(json!({"devices": "not-a-list"}));
        let err = reported.device_infos().unwrap_err();
        assert!(matches!(err, Error::Decode { ref what, .. } if what == "report.devices"));
    }

    #[test]
    fn app_stats_round_trip_through_document() {
        let mut reported = Report::default();
        let stats = vec![AppStats {
            name: "web".to_string(),
            status: "Running".to_string(),
            ..Default::default()
        }];
        reported.set_app_stats(false, &stats).unwrap();
        assert_eq!(reported.app_stats(false).unwrap(), stats);
        assert!(reported.app_stats(true).unwrap().is_empty());
    }

    #[test]
    fn node_props_accessor() {
        let mut desired = Desire::default();
        assert!(desired.node_props().unwrap().is_empty());

        let mut props = Map::new();
        props.insert(PROP_CORE_FREQUENCY.to_string(), json!("20"));
        props.insert(PROP_CORE_API_PORT.to_string(), json!(30050));
        desired.set_node_props(props.clone());
        assert_eq!(desired.node_props().unwrap(), props);

        let reported = report(json!({KEY_NODE_PROPS: ["not", "a", "map"]}));
        let err = reported.node_props().unwrap_err();
        assert!(matches!(err, Error::Decode { ref what, .. } if what == "report.nodeprops"));
    }

    #[test]
    fn report_time_parses_rfc3339() {
        let reported = report(json!({"time": "2024-05-01T10:00:00Z"}));
        let time = reported.time().unwrap().unwrap();
        assert_eq!(time.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        assert!(Report::default().time().unwrap().is_none());
        assert!(report(json!({"time": 5})).time().is_err());
    }
}
