pub mod diff;
pub mod merge;
pub mod patch;
pub mod view;

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Read a document from disk; `.yaml`/`.yml` files are YAML, the rest JSON.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display())),
        _ => serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display())),
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeshadow::{Document, Report};
    use std::io::Write;

    #[test]
    fn reads_json_and_yaml_documents() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("report.json");
        std::fs::write(&json_path, r#"{"apps": [{"name": "a", "version": "1"}]}"#).unwrap();
        let from_json: Report = read_document(&json_path).unwrap();

        let yaml_path = dir.path().join("report.yaml");
        let mut file = std::fs::File::create(&yaml_path).unwrap();
        writeln!(file, "apps:\n  - name: a\n    version: \"1\"").unwrap();
        let from_yaml: Report = read_document(&yaml_path).unwrap();

        assert_eq!(from_json, from_yaml);
        assert_eq!(from_yaml.app_infos(false).unwrap()[0].version, "1");
    }

    #[test]
    fn reports_the_failing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = read_document::<Report>(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
