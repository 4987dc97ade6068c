// src/descriptor.rs

use anyhow::{Context, Result};
use glob::glob;
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};
use tracing::{debug, warn};

use crate::fetch::TransportVerb;

/// Job configuration for one source table, read from `<metadata_dir>/*.json`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TableDescriptor {
    pub table_id: String,
    /// Variable code → requested filter values.
    #[serde(rename = "dst_variables", alias = "variables")]
    pub variables: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub index_vars: Vec<String>,
    /// Forces the transport verb instead of choosing by payload size.
    #[serde(default)]
    pub request_type: Option<TransportVerb>,
}

fn default_format() -> String {
    "CSV".into()
}

impl TableDescriptor {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn destination_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.table_id.to_lowercase())
    }
}

/// Load every descriptor in `dir`, sorted by file name. Unparseable files are skipped.
pub fn load_all(dir: &Path) -> Result<Vec<TableDescriptor>> {
    let pattern = format!("{}/*.json", dir.display());
    let mut paths = glob(&pattern)
        .context("invalid glob pattern for descriptors")?
        .filter_map(Result::ok)
        .collect::<Vec<_>>();
    paths.sort();

    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading descriptor {}", path.display()))?;
        match TableDescriptor::from_json(&text) {
            Ok(d) => {
                debug!(path = %path.display(), table = %d.table_id, "loaded descriptor");
                out.push(d);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping descriptor"),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn parses_descriptor_with_defaults() {
        let d = TableDescriptor::from_json(
            r#"{"table_id": "BEBRIT08",
                "dst_variables": {"Tid": ["2014K1"], "OMRÅDE": [">=101"]}}"#,
        )
        .unwrap();

        assert_eq!(d.table_id, "BEBRIT08");
        assert_eq!(d.format, "CSV");
        assert!(d.index_vars.is_empty());
        assert_eq!(d.request_type, None);
        assert_eq!(d.variables["OMRÅDE"], vec![">=101"]);
        assert_eq!(d.destination_name("dst_"), "dst_bebrit08");
    }

    #[test]
    fn request_type_override() {
        let d = TableDescriptor::from_json(
            r#"{"table_id": "T1", "variables": {"Tid": ["*"]}, "request_type": "POST"}"#,
        )
        .unwrap();
        assert_eq!(d.request_type, Some(TransportVerb::Post));
    }

    #[test]
    fn load_all_skips_broken_files() -> Result<()> {
        let dir = tempdir()?;
        let mut good = fs::File::create(dir.path().join("a.json"))?;
        write!(
            good,
            r#"{{"table_id": "T1", "dst_variables": {{"Tid": [">2014"]}},
                "format": "CSV", "index_vars": ["REGION"]}}"#
        )?;
        fs::write(dir.path().join("b.json"), "{not json")?;
        fs::write(dir.path().join("c.txt"), "ignored")?;

        let all = load_all(dir.path())?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].index_vars, vec!["REGION"]);
        Ok(())
    }
}
