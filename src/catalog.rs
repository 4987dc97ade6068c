// src/catalog.rs

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Column the API uses for the measured value.
pub const CONTENT_COLUMN: &str = "INDHOLD";
/// Name the measure column is loaded under.
pub const CONTENT_LABEL: &str = "content";

/// `GET tableinfo/{id}` response, reduced to what the job reads.
#[derive(Debug, Clone, Deserialize)]
pub struct TableInfo {
    pub variables: Vec<TableVariable>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableVariable {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub values: Vec<VariableValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableValue {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Legal codes and display label for one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogVariable {
    pub values: Vec<String>,
    pub label: String,
    /// Comparison filters must be expanded into literal codes before sending.
    pub materialize: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    variables: BTreeMap<String, CatalogVariable>,
}

impl Catalog {
    pub fn from_variables(vars: &[TableVariable], materialized: &[String]) -> Self {
        let variables = vars
            .iter()
            .map(|v| {
                let entry = CatalogVariable {
                    values: v.values.iter().map(|x| x.id.clone()).collect(),
                    label: v.text.clone(),
                    materialize: materialized.iter().any(|m| m == &v.id),
                };
                (v.id.clone(), entry)
            })
            .collect();
        Self { variables }
    }

    pub fn get(&self, code: &str) -> Option<&CatalogVariable> {
        self.variables.get(code)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Uppercased source code → normalized column name.
    pub fn column_labels(&self) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = self
            .variables
            .iter()
            .map(|(code, v)| (code.to_uppercase(), v.label.replace(' ', "_")))
            .collect();
        map.insert(CONTENT_COLUMN.into(), CONTENT_LABEL.into());
        map
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_info() -> TableInfo {
        serde_json::from_str(
            r#"{
                "id": "T1",
                "text": "Population",
                "variables": [
                    {"id": "OMRÅDE", "text": "region", "elimination": true,
                     "values": [{"id": "000", "text": "All Denmark"},
                                {"id": "101", "text": "Copenhagen"},
                                {"id": "147", "text": "Frederiksberg"}]},
                    {"id": "KØN", "text": "sex",
                     "values": [{"id": "1", "text": "Men"}, {"id": "2", "text": "Women"}]},
                    {"id": "Tid", "text": "time", "time": true,
                     "values": [{"id": "2018"}, {"id": "2019"}, {"id": "2020"}, {"id": "2021"}]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn builds_catalog_and_flags() {
        let info = sample_info();
        let catalog = Catalog::from_variables(&info.variables, &["OMRÅDE".to_string()]);

        assert_eq!(catalog.len(), 3);
        let region = catalog.get("OMRÅDE").unwrap();
        assert_eq!(region.values, vec!["000", "101", "147"]);
        assert_eq!(region.label, "region");
        assert!(region.materialize);
        assert!(!catalog.get("KØN").unwrap().materialize);
    }

    #[test]
    fn column_labels_cover_content() {
        let mut info = sample_info();
        info.variables[1].text = "type of sex".into();
        let labels = Catalog::from_variables(&info.variables, &[]).column_labels();

        assert_eq!(labels["OMRÅDE"], "region");
        assert_eq!(labels["KØN"], "type_of_sex");
        assert_eq!(labels["TID"], "time");
        assert_eq!(labels["INDHOLD"], "content");
    }
}
