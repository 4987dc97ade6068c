// src/filter/validate.rs

use std::collections::BTreeMap;
use tracing::debug;

use super::{Comparison, FilterError, FilterExpr};
use crate::{catalog::Catalog, error::ValidationError};

/// Check every requested variable and value against the catalog.
///
/// The time variable only has to exist; its values are produced by the window planner.
pub fn validate(
    catalog: &Catalog,
    requested: &BTreeMap<String, Vec<String>>,
    time_variable: &str,
) -> Result<(), ValidationError> {
    for (code, values) in requested {
        let entry = catalog
            .get(code)
            .ok_or_else(|| ValidationError::UnknownVariable {
                variable: code.clone(),
            })?;
        if code == time_variable {
            continue;
        }

        match FilterExpr::parse(values) {
            FilterExpr::Wildcard => {}
            FilterExpr::Comparison(raw) => {
                let cmp = Comparison::parse(&raw).map_err(|_| ValidationError::InvalidOperand {
                    variable: code.clone(),
                    filter: raw.clone(),
                })?;
                if !entry.values.iter().any(|v| cmp.matches(v)) {
                    return Err(ValidationError::NoComparisonMatch {
                        variable: code.clone(),
                        filter: raw,
                    });
                }
            }
            FilterExpr::Values(values) => {
                let missing: Vec<String> = values
                    .into_iter()
                    .filter(|v| !entry.values.contains(v))
                    .collect();
                if !missing.is_empty() {
                    return Err(ValidationError::UnknownValues {
                        variable: code.clone(),
                        values: missing,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Expand a comparison filter into the catalog codes that satisfy it, in catalog order.
pub fn materialize(
    values: &[String],
    catalog_values: &[String],
) -> Result<Vec<String>, FilterError> {
    let raw = values.first().map(String::as_str).unwrap_or_default();
    let cmp = Comparison::parse(raw)?;
    Ok(catalog_values
        .iter()
        .filter(|v| cmp.matches(v))
        .cloned()
        .collect())
}

/// Produce the `(code, values)` list sent upstream, materializing flagged variables.
pub fn resolve(
    catalog: &Catalog,
    requested: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<(String, Vec<String>)>, FilterError> {
    let mut out = Vec::with_capacity(requested.len());
    for (code, values) in requested {
        let resolved = match catalog.get(code) {
            Some(entry)
                if entry.materialize && FilterExpr::parse(values) != FilterExpr::Wildcard =>
            {
                let expanded = materialize(values, &entry.values)?;
                debug!(variable = %code, count = expanded.len(), "materialized comparison");
                expanded
            }
            _ => values.clone(),
        };
        out.push((code.clone(), resolved));
    }
    Ok(out)
}
