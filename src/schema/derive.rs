// src/schema/derive.rs

use arrow::datatypes::DataType;
use chrono::NaiveDate;
use tracing::debug;

/// Value kind of a fetched column, decided from all of its cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    Date,
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";

impl ColumnKind {
    pub fn data_type(self) -> DataType {
        match self {
            ColumnKind::Text => DataType::Utf8,
            ColumnKind::Integer => DataType::Int64,
            ColumnKind::Real => DataType::Float64,
            ColumnKind::Date => DataType::Date32,
        }
    }

    /// Widen two kinds: integers promote to reals, any other mix is text.
    fn merge(self, other: ColumnKind) -> ColumnKind {
        use ColumnKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, Real) | (Real, Integer) => Real,
            _ => Text,
        }
    }
}

/// Kind of a single cell, `None` for an empty cell.
pub fn infer_cell(raw: &str) -> Option<ColumnKind> {
    let v = raw.trim();
    if v.is_empty() {
        return None;
    }
    if v.parse::<i64>().is_ok() {
        return Some(ColumnKind::Integer);
    }
    // `nan` and `inf` parse as floats but are not real numbers in a payload
    if v.parse::<f64>().map(f64::is_finite).unwrap_or(false) {
        return Some(ColumnKind::Real);
    }
    if NaiveDate::parse_from_str(v, DATE_FORMAT).is_ok() {
        return Some(ColumnKind::Date);
    }
    Some(ColumnKind::Text)
}

/// Scan every cell of a column:
///  - ignore empty cells
///  - stop at the first cell that forces text
///  - with no non-empty cells, default to text
pub fn derive_kind<'a, I>(column: &str, cells: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a str>,
{
    let mut kind: Option<ColumnKind> = None;
    for cell in cells {
        let Some(k) = infer_cell(cell) else { continue };
        let merged = kind.map_or(k, |prev| prev.merge(k));
        if merged == ColumnKind::Text {
            debug!(column, "text value found, column stays text");
            return ColumnKind::Text;
        }
        kind = Some(merged);
    }
    kind.unwrap_or_else(|| {
        debug!(column, "no samples, defaulting to text");
        ColumnKind::Text
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_kinds() {
        assert_eq!(infer_cell(""), None);
        assert_eq!(infer_cell("  "), None);
        assert_eq!(infer_cell("2020"), Some(ColumnKind::Integer));
        assert_eq!(infer_cell("-12"), Some(ColumnKind::Integer));
        assert_eq!(infer_cell("3.25"), Some(ColumnKind::Real));
        assert_eq!(infer_cell("nan"), Some(ColumnKind::Text));
        assert_eq!(infer_cell("2021-03-01"), Some(ColumnKind::Date));
        assert_eq!(infer_cell("2020K1"), Some(ColumnKind::Text));
        assert_eq!(infer_cell(".."), Some(ColumnKind::Text));
    }

    #[test]
    fn column_kinds_widen() {
        assert_eq!(derive_kind("a", ["1", "2", ""]), ColumnKind::Integer);
        assert_eq!(derive_kind("a", ["1", "2.5"]), ColumnKind::Real);
        assert_eq!(derive_kind("a", ["1", "x"]), ColumnKind::Text);
        assert_eq!(derive_kind("a", ["2020-01-01", "5"]), ColumnKind::Text);
        assert_eq!(derive_kind("a", ["", ""]), ColumnKind::Text);
    }

    #[test]
    fn derivation_is_deterministic() {
        let cells = ["1", "", "4.5", "7"];
        assert_eq!(derive_kind("c", cells), derive_kind("c", cells));
    }
}
