// src/schema/arrow.rs

use arrow::{
    array::{ArrayRef, Date32Builder, Float64Builder, Int64Builder, StringBuilder},
    datatypes::DataType,
};
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;

use super::derive::{ColumnKind, DATE_FORMAT};
use super::SqlType;

/// `num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Map an Arrow column type onto the destination column type.
///
/// Covers:
/// - Utf8, LargeUtf8          → VARCHAR(text_length)
/// - Int8..Int64, UInt8..UInt32 → INT
/// - Float16..Float64         → DECIMAL(14, 5)
/// - Date32, Date64           → DATE
/// - anything else            → None
pub fn map_to_sql_type(ty: &DataType, text_length: u32) -> Option<SqlType> {
    match ty {
        DataType::Utf8 | DataType::LargeUtf8 => Some(SqlType::Varchar(text_length)),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => Some(SqlType::Int),
        DataType::Float16 | DataType::Float32 | DataType::Float64 => Some(SqlType::Decimal {
            precision: 14,
            scale: 5,
        }),
        DataType::Date32 | DataType::Date64 => Some(SqlType::Date),
        _ => None,
    }
}

/// Build a typed Arrow column from raw text cells. Empty cells become nulls.
pub fn build_array(kind: ColumnKind, cells: &[&str]) -> ArrayRef {
    let clean = |s: &&str| -> Option<String> {
        let t = s.trim();
        (!t.is_empty()).then(|| t.to_string())
    };
    match kind {
        ColumnKind::Text => {
            let mut b = StringBuilder::new();
            for c in cells {
                b.append_option(clean(c));
            }
            Arc::new(b.finish())
        }
        ColumnKind::Integer => {
            let mut b = Int64Builder::with_capacity(cells.len());
            for c in cells {
                b.append_option(clean(c).and_then(|s| s.parse().ok()));
            }
            Arc::new(b.finish())
        }
        ColumnKind::Real => {
            let mut b = Float64Builder::with_capacity(cells.len());
            for c in cells {
                b.append_option(clean(c).and_then(|s| s.parse().ok()));
            }
            Arc::new(b.finish())
        }
        ColumnKind::Date => {
            let mut b = Date32Builder::with_capacity(cells.len());
            for c in cells {
                let days = clean(c)
                    .and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
                    .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE);
                b.append_option(days);
            }
            Arc::new(b.finish())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Date32Array, Int64Array, StringArray};

    #[test]
    fn sql_type_mapping() {
        assert_eq!(map_to_sql_type(&DataType::Utf8, 150), Some(SqlType::Varchar(150)));
        assert_eq!(map_to_sql_type(&DataType::Int64, 150), Some(SqlType::Int));
        assert_eq!(
            map_to_sql_type(&DataType::Float64, 150),
            Some(SqlType::Decimal { precision: 14, scale: 5 })
        );
        assert_eq!(map_to_sql_type(&DataType::Date32, 150), Some(SqlType::Date));
        assert_eq!(map_to_sql_type(&DataType::Boolean, 150), None);
    }

    #[test]
    fn arrays_carry_nulls() {
        let ints = build_array(ColumnKind::Integer, &["1", "", "3"]);
        let ints = ints.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(ints.len(), 3);
        assert!(ints.is_null(1));
        assert_eq!(ints.value(2), 3);

        let text = build_array(ColumnKind::Text, &[" a ", ""]);
        let text = text.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(text.value(0), "a");
        assert!(text.is_null(1));
    }

    #[test]
    fn dates_count_from_unix_epoch() {
        let dates = build_array(ColumnKind::Date, &["1970-01-02", "2020-01-01"]);
        let dates = dates.as_any().downcast_ref::<Date32Array>().unwrap();
        assert_eq!(dates.value(0), 1);
        assert_eq!(dates.value(1), 18262);
    }
}
