// src/filter/mod.rs
//
// Request filters as written in table descriptors: `*`, a list of codes,
// or a single comparison such as `>=2020`.

pub mod validate;

pub use validate::{materialize, resolve, validate};

use thiserror::Error;

/// Misuse of a filter, not a data condition. Aborts the run.
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("`{0}` carries no comparison operator but was resolved as a comparison")]
    MissingOperator(String),

    #[error("`{0}` has a non-numeric operand")]
    InvalidOperand(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Operator {
    // Two-character tokens first so `>=` never reads as `>`.
    const TOKENS: [(&'static str, Operator); 6] = [
        (">=", Operator::Ge),
        ("<=", Operator::Le),
        ("==", Operator::Eq),
        (">", Operator::Gt),
        ("<", Operator::Lt),
        ("=", Operator::Eq),
    ];

    /// Split a leading operator off `raw`.
    pub fn detect(raw: &str) -> Option<(Operator, &str)> {
        let raw = raw.trim_start();
        Self::TOKENS
            .iter()
            .find_map(|(tok, op)| raw.strip_prefix(tok).map(|rest| (*op, rest)))
    }

    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Operator::Eq => lhs == rhs,
            Operator::Gt => lhs > rhs,
            Operator::Ge => lhs >= rhs,
            Operator::Lt => lhs < rhs,
            Operator::Le => lhs <= rhs,
        }
    }
}

/// `catalog_value <op> operand`, compared as floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub op: Operator,
    pub operand: f64,
}

impl Comparison {
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let (op, rest) =
            Operator::detect(raw).ok_or_else(|| FilterError::MissingOperator(raw.to_string()))?;
        let operand = rest
            .trim()
            .parse::<f64>()
            .map_err(|_| FilterError::InvalidOperand(raw.to_string()))?;
        Ok(Self { op, operand })
    }

    /// Catalog codes that are not numeric never match.
    pub fn matches(&self, value: &str) -> bool {
        value
            .trim()
            .parse::<f64>()
            .map(|v| self.op.apply(v, self.operand))
            .unwrap_or(false)
    }
}

/// How one variable's requested values are interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Wildcard,
    Values(Vec<String>),
    Comparison(String),
}

impl FilterExpr {
    /// The first value decides whether the list is a wildcard or a comparison.
    pub fn parse(values: &[String]) -> Self {
        match values.first() {
            Some(first) if first.contains('*') => FilterExpr::Wildcard,
            Some(first) if Operator::detect(first).is_some() => {
                FilterExpr::Comparison(first.clone())
            }
            _ => FilterExpr::Values(values.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_detection_prefers_longest_token() {
        assert_eq!(Operator::detect(">=2020"), Some((Operator::Ge, "2020")));
        assert_eq!(Operator::detect("<=5"), Some((Operator::Le, "5")));
        assert_eq!(Operator::detect(">5"), Some((Operator::Gt, "5")));
        assert_eq!(Operator::detect("==5"), Some((Operator::Eq, "5")));
        assert_eq!(Operator::detect("=5"), Some((Operator::Eq, "5")));
        assert_eq!(Operator::detect("2020"), None);
    }

    #[test]
    fn comparison_is_numeric() {
        let c = Comparison::parse(">=100").unwrap();
        assert!(c.matches("100"));
        assert!(c.matches("101.5"));
        assert!(c.matches("0400"));
        assert!(!c.matches("099"));
        assert!(!c.matches("abc"));
    }

    #[test]
    fn comparison_errors() {
        assert_eq!(
            Comparison::parse("2020"),
            Err(FilterError::MissingOperator("2020".into()))
        );
        assert_eq!(
            Comparison::parse(">2020K1"),
            Err(FilterError::InvalidOperand(">2020K1".into()))
        );
    }

    #[test]
    fn filter_expr_variants() {
        let v = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(FilterExpr::parse(&v(&["*"])), FilterExpr::Wildcard);
        assert_eq!(
            FilterExpr::parse(&v(&["<3"])),
            FilterExpr::Comparison("<3".into())
        );
        assert_eq!(
            FilterExpr::parse(&v(&["1", "2"])),
            FilterExpr::Values(v(&["1", "2"]))
        );
        assert_eq!(FilterExpr::parse(&[]), FilterExpr::Values(vec![]));
    }
}
