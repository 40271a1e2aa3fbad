//! Bookkeeping shared by all preprocessors.

use serde::{Deserialize, Serialize};

use crate::helpers::column_description::Marker;
use crate::{Float, Int};

/// A source column a preprocessor derived something from during fit.
///
/// `table` is the index into the peripheral tables; it is 0 for the
/// population.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedColumn {
    pub marker: Marker,
    pub table: usize,
    pub name: String,
}

/// Records a fitted source column.
pub fn add(marker: Marker, table: usize, name: &str, cols: &mut Vec<FittedColumn>) {
    cols.push(FittedColumn {
        marker,
        table,
        name: name.to_string(),
    });
}

/// The names recorded for one table during fit, in recording order.
pub fn retrieve_names(marker: Marker, table: usize, cols: &[FittedColumn]) -> Vec<String> {
    cols.iter()
        .filter(|c| c.marker == marker && c.table == table)
        .map(|c| c.name.clone())
        .collect()
}

/// A derived column is dropped when it carries fewer than two distinct
/// values.
pub fn has_warnings_int(values: &[Int]) -> bool {
    let mut first = None;
    for &v in values {
        match first {
            None => first = Some(v),
            Some(f) if f != v => return false,
            Some(_) => {}
        }
    }
    true
}

pub fn has_warnings_float(values: &[Float]) -> bool {
    let mut first = None;
    for &v in values {
        if v.is_nan() {
            continue;
        }
        match first {
            None => first = Some(v),
            Some(f) if f != v => return false,
            Some(_) => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_warnings() {
        assert!(has_warnings_int(&[]));
        assert!(has_warnings_int(&[1, 1, 1]));
        assert!(!has_warnings_int(&[1, 2]));
        assert!(has_warnings_float(&[f64::NAN, 3.0, 3.0]));
        assert!(!has_warnings_float(&[3.0, 4.0]));
    }

    #[test]
    fn test_retrieve_names_filters_by_table() {
        let mut cols = Vec::new();
        add(Marker::Population, 0, "a", &mut cols);
        add(Marker::Peripheral, 0, "b", &mut cols);
        add(Marker::Peripheral, 1, "c", &mut cols);
        assert_eq!(retrieve_names(Marker::Peripheral, 0, &cols), vec!["b"]);
        assert_eq!(retrieve_names(Marker::Population, 0, &cols), vec!["a"]);
    }
}
