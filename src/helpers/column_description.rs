use serde::{Deserialize, Serialize};

/// Whether a column lives on the population or on a peripheral table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Marker {
    #[serde(rename = "[POPULATION]")]
    Population,
    #[serde(rename = "[PERIPHERAL]")]
    Peripheral,
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Marker::Population => write!(f, "[POPULATION]"),
            Marker::Peripheral => write!(f, "[PERIPHERAL]"),
        }
    }
}

/// Identifies a raw column for the purpose of importance attribution.
///
/// Totally ordered lexicographically by (marker, table, name) so that
/// importance maps across targets share one deterministic key order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub marker: Marker,
    pub table: String,
    pub name: String,
}

impl ColumnDescription {
    pub fn new(marker: Marker, table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            marker,
            table: table.into(),
            name: name.into(),
        }
    }

    /// The full name, e.g. `[POPULATION] population.age`.
    pub fn full_name(&self) -> String {
        format!("{} {}.{}", self.marker, self.table, self.name)
    }
}

impl PartialOrd for ColumnDescription {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ColumnDescription {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.marker
            .cmp(&other.marker)
            .then_with(|| self.table.cmp(&other.table))
            .then_with(|| self.name.cmp(&other.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let a = ColumnDescription::new(Marker::Population, "pop", "age");
        let b = ColumnDescription::new(Marker::Population, "pop", "income");
        let c = ColumnDescription::new(Marker::Peripheral, "trans", "amount");
        assert!(a < b);
        assert!(a < c);
        assert!(b < c);
    }

    #[test]
    fn test_full_name() {
        let desc = ColumnDescription::new(Marker::Peripheral, "trans", "amount");
        assert_eq!(desc.full_name(), "[PERIPHERAL] trans.amount");
    }
}
