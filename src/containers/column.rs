use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::helpers::Subrole;

/// A named, typed column.
///
/// The payload is shared; cloning a column is cheap and mutating one
/// requires building a new payload vector. The unit is a free-form string
/// that may carry sentinels such as `"comparison only"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column<T> {
    name: String,
    unit: String,
    subroles: Vec<Subrole>,
    data: Arc<Vec<T>>,
}

impl<T> Column<T> {
    pub fn new(name: impl Into<String>, data: Vec<T>) -> Self {
        Self {
            name: name.into(),
            unit: String::new(),
            subroles: Vec::new(),
            data: Arc::new(data),
        }
    }

    pub fn from_arc(name: impl Into<String>, data: Arc<Vec<T>>) -> Self {
        Self {
            name: name.into(),
            unit: String::new(),
            subroles: Vec::new(),
            data,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_subroles(mut self, subroles: Vec<Subrole>) -> Self {
        self.subroles = subroles;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn set_unit(&mut self, unit: impl Into<String>) {
        self.unit = unit.into();
    }

    pub fn subroles(&self) -> &[Subrole] {
        &self.subroles
    }

    pub fn set_subroles(&mut self, subroles: Vec<Subrole>) {
        self.subroles = subroles;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_ptr(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.data)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }
}

impl<T> std::ops::Index<usize> for Column<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_payload() {
        let col = Column::new("a", vec![1i64, 2, 3]);
        let copy = col.clone();
        assert!(Arc::ptr_eq(&col.data_ptr(), &copy.data_ptr()));
    }

    #[test]
    fn test_builders() {
        let col = Column::new("ts", vec![0.0f64])
            .with_unit("time stamp, comparison only")
            .with_subroles(vec![Subrole::ExcludeSeasonal]);
        assert_eq!(col.unit(), "time stamp, comparison only");
        assert_eq!(col.subroles(), &[Subrole::ExcludeSeasonal]);
        assert_eq!(col[0], 0.0);
    }
}
