use std::sync::Arc;

use crate::containers::Column;
use crate::{Float, Int};

/// A feature column handed to the predictors: a name plus a shared payload.
#[derive(Clone, Debug)]
pub struct Feature<T> {
    name: String,
    data: Arc<Vec<T>>,
}

impl<T> Feature<T> {
    pub fn new(name: impl Into<String>, data: Vec<T>) -> Self {
        Self {
            name: name.into(),
            data: Arc::new(data),
        }
    }

    pub fn from_column(column: &Column<T>) -> Self {
        Self {
            name: column.name().to_string(),
            data: column.data_ptr(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
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

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }
}

impl<T> std::ops::Index<usize> for Feature<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

pub type NumericalFeatures = Vec<Feature<Float>>;
pub type CategoricalFeatures = Vec<Feature<Int>>;
