use std::collections::BTreeMap;

use crate::helpers::column_description::{ColumnDescription, Marker};
use crate::helpers::marker;
use crate::Float;

/// Accumulates column importances for one target.
///
/// Backed by a `BTreeMap` so the keys are always in the lexicographic order
/// shared across targets.
#[derive(Clone, Debug, Default)]
pub struct ImportanceMaker {
    importances: BTreeMap<ColumnDescription, Float>,
}

impl ImportanceMaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_importances(&mut self, desc: ColumnDescription, value: Float) {
        *self.importances.entry(desc).or_insert(0.0) += value;
    }

    pub fn merge(&mut self, other: BTreeMap<ColumnDescription, Float>) {
        for (desc, value) in other {
            self.add_to_importances(desc, value);
        }
    }

    pub fn importances(&self) -> &BTreeMap<ColumnDescription, Float> {
        &self.importances
    }

    /// Rewrites staging markers in the column names and tables back into
    /// their human-readable form, merging entries that collapse onto the
    /// same description.
    pub fn humanize(self) -> Self {
        let mut humanized = ImportanceMaker::new();
        for (desc, value) in self.importances {
            let (origin, base) = marker::parse_colname(&desc.name);
            let (table, marker_kind) = match &origin {
                Some((table, _alias)) => (table.clone(), Marker::Peripheral),
                None => (marker::base_table_name(&desc.table), desc.marker),
            };
            let new_desc = ColumnDescription::new(
                marker_kind,
                marker::base_table_name(&table),
                marker::humanize(&base),
            );
            humanized.add_to_importances(new_desc, value);
        }
        humanized
    }
}

/// Gives all makers the same key set by inserting zero entries for any
/// description present in one maker but missing in another.
pub fn fill_zeros(makers: &mut [ImportanceMaker]) {
    if makers.is_empty() {
        return;
    }

    let mut union: BTreeMap<ColumnDescription, Float> = BTreeMap::new();
    for maker in makers.iter() {
        for desc in maker.importances().keys() {
            union.entry(desc.clone()).or_insert(0.0);
        }
    }

    for maker in makers.iter_mut() {
        for desc in union.keys() {
            maker.add_to_importances(desc.clone(), 0.0);
        }
    }
}
