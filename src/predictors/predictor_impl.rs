use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::containers::{CategoricalFeatures, ColumnEncoding, Feature, NumericalFeatures};
use crate::{Float, Result, RfeError};

/// Column layout shared between the feature selectors and the predictors.
///
/// Describes which auto-features of each learner survive selection, which
/// manual columns participate, and how the categorical columns are encoded
/// into the design matrix. The invariant `encodings.len() == 0` or
/// `encodings.len() == categorical_colnames.len()` holds at all times.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictorImpl {
    autofeatures: Vec<Vec<usize>>,
    categorical_colnames: Vec<String>,
    numerical_colnames: Vec<String>,
    encodings: Vec<ColumnEncoding>,
}

fn select_cols<T: Clone>(
    n_selected: usize,
    index: &[usize],
    num_preceding: usize,
    cols: &[T],
) -> Vec<T> {
    let kept: HashSet<usize> = index.iter().take(n_selected).copied().collect();
    cols.iter()
        .enumerate()
        .filter(|(j, _)| kept.contains(&(num_preceding + j)))
        .map(|(_, col)| col.clone())
        .collect()
}

impl PredictorImpl {
    /// A fresh impl keeping every auto-feature of every learner.
    pub fn new(
        num_autofeatures: &[usize],
        categorical_colnames: Vec<String>,
        numerical_colnames: Vec<String>,
    ) -> Self {
        Self {
            autofeatures: num_autofeatures.iter().map(|&n| (0..n).collect()).collect(),
            categorical_colnames,
            numerical_colnames,
            encodings: Vec::new(),
        }
    }

    pub fn autofeatures(&self) -> &[Vec<usize>] {
        &self.autofeatures
    }

    pub fn categorical_colnames(&self) -> &[String] {
        &self.categorical_colnames
    }

    pub fn numerical_colnames(&self) -> &[String] {
        &self.numerical_colnames
    }

    pub fn encodings(&self) -> &[ColumnEncoding] {
        &self.encodings
    }

    pub fn num_autofeatures(&self) -> usize {
        self.autofeatures.iter().map(Vec::len).sum()
    }

    pub fn num_manual_features(&self) -> usize {
        self.categorical_colnames.len() + self.numerical_colnames.len()
    }

    /// Total feature count in the compressed (per-column) representation.
    pub fn num_features(&self) -> usize {
        self.num_autofeatures() + self.num_manual_features()
    }

    /// Number of columns of the expanded design matrix.
    pub fn ncols_csr(&self) -> usize {
        self.num_autofeatures()
            + self.numerical_colnames.len()
            + self.encodings.iter().map(ColumnEncoding::n_unique).sum::<usize>()
    }

    /// The names of the selected auto-features, in bank order, prefixed by
    /// the 1-based learner number.
    pub fn autofeature_names(&self) -> Vec<String> {
        self.autofeatures
            .iter()
            .enumerate()
            .flat_map(|(l, indices)| {
                indices
                    .iter()
                    .map(move |&ix| format!("feature_{}_{}", l + 1, ix + 1))
            })
            .collect()
    }

    /// Learns the dense encodings of the categorical columns.
    pub fn fit_encodings(&mut self, x_categorical: &CategoricalFeatures) {
        self.encodings = x_categorical
            .iter()
            .map(|col| ColumnEncoding::fit(col.data()))
            .collect();
    }

    /// Maps categorical input codes onto the encodings learned at fit.
    /// Rejects when the column count does not match.
    pub fn transform_encodings(
        &self,
        x_categorical: &CategoricalFeatures,
    ) -> Result<CategoricalFeatures> {
        if x_categorical.len() != self.encodings.len() {
            return Err(RfeError::Data(format!(
                "Expected {} categorical columns, got {}.",
                self.encodings.len(),
                x_categorical.len()
            )));
        }

        Ok(x_categorical
            .iter()
            .zip(&self.encodings)
            .map(|(col, encoding)| Feature::new(col.name(), encoding.transform(col.data())))
            .collect())
    }

    /// Retains only the `n_selected` top-ranked features.
    ///
    /// `index` ranks the global feature positions by importance. The groups
    /// are pruned in strict reverse order - categoricals, then numericals,
    /// then each learner's auto-features back to front - so `num_preceding`
    /// stays correct while each group shrinks.
    pub fn select_features(&mut self, n_selected: usize, index: &[usize]) {
        self.encodings.clear();

        let mut num_preceding = self.num_autofeatures() + self.numerical_colnames.len();

        self.categorical_colnames =
            select_cols(n_selected, index, num_preceding, &self.categorical_colnames);

        num_preceding -= self.numerical_colnames.len();

        self.numerical_colnames =
            select_cols(n_selected, index, num_preceding, &self.numerical_colnames);

        for i in (0..self.autofeatures.len()).rev() {
            num_preceding -= self.autofeatures[i].len();
            self.autofeatures[i] =
                select_cols(n_selected, index, num_preceding, &self.autofeatures[i]);
        }
    }

    /// Compresses expanded-design importances back to one value per
    /// feature: the dense prefix is copied, the one-hot tail is summed per
    /// categorical column.
    pub fn compress_importances(&self, all_importances: &[Float]) -> Result<Vec<Float>> {
        if all_importances.len() != self.ncols_csr() {
            return Err(RfeError::Data(format!(
                "Expected {} importances, got {}.",
                self.ncols_csr(),
                all_importances.len()
            )));
        }

        let n_dense = self.num_autofeatures() + self.numerical_colnames.len();

        let mut compressed = Vec::with_capacity(self.num_features());
        compressed.extend_from_slice(&all_importances[..n_dense]);

        let mut begin = n_dense;
        for encoding in &self.encodings {
            let end = begin + encoding.n_unique();
            compressed.push(all_importances[begin..end].iter().sum());
            begin = end;
        }

        Ok(compressed)
    }

    /// Checks that all input columns share one length and returns it.
    pub fn check_plausibility(
        &self,
        x_categorical: &CategoricalFeatures,
        x_numerical: &NumericalFeatures,
    ) -> Result<usize> {
        if x_categorical.is_empty() && x_numerical.is_empty() {
            return Err(RfeError::Data(
                "You must provide at least one input column!".to_string(),
            ));
        }

        let expected = x_categorical
            .first()
            .map(Feature::len)
            .or_else(|| x_numerical.first().map(Feature::len))
            .unwrap_or(0);

        let all_match = x_categorical.iter().all(|col| col.len() == expected)
            && x_numerical.iter().all(|col| col.len() == expected);

        if !all_match {
            return Err(RfeError::Data(
                "All input columns must have the same length!".to_string(),
            ));
        }

        Ok(expected)
    }

    /// Builds the dense design matrix, row-major: the numerical features
    /// followed by one-hot expansions of the dense-encoded categoricals.
    pub fn make_design_rows(
        &self,
        x_categorical: &CategoricalFeatures,
        x_numerical: &NumericalFeatures,
    ) -> Result<Vec<Vec<Float>>> {
        let nrows = self.check_plausibility(x_categorical, x_numerical)?;
        let ncols = self.ncols_csr();

        let mut offsets = Vec::with_capacity(self.encodings.len());
        let mut offset = x_numerical.len();
        for encoding in &self.encodings {
            offsets.push(offset);
            offset += encoding.n_unique();
        }

        let mut rows = vec![vec![0.0; ncols]; nrows];

        for (j, col) in x_numerical.iter().enumerate() {
            for (i, row) in rows.iter_mut().enumerate() {
                row[j] = col[i];
            }
        }

        for (c, col) in x_categorical.iter().enumerate() {
            let n_unique = self.encodings[c].n_unique() as i64;
            for (i, row) in rows.iter_mut().enumerate() {
                let code = col[i];
                if code >= 0 && code < n_unique {
                    row[offsets[c] + code as usize] = 1.0;
                }
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impl_with_encodings() -> PredictorImpl {
        // 3 learners x 10 features, 3 numericals, 2 categoricals.
        let mut imp = PredictorImpl::new(
            &[10, 10, 10],
            vec!["c1".to_string(), "c2".to_string()],
            vec!["n1".to_string(), "n2".to_string(), "n3".to_string()],
        );
        let cat1 = Feature::new("c1", vec![0, 1, 2, 3, 0, 1]);
        let cat2 = Feature::new("c2", vec![0, 1, 2, 3, 4, 0]);
        imp.fit_encodings(&vec![cat1, cat2]);
        imp
    }

    #[test]
    fn test_counts() {
        let imp = impl_with_encodings();
        assert_eq!(imp.num_autofeatures(), 30);
        assert_eq!(imp.num_manual_features(), 5);
        assert_eq!(imp.num_features(), 35);
        assert_eq!(imp.ncols_csr(), 30 + 3 + 4 + 5);
    }

    #[test]
    fn test_select_features_reverse_group_order() {
        let mut imp = impl_with_encodings();
        let index: Vec<usize> = (0..35).collect();
        imp.select_features(7, &index);

        let kept: usize = imp.num_features();
        assert_eq!(kept, 7);
        // The first seven global positions are auto-features of learner 0.
        assert_eq!(imp.autofeatures()[0], vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(imp.autofeatures()[1].is_empty());
        assert!(imp.autofeatures()[2].is_empty());
        assert!(imp.numerical_colnames().is_empty());
        assert!(imp.categorical_colnames().is_empty());
        assert!(imp.encodings().is_empty());
    }

    #[test]
    fn test_select_features_keeps_manual_columns() {
        let mut imp = impl_with_encodings();
        // Rank the numericals and categoricals first: positions 30..35.
        let mut index: Vec<usize> = (30..35).collect();
        index.extend(0..30);
        imp.select_features(5, &index);
        assert_eq!(imp.numerical_colnames().len(), 3);
        assert_eq!(imp.categorical_colnames().len(), 2);
        assert_eq!(imp.num_autofeatures(), 0);
    }

    #[test]
    fn test_transform_encodings_round_trip() {
        let imp = impl_with_encodings();
        let transformed = imp
            .transform_encodings(&vec![
                Feature::new("c1", vec![0, 1, 2, 3]),
                Feature::new("c2", vec![4, 0, 1, 2]),
            ])
            .unwrap();
        let distinct: HashSet<i64> = transformed[0].iter().copied().collect();
        assert_eq!(distinct.len(), 4);

        assert!(imp
            .transform_encodings(&vec![Feature::new("c1", vec![0])])
            .is_err());
    }

    #[test]
    fn test_compress_importances() {
        let imp = impl_with_encodings();
        let mut all = vec![0.0; imp.ncols_csr()];
        // One-hot tail of the first categorical: positions 33..37.
        all[33] = 0.1;
        all[34] = 0.2;
        // Second categorical: positions 37..42.
        all[37] = 0.3;
        let compressed = imp.compress_importances(&all).unwrap();
        assert_eq!(compressed.len(), 35);
        assert!((compressed[33] - 0.3).abs() < 1e-12);
        assert!((compressed[34] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_design_rows() {
        let mut imp = PredictorImpl::new(&[], vec!["c".to_string()], vec!["n".to_string()]);
        let cat = vec![Feature::new("c", vec![0, 1, 0])];
        imp.fit_encodings(&cat);
        let num = vec![Feature::new("n", vec![1.0, 2.0, 3.0])];
        let rows = imp.make_design_rows(&cat, &num).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![1.0, 1.0, 0.0]);
        assert_eq!(rows[1], vec![2.0, 0.0, 1.0]);
    }
}
