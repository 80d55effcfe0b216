//! Feature Matrix

use crate::error::ValidationError;
use ndarray::Array2;

/// Dense samples x features matrix handed to the model
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Row-major feature values
    values: Array2<f64>,
    /// Column names, set when the matrix was built from a keyed object
    feature_names: Option<Vec<String>>,
}

impl FeatureMatrix {
    /// Build a matrix from rows of equal, non-zero length
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ValidationError> {
        let n_rows = rows.len();
        let width = match rows.first() {
            Some(first) => first.len(),
            None => return Err(ValidationError::NoData),
        };

        if width == 0 {
            return Err(ValidationError::InvalidFormat(
                "rows must contain at least one feature".to_string(),
            ));
        }

        let mut flat = Vec::with_capacity(n_rows * width);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != width {
                return Err(ValidationError::RaggedRows {
                    row,
                    expected: width,
                    actual: values.len(),
                });
            }
            flat.extend(values);
        }

        let values = Array2::from_shape_vec((n_rows, width), flat)
            .map_err(|e| ValidationError::InvalidFormat(e.to_string()))?;

        Ok(Self {
            values,
            feature_names: None,
        })
    }

    /// Build a one-row matrix
    pub fn single_row(row: Vec<f64>) -> Result<Self, ValidationError> {
        Self::from_rows(vec![row])
    }

    /// Attach column names
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    /// Number of samples
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of features per sample
    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Underlying array
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Column names, if the payload named its features
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Values in row-major order
    pub fn to_row_major(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Values in row-major order, narrowed to `f32`
    pub fn to_row_major_f32(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32).collect()
    }

    /// Copy of a single row
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        (index < self.nrows()).then(|| self.values.row(index).to_vec())
    }
}
