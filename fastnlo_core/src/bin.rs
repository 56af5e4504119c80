//! Module that contains the geometry of the observable bins.

use super::error::{Axis, Result, check_index};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Error type that is returned by the constructors of [`BinGeometry`].
#[derive(Debug, Error, PartialEq)]
pub enum BinGeometryError {
    /// Returned if the number of limits is not a multiple of the number of dimensions, or if
    /// there are no dimensions at all.
    #[error(
        "could not determine the number of bins from {limits_len} limits and {dimensions} dimensions"
    )]
    DimensionUnknown {
        /// Number of `(low, high)` tuples given.
        limits_len: usize,
        /// Number of dimensions given.
        dimensions: usize,
    },
    /// Returned if an interval is empty or inverted.
    #[error("bin {bin} has an empty interval in dimension {dimension}: [{low}, {high})")]
    EmptyInterval {
        /// Index of the bin.
        bin: usize,
        /// Index of the dimension.
        dimension: usize,
        /// Lower limit.
        low: f64,
        /// Upper limit.
        high: f64,
    },
    /// Returned if bin `bin` overlaps with or comes before the previous bin.
    #[error("bin {bin} overlaps with or comes before the previous bin")]
    NotIncreasing {
        /// Index of the offending bin.
        bin: usize,
    },
    /// Returned if the number of labels is different from the number of dimensions.
    #[error("expected {dimensions} labels, but found {labels}")]
    LabelCount {
        /// Number of dimensions.
        dimensions: usize,
        /// Number of labels given.
        labels: usize,
    },
}

/// Boundaries of the observable bins. Each bin is a product of half-open intervals `[low, high)`,
/// one for each kinematic dimension.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "BinGeometryData")]
pub struct BinGeometry {
    dimensions: usize,
    limits: Vec<(f64, f64)>,
    labels: Vec<String>,
}

#[derive(Deserialize)]
struct BinGeometryData {
    dimensions: usize,
    limits: Vec<(f64, f64)>,
    #[serde(default)]
    labels: Vec<String>,
}

impl TryFrom<BinGeometryData> for BinGeometry {
    type Error = BinGeometryError;

    fn try_from(data: BinGeometryData) -> std::result::Result<Self, Self::Error> {
        let bins = Self::new(data.dimensions, data.limits)?;

        if data.labels.is_empty() {
            Ok(bins)
        } else {
            bins.with_labels(data.labels)
        }
    }
}

impl BinGeometry {
    /// Constructor. The parameter `limits` contains the `(low, high)` tuples of all bins, the
    /// tuples of each bin for all `dimensions` one after another.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of `limits` is not a multiple of `dimensions`, if an
    /// interval is empty, or if the bins are not ordered. Two consecutive bins are ordered if they
    /// share the intervals of the leading dimensions and, in the first dimension where they
    /// differ, the upper limit of the first bin is not larger than the lower limit of the second.
    /// Ordered bins never overlap.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fastnlo_core::bin::BinGeometry;
    ///
    /// // two bins in the first dimension, each with two bins in the second dimension
    /// let bins = BinGeometry::new(
    ///     2,
    ///     vec![
    ///         (0.0, 0.5), (100.0, 200.0),
    ///         (0.0, 0.5), (200.0, 300.0),
    ///         (0.5, 1.0), (100.0, 200.0),
    ///         (0.5, 1.0), (200.0, 300.0),
    ///     ],
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(bins.len(), 4);
    /// assert_eq!(bins.bounds_of(2, 0).unwrap(), (0.5, 1.0));
    /// assert_eq!(bins.width(3).unwrap(), 50.0);
    /// ```
    pub fn new(
        dimensions: usize,
        limits: Vec<(f64, f64)>,
    ) -> std::result::Result<Self, BinGeometryError> {
        if dimensions == 0 || limits.is_empty() || limits.len() % dimensions != 0 {
            return Err(BinGeometryError::DimensionUnknown {
                limits_len: limits.len(),
                dimensions,
            });
        }

        for (bin, intervals) in limits.chunks_exact(dimensions).enumerate() {
            if let Some((dimension, &(low, high))) = intervals
                .iter()
                .find_position(|(low, high)| low.partial_cmp(high) != Some(Ordering::Less))
            {
                return Err(BinGeometryError::EmptyInterval {
                    bin,
                    dimension,
                    low,
                    high,
                });
            }
        }

        if let Some((bin, _)) = limits
            .chunks_exact(dimensions)
            .tuple_windows()
            .find_position(|(lhs, rhs)| !Self::ordered(lhs, rhs))
        {
            return Err(BinGeometryError::NotIncreasing { bin: bin + 1 });
        }

        Ok(Self {
            dimensions,
            limits,
            labels: Vec::new(),
        })
    }

    fn ordered(lhs: &[(f64, f64)], rhs: &[(f64, f64)]) -> bool {
        lhs.iter()
            .zip(rhs)
            .find(|(lhs, rhs)| lhs != rhs)
            .is_some_and(|(&(_, high), &(low, _))| high <= low)
    }

    /// Construct a one-dimensional geometry of contiguous bins from the `limits`, the left limit of
    /// the first bin followed by the right limits of all bins.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than two limits or if they are not strictly increasing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fastnlo_core::bin::BinGeometry;
    ///
    /// let bins = BinGeometry::from_limits(&[0.0, 0.5, 2.5]).unwrap();
    ///
    /// assert_eq!(bins.len(), 2);
    /// assert_eq!(bins.normalizations(), [0.5, 2.0]);
    /// ```
    pub fn from_limits(limits: &[f64]) -> std::result::Result<Self, BinGeometryError> {
        Self::new(1, limits.iter().copied().tuple_windows().collect())
    }

    /// Attach a label to each dimension.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of `labels` is not equal to [`Self::dimensions`].
    pub fn with_labels(
        mut self,
        labels: Vec<String>,
    ) -> std::result::Result<Self, BinGeometryError> {
        if labels.len() != self.dimensions {
            return Err(BinGeometryError::LabelCount {
                dimensions: self.dimensions,
                labels: labels.len(),
            });
        }

        self.labels = labels;

        Ok(self)
    }

    /// Return the number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.limits.len() / self.dimensions
    }

    /// Return `true` if there are no bins. This can never be the case for a successfully
    /// constructed object.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    /// Return the number of dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Return the labels of each dimension. If no labels were set the slice is empty.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Return the lower and upper boundary of `bin` in `dimension`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if either `bin` or `dimension` is out of range.
    ///
    /// [`Error::IndexOutOfRange`]: super::error::Error::IndexOutOfRange
    pub fn bounds_of(&self, bin: usize, dimension: usize) -> Result<(f64, f64)> {
        check_index(Axis::Bin, bin, self.len())?;
        check_index(Axis::Dimension, dimension, self.dimensions)?;

        Ok(self.limits[bin * self.dimensions + dimension])
    }

    /// Return all lower limits for `dimension`. If the dimension does not exist, an empty vector
    /// is returned.
    #[must_use]
    pub fn left(&self, dimension: usize) -> Vec<f64> {
        self.column(dimension).map(|&(low, _)| low).collect()
    }

    /// Return all upper limits for `dimension`. If the dimension does not exist, an empty vector
    /// is returned.
    #[must_use]
    pub fn right(&self, dimension: usize) -> Vec<f64> {
        self.column(dimension).map(|&(_, high)| high).collect()
    }

    fn column(&self, dimension: usize) -> impl Iterator<Item = &(f64, f64)> {
        self.limits
            .iter()
            .skip(dimension)
            .step_by(self.dimensions)
            .take(if dimension < self.dimensions {
                self.len()
            } else {
                0
            })
    }

    /// Return the width of `bin`, which is the product of the widths of its intervals in all
    /// dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `bin` is out of range.
    ///
    /// [`Error::IndexOutOfRange`]: super::error::Error::IndexOutOfRange
    pub fn width(&self, bin: usize) -> Result<f64> {
        check_index(Axis::Bin, bin, self.len())?;

        Ok(self.bin_width(bin))
    }

    fn bin_width(&self, bin: usize) -> f64 {
        self.limits[bin * self.dimensions..(bin + 1) * self.dimensions]
            .iter()
            .map(|(low, high)| high - low)
            .product()
    }

    /// Return the widths of all bins.
    #[must_use]
    pub fn normalizations(&self) -> Vec<f64> {
        (0..self.len()).map(|bin| self.bin_width(bin)).collect()
    }

    /// Return the index of the bin that contains the point `values`, which must have one entry
    /// per dimension. If the point lies outside of all bins, or if the number of `values` does not
    /// match the number of dimensions, `None` is returned.
    #[must_use]
    pub fn find_bin(&self, values: &[f64]) -> Option<usize> {
        if values.len() != self.dimensions {
            return None;
        }

        self.limits.chunks_exact(self.dimensions).position(|intervals| {
            intervals
                .iter()
                .zip(values)
                .all(|(&(low, high), &value)| low <= value && value < high)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn one_dimensional() {
        let bins = BinGeometry::from_limits(&[0.0, 0.125, 0.25, 0.375, 0.5]).unwrap();

        assert_eq!(bins.len(), 4);
        assert!(!bins.is_empty());
        assert_eq!(bins.dimensions(), 1);
        assert_eq!(bins.left(0), [0.0, 0.125, 0.25, 0.375]);
        assert_eq!(bins.right(0), [0.125, 0.25, 0.375, 0.5]);
        assert_eq!(bins.normalizations(), [0.125; 4]);
        assert_eq!(bins.bounds_of(1, 0).unwrap(), (0.125, 0.25));

        assert!(bins.left(1).is_empty());
        assert!(bins.right(1).is_empty());
    }

    #[test]
    fn three_dimensional() {
        let bins = BinGeometry::new(
            3,
            vec![
                (0.0, 0.5),
                (0.25, 0.75),
                (1.0, 2.0),
                (0.5, 1.0),
                (0.75, 1.0),
                (2.0, 5.0),
                (1.0, 2.0),
                (1.75, 2.0),
                (5.0, 5.5),
                (2.5, 3.0),
                (2.0, 2.5),
                (6.0, 8.0),
            ],
        )
        .unwrap()
        .with_labels(vec!["y".to_owned(), "eta".to_owned(), "pT".to_owned()])
        .unwrap();

        assert_eq!(bins.len(), 4);
        assert_eq!(bins.dimensions(), 3);
        assert_eq!(bins.labels(), ["y", "eta", "pT"]);
        assert_eq!(bins.left(0), [0.0, 0.5, 1.0, 2.5]);
        assert_eq!(bins.left(1), [0.25, 0.75, 1.75, 2.0]);
        assert_eq!(bins.left(2), [1.0, 2.0, 5.0, 6.0]);
        assert_eq!(bins.right(0), [0.5, 1.0, 2.0, 3.0]);
        assert_eq!(bins.right(1), [0.75, 1.0, 2.0, 2.5]);
        assert_eq!(bins.right(2), [2.0, 5.0, 5.5, 8.0]);
        assert_eq!(bins.normalizations(), [0.25, 0.375, 0.125, 0.5]);

        assert!(bins.left(3).is_empty());
    }

    #[test]
    fn bounds_out_of_range() {
        let bins = BinGeometry::from_limits(&[0.0, 1.0, 2.0]).unwrap();

        assert!(matches!(
            bins.bounds_of(2, 0),
            Err(Error::IndexOutOfRange {
                axis: Axis::Bin,
                index: 2,
                extent: 2
            })
        ));
        assert!(matches!(
            bins.bounds_of(0, 1),
            Err(Error::IndexOutOfRange {
                axis: Axis::Dimension,
                index: 1,
                extent: 1
            })
        ));
        assert!(matches!(
            bins.width(5),
            Err(Error::IndexOutOfRange {
                axis: Axis::Bin,
                ..
            })
        ));
    }

    #[test]
    fn invalid_geometries() {
        assert_eq!(
            BinGeometry::new(2, vec![(0.0, 1.0); 3]),
            Err(BinGeometryError::DimensionUnknown {
                limits_len: 3,
                dimensions: 2
            })
        );
        assert_eq!(
            BinGeometry::new(0, vec![]),
            Err(BinGeometryError::DimensionUnknown {
                limits_len: 0,
                dimensions: 0
            })
        );
        assert_eq!(
            BinGeometry::from_limits(&[0.0, 1.0, 1.0]),
            Err(BinGeometryError::EmptyInterval {
                bin: 1,
                dimension: 0,
                low: 1.0,
                high: 1.0
            })
        );
        assert_eq!(
            BinGeometry::new(1, vec![(1.0, 2.0), (0.0, 1.0)]),
            Err(BinGeometryError::NotIncreasing { bin: 1 })
        );
        // nested
        assert_eq!(
            BinGeometry::new(1, vec![(0.0, 3.0), (1.0, 2.0)]),
            Err(BinGeometryError::NotIncreasing { bin: 1 })
        );
        // overlapping
        assert_eq!(
            BinGeometry::new(1, vec![(0.0, 2.0), (1.0, 3.0)]),
            Err(BinGeometryError::NotIncreasing { bin: 1 })
        );
        assert_eq!(
            BinGeometry::new(1, vec![(0.0, 1.0), (1.0, 2.0), (1.0, 2.0)]),
            Err(BinGeometryError::NotIncreasing { bin: 2 })
        );
        assert_eq!(
            BinGeometry::new(2, vec![(0.0, 1.0), (0.0, 10.0), (0.5, 2.0), (0.0, 10.0)]),
            Err(BinGeometryError::NotIncreasing { bin: 1 })
        );
        assert_eq!(
            BinGeometry::new(2, vec![(0.0, 1.0), (0.0, 10.0), (0.0, 1.0), (5.0, 20.0)]),
            Err(BinGeometryError::NotIncreasing { bin: 1 })
        );
        assert_eq!(
            BinGeometry::from_limits(&[0.0])
                .unwrap_err()
                .to_string(),
            "could not determine the number of bins from 0 limits and 1 dimensions"
        );
        assert_eq!(
            BinGeometry::from_limits(&[0.0, 1.0])
                .unwrap()
                .with_labels(vec![]),
            Err(BinGeometryError::LabelCount {
                dimensions: 1,
                labels: 0
            })
        );
    }

    #[test]
    fn deserialization_is_validated() {
        let bins = BinGeometry::from_limits(&[0.0, 1.0, 3.0])
            .unwrap()
            .with_labels(vec!["pT".to_owned()])
            .unwrap();
        let yaml = serde_yaml::to_string(&bins).unwrap();

        assert_eq!(serde_yaml::from_str::<BinGeometry>(&yaml).unwrap(), bins);

        let err = serde_yaml::from_str::<BinGeometry>("dimensions: 0\nlimits: []\nlabels: []\n")
            .unwrap_err();

        assert!(err.to_string().contains("from 0 limits and 0 dimensions"));

        let err = serde_yaml::from_str::<BinGeometry>(
            "dimensions: 1\nlimits: [[0.0, 2.0], [1.0, 3.0]]\n",
        )
        .unwrap_err();

        assert!(err.to_string().contains("bin 1 overlaps with or comes before the previous bin"));
    }

    #[test]
    fn find_bin() {
        let bins = BinGeometry::from_limits(&[0.0, 0.1, 0.3, 0.6, 1.0]).unwrap();

        assert_eq!(bins.find_bin(&[-1.0]), None);
        assert_eq!(bins.find_bin(&[0.0]), Some(0));
        assert_eq!(bins.find_bin(&[0.05]), Some(0));
        assert_eq!(bins.find_bin(&[0.1]), Some(1));
        assert_eq!(bins.find_bin(&[0.4]), Some(2));
        assert_eq!(bins.find_bin(&[0.9]), Some(3));
        assert_eq!(bins.find_bin(&[1.0]), None);
        assert_eq!(bins.find_bin(&[0.5, 0.5]), None);

        let bins = BinGeometry::new(
            2,
            vec![
                (0.0, 1.0),
                (10.0, 20.0),
                (0.0, 1.0),
                (20.0, 40.0),
                (1.0, 2.0),
                (10.0, 40.0),
            ],
        )
        .unwrap();

        assert_eq!(bins.find_bin(&[0.5, 15.0]), Some(0));
        assert_eq!(bins.find_bin(&[0.5, 25.0]), Some(1));
        assert_eq!(bins.find_bin(&[1.5, 25.0]), Some(2));
        assert_eq!(bins.find_bin(&[1.5, 45.0]), None);
    }
}
