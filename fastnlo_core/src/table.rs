//! Module containing [`Table`], which reconstructs cross sections from a coefficient table.

use super::bin::BinGeometry;
use super::coeff::{CoeffGrid, Coefficients, ScalePoint};
use super::convolutions::ConvolutionInputs;
use super::error::{Axis, Error, Result, check_index, check_len};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A coefficient table together with the geometry of its bins and metadata. This is the object
/// cross sections are computed from.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(try_from = "TableData")]
pub struct Table {
    bins: BinGeometry,
    coeffs: CoeffGrid,
    publication_units: i32,
    metadata: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct TableData {
    bins: BinGeometry,
    coeffs: CoeffGrid,
    publication_units: i32,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl TryFrom<TableData> for Table {
    type Error = Error;

    fn try_from(data: TableData) -> Result<Self> {
        let mut table =
            Self::new(data.bins, data.coeffs)?.with_publication_units(data.publication_units);
        table.metadata = data.metadata;

        Ok(table)
    }
}

impl Table {
    /// Constructor. Cross sections are returned in picobarn unless changed with
    /// [`Self::with_publication_units`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `bins` and `coeffs` have a different number of
    /// bins.
    ///
    /// [`Error::DimensionMismatch`]: super::error::Error::DimensionMismatch
    pub fn new(bins: BinGeometry, coeffs: CoeffGrid) -> Result<Self> {
        check_len("bins in the coefficient table", bins.len(), coeffs.bins())?;

        Ok(Self {
            bins,
            coeffs,
            publication_units: 12,
            metadata: BTreeMap::new(),
        })
    }

    /// Return cross sections in units of `10^-publication_units` barn.
    #[must_use]
    pub const fn with_publication_units(mut self, publication_units: i32) -> Self {
        self.publication_units = publication_units;
        self
    }

    /// Return the geometry of the bins.
    #[must_use]
    pub const fn bins(&self) -> &BinGeometry {
        &self.bins
    }

    /// Return the coefficient table.
    #[must_use]
    pub const fn coeffs(&self) -> &CoeffGrid {
        &self.coeffs
    }

    /// Return the negative power of ten of the unit, in barn, cross sections are returned in.
    #[must_use]
    pub const fn publication_units(&self) -> i32 {
        self.publication_units
    }

    /// Set a metadata key-value pair.
    pub fn set_key_value(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_owned(), value.to_owned());
    }

    /// Return the value stored for `key`, if there is one.
    #[must_use]
    pub fn key_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Return all metadata.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Compute the cross section of `bin`. If `normalize_by_bin_width` is `true` the result is
    /// divided by the width of the bin.
    ///
    /// # Errors
    ///
    /// Returns an error if `bin` is out of range, if a PDF set lacks a flavor needed by the
    /// subprocesses or if the options are not supported by the coefficient table.
    pub fn cross_section(
        &self,
        bin: usize,
        normalize_by_bin_width: bool,
        inputs: &ConvolutionInputs,
    ) -> Result<f64> {
        let mut total = 0.0;
        self.reduce(bin, inputs, |_, term| total += term)?;

        self.rescale(bin, total, normalize_by_bin_width)
    }

    /// Compute the cross sections of all bins.
    ///
    /// # Errors
    ///
    /// Returns the first error [`Self::cross_section`] returns.
    pub fn cross_section_all(
        &self,
        normalize_by_bin_width: bool,
        inputs: &ConvolutionInputs,
    ) -> Result<Vec<f64>> {
        log::debug!("computing cross sections of {} bins", self.bins.len());

        (0..self.bins.len())
            .map(|bin| self.cross_section(bin, normalize_by_bin_width, inputs))
            .collect()
    }

    /// Compute the cross sections of all bins in parallel. The results are identical to the ones
    /// of [`Self::cross_section_all`].
    ///
    /// # Errors
    ///
    /// Returns an error if [`Self::cross_section`] fails for any bin.
    pub fn par_cross_section_all(
        &self,
        normalize_by_bin_width: bool,
        inputs: &ConvolutionInputs,
    ) -> Result<Vec<f64>> {
        log::debug!(
            "computing cross sections of {} bins in parallel",
            self.bins.len()
        );

        (0..self.bins.len())
            .into_par_iter()
            .map(|bin| self.cross_section(bin, normalize_by_bin_width, inputs))
            .collect()
    }

    /// Compute the contribution of each subprocess to the cross section of `bin`.
    ///
    /// # Errors
    ///
    /// See [`Self::cross_section`].
    pub fn subprocess_cross_sections(
        &self,
        bin: usize,
        normalize_by_bin_width: bool,
        inputs: &ConvolutionInputs,
    ) -> Result<Vec<f64>> {
        let mut totals = vec![0.0; self.coeffs.subprocess_count(bin)?];
        self.reduce(bin, inputs, |isubproc, term| totals[isubproc] += term)?;

        totals
            .into_iter()
            .map(|total| self.rescale(bin, total, normalize_by_bin_width))
            .collect()
    }

    fn rescale(&self, bin: usize, value: f64, normalize_by_bin_width: bool) -> Result<f64> {
        let value = value
            * self
                .coeffs
                .normalization()
                .factor(self.publication_units);

        if normalize_by_bin_width {
            Ok(value / self.bins.width(bin)?)
        } else {
            Ok(value)
        }
    }

    // calls `sink` with the subprocess index and the value of every term of the sum over scale
    // nodes, subprocesses, x1 nodes, x2 nodes and selected orders, in this order
    fn reduce(
        &self,
        bin: usize,
        inputs: &ConvolutionInputs,
        mut sink: impl FnMut(usize, f64),
    ) -> Result<()> {
        check_index(Axis::Bin, bin, self.bins.len())?;

        let coeffs = &self.coeffs;
        let options = inputs.options();
        let subprocesses = coeffs.subprocess_definition(bin)?;
        let npdf = coeffs.npdf();

        inputs.check_flavors(subprocesses, npdf)?;

        let selected: Vec<_> = coeffs
            .orders()
            .iter()
            .zip(options.selected_orders(coeffs.orders())?)
            .enumerate()
            .filter_map(|(index, (&order, selected))| selected.then_some((index, order)))
            .collect();
        let scale_points = coeffs.scale_points(bin, options)?;
        let sigma = coeffs.sigma_array(bin)?;
        let (nx1, nx2, _, nsubproc, _) = sigma.dim();
        let x_nodes1 = coeffs.x_nodes1(bin)?;
        let x_nodes2 = coeffs.x_nodes2(bin)?;
        let anti = options.pdf2_is_antiparticle();
        let (flavors1, flavors2) = subprocesses.required_flavors(anti);
        let coupling = inputs.coupling();
        let mut cache = inputs.cache();

        log::trace!(
            "bin {bin}: {} scale points, {nx1}x{nx2} x nodes, {} orders",
            scale_points.len(),
            selected.len()
        );

        for (iscale, &ScalePoint { mur2, muf2 }) in scale_points.iter().enumerate() {
            let pdfs_x1 = cache.densities(0, &flavors1, x_nodes1, muf2);
            let pdfs_x2 = if npdf > 1 {
                cache.densities(1, &flavors2, x_nodes2, muf2)
            } else {
                Vec::new()
            };
            let lumis = coeffs.pdf_linear_combinations(bin, &pdfs_x1, &pdfs_x2, anti)?;
            let factors: Vec<_> = selected
                .iter()
                .map(|&(_, order)| {
                    let mut factor = coupling.coupling_power(mur2, order.alphas);

                    if order.logxir > 0 {
                        factor *= mur2.ln().powi(order.logxir.into());
                    }

                    if order.logxif > 0 {
                        factor *= muf2.ln().powi(order.logxif.into());
                    }

                    factor
                })
                .collect();

            for isubproc in 0..nsubproc {
                for ix1 in 0..nx1 {
                    for ix2 in 0..nx2 {
                        let lumi = lumis[[ix1, ix2, isubproc]];

                        for (&(iorder, _), &factor) in selected.iter().zip(&factors) {
                            sink(
                                isubproc,
                                sigma[[ix1, ix2, iscale, isubproc, iorder]] * lumi * factor,
                            );
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coeff::XNodes;
    use crate::convolutions::{AlphasTwoPi, ConvolveOptions, PdfFn};
    use crate::fix_scale::{FixScaleBin, FixScaleCoeffs};
    use crate::order::Order;
    use crate::subproc::{Channel, SubprocessDef};
    use ndarray::Array5;

    // one bin, one x node for each hadron, one scale node, one gluon-gluon channel
    fn gluon_table(sigma: f64, limits: &[f64]) -> Table {
        let bin = FixScaleBin::new(
            XNodes::new(vec![0.1], vec![0.2]).unwrap(),
            vec![10.0],
            Array5::from_elem((1, 1, 1, 1, 1), sigma),
        )
        .unwrap();
        let coeffs = FixScaleCoeffs::new(
            vec![bin],
            SubprocessDef::new(vec![Channel::new(vec![(21, 21)], false)]),
            vec![Order::new(0, 0, 0)],
            1.0,
        )
        .unwrap();

        Table::new(BinGeometry::from_limits(limits).unwrap(), coeffs.into()).unwrap()
    }

    #[test]
    fn end_to_end() {
        let table = gluon_table(4.0, &[0.0, 1.0]);
        let pdf1 = PdfFn::new(vec![21], |_, _, _| 2.0);
        let pdf2 = PdfFn::new(vec![21], |_, _, _| 1.0);
        let coupling = AlphasTwoPi::new(|_| 0.118);
        let inputs = ConvolutionInputs::new(&pdf1, &coupling).with_second_pdf(&pdf2);

        assert_eq!(table.cross_section(0, false, &inputs).unwrap(), 8.0);
        assert_eq!(table.subprocess_cross_sections(0, false, &inputs).unwrap(), [8.0]);
    }

    #[test]
    fn normalize_by_bin_width() {
        let table = gluon_table(4.0, &[1.0, 3.0]);
        let pdf = PdfFn::new(vec![21], |_, _, _| 1.0);
        let coupling = AlphasTwoPi::new(|_| 0.118);
        let inputs = ConvolutionInputs::new(&pdf, &coupling);

        let raw = table.cross_section(0, false, &inputs).unwrap();

        assert_eq!(raw, 4.0);
        assert_eq!(table.cross_section(0, true, &inputs).unwrap(), raw / 2.0);
    }

    #[test]
    fn publication_units() {
        let table = gluon_table(4.0, &[0.0, 1.0]).with_publication_units(15);
        let pdf = PdfFn::new(vec![21], |_, _, _| 1.0);
        let coupling = AlphasTwoPi::new(|_| 0.118);
        let inputs = ConvolutionInputs::new(&pdf, &coupling);

        assert_eq!(table.publication_units(), 15);
        assert_eq!(table.cross_section(0, false, &inputs).unwrap(), 4000.0);
    }

    #[test]
    fn errors() {
        let table = gluon_table(4.0, &[0.0, 1.0]);
        let pdf = PdfFn::new(vec![1], |_, _, _| 1.0);
        let coupling = AlphasTwoPi::new(|_| 0.118);
        let inputs = ConvolutionInputs::new(&pdf, &coupling);

        assert!(matches!(
            table.cross_section(0, false, &inputs),
            Err(Error::MissingFlavor { pid: 21 })
        ));
        assert!(matches!(
            table.cross_section(1, false, &inputs),
            Err(Error::IndexOutOfRange {
                axis: Axis::Bin,
                index: 1,
                extent: 1
            })
        ));

        let gluon = PdfFn::new(vec![21], |_, _, _| 1.0);
        let inputs = ConvolutionInputs::new(&gluon, &coupling)
            .with_options(ConvolveOptions::default().with_xmuf(2.0));

        assert!(matches!(
            table.cross_section_all(false, &inputs),
            Err(Error::General(_))
        ));
        assert!(matches!(
            table.par_cross_section_all(false, &inputs),
            Err(Error::General(_))
        ));
    }

    #[test]
    fn bin_count_mismatch() {
        let table = gluon_table(1.0, &[0.0, 1.0]);
        let coeffs = table.coeffs().clone();

        assert!(matches!(
            Table::new(BinGeometry::from_limits(&[0.0, 1.0, 2.0]).unwrap(), coeffs),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn metadata() {
        let mut table = gluon_table(1.0, &[0.0, 1.0]);

        assert_eq!(table.key_value("description"), None);

        table.set_key_value("description", "inclusive jets");
        table.set_key_value("units", "pb");

        assert_eq!(table.key_value("description"), Some("inclusive jets"));
        assert_eq!(
            table.metadata().keys().collect::<Vec<_>>(),
            ["description", "units"]
        );
    }

    #[test]
    fn deserialization_checks_bin_count() {
        let mut table = gluon_table(4.0, &[0.0, 1.0]).with_publication_units(15);
        table.set_key_value("units", "fb");

        let yaml = serde_yaml::to_string(&table).unwrap();
        let deserialized: Table = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(deserialized.bins(), table.bins());
        assert_eq!(deserialized.publication_units(), 15);
        assert_eq!(deserialized.key_value("units"), Some("fb"));

        let mut value = serde_yaml::to_value(&table).unwrap();
        value["bins"] = serde_yaml::to_value(BinGeometry::from_limits(&[0.0, 1.0, 2.0]).unwrap())
            .unwrap();

        let err = serde_yaml::from_value::<Table>(value).unwrap_err();

        assert!(err.to_string().contains("expected 2 bins in the coefficient table, but found 1"));
    }
}
