//! Module containing the trait [`Coefficients`] shared by both kinds of coefficient tables and
//! the enum [`CoeffGrid`] that holds either one of them.

use super::convolutions::ConvolveOptions;
use super::error::{Axis, Error, Result, check_index, check_len};
use super::fix_scale::FixScaleCoeffs;
use super::flex_scale::FlexScaleCoeffs;
use super::order::Order;
use super::subproc::{FlavorDensities, SubprocessDef};
use enum_dispatch::enum_dispatch;
use itertools::Itertools;
use ndarray::{Array3, ArrayView5};
use serde::{Deserialize, Serialize};

/// Enum which lists all possible coefficient tables.
#[enum_dispatch(Coefficients)]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum CoeffGrid {
    /// Table computed at fixed renormalization and factorization scale, with a single scale
    /// axis.
    FixScaleCoeffs,
    /// Table with two independent scale axes, allowing to vary the renormalization and
    /// factorization scales after the fact.
    FlexScaleCoeffs,
}

/// Renormalization and factorization scale, both squared, belonging to one (flattened) scale
/// index of a coefficient table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalePoint {
    /// Squared renormalization scale.
    pub mur2: f64,
    /// Squared factorization scale.
    pub muf2: f64,
}

/// Trait each coefficient table must implement. All accessors taking a bin index fail with
/// [`Error::IndexOutOfRange`] if the bin does not exist.
#[enum_dispatch]
pub trait Coefficients {
    /// Return the number of observable bins.
    fn bins(&self) -> usize;

    /// Return the number of hadrons in the initial state, which is either one or two.
    fn npdf(&self) -> usize;

    /// Return the number of momentum-fraction nodes of the first parton in `bin`.
    ///
    /// # Errors
    ///
    /// Returns an error if `bin` is out of range.
    fn node_count_x1(&self, bin: usize) -> Result<usize> {
        Ok(self.x_nodes1(bin)?.len())
    }

    /// Return the number of momentum-fraction nodes of the second parton in `bin`, which is zero
    /// for tables with a single hadron. The x2 axis of the coefficient array still has length
    /// one in that case, so its extent is always `max(node_count_x2, 1)`.
    ///
    /// # Errors
    ///
    /// Returns an error if `bin` is out of range.
    fn node_count_x2(&self, bin: usize) -> Result<usize> {
        Ok(self.x_nodes2(bin)?.len())
    }

    /// Return the momentum-fraction nodes of the first parton in `bin`.
    ///
    /// # Errors
    ///
    /// Returns an error if `bin` is out of range.
    fn x_nodes1(&self, bin: usize) -> Result<&[f64]>;

    /// Return the momentum-fraction nodes of the second parton in `bin`. The slice is empty for
    /// tables with a single hadron.
    ///
    /// # Errors
    ///
    /// Returns an error if `bin` is out of range.
    fn x_nodes2(&self, bin: usize) -> Result<&[f64]>;

    /// Return the number of independent scale axes: one for fixed-scale tables, two for
    /// flexible-scale tables.
    fn scale_variables(&self) -> usize;

    /// Return the scale nodes of `bin` for the scale axis `scale_variable`.
    ///
    /// # Errors
    ///
    /// Returns an error if `bin` or `scale_variable` is out of range.
    fn scale_nodes(&self, bin: usize, scale_variable: usize) -> Result<&[f64]>;

    /// Return the number of flattened scale indices of `bin`, which is the product of the number
    /// of nodes of each scale axis.
    ///
    /// # Errors
    ///
    /// Returns an error if `bin` is out of range.
    fn scale_count(&self, bin: usize) -> Result<usize> {
        (0..self.scale_variables())
            .map(|scale_variable| Ok(self.scale_nodes(bin, scale_variable)?.len()))
            .product()
    }

    /// Return the coefficient at the given indices. For flexible-scale tables `iscale` is the
    /// flattened index `is1 * n2 + is2`, where `n2` is the number of nodes of the second scale
    /// axis. The extent of the x2 axis is `max(node_count_x2, 1)`, so for tables with a single
    /// hadron `ix2 = 0` is valid and addresses the pointlike second side.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if any index exceeds the extent of its axis.
    fn sigma_tilde(
        &self,
        bin: usize,
        ix1: usize,
        ix2: usize,
        iscale: usize,
        isubproc: usize,
        iorder: usize,
    ) -> Result<f64> {
        let sigma = self.sigma_array(bin)?;
        let shape = sigma.shape();

        check_index(Axis::X1, ix1, shape[0])?;
        check_index(Axis::X2, ix2, shape[1])?;
        check_index(Axis::Scale, iscale, shape[2])?;
        check_index(Axis::Subprocess, isubproc, shape[3])?;
        check_index(Axis::Order, iorder, shape[4])?;

        Ok(sigma[[ix1, ix2, iscale, isubproc, iorder]])
    }

    /// Return the coefficients of `bin` as an array with the axes x1, x2, (flattened) scale,
    /// subprocess and order.
    ///
    /// # Errors
    ///
    /// Returns an error if `bin` is out of range.
    fn sigma_array(&self, bin: usize) -> Result<ArrayView5<'_, f64>>;

    /// Return the number of subprocess channels of `bin`.
    ///
    /// # Errors
    ///
    /// Returns an error if `bin` is out of range.
    fn subprocess_count(&self, bin: usize) -> Result<usize> {
        Ok(self.subprocess_definition(bin)?.len())
    }

    /// Return the subprocess definition of `bin`.
    ///
    /// # Errors
    ///
    /// Returns an error if `bin` is out of range.
    fn subprocess_definition(&self, bin: usize) -> Result<&SubprocessDef>;

    /// Return the entries of the order axis.
    fn orders(&self) -> &[Order];

    /// Return the normalization of the coefficients.
    fn normalization(&self) -> &Normalization;

    /// Return the renormalization and factorization scales for every flattened scale index of
    /// `bin`, using the scale factors in `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if `bin` is out of range or if the table does not support the requested
    /// scale factors.
    fn scale_points(&self, bin: usize, options: &ConvolveOptions) -> Result<Vec<ScalePoint>>;
}

impl CoeffGrid {
    /// Compute the PDF linear combinations of `bin` for every pair of momentum-fraction nodes.
    /// The densities `pdfs_x1` and `pdfs_x2` must be given for each node of the first and second
    /// parton, respectively; for tables with a single hadron `pdfs_x2` must be empty. The returned
    /// array has the axes x1, x2 and subprocess.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the number of densities does not match the number
    /// of nodes, [`Error::MissingFlavor`] if a required flavor is missing and
    /// [`Error::IndexOutOfRange`] if `bin` is out of range.
    pub fn pdf_linear_combinations(
        &self,
        bin: usize,
        pdfs_x1: &[FlavorDensities],
        pdfs_x2: &[FlavorDensities],
        pdf2_is_antiparticle: bool,
    ) -> Result<Array3<f64>> {
        check_len("x1 densities", self.node_count_x1(bin)?, pdfs_x1.len())?;
        check_len("x2 densities", self.node_count_x2(bin)?, pdfs_x2.len())?;

        self.subprocess_definition(bin)?
            .combine_nodes(pdfs_x1, pdfs_x2, pdf2_is_antiparticle)
    }
}

/// Normalization of the coefficients of a table: they must be divided by the number of events
/// `nevt` the table was filled with and are given in units of `10^-xsect_units` barn.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Normalization {
    /// Number of events the coefficients must be divided by.
    pub nevt: f64,
    /// Negative power of ten of the unit of the coefficients in barn, for instance `12` for pb.
    pub xsect_units: i32,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            nevt: 1.0,
            xsect_units: 12,
        }
    }
}

impl Normalization {
    /// Return the factor the coefficients must be multiplied with to obtain cross sections in
    /// units of `10^-publication_units` barn.
    #[must_use]
    pub fn factor(&self, publication_units: i32) -> f64 {
        10.0_f64.powi(publication_units - self.xsect_units) / self.nevt
    }
}

/// Momentum-fraction nodes of one bin.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "XNodesData")]
pub struct XNodes {
    x1: Vec<f64>,
    x2: Vec<f64>,
}

#[derive(Deserialize)]
struct XNodesData {
    x1: Vec<f64>,
    #[serde(default)]
    x2: Vec<f64>,
}

impl TryFrom<XNodesData> for XNodes {
    type Error = Error;

    fn try_from(data: XNodesData) -> Result<Self> {
        if data.x2.is_empty() {
            Self::single(data.x1)
        } else {
            Self::new(data.x1, data.x2)
        }
    }
}

impl XNodes {
    /// Constructor for tables with two hadrons.
    ///
    /// # Errors
    ///
    /// Returns an error if either set of nodes is empty or not strictly increasing.
    pub fn new(x1: Vec<f64>, x2: Vec<f64>) -> Result<Self> {
        check_nodes("x1", &x1)?;
        check_nodes("x2", &x2)?;

        Ok(Self { x1, x2 })
    }

    /// Constructor for tables with a single hadron.
    ///
    /// # Errors
    ///
    /// Returns an error if the nodes are empty or not strictly increasing.
    pub fn single(x1: Vec<f64>) -> Result<Self> {
        check_nodes("x1", &x1)?;

        Ok(Self { x1, x2: Vec::new() })
    }

    /// Return the nodes of the first parton.
    #[must_use]
    pub fn x1(&self) -> &[f64] {
        &self.x1
    }

    /// Return the nodes of the second parton; empty for tables with a single hadron.
    #[must_use]
    pub fn x2(&self) -> &[f64] {
        &self.x2
    }

    /// Return the number of hadrons these nodes are for.
    #[must_use]
    pub fn npdf(&self) -> usize {
        if self.x2.is_empty() { 1 } else { 2 }
    }

    /// Return the expected lengths of the x1 and x2 axes of a coefficient array.
    pub(crate) fn extents(&self) -> (usize, usize) {
        (self.x1.len(), self.x2.len().max(1))
    }
}

/// Check that `nodes` are non-empty and strictly increasing.
pub(crate) fn check_nodes(what: &str, nodes: &[f64]) -> Result<()> {
    if nodes.is_empty() {
        return Err(Error::General(format!("the {what} nodes are empty")));
    }

    if let Some((index, _)) = nodes
        .iter()
        .tuple_windows()
        .find_position(|(lhs, rhs)| lhs.partial_cmp(rhs) != Some(std::cmp::Ordering::Less))
    {
        return Err(Error::General(format!(
            "the {what} nodes are not strictly increasing at index {}",
            index + 1
        )));
    }

    Ok(())
}

/// Check the parts of coefficient tables that are common to both kinds.
pub(crate) fn check_common(
    bins: usize,
    npdf: impl Iterator<Item = usize>,
    subprocesses: &SubprocessDef,
    orders: &[Order],
) -> Result<usize> {
    if bins == 0 {
        return Err(Error::General("a table needs at least one bin".to_owned()));
    }

    if subprocesses.is_empty() {
        return Err(Error::General(
            "a table needs at least one subprocess".to_owned(),
        ));
    }

    if orders.is_empty() {
        return Err(Error::General("a table needs at least one order".to_owned()));
    }

    let npdf: Vec<_> = npdf.dedup().collect();

    if let [npdf] = npdf[..] {
        Ok(npdf)
    } else {
        Err(Error::General(
            "the bins of a table must all have the same number of hadrons".to_owned(),
        ))
    }
}
