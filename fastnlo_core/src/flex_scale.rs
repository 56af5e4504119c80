//! Provides the [`FlexScaleCoeffs`] table.

use super::coeff::{self, Coefficients, Normalization, ScalePoint, XNodes};
use super::convolutions::ConvolveOptions;
use super::error::{Axis, Error, Result, check_index, check_len};
use super::order::Order;
use super::scales::Scales;
use super::subproc::SubprocessDef;
use itertools::Itertools;
use ndarray::{Array5, Array6, ArrayView5};
use serde::{Deserialize, Serialize};

/// Coefficients and nodes of one bin of a [`FlexScaleCoeffs`] table.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(try_from = "FlexScaleBinData")]
pub struct FlexScaleBin {
    x_nodes: XNodes,
    scale_nodes1: Vec<f64>,
    scale_nodes2: Vec<f64>,
    // the two scale axes are flattened into one with index `is1 * scale_nodes2.len() + is2`
    sigma: Array5<f64>,
}

#[derive(Deserialize)]
struct FlexScaleBinData {
    x_nodes: XNodes,
    scale_nodes1: Vec<f64>,
    scale_nodes2: Vec<f64>,
    sigma: Array5<f64>,
}

impl TryFrom<FlexScaleBinData> for FlexScaleBin {
    type Error = Error;

    fn try_from(data: FlexScaleBinData) -> Result<Self> {
        let (n1, n2) = (data.scale_nodes1.len(), data.scale_nodes2.len());
        let (s0, s1, s2, s3, s4) = data.sigma.dim();

        check_len("scale nodes in sigma-tilde", n1 * n2, s2)?;

        let sigma = data
            .sigma
            .into_shape_with_order((s0, s1, n1, n2, s3, s4))
            .map_err(|err| Error::General(err.to_string()))?;

        Self::new(data.x_nodes, data.scale_nodes1, data.scale_nodes2, sigma)
    }
}

impl FlexScaleBin {
    /// Constructor. The array `sigma` has the axes x1, x2, first scale, second scale, subprocess
    /// and order; the lengths of the first four axes must match the number of nodes. For tables
    /// with a single hadron the x2 axis has length one.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the scale node sets is empty or not strictly increasing, or if
    /// the shape of `sigma` does not match the nodes.
    pub fn new(
        x_nodes: XNodes,
        scale_nodes1: Vec<f64>,
        scale_nodes2: Vec<f64>,
        sigma: Array6<f64>,
    ) -> Result<Self> {
        coeff::check_nodes("first scale", &scale_nodes1)?;
        coeff::check_nodes("second scale", &scale_nodes2)?;

        let (nx1, nx2) = x_nodes.extents();
        let (s0, s1, s2, s3, s4, s5) = sigma.dim();

        check_len("x1 nodes in sigma-tilde", nx1, s0)?;
        check_len("x2 nodes in sigma-tilde", nx2, s1)?;
        check_len("first scale nodes in sigma-tilde", scale_nodes1.len(), s2)?;
        check_len("second scale nodes in sigma-tilde", scale_nodes2.len(), s3)?;

        let sigma = sigma
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order((s0, s1, s2 * s3, s4, s5))
            .map_err(|err| Error::General(err.to_string()))?;

        Ok(Self {
            x_nodes,
            scale_nodes1,
            scale_nodes2,
            sigma,
        })
    }

    /// Return the momentum-fraction nodes.
    #[must_use]
    pub const fn x_nodes(&self) -> &XNodes {
        &self.x_nodes
    }
}

/// Coefficient table with two independent scale axes. The renormalization and factorization
/// scales are computed from the nodes of both axes with the functional forms given by
/// [`Scales`], and the dependence on them is reconstructed from the logarithmic terms on the
/// order axis.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(try_from = "FlexScaleCoeffsData")]
pub struct FlexScaleCoeffs {
    bins: Vec<FlexScaleBin>,
    subprocesses: SubprocessDef,
    orders: Vec<Order>,
    npdf: usize,
    scales: Scales,
    normalization: Normalization,
}

// `npdf` is recomputed from the bins
#[derive(Deserialize)]
struct FlexScaleCoeffsData {
    bins: Vec<FlexScaleBin>,
    subprocesses: SubprocessDef,
    orders: Vec<Order>,
    #[serde(default)]
    scales: Scales,
    #[serde(default)]
    normalization: Normalization,
}

impl TryFrom<FlexScaleCoeffsData> for FlexScaleCoeffs {
    type Error = Error;

    fn try_from(data: FlexScaleCoeffsData) -> Result<Self> {
        Ok(Self::new(data.bins, data.subprocesses, data.orders)?
            .with_scales(data.scales)
            .with_normalization(data.normalization))
    }
}

impl FlexScaleCoeffs {
    /// Constructor. Both scales default to the nodes of the first scale axis.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no bins, subprocesses or orders, if the bins have a
    /// different number of hadrons or if the subprocess and order axes of the coefficient arrays
    /// do not match `subprocesses` and `orders`.
    pub fn new(
        bins: Vec<FlexScaleBin>,
        subprocesses: SubprocessDef,
        orders: Vec<Order>,
    ) -> Result<Self> {
        let npdf = coeff::check_common(
            bins.len(),
            bins.iter().map(|bin| bin.x_nodes.npdf()),
            &subprocesses,
            &orders,
        )?;

        for bin in &bins {
            let shape = bin.sigma.shape();

            check_len("subprocesses in sigma-tilde", subprocesses.len(), shape[3])?;
            check_len("orders in sigma-tilde", orders.len(), shape[4])?;
        }

        log::debug!(
            "created flexible-scale table with {} bins, {} subprocesses and orders {}",
            bins.len(),
            subprocesses.len(),
            orders.iter().join(",")
        );

        Ok(Self {
            bins,
            subprocesses,
            orders,
            npdf,
            scales: Scales::default(),
            normalization: Normalization::default(),
        })
    }

    /// Set the functional forms of the renormalization and factorization scales.
    #[must_use]
    pub fn with_scales(mut self, scales: Scales) -> Self {
        self.scales = scales;
        self
    }

    /// Set the normalization of the coefficients.
    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Return the functional forms of the renormalization and factorization scales.
    #[must_use]
    pub const fn scales(&self) -> &Scales {
        &self.scales
    }

    /// Return the nodes of the first scale axis of `bin`.
    ///
    /// # Errors
    ///
    /// Returns an error if `bin` is out of range.
    pub fn scale_nodes1(&self, bin: usize) -> Result<&[f64]> {
        Ok(&self.bin(bin)?.scale_nodes1)
    }

    /// Return the nodes of the second scale axis of `bin`.
    ///
    /// # Errors
    ///
    /// Returns an error if `bin` is out of range.
    pub fn scale_nodes2(&self, bin: usize) -> Result<&[f64]> {
        Ok(&self.bin(bin)?.scale_nodes2)
    }

    /// Return the coefficient at the given indices, addressing both scale axes separately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if any index exceeds the extent of its axis.
    #[allow(clippy::too_many_arguments)]
    pub fn sigma_tilde_2d(
        &self,
        bin: usize,
        ix1: usize,
        ix2: usize,
        is1: usize,
        is2: usize,
        isubproc: usize,
        iorder: usize,
    ) -> Result<f64> {
        let data = self.bin(bin)?;
        let n2 = data.scale_nodes2.len();

        check_index(Axis::Scale, is1, data.scale_nodes1.len())?;
        check_index(Axis::Scale, is2, n2)?;

        self.sigma_tilde(bin, ix1, ix2, is1 * n2 + is2, isubproc, iorder)
    }

    fn bin(&self, bin: usize) -> Result<&FlexScaleBin> {
        check_index(Axis::Bin, bin, self.bins.len())?;

        Ok(&self.bins[bin])
    }
}

impl Coefficients for FlexScaleCoeffs {
    fn bins(&self) -> usize {
        self.bins.len()
    }

    fn npdf(&self) -> usize {
        self.npdf
    }

    fn x_nodes1(&self, bin: usize) -> Result<&[f64]> {
        Ok(self.bin(bin)?.x_nodes.x1())
    }

    fn x_nodes2(&self, bin: usize) -> Result<&[f64]> {
        Ok(self.bin(bin)?.x_nodes.x2())
    }

    fn scale_variables(&self) -> usize {
        2
    }

    fn scale_nodes(&self, bin: usize, scale_variable: usize) -> Result<&[f64]> {
        let bin = self.bin(bin)?;

        match scale_variable {
            0 => Ok(&bin.scale_nodes1),
            1 => Ok(&bin.scale_nodes2),
            _ => Err(Error::IndexOutOfRange {
                axis: Axis::ScaleVariable,
                index: scale_variable,
                extent: 2,
            }),
        }
    }

    fn sigma_array(&self, bin: usize) -> Result<ArrayView5<'_, f64>> {
        Ok(self.bin(bin)?.sigma.view())
    }

    fn subprocess_definition(&self, bin: usize) -> Result<&SubprocessDef> {
        self.bin(bin)?;

        Ok(&self.subprocesses)
    }

    fn orders(&self) -> &[Order] {
        &self.orders
    }

    fn normalization(&self) -> &Normalization {
        &self.normalization
    }

    fn scale_points(&self, bin: usize, options: &ConvolveOptions) -> Result<Vec<ScalePoint>> {
        let bin = self.bin(bin)?;

        Ok(bin
            .scale_nodes1
            .iter()
            .cartesian_product(&bin.scale_nodes2)
            .map(|(&s1, &s2)| {
                let (mur2, muf2) = self.scales.mu2(s1, s2, options.xmur(), options.xmuf());
                ScalePoint { mur2, muf2 }
            })
            .collect())
    }
}
