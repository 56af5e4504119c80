//! Provides the [`FixScaleCoeffs`] table.

use super::coeff::{self, Coefficients, Normalization, ScalePoint, XNodes};
use super::convolutions::ConvolveOptions;
use super::error::{Axis, Error, Result, check_index, check_len};
use super::order::Order;
use super::subproc::SubprocessDef;
use float_cmp::approx_eq;
use ndarray::{Array5, ArrayView5};
use serde::{Deserialize, Serialize};

/// Coefficients and nodes of one bin of a [`FixScaleCoeffs`] table.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(try_from = "FixScaleBinData")]
pub struct FixScaleBin {
    x_nodes: XNodes,
    scale_nodes: Vec<f64>,
    sigma: Array5<f64>,
}

#[derive(Deserialize)]
struct FixScaleBinData {
    x_nodes: XNodes,
    scale_nodes: Vec<f64>,
    sigma: Array5<f64>,
}

impl TryFrom<FixScaleBinData> for FixScaleBin {
    type Error = Error;

    fn try_from(data: FixScaleBinData) -> Result<Self> {
        Self::new(data.x_nodes, data.scale_nodes, data.sigma)
    }
}

impl FixScaleBin {
    /// Constructor. The array `sigma` has the axes x1, x2, scale, subprocess and order; the
    /// lengths of the first three axes must match the number of nodes. For tables with a single
    /// hadron the x2 axis has length one.
    ///
    /// # Errors
    ///
    /// Returns an error if the scale nodes are empty or not strictly increasing, or if the shape
    /// of `sigma` does not match the nodes.
    pub fn new(x_nodes: XNodes, scale_nodes: Vec<f64>, sigma: Array5<f64>) -> Result<Self> {
        coeff::check_nodes("scale", &scale_nodes)?;

        let (nx1, nx2) = x_nodes.extents();
        let shape = sigma.shape();

        check_len("x1 nodes in sigma-tilde", nx1, shape[0])?;
        check_len("x2 nodes in sigma-tilde", nx2, shape[1])?;
        check_len("scale nodes in sigma-tilde", scale_nodes.len(), shape[2])?;

        Ok(Self {
            x_nodes,
            scale_nodes,
            sigma,
        })
    }

    /// Return the momentum-fraction nodes.
    #[must_use]
    pub const fn x_nodes(&self) -> &XNodes {
        &self.x_nodes
    }

    /// Return the scale nodes.
    #[must_use]
    pub fn scale_nodes(&self) -> &[f64] {
        &self.scale_nodes
    }
}

/// Coefficient table computed for a fixed choice of the renormalization and factorization
/// scales. Both scales are the same and given by the scale nodes, which already include the
/// table's scale factor.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(try_from = "FixScaleCoeffsData")]
pub struct FixScaleCoeffs {
    bins: Vec<FixScaleBin>,
    subprocesses: SubprocessDef,
    orders: Vec<Order>,
    npdf: usize,
    scale_factor: f64,
    normalization: Normalization,
}

// `npdf` is recomputed from the bins
#[derive(Deserialize)]
struct FixScaleCoeffsData {
    bins: Vec<FixScaleBin>,
    subprocesses: SubprocessDef,
    orders: Vec<Order>,
    scale_factor: f64,
    #[serde(default)]
    normalization: Normalization,
}

impl TryFrom<FixScaleCoeffsData> for FixScaleCoeffs {
    type Error = Error;

    fn try_from(data: FixScaleCoeffsData) -> Result<Self> {
        Ok(
            Self::new(data.bins, data.subprocesses, data.orders, data.scale_factor)?
                .with_normalization(data.normalization),
        )
    }
}

impl FixScaleCoeffs {
    /// Constructor. The table was computed with the renormalization and factorization scales set
    /// to `scale_factor` times the central scale.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no bins, subprocesses or orders, if an order contains
    /// logarithms, if the bins have a different number of hadrons or if the subprocess and order
    /// axes of the coefficient arrays do not match `subprocesses` and `orders`.
    pub fn new(
        bins: Vec<FixScaleBin>,
        subprocesses: SubprocessDef,
        orders: Vec<Order>,
        scale_factor: f64,
    ) -> Result<Self> {
        let npdf = coeff::check_common(
            bins.len(),
            bins.iter().map(|bin| bin.x_nodes.npdf()),
            &subprocesses,
            &orders,
        )?;

        if let Some(order) = orders.iter().find(|order| order.has_logs()) {
            return Err(Error::General(format!(
                "fixed-scale tables do not support the order {order}"
            )));
        }

        for bin in &bins {
            let shape = bin.sigma.shape();

            check_len("subprocesses in sigma-tilde", subprocesses.len(), shape[3])?;
            check_len("orders in sigma-tilde", orders.len(), shape[4])?;
        }

        log::debug!(
            "created fixed-scale table with {} bins, {} subprocesses and {} orders",
            bins.len(),
            subprocesses.len(),
            orders.len()
        );

        Ok(Self {
            bins,
            subprocesses,
            orders,
            npdf,
            scale_factor,
            normalization: Normalization::default(),
        })
    }

    /// Set the normalization of the coefficients.
    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Return the factor the central scale was multiplied with to obtain the scale nodes.
    #[must_use]
    pub const fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    fn bin(&self, bin: usize) -> Result<&FixScaleBin> {
        check_index(Axis::Bin, bin, self.bins.len())?;

        Ok(&self.bins[bin])
    }
}

impl Coefficients for FixScaleCoeffs {
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
        1
    }

    fn scale_nodes(&self, bin: usize, scale_variable: usize) -> Result<&[f64]> {
        let bin = self.bin(bin)?;
        check_index(Axis::ScaleVariable, scale_variable, 1)?;

        Ok(&bin.scale_nodes)
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
        let (xmur, xmuf) = (options.xmur(), options.xmuf());

        if !approx_eq!(f64, xmur, self.scale_factor, ulps = 4)
            || !approx_eq!(f64, xmuf, self.scale_factor, ulps = 4)
        {
            return Err(Error::General(format!(
                "fixed-scale table requires xmur = xmuf = {}, got xmur = {xmur}, xmuf = {xmuf}",
                self.scale_factor
            )));
        }

        Ok(bin
            .scale_nodes
            .iter()
            .map(|&mu| ScalePoint {
                mur2: mu * mu,
                muf2: mu * mu,
            })
            .collect())
    }
}
