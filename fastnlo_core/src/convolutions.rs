//! Module for everything the reconstruction of cross sections needs from the outside: PDF sets,
//! the strong coupling and the options steering the convolution.

use super::error::{Error, Result, check_len};
use super::order::Order;
use super::subproc::{FlavorDensities, SubprocessDef};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A set of parton distribution functions.
pub trait PdfSet: Sync {
    /// Return the PDG MC IDs of all flavors this set provides.
    fn flavors(&self) -> Vec<i32>;

    /// Return `x` times the parton density of the flavor `pid` at the momentum fraction `x` and
    /// the squared factorization scale `q2`.
    fn xfx(&self, pid: i32, x: f64, q2: f64) -> f64;
}

/// A [`PdfSet`] made from a closure and the list of flavors it supports.
///
/// # Examples
///
/// ```rust
/// use fastnlo_core::convolutions::{PdfFn, PdfSet};
///
/// let pdf = PdfFn::new(vec![-1, 1, 21], |pid, x, _| if pid == 21 { 2.0 * x } else { x });
///
/// assert_eq!(pdf.flavors(), [-1, 1, 21]);
/// assert_eq!(pdf.xfx(21, 0.5, 100.0), 1.0);
/// ```
pub struct PdfFn<F> {
    flavors: Vec<i32>,
    xfx: F,
}

impl<F: Fn(i32, f64, f64) -> f64 + Sync> PdfFn<F> {
    /// Constructor.
    pub const fn new(flavors: Vec<i32>, xfx: F) -> Self {
        Self { flavors, xfx }
    }
}

impl<F: Fn(i32, f64, f64) -> f64 + Sync> PdfSet for PdfFn<F> {
    fn flavors(&self) -> Vec<i32> {
        self.flavors.clone()
    }

    fn xfx(&self, pid: i32, x: f64, q2: f64) -> f64 {
        (self.xfx)(pid, x, q2)
    }
}

/// Provider of the coupling factors multiplying the coefficients.
pub trait Coupling: Sync {
    /// Return the coupling factor raised to `power` at the squared renormalization scale `mur2`.
    fn coupling_power(&self, mur2: f64, power: u8) -> f64;
}

/// A [`Coupling`] that turns the strong coupling `alphas(mur2)` into the factor `(alphas /
/// (2 pi))^power`, which is the expansion parameter fastNLO tables use.
pub struct AlphasTwoPi<F> {
    alphas: F,
}

impl<F: Fn(f64) -> f64 + Sync> AlphasTwoPi<F> {
    /// Constructor.
    pub const fn new(alphas: F) -> Self {
        Self { alphas }
    }
}

impl<F: Fn(f64) -> f64 + Sync> Coupling for AlphasTwoPi<F> {
    fn coupling_power(&self, mur2: f64, power: u8) -> f64 {
        ((self.alphas)(mur2) / (2.0 * PI)).powi(power.into())
    }
}

/// Options for [`Table::cross_section`] and its siblings.
///
/// [`Table::cross_section`]: super::table::Table::cross_section
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ConvolveOptions {
    xmur: f64,
    xmuf: f64,
    max_order: Option<u8>,
    order_mask: Vec<bool>,
    pdf2_is_antiparticle: bool,
}

impl Default for ConvolveOptions {
    fn default() -> Self {
        Self {
            xmur: 1.0,
            xmuf: 1.0,
            max_order: None,
            order_mask: Vec::new(),
            pdf2_is_antiparticle: false,
        }
    }
}

impl ConvolveOptions {
    /// Set the factor the renormalization scale is multiplied with.
    #[must_use]
    pub const fn with_xmur(mut self, xmur: f64) -> Self {
        self.xmur = xmur;
        self
    }

    /// Set the factor the factorization scale is multiplied with.
    #[must_use]
    pub const fn with_xmuf(mut self, xmuf: f64) -> Self {
        self.xmuf = xmuf;
        self
    }

    /// Only include orders whose power of the strong coupling is at most `max_order` larger than
    /// the lowest one; `0` selects the leading order.
    #[must_use]
    pub const fn with_max_order(mut self, max_order: u8) -> Self {
        self.max_order = Some(max_order);
        self
    }

    /// Select the orders explicitly. An empty mask selects all orders.
    #[must_use]
    pub fn with_order_mask(mut self, order_mask: Vec<bool>) -> Self {
        self.order_mask = order_mask;
        self
    }

    /// If `true`, the second hadron is the antiparticle of the hadron the second PDF set
    /// describes, and its flavors are charge conjugated before they are looked up.
    #[must_use]
    pub const fn with_pdf2_is_antiparticle(mut self, pdf2_is_antiparticle: bool) -> Self {
        self.pdf2_is_antiparticle = pdf2_is_antiparticle;
        self
    }

    /// Return the renormalization scale factor.
    #[must_use]
    pub const fn xmur(&self) -> f64 {
        self.xmur
    }

    /// Return the factorization scale factor.
    #[must_use]
    pub const fn xmuf(&self) -> f64 {
        self.xmuf
    }

    /// Return whether the second hadron is an antiparticle.
    #[must_use]
    pub const fn pdf2_is_antiparticle(&self) -> bool {
        self.pdf2_is_antiparticle
    }

    /// Return which of `orders` are included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if an explicit order mask was set whose length differs
    /// from the number of orders.
    pub fn selected_orders(&self, orders: &[Order]) -> Result<Vec<bool>> {
        let mut mask = self.max_order.map_or_else(
            || vec![true; orders.len()],
            |max_order| Order::create_mask(orders, max_order),
        );

        if !self.order_mask.is_empty() {
            check_len("orders in the order mask", orders.len(), self.order_mask.len())?;

            for (selected, &explicit) in mask.iter_mut().zip(&self.order_mask) {
                *selected &= explicit;
            }
        }

        Ok(mask)
    }
}

/// Everything needed to turn coefficients into cross sections.
pub struct ConvolutionInputs<'a> {
    pdf1: &'a dyn PdfSet,
    pdf2: Option<&'a dyn PdfSet>,
    coupling: &'a dyn Coupling,
    options: ConvolveOptions,
}

impl<'a> ConvolutionInputs<'a> {
    /// Constructor. The PDF set `pdf` is used for both hadrons unless a second one is set with
    /// [`Self::with_second_pdf`].
    #[must_use]
    pub fn new(pdf: &'a dyn PdfSet, coupling: &'a dyn Coupling) -> Self {
        Self {
            pdf1: pdf,
            pdf2: None,
            coupling,
            options: ConvolveOptions::default(),
        }
    }

    /// Use `pdf` for the second hadron.
    #[must_use]
    pub fn with_second_pdf(mut self, pdf: &'a dyn PdfSet) -> Self {
        self.pdf2 = Some(pdf);
        self
    }

    /// Set the options of the convolution.
    #[must_use]
    pub fn with_options(mut self, options: ConvolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Return the options of the convolution.
    #[must_use]
    pub const fn options(&self) -> &ConvolveOptions {
        &self.options
    }

    pub(crate) fn coupling(&self) -> &dyn Coupling {
        self.coupling
    }

    /// Check that the PDF sets provide every flavor needed by `subprocesses`. For tables with a
    /// single hadron only the first PDF set is checked.
    pub(crate) fn check_flavors(&self, subprocesses: &SubprocessDef, npdf: usize) -> Result<()> {
        let (first, second) = subprocesses.required_flavors(self.options.pdf2_is_antiparticle);
        let check = |pdf: &dyn PdfSet, required: &[i32]| {
            let provided = pdf.flavors();

            required
                .iter()
                .find(|pid| !provided.contains(pid))
                .map_or(Ok(()), |&pid| Err(Error::MissingFlavor { pid }))
        };

        check(self.pdf1, &first)?;

        if npdf > 1 {
            check(self.pdf2.unwrap_or(self.pdf1), &second)?;
        }

        Ok(())
    }

    pub(crate) fn cache(&self) -> PdfCache<'a> {
        PdfCache {
            pdfs: match self.pdf2 {
                Some(pdf2) => Pdfs::Two {
                    pdf1: self.pdf1,
                    cache1: FxHashMap::default(),
                    pdf2,
                    cache2: FxHashMap::default(),
                },
                None => Pdfs::One {
                    pdf: self.pdf1,
                    cache: FxHashMap::default(),
                },
            },
        }
    }
}

type XfxCache = FxHashMap<(i32, u64, u64), f64>;

enum Pdfs<'a> {
    Two {
        pdf1: &'a dyn PdfSet,
        cache1: XfxCache,
        pdf2: &'a dyn PdfSet,
        cache2: XfxCache,
    },
    One {
        pdf: &'a dyn PdfSet,
        cache: XfxCache,
    },
}

/// Call-local cache of PDF values, which avoids evaluating the same density more than once when
/// several scale nodes share a factorization scale.
pub(crate) struct PdfCache<'a> {
    pdfs: Pdfs<'a>,
}

impl PdfCache<'_> {
    /// Evaluate the PDF set of hadron `hadron` (`0` or `1`) for all `flavors` at every node in
    /// `x_nodes`.
    pub(crate) fn densities(
        &mut self,
        hadron: usize,
        flavors: &[i32],
        x_nodes: &[f64],
        q2: f64,
    ) -> Vec<FlavorDensities> {
        let (pdf, cache) = match &mut self.pdfs {
            Pdfs::One { pdf, cache } => (*pdf, cache),
            Pdfs::Two { pdf1, cache1, .. } if hadron == 0 => (*pdf1, cache1),
            Pdfs::Two { pdf2, cache2, .. } => (*pdf2, cache2),
        };

        x_nodes
            .iter()
            .map(|&x| {
                flavors
                    .iter()
                    .map(|&pid| {
                        let xfx = *cache
                            .entry((pid, x.to_bits(), q2.to_bits()))
                            .or_insert_with(|| pdf.xfx(pid, x, q2));
                        (pid, xfx)
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subproc::Channel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn alphas_two_pi() {
        let coupling = AlphasTwoPi::new(|_| 2.0 * PI * 0.5);

        assert_eq!(coupling.coupling_power(100.0, 0), 1.0);
        assert_eq!(coupling.coupling_power(100.0, 1), 0.5);
        assert_eq!(coupling.coupling_power(100.0, 3), 0.125);
    }

    #[test]
    fn convolve_options_from_yaml() {
        let options: ConvolveOptions = serde_yaml::from_str(
            "xmur: 2.0\n\
             max_order: 1\n\
             pdf2_is_antiparticle: true\n",
        )
        .unwrap();

        assert_eq!(
            options,
            ConvolveOptions::default()
                .with_xmur(2.0)
                .with_max_order(1)
                .with_pdf2_is_antiparticle(true)
        );
        assert_eq!(options.xmuf(), 1.0);

        let options: ConvolveOptions = serde_yaml::from_str("{}").unwrap();

        assert_eq!(options, ConvolveOptions::default());
    }

    #[test]
    fn selected_orders() {
        let orders = [
            Order::new(2, 0, 0),
            Order::new(3, 0, 0),
            Order::new(3, 1, 0),
            Order::new(4, 0, 0),
        ];

        assert_eq!(
            ConvolveOptions::default().selected_orders(&orders).unwrap(),
            [true; 4]
        );
        assert_eq!(
            ConvolveOptions::default()
                .with_max_order(1)
                .selected_orders(&orders)
                .unwrap(),
            [true, true, true, false]
        );
        assert_eq!(
            ConvolveOptions::default()
                .with_max_order(1)
                .with_order_mask(vec![false, true, false, true])
                .selected_orders(&orders)
                .unwrap(),
            [false, true, false, false]
        );
        assert!(matches!(
            ConvolveOptions::default()
                .with_order_mask(vec![true])
                .selected_orders(&orders),
            Err(Error::DimensionMismatch {
                expected: 4,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn check_flavors() {
        let def = SubprocessDef::new(vec![Channel::new(vec![(2, 2)], false)]);
        let pdf = PdfFn::new(vec![2, 21], |_, _, _| 1.0);
        let coupling = AlphasTwoPi::new(|_| 0.118);

        let inputs = ConvolutionInputs::new(&pdf, &coupling);

        assert!(inputs.check_flavors(&def, 2).is_ok());

        let inputs =
            inputs.with_options(ConvolveOptions::default().with_pdf2_is_antiparticle(true));

        assert!(matches!(
            inputs.check_flavors(&def, 2),
            Err(Error::MissingFlavor { pid: -2 })
        ));
        // the second side is point-like
        assert!(inputs.check_flavors(&def, 1).is_ok());
    }

    #[test]
    fn cache_evaluates_once() {
        let calls = AtomicUsize::new(0);
        let pdf = PdfFn::new(vec![1, 21], |pid, x, _| {
            calls.fetch_add(1, Ordering::Relaxed);
            f64::from(pid) * x
        });
        let coupling = AlphasTwoPi::new(|_| 0.118);
        let inputs = ConvolutionInputs::new(&pdf, &coupling);
        let mut cache = inputs.cache();

        let first = cache.densities(0, &[1, 21], &[0.1, 0.5], 100.0);
        let second = cache.densities(1, &[1, 21], &[0.1, 0.5], 100.0);

        assert_eq!(first, second);
        assert_eq!(first[1].get(21).unwrap(), 10.5);
        assert_eq!(calls.load(Ordering::Relaxed), 4);

        let _ = cache.densities(0, &[1], &[0.1], 400.0);

        assert_eq!(calls.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn cache_with_two_pdfs() {
        let pdf1 = PdfFn::new(vec![21], |_, _, _| 1.0);
        let pdf2 = PdfFn::new(vec![21], |_, _, _| 2.0);
        let coupling = AlphasTwoPi::new(|_| 0.118);
        let inputs = ConvolutionInputs::new(&pdf1, &coupling).with_second_pdf(&pdf2);
        let mut cache = inputs.cache();

        assert_eq!(cache.densities(0, &[21], &[0.1], 10.0)[0].get(21).unwrap(), 1.0);
        assert_eq!(cache.densities(1, &[21], &[0.1], 10.0)[0].get(21).unwrap(), 2.0);
    }
}
