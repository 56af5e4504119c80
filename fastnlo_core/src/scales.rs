//! Functional forms that combine the two scale axes of a flexible-scale table into the
//! renormalization and factorization scales.

use serde::{Deserialize, Serialize};

/// Functional form of a scale in terms of the nodes `s1` and `s2` of the two scale axes of a
/// flexible-scale table. All forms return the scale itself, not its square.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum ScaleFuncForm {
    /// `s1`.
    #[default]
    Scale1,
    /// `s2`.
    Scale2,
    /// `sqrt(s1^2 + s2^2)`.
    QuadraticSum,
    /// `sqrt((s1^2 + s2^2) / 2)`.
    QuadraticMean,
    /// `sqrt((s1^2 + s2^2) / 4)`.
    QuadraticSumOver4,
    /// `(s1 + s2) / 2`.
    LinearMean,
    /// `s1 + s2`.
    LinearSum,
    /// `max(s1, s2)`.
    ScaleMax,
    /// `min(s1, s2)`.
    ScaleMin,
    /// `s1 * s2`.
    Prod,
    /// `sqrt(s1^2 / 2 + s2^2)`.
    S2plusS1half,
    /// `(s1^4 + s2^4)^(1/4)`.
    Pow4Sum,
    /// `sqrt((s1^4 + s2^4) / (s1^2 + s2^2))`.
    WgtAvg,
    /// `sqrt(s1^2 / 4 + s2^2)`.
    S2plusS1fourth,
    /// `s1 * exp(0.3 * s2)`.
    ExpProd2,
    /// A constant scale, independent of the nodes.
    Const(f64),
}

impl ScaleFuncForm {
    /// Evaluate this functional form for the scale nodes `s1` and `s2`.
    #[must_use]
    pub fn calc(&self, s1: f64, s2: f64) -> f64 {
        match *self {
            Self::Scale1 => s1,
            Self::Scale2 => s2,
            Self::QuadraticSum => s1.hypot(s2),
            Self::QuadraticMean => (0.5 * s1.mul_add(s1, s2 * s2)).sqrt(),
            Self::QuadraticSumOver4 => (0.25 * s1.mul_add(s1, s2 * s2)).sqrt(),
            Self::LinearMean => 0.5 * (s1 + s2),
            Self::LinearSum => s1 + s2,
            Self::ScaleMax => s1.max(s2),
            Self::ScaleMin => s1.min(s2),
            Self::Prod => s1 * s2,
            Self::S2plusS1half => (0.5 * s1).mul_add(s1, s2 * s2).sqrt(),
            Self::Pow4Sum => (s1.powi(4) + s2.powi(4)).powf(0.25),
            Self::WgtAvg => ((s1.powi(4) + s2.powi(4)) / s1.mul_add(s1, s2 * s2)).sqrt(),
            Self::S2plusS1fourth => (0.25 * s1).mul_add(s1, s2 * s2).sqrt(),
            Self::ExpProd2 => s1 * (0.3 * s2).exp(),
            Self::Const(value) => value,
        }
    }
}

/// The functional forms used to compute the renormalization and factorization scales of a
/// flexible-scale table.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Scales {
    /// Functional form of the renormalization scale.
    pub ren: ScaleFuncForm,
    /// Functional form of the factorization scale.
    pub fac: ScaleFuncForm,
}

impl Scales {
    /// Constructor.
    #[must_use]
    pub const fn new(ren: ScaleFuncForm, fac: ScaleFuncForm) -> Self {
        Self { ren, fac }
    }

    /// Return the squared renormalization and factorization scales for the scale nodes `s1` and
    /// `s2`, multiplied with the scale factors `xmur` and `xmuf`, respectively.
    #[must_use]
    pub fn mu2(&self, s1: f64, s2: f64, xmur: f64, xmuf: f64) -> (f64, f64) {
        let mur = xmur * self.ren.calc(s1, s2);
        let muf = xmuf * self.fac.calc(s1, s2);

        (mur * mur, muf * muf)
    }
}
