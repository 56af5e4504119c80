//! Perturbative orders of the coefficient tensors.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Error type keeping information if [`Order::from_str`] went wrong.
#[derive(Debug, Error, Eq, PartialEq)]
#[error("{0}")]
pub struct ParseOrderError(String);

/// Describes one entry of the order axis of a coefficient tensor. A coefficient belonging to this
/// order is multiplied with the strong coupling raised to the power `alphas` and, for
/// flexible-scale tables, with the logarithms of the renormalization and factorization scales,
/// `ln(mur2)^logxir * ln(muf2)^logxif`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Order {
    /// Exponent of the strong coupling.
    pub alphas: u8,
    /// Exponent of the logarithm of the squared renormalization scale.
    pub logxir: u8,
    /// Exponent of the logarithm of the squared factorization scale.
    pub logxif: u8,
}

impl FromStr for Order {
    type Err = ParseOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut result = Self {
            alphas: 0,
            logxir: 0,
            logxif: 0,
        };

        for tuple in s
            .split(|c: char| c.is_ascii_digit())
            .filter(|s| !s.is_empty())
            .zip(
                s.split(|c: char| !c.is_ascii_digit())
                    .filter(|s| !s.is_empty())
                    .map(str::parse),
            )
        {
            match tuple {
                ("as", Ok(num)) => {
                    result.alphas = num;
                }
                ("lr", Ok(num)) => {
                    result.logxir = num;
                }
                ("lf", Ok(num)) => {
                    result.logxif = num;
                }
                (label, Err(err)) => {
                    return Err(ParseOrderError(format!(
                        "error while parsing exponent of '{label}': {err}"
                    )));
                }
                (label, Ok(_)) => {
                    return Err(ParseOrderError(format!("unknown coupling: '{label}'")));
                }
            }
        }

        Ok(result)
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "as{}", self.alphas)?;

        if self.logxir > 0 {
            write!(f, "lr{}", self.logxir)?;
        }

        if self.logxif > 0 {
            write!(f, "lf{}", self.logxif)?;
        }

        Ok(())
    }
}

impl Ord for Order {
    fn cmp(&self, other: &Self) -> Ordering {
        // lower powers of the strong coupling first, then the logarithms lexicographically
        (self.alphas, self.logxir, self.logxif).cmp(&(other.alphas, other.logxir, other.logxif))
    }
}

impl PartialOrd for Order {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Order {
    /// Constructor. This function mainly exists to have a way of constructing `Order` that is less
    /// verbose.
    #[must_use]
    pub const fn new(alphas: u8, logxir: u8, logxif: u8) -> Self {
        Self {
            alphas,
            logxir,
            logxif,
        }
    }

    /// Return `true` if this order is multiplied with a power of a scale logarithm.
    #[must_use]
    pub const fn has_logs(&self) -> bool {
        self.logxir > 0 || self.logxif > 0
    }

    /// Return a mask that selects all `orders` whose power of the strong coupling is at most
    /// `max_order` larger than the smallest power found in `orders`. Orders with logarithms are
    /// selected together with the power of the strong coupling they belong to.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fastnlo_core::order::Order;
    ///
    /// // dijet production: LO is alphas^2, the NLO comes with scale logarithms
    /// let orders = [
    ///     Order::new(2, 0, 0),
    ///     Order::new(3, 0, 0),
    ///     Order::new(3, 1, 0),
    ///     Order::new(3, 0, 1),
    ///     Order::new(4, 0, 0),
    /// ];
    ///
    /// // LO
    /// assert_eq!(Order::create_mask(&orders, 0), [true, false, false, false, false]);
    /// // NLO
    /// assert_eq!(Order::create_mask(&orders, 1), [true, true, true, true, false]);
    /// // NNLO
    /// assert_eq!(Order::create_mask(&orders, 2), [true; 5]);
    /// ```
    #[must_use]
    pub fn create_mask(orders: &[Self], max_order: u8) -> Vec<bool> {
        let lo = orders
            .iter()
            .map(|Self { alphas, .. }| *alphas)
            .min()
            .unwrap_or_default();

        orders
            .iter()
            .map(|&Self { alphas, .. }| u32::from(alphas) <= u32::from(lo) + u32::from(max_order))
            .collect()
    }
}
