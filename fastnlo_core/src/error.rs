//! Error types of this crate.

use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Axis of a [`BinGeometry`] or a coefficient tensor an index refers to.
///
/// [`BinGeometry`]: super::bin::BinGeometry
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Axis {
    /// Observable bins.
    Bin,
    /// Kinematic dimensions of the bin geometry.
    Dimension,
    /// Momentum-fraction nodes of the first parton.
    X1,
    /// Momentum-fraction nodes of the second parton.
    X2,
    /// Scale nodes.
    Scale,
    /// Scale variables, i.e. the number of independent scale axes.
    ScaleVariable,
    /// Subprocess channels.
    Subprocess,
    /// Perturbative orders.
    Order,
}

impl Display for Axis {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Bin => "bin",
            Self::Dimension => "dimension",
            Self::X1 => "x1 node",
            Self::X2 => "x2 node",
            Self::Scale => "scale node",
            Self::ScaleVariable => "scale variable",
            Self::Subprocess => "subprocess",
            Self::Order => "order",
        })
    }
}

/// Catch-all error for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// An index exceeds the extent published for its axis.
    #[error("{axis} index {index} is out of range, the extent is {extent}")]
    IndexOutOfRange {
        /// The axis the index was used for.
        axis: Axis,
        /// The offending index.
        index: usize,
        /// The number of valid indices.
        extent: usize,
    },
    /// A PDF set can not supply a flavor required by a subprocess definition.
    #[error("the PDF set does not provide the flavor with PDG MC ID {pid}")]
    MissingFlavor {
        /// PDG MC ID of the missing flavor.
        pid: i32,
    },
    /// The length of a caller-supplied sequence does not match what the grid expects.
    #[error("expected {expected} {what}, but found {found}")]
    DimensionMismatch {
        /// Description of the mismatched quantity.
        what: &'static str,
        /// The length the grid expects.
        expected: usize,
        /// The length that was supplied.
        found: usize,
    },
    /// An error that originates in this crate.
    #[error("{0}")]
    General(String),
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn check_index(axis: Axis, index: usize, extent: usize) -> Result<()> {
    if index < extent {
        Ok(())
    } else {
        Err(Error::IndexOutOfRange {
            axis,
            index,
            extent,
        })
    }
}

pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            what,
            expected,
            found,
        })
    }
}
