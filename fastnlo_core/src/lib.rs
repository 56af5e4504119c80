#![allow(clippy::module_name_repetitions)]

//! `fastnlo_core` stores precomputed partonic cross-section coefficients of fastNLO-style tables
//! and reconstructs cross sections from them.
//!
//! A coefficient table ([`coeff::CoeffGrid`]) holds, for every observable bin, coefficients
//! indexed by the momentum-fraction nodes of both partons, the scale nodes, the subprocess channel
//! and the perturbative order. Together with the bin geometry it forms a [`table::Table`], which
//! contracts the coefficients with PDF linear combinations ([`subproc`]) and coupling factors
//! supplied by the caller ([`convolutions`]).

pub mod bin;
pub mod coeff;
pub mod convolutions;
pub mod error;
pub mod fix_scale;
pub mod flex_scale;
pub mod order;
pub mod pids;
pub mod scales;
pub mod subproc;
pub mod table;
