//! Subprocess definitions and the linear combinations of parton densities they imply.

use super::error::{Axis, Error, Result, check_index};
use super::pids::{self, charge_conjugate_pdg_pid};
use itertools::Itertools;
use ndarray::{Array3, s};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Parton densities of one initial state, evaluated at a single momentum fraction and scale.
#[derive(Clone, Debug, PartialEq)]
pub enum FlavorDensities {
    /// Densities of a hadron, keyed by PDG MC ID.
    Hadron(FxHashMap<i32, f64>),
    /// A point-like initial state, for instance the lepton in deep-inelastic scattering. Every
    /// flavor has density one.
    Pointlike,
}

impl FlavorDensities {
    /// Return the density of the flavor `pid`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFlavor`] if the densities do not contain `pid`.
    pub fn get(&self, pid: i32) -> Result<f64> {
        match self {
            Self::Hadron(densities) => densities
                .get(&pid)
                .copied()
                .ok_or(Error::MissingFlavor { pid }),
            Self::Pointlike => Ok(1.0),
        }
    }
}

impl FromIterator<(i32, f64)> for FlavorDensities {
    fn from_iter<T: IntoIterator<Item = (i32, f64)>>(iter: T) -> Self {
        Self::Hadron(iter.into_iter().collect())
    }
}

/// A subprocess channel: the pairs of parton flavors, given as PDG MC IDs, that contribute to the
/// same coefficient.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Channel {
    pairs: Vec<(i32, i32)>,
    symmetric: bool,
}

impl Channel {
    /// Constructor. If `symmetric` is `true`, the channel is symmetric under the exchange of the
    /// two initial states and `pairs` must list every unordered combination only once; the
    /// transposed combination is added when the channel is evaluated.
    ///
    /// # Panics
    ///
    /// Creating an empty channel panics:
    ///
    /// ```rust,should_panic
    /// use fastnlo_core::subproc::Channel;
    ///
    /// let _ = Channel::new(vec![], false);
    /// ```
    #[must_use]
    pub fn new(pairs: Vec<(i32, i32)>, symmetric: bool) -> Self {
        assert!(!pairs.is_empty(), "can not create empty channel");

        Self { pairs, symmetric }
    }

    /// Return the flavor pairs of this channel in the order they are summed.
    #[must_use]
    pub fn pairs(&self) -> &[(i32, i32)] {
        &self.pairs
    }

    /// Return `true` if this channel is symmetric under exchange of the initial states.
    #[must_use]
    pub const fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    fn lumi(
        &self,
        pdf_x1: &FlavorDensities,
        pdf_x2: &FlavorDensities,
        pdf2_is_antiparticle: bool,
    ) -> Result<f64> {
        let second = |pid| {
            if pdf2_is_antiparticle {
                charge_conjugate_pdg_pid(pid)
            } else {
                pid
            }
        };

        let mut lumi = 0.0;

        for &(id1, id2) in &self.pairs {
            lumi += pdf_x1.get(id1)? * pdf_x2.get(second(id2))?;

            if self.symmetric {
                lumi += pdf_x1.get(id2)? * pdf_x2.get(second(id1))?;
            }
        }

        Ok(lumi)
    }
}

/// The subprocess definition of a coefficient table: an ordered list of [`Channel`]s.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SubprocessDef {
    channels: Vec<Channel>,
}

impl SubprocessDef {
    /// Constructor.
    #[must_use]
    pub const fn new(channels: Vec<Channel>) -> Self {
        Self { channels }
    }

    /// Construct a subprocess definition from `channels` whose flavors use fastNLO's numbering,
    /// in which the gluon is `0` and the (anti)quarks are `-6` to `6`.
    ///
    /// # Errors
    ///
    /// Returns an error if a parton ID is outside of the range `-6..=6`.
    ///
    /// # Panics
    ///
    /// Panics if one of the channels is empty.
    pub fn from_fastnlo_ids(channels: Vec<(Vec<(i32, i32)>, bool)>) -> Result<Self> {
        let convert = |pid| {
            pids::pdg_id_from_fastnlo(pid)
                .ok_or_else(|| Error::General(format!("parton ID {pid} is not supported")))
        };

        channels
            .into_iter()
            .map(|(pairs, symmetric)| -> Result<Channel> {
                Ok(Channel::new(
                    pairs
                        .into_iter()
                        .map(|(a, b)| -> Result<_> { Ok((convert(a)?, convert(b)?)) })
                        .collect::<Result<_>>()?,
                    symmetric,
                ))
            })
            .collect::<Result<_>>()
            .map(Self::new)
    }

    /// Return the number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Return `true` if there are no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Return all channels.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Return the channel with index `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `channel` is out of range.
    pub fn channel(&self, channel: usize) -> Result<&Channel> {
        check_index(Axis::Subprocess, channel, self.channels.len())?;

        Ok(&self.channels[channel])
    }

    /// Return the sorted flavors needed from the first and from the second initial state to
    /// evaluate [`Self::combine`]. If `pdf2_is_antiparticle` is `true` the flavors for the second
    /// initial state are charge conjugated, so that they can be passed to the PDF set directly.
    #[must_use]
    pub fn required_flavors(&self, pdf2_is_antiparticle: bool) -> (Vec<i32>, Vec<i32>) {
        let second = |pid| {
            if pdf2_is_antiparticle {
                charge_conjugate_pdg_pid(pid)
            } else {
                pid
            }
        };

        let pairs = || {
            self.channels.iter().flat_map(|channel| {
                channel.pairs.iter().flat_map(move |&(a, b)| {
                    let transposed = channel.symmetric.then_some((b, a));
                    std::iter::once((a, b)).chain(transposed)
                })
            })
        };

        (
            pairs().map(|(a, _)| a).sorted_unstable().dedup().collect(),
            pairs()
                .map(|(_, b)| second(b))
                .sorted_unstable()
                .dedup()
                .collect(),
        )
    }

    /// Compute the PDF linear combination of every channel, given the densities `pdf_x1` of the
    /// first initial state and `pdf_x2` of the second one. For each channel the products of the
    /// densities of its pairs are summed in the order the pairs were given; symmetric channels
    /// also add the transposed product. If `pdf2_is_antiparticle` is `true` the flavors of the
    /// second initial state are charge conjugated before they are looked up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFlavor`] if one of the densities lacks a required flavor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fastnlo_core::subproc::{Channel, FlavorDensities, SubprocessDef};
    ///
    /// let def = SubprocessDef::new(vec![
    ///     Channel::new(vec![(21, 21)], true),
    ///     Channel::new(vec![(2, -2), (1, -1)], false),
    /// ]);
    /// let pdf: FlavorDensities = [(21, 2.0), (1, 0.5), (-1, 0.25), (2, 1.0), (-2, 0.125)]
    ///     .into_iter()
    ///     .collect();
    ///
    /// let lumi = def.combine(&pdf, &pdf, false).unwrap();
    ///
    /// assert_eq!(lumi, [8.0, 0.125 + 0.125]);
    /// ```
    pub fn combine(
        &self,
        pdf_x1: &FlavorDensities,
        pdf_x2: &FlavorDensities,
        pdf2_is_antiparticle: bool,
    ) -> Result<Vec<f64>> {
        self.channels
            .iter()
            .map(|channel| channel.lumi(pdf_x1, pdf_x2, pdf2_is_antiparticle))
            .collect()
    }

    /// Compute the PDF linear combinations for all pairs of momentum-fraction nodes. The returned
    /// array has the shape `(pdfs_x1.len(), pdfs_x2.len(), self.len())`. If `pdfs_x2` is empty,
    /// the second initial state is treated as [`FlavorDensities::Pointlike`] and the second
    /// dimension of the array has length one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFlavor`] if one of the densities lacks a required flavor.
    pub fn combine_nodes(
        &self,
        pdfs_x1: &[FlavorDensities],
        pdfs_x2: &[FlavorDensities],
        pdf2_is_antiparticle: bool,
    ) -> Result<Array3<f64>> {
        let pointlike = [FlavorDensities::Pointlike];
        let pdfs_x2 = if pdfs_x2.is_empty() {
            &pointlike[..]
        } else {
            pdfs_x2
        };

        let mut lumis = Array3::zeros((pdfs_x1.len(), pdfs_x2.len(), self.len()));

        for (ix1, pdf_x1) in pdfs_x1.iter().enumerate() {
            for (ix2, pdf_x2) in pdfs_x2.iter().enumerate() {
                let values = self.combine(pdf_x1, pdf_x2, pdf2_is_antiparticle)?;

                for (lumi, value) in lumis.slice_mut(s![ix1, ix2, ..]).iter_mut().zip(values) {
                    *lumi = value;
                }
            }
        }

        Ok(lumis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn densities(values: &[(i32, f64)]) -> FlavorDensities {
        values.iter().copied().collect()
    }

    #[test]
    fn symmetric_channel_is_doubled() {
        // flavors 'A' and 'B' are the gluon and the up quark
        let def = SubprocessDef::new(vec![
            Channel::new(vec![(21, 21)], true),
            Channel::new(vec![(21, 2)], false),
        ]);
        let node_x1 = densities(&[(21, 2.0), (2, 3.0)]);
        let node_x2 = densities(&[(21, 1.5), (2, 0.5)]);

        // diagonal node pair (x1, x1)
        let lumi = def.combine(&node_x1, &node_x1, false).unwrap();

        assert_eq!(lumi[0], 2.0 * 2.0 + 2.0 * 2.0);
        assert_eq!(lumi[0], 8.0);
        assert_eq!(lumi[1], 2.0 * 3.0);
        assert_eq!(lumi.iter().sum::<f64>(), 14.0);

        // off-diagonal node pair (x1, x2)
        let lumi = def.combine(&node_x1, &node_x2, false).unwrap();

        assert_eq!(lumi, [2.0 * 1.5 + 2.0 * 1.5, 2.0 * 0.5]);
    }

    #[test]
    fn symmetric_channel_adds_transposed_pair() {
        let def = SubprocessDef::new(vec![Channel::new(vec![(21, 2)], true)]);
        let pdf_x1 = densities(&[(21, 2.0), (2, 3.0)]);
        let pdf_x2 = densities(&[(21, 5.0), (2, 7.0)]);

        assert_eq!(
            def.combine(&pdf_x1, &pdf_x2, false).unwrap(),
            [2.0 * 7.0 + 3.0 * 5.0]
        );
    }

    #[test]
    fn antiparticle_lookup() {
        let def = SubprocessDef::new(vec![Channel::new(vec![(2, 2)], false)]);
        let pdf = densities(&[(2, 2.0), (-2, 5.0)]);

        assert_eq!(def.combine(&pdf, &pdf, true).unwrap(), [2.0 * 5.0]);
        assert_eq!(def.combine(&pdf, &pdf, false).unwrap(), [2.0 * 2.0]);
    }

    #[test]
    fn antiparticle_lookup_leaves_gluon_alone() {
        let def = SubprocessDef::new(vec![Channel::new(vec![(2, 21)], true)]);
        let pdf = densities(&[(2, 2.0), (-2, 5.0), (21, 3.0)]);

        // (2, 21) -> 2.0 * 3.0 and transposed (21, 2) -> 3.0 * f(-2)
        assert_eq!(def.combine(&pdf, &pdf, true).unwrap(), [2.0 * 3.0 + 3.0 * 5.0]);
    }

    #[test]
    fn missing_flavor() {
        let def = SubprocessDef::new(vec![Channel::new(vec![(2, 4)], false)]);
        let pdf = densities(&[(2, 2.0)]);

        assert!(matches!(
            def.combine(&pdf, &pdf, false),
            Err(Error::MissingFlavor { pid: 4 })
        ));
    }

    #[test]
    fn pointlike_second_state() {
        let def = SubprocessDef::new(vec![
            Channel::new(vec![(2, 11), (-2, 11)], false),
            Channel::new(vec![(21, 11)], false),
        ]);
        let pdfs_x1 = [
            densities(&[(2, 1.0), (-2, 0.5), (21, 4.0)]),
            densities(&[(2, 0.25), (-2, 0.125), (21, 2.0)]),
        ];

        let lumis = def.combine_nodes(&pdfs_x1, &[], false).unwrap();

        assert_eq!(lumis.shape(), [2, 1, 2]);
        assert_eq!(lumis[[0, 0, 0]], 1.5);
        assert_eq!(lumis[[0, 0, 1]], 4.0);
        assert_eq!(lumis[[1, 0, 0]], 0.375);
        assert_eq!(lumis[[1, 0, 1]], 2.0);
    }

    #[test]
    fn combine_nodes_matches_combine() {
        let def = SubprocessDef::new(vec![
            Channel::new(vec![(21, 21)], true),
            Channel::new(vec![(1, -1), (2, -2)], false),
            Channel::new(vec![(21, 1), (21, 2)], true),
        ]);
        let pdfs_x1 = [
            densities(&[(21, 2.0), (1, 0.5), (-1, 0.25), (2, 1.0), (-2, 0.125)]),
            densities(&[(21, 1.0), (1, 0.75), (-1, 0.5), (2, 1.5), (-2, 0.25)]),
        ];
        let pdfs_x2 = [
            densities(&[(21, 3.0), (1, 0.5), (-1, 0.5), (2, 2.0), (-2, 1.0)]),
            densities(&[(21, 0.5), (1, 0.25), (-1, 0.125), (2, 0.5), (-2, 0.0)]),
            densities(&[(21, 1.0), (1, 1.0), (-1, 1.0), (2, 1.0), (-2, 1.0)]),
        ];

        let lumis = def.combine_nodes(&pdfs_x1, &pdfs_x2, false).unwrap();

        assert_eq!(lumis.shape(), [2, 3, 3]);

        for (ix1, pdf_x1) in pdfs_x1.iter().enumerate() {
            for (ix2, pdf_x2) in pdfs_x2.iter().enumerate() {
                let lumi = def.combine(pdf_x1, pdf_x2, false).unwrap();

                for (channel, value) in lumi.into_iter().enumerate() {
                    assert_eq!(lumis[[ix1, ix2, channel]].to_bits(), value.to_bits());
                }
            }
        }
    }

    #[test]
    fn required_flavors() {
        let def = SubprocessDef::new(vec![
            Channel::new(vec![(21, 21)], true),
            Channel::new(vec![(2, -1)], false),
            Channel::new(vec![(3, 21)], true),
        ]);

        assert_eq!(
            def.required_flavors(false),
            (vec![2, 3, 21], vec![-1, 3, 21])
        );
        assert_eq!(def.required_flavors(true), (vec![2, 3, 21], vec![-3, 1, 21]));
    }

    #[test]
    fn from_fastnlo_ids() {
        let def =
            SubprocessDef::from_fastnlo_ids(vec![(vec![(0, 0)], false), (vec![(1, -1)], true)])
                .unwrap();

        assert_eq!(def.len(), 2);
        assert!(!def.is_empty());
        assert_eq!(def.channels()[0].pairs(), [(21, 21)]);
        assert!(!def.channels()[0].is_symmetric());
        assert_eq!(def.channel(1).unwrap().pairs(), [(1, -1)]);
        assert!(def.channel(1).unwrap().is_symmetric());

        assert!(matches!(
            def.channel(2),
            Err(Error::IndexOutOfRange {
                axis: Axis::Subprocess,
                index: 2,
                extent: 2
            })
        ));

        assert_eq!(
            SubprocessDef::from_fastnlo_ids(vec![(vec![(7, 0)], false)])
                .unwrap_err()
                .to_string(),
            "parton ID 7 is not supported"
        );
    }
}
