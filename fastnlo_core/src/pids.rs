//! Particle identifiers used in subprocess definitions.
//!
//! Subprocess definitions use PDG Monte Carlo IDs throughout this crate; fastNLO's native
//! numbering, where the partons are labelled from `-6` to `6` and the gluon is `0`, can be
//! translated with [`pdg_id_from_fastnlo`] and [`fastnlo_id_from_pdg`].

/// PDG MC ID of the gluon.
pub const GLUON: i32 = 21;

/// PDG MC ID of the photon.
pub const PHOTON: i32 = 22;

/// Return the charge-conjugated PDG ID of `pid`. Quarks are mapped to antiquarks and vice versa,
/// gluons and photons are their own antiparticles.
#[must_use]
pub const fn charge_conjugate_pdg_pid(pid: i32) -> i32 {
    match pid {
        GLUON | PHOTON => pid,
        _ => -pid,
    }
}

/// Translate a parton ID in fastNLO's numbering into a PDG MC ID. Returns `None` if `pid` is not
/// in the range `-6..=6`.
#[must_use]
pub const fn pdg_id_from_fastnlo(pid: i32) -> Option<i32> {
    match pid {
        -6..=-1 | 1..=6 => Some(pid),
        0 => Some(GLUON),
        _ => None,
    }
}

/// Translate a PDG MC ID into fastNLO's parton numbering. This is the inverse of
/// [`pdg_id_from_fastnlo`]; IDs of particles that are neither quarks nor the gluon give `None`.
#[must_use]
pub const fn fastnlo_id_from_pdg(pid: i32) -> Option<i32> {
    match pid {
        -6..=-1 | 1..=6 => Some(pid),
        GLUON => Some(0),
        _ => None,
    }
}
