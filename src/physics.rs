//! Derived physical quantities computed from loaded records.
//!
//! Everything here is a pure function of its arguments. CGS units throughout,
//! wavelengths in Angstrom.

use std::f64::consts::{E, PI};

use crate::data::model::{CollisionTable, Line, TransitionType};
use crate::error::QueryError;
use crate::interp::{interpolate, InterpMode};

/// Speed of light, cm/s.
pub const C: f64 = 2.997_924_58e10;
/// Elementary charge, esu.
pub const E_CHARGE: f64 = 4.803_204_25e-10;
/// Electron mass, g.
pub const M_ELECTRON: f64 = 9.109_383_7e-28;
pub const ANGSTROM: f64 = 1e-8;

/// `8 pi^2 e^2 / (m_e c^3)`, the prefactor linking gf to A21.
pub const A21_CONSTANT: f64 = 8.0 * PI * PI * E_CHARGE * E_CHARGE / (M_ELECTRON * C * C * C);

pub fn frequency_to_wavelength(frequency: f64) -> f64 {
    C / (frequency * ANGSTROM)
}

pub fn wavelength_to_frequency(wavelength: f64) -> f64 {
    C / (wavelength * ANGSTROM)
}

/// Einstein A coefficient for spontaneous emission along `line`.
///
/// `A21 = 8 pi^2 e^2 nu^2 / (m_e c^3) * gf / g_upper`
pub fn einstein_a(line: &Line) -> f64 {
    A21_CONSTANT * line.frequency * line.frequency * line.gf / line.g_upper
}

/// Effective collision strength at scaled incident energy `u`.
///
/// Inside the tabulated grid the value is interpolated linearly. Past the
/// last sample, forbidden transitions stay flat and allowed transitions grow
/// like `ln(u + e)`, anchored on the last tabulated value. Energies below the
/// first sample are `OutOfRange`.
pub fn upsilon(table: &CollisionTable, u: f64) -> Result<f64, QueryError> {
    let n = table.energy.len();
    if n < 2 || table.upsilon.len() != n {
        return Err(QueryError::InsufficientSamples {
            x_len: n,
            y_len: table.upsilon.len(),
        });
    }

    let u_last = table.energy[n - 1];
    if u > u_last {
        let last = table.upsilon[n - 1];
        return Ok(match table.transition {
            TransitionType::Forbidden => last,
            TransitionType::Allowed => last * (u + E).ln() / (u_last + E).ln(),
        });
    }

    interpolate(u, &table.energy, &table.upsilon, InterpMode::Linear)
}
