//! Linked catalog records.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::Serialize;

use crate::error::QueryError;
use crate::interp::{interpolate, InterpMode};
use crate::physics;

// ---------------------------------------------------------------------------
// Element / Ion / Level
// ---------------------------------------------------------------------------

/// A chemical element. `z` is unique within a catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub z: u32,
    pub name: String,
    /// Abundance on the log scale where hydrogen is 12.
    pub abundance: f64,
}

impl Element {
    /// Number abundance relative to hydrogen.
    pub fn relative_abundance(&self) -> f64 {
        10f64.powf(self.abundance - 12.0)
    }
}

/// One ionization stage of an element. Unique on `(element, stage)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ion {
    /// Index into the element table.
    pub element: usize,
    pub z: u32,
    pub stage: u32,
    /// Ionization potential in eV.
    pub ionization_potential: f64,
    /// Ground state statistical weight.
    pub g: f64,
    /// Half-open range of this ion's levels in the level table.
    pub level_start: usize,
    pub level_end: usize,
}

impl Ion {
    pub fn levels(&self) -> Range<usize> {
        self.level_start..self.level_end
    }

    pub fn n_levels(&self) -> usize {
        self.level_end.saturating_sub(self.level_start)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Level {
    /// Index into the ion table.
    pub ion: usize,
    /// Level number as written in the data files, unique within its ion.
    pub level: u32,
    /// Excitation energy in eV.
    pub energy: f64,
    pub g: f64,
    pub config: String,
}

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

/// A bound-bound transition between two levels of the same ion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub ion: usize,
    /// Level table indices.
    pub lower: usize,
    pub upper: usize,
    /// Transition frequency in Hz, always > 0.
    pub frequency: f64,
    pub gf: f64,
    pub g_lower: f64,
    pub g_upper: f64,
    /// Einstein A coefficient, derived at load time.
    pub a21: f64,
}

impl Line {
    /// Wavelength in Angstrom.
    pub fn wavelength(&self) -> f64 {
        physics::frequency_to_wavelength(self.frequency)
    }

    /// Absorption oscillator strength.
    pub fn f(&self) -> f64 {
        self.gf / self.g_lower
    }
}

// ---------------------------------------------------------------------------
// Cross sections
// ---------------------------------------------------------------------------

/// Frequency (Hz) against cross-section (cm^2), sampled geometrically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossSection {
    pub frequency: Vec<f64>,
    pub sigma: Vec<f64>,
}

impl CrossSection {
    pub fn from_samples(samples: &[(f64, f64)]) -> Self {
        let (frequency, sigma) = samples.iter().copied().unzip();
        CrossSection { frequency, sigma }
    }

    pub fn len(&self) -> usize {
        self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency.is_empty()
    }

    /// Log-log interpolated cross-section at `freq`.
    pub fn at(&self, freq: f64) -> Result<f64, QueryError> {
        interpolate(freq, &self.frequency, &self.sigma, InterpMode::Log)
    }
}

/// A photoionization edge from the ground state of an ion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoEdge {
    pub ion: usize,
    pub z: u32,
    pub stage: u32,
    /// Threshold frequency in Hz.
    pub threshold: f64,
    pub table: CrossSection,
}

/// An inner-shell ionization edge of an ion, keyed also by its element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InnerShellEdge {
    pub element: usize,
    pub ion: usize,
    pub z: u32,
    pub stage: u32,
    pub shell_n: u32,
    pub shell_l: u32,
    pub threshold: f64,
    pub table: CrossSection,
}

// ---------------------------------------------------------------------------
// Collision strengths
// ---------------------------------------------------------------------------

/// Governs how a collision strength behaves past its tabulated range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransitionType {
    Allowed,
    Forbidden,
}

impl FromStr for TransitionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allowed" => Ok(TransitionType::Allowed),
            "forbidden" => Ok(TransitionType::Forbidden),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionType::Allowed => write!(f, "allowed"),
            TransitionType::Forbidden => write!(f, "forbidden"),
        }
    }
}

/// Effective collision strength against scaled incident energy for one line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionTable {
    /// Index into the line table.
    pub line: usize,
    pub transition: TransitionType,
    pub energy: Vec<f64>,
    pub upsilon: Vec<f64>,
}
