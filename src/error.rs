//! Error types for loading, validating and querying a catalog.
//!
//! Every variant carries structured context so a presentation layer can
//! render its own message; nothing here is printed by the library itself.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::data::parser::{MalformedRecord, RecordKind};

// ---------------------------------------------------------------------------
// Load errors
// ---------------------------------------------------------------------------

/// Anything that aborts a load. No partial catalog is ever returned.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    LoadIoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("master file '{name}' not found (searched {} location(s))", .searched.len())]
    MasterNotFound { name: String, searched: Vec<PathBuf> },

    #[error("{path}:{line}: malformed manifest entry: {reason}")]
    MalformedManifest {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("{path}: {source}")]
    MalformedRecord {
        path: PathBuf,
        #[source]
        source: MalformedRecord,
    },

    #[error("{path}:{line}: {kind} record references missing {target}")]
    BrokenReference {
        path: PathBuf,
        line: usize,
        kind: RecordKind,
        target: MissingTarget,
    },

    #[error("{path}:{line}: duplicate {kind} record for {key}")]
    DuplicateKey {
        path: PathBuf,
        line: usize,
        kind: RecordKind,
        key: String,
    },

    #[error("load cancelled")]
    Cancelled,
}

/// The natural key a dangling reference pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingTarget {
    Element { z: u32 },
    Ion { z: u32, stage: u32 },
    Level { z: u32, stage: u32, level: u32 },
    Line { z: u32, stage: u32, lower: u32, upper: u32 },
}

impl fmt::Display for MissingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingTarget::Element { z } => write!(f, "element z={z}"),
            MissingTarget::Ion { z, stage } => write!(f, "ion z={z} stage={stage}"),
            MissingTarget::Level { z, stage, level } => {
                write!(f, "level {level} of ion z={z} stage={stage}")
            }
            MissingTarget::Line {
                z,
                stage,
                lower,
                upper,
            } => write!(f, "line {lower}->{upper} of ion z={z} stage={stage}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

/// Failures local to one query; they never change catalog state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("need matching x/y tables of at least 2 samples (got {x_len} and {y_len})")]
    InsufficientSamples { x_len: usize, y_len: usize },

    #[error("invalid range: minimum {min} exceeds maximum {max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("{value} is outside the tabulated range [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("catalog failed validation with {problems} problem(s)")]
    CatalogInvalid { problems: usize },

    #[error("no {table} record at index {index}")]
    NoSuchRecord { table: &'static str, index: usize },
}

// ---------------------------------------------------------------------------
// Consistency errors
// ---------------------------------------------------------------------------

/// Which sampled table a consistency problem was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SampledTable {
    Photoionization,
    InnerShell,
    Collision,
}

impl fmt::Display for SampledTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampledTable::Photoionization => "photoionization edge",
            SampledTable::InnerShell => "inner-shell edge",
            SampledTable::Collision => "collision strength table",
        };
        f.write_str(name)
    }
}

/// A problem reported by [`crate::data::validate::validate`].
#[derive(Debug, Error, Clone, PartialEq, Serialize)]
pub enum ConsistencyError {
    #[error("{table} {record} (z={z} stage={stage}): sample {sample} at {value} does not exceed {previous}")]
    NonMonotonic {
        table: SampledTable,
        record: usize,
        z: u32,
        stage: u32,
        sample: usize,
        previous: f64,
        value: f64,
    },

    #[error("{table} {record} (z={z} stage={stage}): threshold {threshold} differs from first sample {first}")]
    ThresholdMismatch {
        table: SampledTable,
        record: usize,
        z: u32,
        stage: u32,
        threshold: f64,
        first: f64,
    },

    #[error("ion {ion} (z={z} stage={stage}) has no levels")]
    EmptyLevelRange { ion: usize, z: u32, stage: u32 },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_reference_names_the_missing_level() {
        let err = LoadError::BrokenReference {
            path: PathBuf::from("lines.dat"),
            line: 4,
            kind: RecordKind::Line,
            target: MissingTarget::Level {
                z: 6,
                stage: 4,
                level: 999,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("lines.dat:4"));
        assert!(msg.contains("level 999"));
    }

    #[test]
    fn consistency_error_serializes() {
        let err = ConsistencyError::EmptyLevelRange {
            ion: 2,
            z: 8,
            stage: 1,
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("EmptyLevelRange"));
    }
}
