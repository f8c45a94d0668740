//! Line-level parsing of catalog sub-files.
//!
//! Each data line is tokenised on whitespace and read field by field into a
//! typed record. References stay as natural keys until the loader links them.

use std::fmt;
use std::str::{FromStr, SplitWhitespace};

use serde::Serialize;
use thiserror::Error;

use super::model::TransitionType;

// ---------------------------------------------------------------------------
// Record kinds
// ---------------------------------------------------------------------------

/// The kind tag attached to each sub-file in the master manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordKind {
    Element,
    Ion,
    Level,
    Line,
    Photo,
    InnerShell,
    Collision,
}

impl RecordKind {
    pub fn tag(self) -> &'static str {
        match self {
            RecordKind::Element => "element",
            RecordKind::Ion => "ion",
            RecordKind::Level => "level",
            RecordKind::Line => "line",
            RecordKind::Photo => "photo",
            RecordKind::InnerShell => "inner",
            RecordKind::Collision => "collision",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "element" => Ok(RecordKind::Element),
            "ion" => Ok(RecordKind::Ion),
            "level" => Ok(RecordKind::Level),
            "line" => Ok(RecordKind::Line),
            "photo" => Ok(RecordKind::Photo),
            "inner" => Ok(RecordKind::InnerShell),
            "collision" => Ok(RecordKind::Collision),
            other => Err(format!("unknown record kind '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// What exactly was wrong with a record's fields.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldProblem {
    #[error("missing field '{0}'")]
    Missing(&'static str),

    #[error("field '{field}' has invalid value '{token}'")]
    Invalid { field: &'static str, token: String },

    #[error("field '{field}' must be positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    #[error("need at least 2 samples (got {0})")]
    TooFewSamples(usize),

    #[error("expected {expected} sample pairs but found {found}")]
    MissingSamples { expected: usize, found: usize },

    #[error("unknown transition type '{0}' (expected allowed or forbidden)")]
    UnknownTransition(String),
}

/// A line that could not be decoded as its declared record kind.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("line {line}: malformed {kind} record: {problem}")]
pub struct MalformedRecord {
    pub line: usize,
    pub kind: RecordKind,
    pub problem: FieldProblem,
}

// ---------------------------------------------------------------------------
// Parsed records (natural keys, not yet linked)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ElementRecord {
    pub z: u32,
    pub name: String,
    pub abundance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IonRecord {
    pub z: u32,
    pub stage: u32,
    pub ionization_potential: f64,
    pub g: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelRecord {
    pub z: u32,
    pub stage: u32,
    pub level: u32,
    pub energy: f64,
    pub g: f64,
    pub config: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineRecord {
    pub z: u32,
    pub stage: u32,
    pub lower: u32,
    pub upper: u32,
    pub frequency: f64,
    pub gf: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    pub z: u32,
    pub stage: u32,
    pub threshold: f64,
    pub samples: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InnerShellRecord {
    pub z: u32,
    pub stage: u32,
    pub shell_n: u32,
    pub shell_l: u32,
    pub threshold: f64,
    pub samples: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionRecord {
    pub z: u32,
    pub stage: u32,
    pub lower: u32,
    pub upper: u32,
    pub transition: TransitionType,
    pub samples: Vec<(f64, f64)>,
}

/// One decoded line of a sub-file.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Element(ElementRecord),
    Ion(IonRecord),
    Level(LevelRecord),
    Line(LineRecord),
    Photo(PhotoRecord),
    InnerShell(InnerShellRecord),
    Collision(CollisionRecord),
}

// ---------------------------------------------------------------------------
// Field cursor
// ---------------------------------------------------------------------------

struct Fields<'a> {
    tokens: SplitWhitespace<'a>,
    line: usize,
    kind: RecordKind,
}

impl<'a> Fields<'a> {
    fn new(text: &'a str, line: usize, kind: RecordKind) -> Self {
        Fields {
            tokens: text.split_whitespace(),
            line,
            kind,
        }
    }

    fn fail(&self, problem: FieldProblem) -> MalformedRecord {
        MalformedRecord {
            line: self.line,
            kind: self.kind,
            problem,
        }
    }

    fn text(&mut self, field: &'static str) -> Result<&'a str, MalformedRecord> {
        self.tokens
            .next()
            .ok_or_else(|| self.fail(FieldProblem::Missing(field)))
    }

    fn uint(&mut self, field: &'static str) -> Result<u32, MalformedRecord> {
        let tok = self.text(field)?;
        tok.parse::<u32>().map_err(|_| {
            self.fail(FieldProblem::Invalid {
                field,
                token: tok.to_string(),
            })
        })
    }

    fn float(&mut self, field: &'static str) -> Result<f64, MalformedRecord> {
        let tok = self.text(field)?;
        match tok.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(self.fail(FieldProblem::Invalid {
                field,
                token: tok.to_string(),
            })),
        }
    }

    fn positive(&mut self, field: &'static str) -> Result<f64, MalformedRecord> {
        let value = self.float(field)?;
        if value <= 0.0 {
            return Err(self.fail(FieldProblem::NotPositive { field, value }));
        }
        Ok(value)
    }

    /// A sample count followed by that many `(x, y)` pairs.
    fn samples(&mut self) -> Result<Vec<(f64, f64)>, MalformedRecord> {
        let n = self.uint("n")? as usize;
        if n < 2 {
            return Err(self.fail(FieldProblem::TooFewSamples(n)));
        }
        // `n` comes from the file, so cap the reservation.
        let mut samples = Vec::with_capacity(n.min(64));
        for found in 0..n {
            let x = match self.tokens.next() {
                Some(tok) => tok,
                None => {
                    return Err(self.fail(FieldProblem::MissingSamples { expected: n, found }))
                }
            };
            let y = match self.tokens.next() {
                Some(tok) => tok,
                None => {
                    return Err(self.fail(FieldProblem::MissingSamples { expected: n, found }))
                }
            };
            let x = self.sample_value("sample x", x)?;
            let y = self.sample_value("sample y", y)?;
            samples.push((x, y));
        }
        Ok(samples)
    }

    fn sample_value(&self, field: &'static str, tok: &str) -> Result<f64, MalformedRecord> {
        match tok.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(self.fail(FieldProblem::Invalid {
                field,
                token: tok.to_string(),
            })),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Decode one data line as a record of `kind`.
///
/// The caller has already dropped blank and comment lines. `line` is the
/// 1-based line number used in error reports. Tokens past the last field of
/// the layout are ignored.
pub fn parse_record(kind: RecordKind, text: &str, line: usize) -> Result<Record, MalformedRecord> {
    let mut f = Fields::new(text, line, kind);

    let record = match kind {
        RecordKind::Element => Record::Element(ElementRecord {
            z: f.uint("z")?,
            name: f.text("name")?.to_string(),
            abundance: f.float("abundance")?,
        }),
        RecordKind::Ion => Record::Ion(IonRecord {
            z: f.uint("z")?,
            stage: f.uint("stage")?,
            ionization_potential: f.float("ionization_potential")?,
            g: f.float("g")?,
        }),
        RecordKind::Level => Record::Level(LevelRecord {
            z: f.uint("z")?,
            stage: f.uint("stage")?,
            level: f.uint("level")?,
            energy: f.float("energy")?,
            g: f.positive("g")?,
            config: f.text("config")?.to_string(),
        }),
        RecordKind::Line => Record::Line(LineRecord {
            z: f.uint("z")?,
            stage: f.uint("stage")?,
            lower: f.uint("lower")?,
            upper: f.uint("upper")?,
            frequency: f.positive("frequency")?,
            gf: f.float("gf")?,
        }),
        RecordKind::Photo => Record::Photo(PhotoRecord {
            z: f.uint("z")?,
            stage: f.uint("stage")?,
            threshold: f.positive("threshold")?,
            samples: f.samples()?,
        }),
        RecordKind::InnerShell => Record::InnerShell(InnerShellRecord {
            z: f.uint("z")?,
            stage: f.uint("stage")?,
            shell_n: f.uint("shell_n")?,
            shell_l: f.uint("shell_l")?,
            threshold: f.positive("threshold")?,
            samples: f.samples()?,
        }),
        RecordKind::Collision => {
            let z = f.uint("z")?;
            let stage = f.uint("stage")?;
            let lower = f.uint("lower")?;
            let upper = f.uint("upper")?;
            let tag = f.text("transition")?;
            let transition = tag
                .parse::<TransitionType>()
                .map_err(|_| f.fail(FieldProblem::UnknownTransition(tag.to_string())))?;
            Record::Collision(CollisionRecord {
                z,
                stage,
                lower,
                upper,
                transition,
                samples: f.samples()?,
            })
        }
    };

    Ok(record)
}
