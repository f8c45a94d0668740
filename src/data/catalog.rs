//! The loaded catalog and its query surface.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::filter::{self, QueryWindow};
use super::index::SortIndex;
use super::model::{CollisionTable, Element, InnerShellEdge, Ion, Level, Line, PhotoEdge};
use super::validate::validate;
use crate::error::{ConsistencyError, QueryError};
use crate::physics;

// ---------------------------------------------------------------------------
// Catalog – every table loaded from one master file
// ---------------------------------------------------------------------------

/// The complete, immutable data set loaded from one master file.
///
/// Tables keep load order; a record's position is its identity. Frequency
/// order is available through the line and edge [`SortIndex`]es. A catalog
/// that failed validation is still inspectable through the raw table
/// accessors, but every query method returns `CatalogInvalid`.
#[derive(Debug, Clone)]
pub struct Catalog {
    source: PathBuf,
    elements: Vec<Element>,
    ions: Vec<Ion>,
    levels: Vec<Level>,
    lines: Vec<Line>,
    photo_edges: Vec<PhotoEdge>,
    inner_edges: Vec<InnerShellEdge>,
    collisions: Vec<CollisionTable>,
    line_index: SortIndex,
    photo_index: SortIndex,
    inner_index: SortIndex,
    problems: Vec<ConsistencyError>,
}

/// Fully linked tables, ready to become a [`Catalog`].
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    pub elements: Vec<Element>,
    pub ions: Vec<Ion>,
    pub levels: Vec<Level>,
    pub lines: Vec<Line>,
    pub photo_edges: Vec<PhotoEdge>,
    pub inner_edges: Vec<InnerShellEdge>,
    pub collisions: Vec<CollisionTable>,
}

/// Table counts and health, suitable for a status view or JSON dump.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSummary {
    pub source: PathBuf,
    pub elements: usize,
    pub ions: usize,
    pub levels: usize,
    pub lines: usize,
    pub photo_edges: usize,
    pub inner_edges: usize,
    pub collision_tables: usize,
    /// Lowest and highest line frequency, if there are lines.
    pub line_frequency_span: Option<(f64, f64)>,
    pub valid: bool,
    pub problems: Vec<ConsistencyError>,
}

impl Catalog {
    /// Build the sort indices over linked `tables` and run validation.
    pub(crate) fn assemble(source: PathBuf, tables: Tables) -> Self {
        let Tables {
            elements,
            ions,
            levels,
            lines,
            photo_edges,
            inner_edges,
            collisions,
        } = tables;

        let line_index = SortIndex::build(&lines, |l| l.frequency);
        let photo_index = SortIndex::build(&photo_edges, |e| e.threshold);
        let inner_index = SortIndex::build(&inner_edges, |e| e.threshold);

        let mut catalog = Catalog {
            source,
            elements,
            ions,
            levels,
            lines,
            photo_edges,
            inner_edges,
            collisions,
            line_index,
            photo_index,
            inner_index,
            problems: Vec::new(),
        };
        if let Err(problems) = validate(&catalog) {
            catalog.problems = problems;
        }
        catalog
    }

    // -- Raw tables (always available, also on invalid catalogs) --

    /// Master file this catalog was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn ions(&self) -> &[Ion] {
        &self.ions
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn photo_edges(&self) -> &[PhotoEdge] {
        &self.photo_edges
    }

    pub fn inner_edges(&self) -> &[InnerShellEdge] {
        &self.inner_edges
    }

    pub fn collisions(&self) -> &[CollisionTable] {
        &self.collisions
    }

    pub fn line_index(&self) -> &SortIndex {
        &self.line_index
    }

    pub fn photo_index(&self) -> &SortIndex {
        &self.photo_index
    }

    pub fn inner_index(&self) -> &SortIndex {
        &self.inner_index
    }

    // -- Health --

    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }

    /// Validation problems found at load time (empty when valid).
    pub fn problems(&self) -> &[ConsistencyError] {
        &self.problems
    }

    fn ensure_valid(&self) -> Result<(), QueryError> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(QueryError::CatalogInvalid {
                problems: self.problems.len(),
            })
        }
    }

    pub fn summary(&self) -> CatalogSummary {
        let keys = self.line_index.keys();
        CatalogSummary {
            source: self.source.clone(),
            elements: self.elements.len(),
            ions: self.ions.len(),
            levels: self.levels.len(),
            lines: self.lines.len(),
            photo_edges: self.photo_edges.len(),
            inner_edges: self.inner_edges.len(),
            collision_tables: self.collisions.len(),
            line_frequency_span: keys.first().zip(keys.last()).map(|(a, b)| (*a, *b)),
            valid: self.is_valid(),
            problems: self.problems.clone(),
        }
    }

    // -- Lookups --

    pub fn element(&self, index: usize) -> Result<&Element, QueryError> {
        self.ensure_valid()?;
        self.elements.get(index).ok_or(QueryError::NoSuchRecord {
            table: "element",
            index,
        })
    }

    pub fn ion(&self, index: usize) -> Result<&Ion, QueryError> {
        self.ensure_valid()?;
        self.ions.get(index).ok_or(QueryError::NoSuchRecord { table: "ion", index })
    }

    pub fn line(&self, index: usize) -> Result<&Line, QueryError> {
        self.ensure_valid()?;
        self.lines.get(index).ok_or(QueryError::NoSuchRecord { table: "line", index })
    }

    /// Index of the element with atomic number `z`.
    pub fn element_by_z(&self, z: u32) -> Result<Option<usize>, QueryError> {
        self.ensure_valid()?;
        Ok(self.elements.iter().position(|e| e.z == z))
    }

    pub fn element_name(&self, z: u32) -> Result<Option<&str>, QueryError> {
        self.ensure_valid()?;
        Ok(self.elements.iter().find(|e| e.z == z).map(|e| e.name.as_str()))
    }

    pub fn ion_by_z_stage(&self, z: u32, stage: u32) -> Result<Option<usize>, QueryError> {
        self.ensure_valid()?;
        Ok(self.ions.iter().position(|i| i.z == z && i.stage == stage))
    }

    /// Ion indices belonging to `element`, in table order.
    pub fn ions_of_element(&self, element: usize) -> Result<Vec<usize>, QueryError> {
        self.element(element)?;
        Ok(self
            .ions
            .iter()
            .enumerate()
            .filter(|(_, ion)| ion.element == element)
            .map(|(i, _)| i)
            .collect())
    }

    pub fn levels_of_ion(&self, ion: usize) -> Result<&[Level], QueryError> {
        let ion = self.ion(ion)?;
        Ok(self.levels.get(ion.levels()).unwrap_or(&[]))
    }

    /// Line indices of `ion` in ascending frequency.
    pub fn lines_of_ion(&self, ion: usize) -> Result<Vec<usize>, QueryError> {
        self.ion(ion)?;
        Ok(self.lines_where(|line| line.ion == ion))
    }

    /// Line indices of every ion of `element` in ascending frequency.
    pub fn lines_of_element(&self, element: usize) -> Result<Vec<usize>, QueryError> {
        self.element(element)?;
        Ok(self.lines_where(|line| self.ions[line.ion].element == element))
    }

    fn lines_where<F: Fn(&Line) -> bool>(&self, keep: F) -> Vec<usize> {
        self.line_index
            .order()
            .iter()
            .copied()
            .filter(|&i| keep(&self.lines[i]))
            .collect()
    }

    pub fn photo_edges_of_ion(&self, ion: usize) -> Result<Vec<usize>, QueryError> {
        self.ion(ion)?;
        Ok(self
            .photo_index
            .order()
            .iter()
            .copied()
            .filter(|&i| self.photo_edges[i].ion == ion)
            .collect())
    }

    pub fn inner_edges_of_element(&self, element: usize) -> Result<Vec<usize>, QueryError> {
        self.element(element)?;
        Ok(self
            .inner_index
            .order()
            .iter()
            .copied()
            .filter(|&i| self.inner_edges[i].element == element)
            .collect())
    }

    // -- Range queries --

    /// Lines with `fmin <= frequency <= fmax`, as a window over the line index.
    pub fn restrict(&self, fmin: f64, fmax: f64) -> Result<QueryWindow, QueryError> {
        self.ensure_valid()?;
        filter::restrict(&self.line_index, fmin, fmax)
    }

    /// Lines with wavelength (Angstrom) in `[wmin, wmax]`.
    pub fn restrict_wavelength(&self, wmin: f64, wmax: f64) -> Result<QueryWindow, QueryError> {
        if !(wmin <= wmax) || wmin <= 0.0 {
            return Err(QueryError::InvalidRange { min: wmin, max: wmax });
        }
        self.restrict(
            physics::wavelength_to_frequency(wmax),
            physics::wavelength_to_frequency(wmin),
        )
    }

    /// Photoionization edges with threshold in `[fmin, fmax]`.
    pub fn restrict_photo(&self, fmin: f64, fmax: f64) -> Result<QueryWindow, QueryError> {
        self.ensure_valid()?;
        filter::restrict(&self.photo_index, fmin, fmax)
    }

    /// Inner-shell edges with threshold in `[fmin, fmax]`.
    pub fn restrict_inner(&self, fmin: f64, fmax: f64) -> Result<QueryWindow, QueryError> {
        self.ensure_valid()?;
        filter::restrict(&self.inner_index, fmin, fmax)
    }

    pub fn lines_in(
        &self,
        window: QueryWindow,
    ) -> Result<impl Iterator<Item = (usize, &Line)> + '_, QueryError> {
        self.ensure_valid()?;
        Ok(filter::windowed(&self.lines, &self.line_index, window))
    }

    pub fn photo_edges_in(
        &self,
        window: QueryWindow,
    ) -> Result<impl Iterator<Item = (usize, &PhotoEdge)> + '_, QueryError> {
        self.ensure_valid()?;
        Ok(filter::windowed(&self.photo_edges, &self.photo_index, window))
    }

    pub fn inner_edges_in(
        &self,
        window: QueryWindow,
    ) -> Result<impl Iterator<Item = (usize, &InnerShellEdge)> + '_, QueryError> {
        self.ensure_valid()?;
        Ok(filter::windowed(&self.inner_edges, &self.inner_index, window))
    }

    // -- Interpolated quantities --

    pub fn photo_cross_section(&self, edge: usize, frequency: f64) -> Result<f64, QueryError> {
        self.ensure_valid()?;
        let edge = self.photo_edges.get(edge).ok_or(QueryError::NoSuchRecord {
            table: "photoionization edge",
            index: edge,
        })?;
        edge.table.at(frequency)
    }

    pub fn inner_cross_section(&self, edge: usize, frequency: f64) -> Result<f64, QueryError> {
        self.ensure_valid()?;
        let edge = self.inner_edges.get(edge).ok_or(QueryError::NoSuchRecord {
            table: "inner-shell edge",
            index: edge,
        })?;
        edge.table.at(frequency)
    }

    pub fn collision_upsilon(&self, table: usize, u: f64) -> Result<f64, QueryError> {
        self.ensure_valid()?;
        let coll = self.collisions.get(table).ok_or(QueryError::NoSuchRecord {
            table: "collision strength table",
            index: table,
        })?;
        physics::upsilon(coll, u)
    }

    /// Collision table attached to line `line`, if any.
    pub fn collision_for_line(&self, line: usize) -> Result<Option<usize>, QueryError> {
        self.ensure_valid()?;
        Ok(self.collisions.iter().position(|c| c.line == line))
    }
}
