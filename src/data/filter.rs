//! Range restriction over a [`SortIndex`](super::index::SortIndex).
//!
//! A restriction yields a [`QueryWindow`] of index positions; callers walk
//! it with [`windowed`] to get the matching records in key order.

use serde::Serialize;

use super::index::SortIndex;
use crate::error::QueryError;

// ---------------------------------------------------------------------------
// QueryWindow – active frequency restriction over a SortIndex
// ---------------------------------------------------------------------------

/// A contiguous run of sorted positions in a [`SortIndex`].
///
/// Stored half-open as `start..end`; `start == end` is the empty window,
/// which means "zero results", not failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryWindow {
    pub start: usize,
    pub end: usize,
}

impl QueryWindow {
    pub const EMPTY: QueryWindow = QueryWindow { start: 0, end: 0 };

    /// Window covering every entry of an index of length `len`.
    pub fn all(len: usize) -> Self {
        QueryWindow { start: 0, end: len }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Inclusive `(min, max)` sorted positions, `None` when empty.
    pub fn bounds(&self) -> Option<(usize, usize)> {
        if self.is_empty() {
            None
        } else {
            Some((self.start, self.end - 1))
        }
    }
}

/// Narrow `index` to entries with `min <= key <= max`.
///
/// `min > max` (or a NaN bound) is `InvalidRange`; a range that catches no
/// entries yields an empty window.
pub fn restrict(index: &SortIndex, min: f64, max: f64) -> Result<QueryWindow, QueryError> {
    if !(min <= max) {
        return Err(QueryError::InvalidRange { min, max });
    }
    let start = index.lower_bound(min);
    let end = index.upper_bound(max);
    if end <= start {
        return Ok(QueryWindow::EMPTY);
    }
    Ok(QueryWindow { start, end })
}

/// Walk `table` in key order through `window`, yielding `(table index, record)`.
///
/// Positions past the end of `index` are skipped, so a window built from a
/// different index cannot index out of bounds.
pub fn windowed<'a, T>(
    table: &'a [T],
    index: &'a SortIndex,
    window: QueryWindow,
) -> impl Iterator<Item = (usize, &'a T)> + 'a {
    let end = window.end.min(index.len());
    let start = window.start.min(end);
    index.order()[start..end]
        .iter()
        .filter_map(move |&i| table.get(i).map(|rec| (i, rec)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> (Vec<f64>, SortIndex) {
        let freqs = vec![1.0, 2.5, 2.5, 4.0];
        let index = SortIndex::build(&freqs, |&v| v);
        (freqs, index)
    }

    #[test]
    fn restrict_selects_tied_entries() {
        let (freqs, index) = index();
        let w = restrict(&index, 2.0, 3.0).unwrap();
        assert_eq!(w.bounds(), Some((1, 2)));
        let hits: Vec<usize> = windowed(&freqs, &index, w).map(|(i, _)| i).collect();
        assert_eq!(hits, vec![1, 2]);
    }

    #[test]
    fn restrict_is_inclusive_and_idempotent() {
        let (_, index) = index();
        let a = restrict(&index, 1.0, 4.0).unwrap();
        let b = restrict(&index, 1.0, 4.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, QueryWindow::all(4));
    }

    #[test]
    fn restrict_outside_keys_is_empty() {
        let (_, index) = index();
        assert!(restrict(&index, 5.0, 9.0).unwrap().is_empty());
        assert!(restrict(&index, 0.1, 0.9).unwrap().is_empty());
        assert!(restrict(&index, 2.6, 3.9).unwrap().is_empty());
        assert_eq!(restrict(&index, 5.0, 9.0).unwrap().bounds(), None);
    }

    #[test]
    fn restrict_rejects_inverted_range() {
        let (_, index) = index();
        assert_eq!(
            restrict(&index, 3.0, 2.0),
            Err(QueryError::InvalidRange { min: 3.0, max: 2.0 })
        );
    }

    #[test]
    fn restrict_on_empty_index() {
        let index = SortIndex::build(&Vec::<f64>::new(), |&v| v);
        let w = restrict(&index, 0.0, 1.0).unwrap();
        assert!(w.is_empty());
        assert_eq!(windowed(&Vec::<f64>::new(), &index, w).count(), 0);
    }
}
